//! NetCDF classic header parsing.
//!
//! The header has no fixed size, so the parser is built on `nom`'s
//! **streaming** primitives: on a truncated buffer it reports
//! [`nom::Err::Incomplete`] and the caller can read more bytes and retry
//! (see [`crate::netcdf::Dataset`]).
//!
//! # See also
//! ------------
//! * [`Header::parse`] – Decoder for the whole header.
//! * [`crate::netcdf::DatasetBuilder`] – The matching encoder.

use nom::{
    bytes::streaming::take,
    error::{Error, ErrorKind},
    number::streaming::{be_u32, be_u64, u8 as byte},
    Err, IResult,
};
use smallvec::SmallVec;

use super::{decode_numbers, AttrValue, Attribute, Dimension, NcType, Variable};

pub(crate) const NC_DIMENSION: u32 = 0x0A;
pub(crate) const NC_VARIABLE: u32 = 0x0B;
pub(crate) const NC_ATTRIBUTE: u32 = 0x0C;

/// Record count written by streaming producers that never finalized the file
const STREAMING_NUMRECS: u32 = u32::MAX;

/// Smallest encoded size of a list entry: name length and dimension length
const MIN_DIMENSION_BYTES: usize = 8;
/// Name length, type and element count
const MIN_ATTRIBUTE_BYTES: usize = 12;
/// Name length, dimension count, ABSENT attribute list, type, vsize and 32-bit begin
const MIN_VARIABLE_BYTES: usize = 28;

type NcResult<'a, T> = IResult<&'a [u8], T>;

/// Number of padding bytes needed to reach a 4-byte boundary.
pub(crate) fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

fn fail<T>(input: &[u8]) -> NcResult<'_, T> {
    Err(Err::Failure(Error::new(input, ErrorKind::Verify)))
}

fn u8_be(input: &[u8]) -> NcResult<'_, u8> {
    byte(input)
}

fn u32_be(input: &[u8]) -> NcResult<'_, u32> {
    be_u32(input)
}

fn u64_be(input: &[u8]) -> NcResult<'_, u64> {
    be_u64(input)
}

fn take_bytes(input: &[u8], n: usize) -> NcResult<'_, &[u8]> {
    take(n)(input)
}

fn parse_name(input: &[u8]) -> NcResult<'_, String> {
    let (input, len) = u32_be(input)?;
    let (input, bytes) = take_bytes(input, len as usize)?;
    let (input, _) = take_bytes(input, padding(len as usize))?;
    Ok((input, String::from_utf8_lossy(bytes).into_owned()))
}

fn parse_nc_type(input: &[u8]) -> NcResult<'_, NcType> {
    let (rest, code) = u32_be(input)?;
    match NcType::from_code(code) {
        Some(nc_type) => Ok((rest, nc_type)),
        None => fail(input),
    }
}

/// Parse the `(tag, nelems)` prefix of a list, `None` when the list is ABSENT.
fn parse_list_prefix(input: &[u8], expected_tag: u32) -> NcResult<'_, Option<usize>> {
    let (rest, tag) = u32_be(input)?;
    let (rest, nelems) = u32_be(rest)?;
    match (tag, nelems) {
        (0, 0) => Ok((rest, None)),
        (t, n) if t == expected_tag => Ok((rest, Some(n as usize))),
        _ => fail(input),
    }
}

/// Capacity to reserve for a list of `nelems` entries; the count comes from the
/// file and is bounded by what the remaining bytes can encode.
fn list_capacity(nelems: Option<usize>, input: &[u8], min_entry_bytes: usize) -> usize {
    nelems.unwrap_or(0).min(input.len() / min_entry_bytes)
}

fn parse_dimension(input: &[u8]) -> NcResult<'_, (String, u32)> {
    let (input, name) = parse_name(input)?;
    let (input, len) = u32_be(input)?;
    Ok((input, (name, len)))
}

fn parse_attribute(input: &[u8]) -> NcResult<'_, Attribute> {
    let (input, name) = parse_name(input)?;
    let (input, nc_type) = parse_nc_type(input)?;
    let (input, nelems) = u32_be(input)?;
    let nbytes = nelems as usize * nc_type.size();
    let (input, payload) = take_bytes(input, nbytes)?;
    let (input, _) = take_bytes(input, padding(nbytes))?;

    let value = match nc_type {
        NcType::Char => AttrValue::Text(
            String::from_utf8_lossy(payload)
                .trim_end_matches('\0')
                .to_string(),
        ),
        numeric => AttrValue::Numbers(decode_numbers(payload, numeric)),
    };
    Ok((input, Attribute { name, value }))
}

fn parse_attribute_list(input: &[u8]) -> NcResult<'_, Vec<Attribute>> {
    let (mut input, nelems) = parse_list_prefix(input, NC_ATTRIBUTE)?;
    let mut attributes = Vec::with_capacity(list_capacity(nelems, input, MIN_ATTRIBUTE_BYTES));
    for _ in 0..nelems.unwrap_or(0) {
        let (rest, attribute) = parse_attribute(input)?;
        attributes.push(attribute);
        input = rest;
    }
    Ok((input, attributes))
}

fn parse_variable(input: &[u8], version: u8, ndims_total: usize) -> NcResult<'_, Variable> {
    let (input, name) = parse_name(input)?;
    let (mut input, ndims) = u32_be(input)?;
    let mut dim_ids = SmallVec::new();
    for _ in 0..ndims {
        let (rest, id) = u32_be(input)?;
        if id as usize >= ndims_total {
            return fail(input);
        }
        dim_ids.push(id as usize);
        input = rest;
    }
    let (input, attributes) = parse_attribute_list(input)?;
    let (input, nc_type) = parse_nc_type(input)?;
    let (input, vsize) = u32_be(input)?;
    let (input, begin) = if version == 1 {
        let (input, begin) = u32_be(input)?;
        (input, begin as u64)
    } else {
        u64_be(input)?
    };
    Ok((
        input,
        Variable {
            name,
            dim_ids,
            attributes,
            nc_type,
            vsize: vsize as u64,
            begin,
        },
    ))
}

/// In-memory representation of a NetCDF classic header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// 1 for CDF-1, 2 for CDF-2
    pub version: u8,
    pub numrecs: usize,
    pub dimensions: Vec<Dimension>,
    pub attributes: Vec<Attribute>,
    pub variables: Vec<Variable>,
}

impl Header {
    /// Parse a header from the start of a file.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: bytes from the beginning of the file; may be a prefix.
    ///
    /// Return
    /// ----------
    /// * An [`IResult`] whose value is `(remaining, header)`, or
    ///   [`nom::Err::Incomplete`] if `input` stops before the end of the header.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (rest, magic) = take_bytes(input, 3)?;
        if magic != b"CDF" {
            return fail(input);
        }
        let (rest, version) = u8_be(rest)?;
        if version != 1 && version != 2 {
            return fail(input);
        }
        let (rest, numrecs) = u32_be(rest)?;
        if numrecs == STREAMING_NUMRECS {
            return fail(input);
        }

        let (mut rest, ndims) = parse_list_prefix(rest, NC_DIMENSION)?;
        let mut raw_dims = Vec::with_capacity(list_capacity(ndims, rest, MIN_DIMENSION_BYTES));
        for _ in 0..ndims.unwrap_or(0) {
            let (next, dim) = parse_dimension(rest)?;
            raw_dims.push(dim);
            rest = next;
        }
        let dimensions: Vec<Dimension> = raw_dims
            .into_iter()
            .map(|(name, len)| Dimension {
                name,
                len: if len == 0 { numrecs as usize } else { len as usize },
                unlimited: len == 0,
            })
            .collect();

        let (rest, attributes) = parse_attribute_list(rest)?;

        let (mut rest, nvars) = parse_list_prefix(rest, NC_VARIABLE)?;
        let mut variables = Vec::with_capacity(list_capacity(nvars, rest, MIN_VARIABLE_BYTES));
        for _ in 0..nvars.unwrap_or(0) {
            let (next, variable) = parse_variable(rest, version, dimensions.len())?;
            variables.push(variable);
            rest = next;
        }

        Ok((
            rest,
            Header {
                version,
                numrecs: numrecs as usize,
                dimensions,
                attributes,
                variables,
            },
        ))
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn dimension_names(&self, variable: &Variable) -> Vec<String> {
        variable
            .dim_ids
            .iter()
            .map(|id| self.dimensions[*id].name.clone())
            .collect()
    }

    pub fn shape(&self, variable: &Variable) -> Vec<usize> {
        variable
            .dim_ids
            .iter()
            .map(|id| self.dimensions[*id].len)
            .collect()
    }

    pub fn is_record_variable(&self, variable: &Variable) -> bool {
        variable
            .dim_ids
            .first()
            .is_some_and(|id| self.dimensions[*id].unlimited)
    }

    /// Stride between two consecutive records.
    pub fn record_size(&self) -> u64 {
        let record_vars: Vec<&Variable> = self
            .variables
            .iter()
            .filter(|v| self.is_record_variable(v))
            .collect();
        match record_vars.as_slice() {
            // A lone record variable is not padded
            [single] => {
                let shape = self.shape(single);
                (shape[1..].iter().product::<usize>() * single.nc_type.size()) as u64
            }
            vars => vars.iter().map(|v| v.vsize).sum(),
        }
    }

    pub fn global_attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }
}

#[cfg(test)]
mod test_header {
    use super::*;
    use crate::netcdf::DatasetBuilder;

    fn sample() -> Vec<u8> {
        DatasetBuilder::new()
            .dimension("w", 3)
            .dimension("wbv", 2)
            .attribute("title", "test")
            .variable_f64("w", &["w"], vec![500.0, 510.0, 520.0])
            .variable_attribute("w", "units", "nm")
            .variable_f64("wbounds", &["wbv", "w"], vec![0.0; 6])
            .to_bytes()
            .unwrap()
    }

    #[test]
    fn test_parse_header() {
        let bytes = sample();
        let (_, header) = Header::parse(&bytes).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.numrecs, 0);
        assert_eq!(header.dimensions.len(), 2);
        assert_eq!(header.dimensions[0].name, "w");
        assert_eq!(header.dimensions[0].len, 3);
        assert_eq!(
            header.global_attribute("title"),
            Some(&AttrValue::Text("test".into()))
        );

        let w = header.variable("w").unwrap();
        assert_eq!(w.nc_type, NcType::Double);
        assert_eq!(w.vsize, 24);
        assert_eq!(w.attribute("units").and_then(|u| u.as_str()), Some("nm"));

        let wbounds = header.variable("wbounds").unwrap();
        assert_eq!(header.dimension_names(wbounds), vec!["wbv", "w"]);
        assert_eq!(header.shape(wbounds), vec![2, 3]);
        assert_eq!(wbounds.begin, w.begin + 24);
    }

    #[test]
    fn test_truncated_header_is_incomplete() {
        let bytes = sample();
        assert!(matches!(Header::parse(&bytes[..20]), Err(Err::Incomplete(_))));
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample();
        bytes[0] = b'H';
        assert!(matches!(Header::parse(&bytes), Err(Err::Failure(_))));

        let mut bytes = sample();
        bytes[3] = 5;
        assert!(matches!(Header::parse(&bytes), Err(Err::Failure(_))));
    }

    /// Empty classic header, then a variable list announcing `nvars` entries.
    fn header_with_variable_count(nvars: u32) -> Vec<u8> {
        let mut bytes = b"CDF\x01".to_vec();
        bytes.extend(0u32.to_be_bytes()); // numrecs
        bytes.extend([0u8; 8]); // ABSENT dimensions
        bytes.extend([0u8; 8]); // ABSENT attributes
        bytes.extend(NC_VARIABLE.to_be_bytes());
        bytes.extend(nvars.to_be_bytes());
        bytes
    }

    #[test]
    fn test_huge_element_count() {
        let bytes = header_with_variable_count(0x7fff_ffff);
        assert!(matches!(Header::parse(&bytes), Err(Err::Incomplete(_))));

        let result = crate::netcdf::Dataset::from_bytes(camino::Utf8Path::new("corrupt.nc"), bytes);
        assert!(matches!(result, Err(crate::ckdkit_errors::CkdkitError::NetcdfParsingError(_))));

        let (_, header) = Header::parse(&header_with_variable_count(0)).unwrap();
        assert!(header.variables.is_empty());
    }

    #[test]
    fn test_list_capacity() {
        assert_eq!(list_capacity(None, &[0u8; 64], MIN_VARIABLE_BYTES), 0);
        assert_eq!(list_capacity(Some(usize::MAX), &[0u8; 64], MIN_VARIABLE_BYTES), 2);
        assert_eq!(list_capacity(Some(3), &[0u8; 64], MIN_DIMENSION_BYTES), 3);
    }

    #[test]
    fn test_padding() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 3);
        assert_eq!(padding(4), 0);
        assert_eq!(padding(6), 2);
    }
}
