//! Writer for NetCDF classic (CDF-1) files.
//!
//! [`DatasetBuilder`] collects dimensions, attributes and variables and
//! serializes them in one pass. It only writes fixed-size variables (no
//! unlimited dimension), which is all absorption datasets need.
//!
//! ```rust
//! use ckdkit::netcdf::{Dataset, DatasetBuilder};
//! use camino::Utf8Path;
//!
//! let bytes = DatasetBuilder::new()
//!     .dimension("w", 2)
//!     .variable_f64("w", &["w"], vec![500.0, 510.0])
//!     .variable_attribute("w", "units", "nm")
//!     .to_bytes()
//!     .unwrap();
//! let ds = Dataset::from_bytes(Utf8Path::new("memory.nc"), bytes).unwrap();
//! assert_eq!(ds.values("w").unwrap(), vec![500.0, 510.0]);
//! ```

use camino::Utf8Path;

use super::header::{padding, NC_ATTRIBUTE, NC_DIMENSION, NC_VARIABLE};
use super::{AttrValue, Attribute, NcType};
use crate::ckdkit_errors::CkdkitError;

#[derive(Debug, Clone, PartialEq)]
enum VarData {
    Double(Vec<f64>),
    Int(Vec<i32>),
    Char(Vec<u8>),
}

impl VarData {
    fn nc_type(&self) -> NcType {
        match self {
            VarData::Double(_) => NcType::Double,
            VarData::Int(_) => NcType::Int,
            VarData::Char(_) => NcType::Char,
        }
    }

    fn len(&self) -> usize {
        match self {
            VarData::Double(v) => v.len(),
            VarData::Int(v) => v.len(),
            VarData::Char(v) => v.len(),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            VarData::Double(v) => v.iter().for_each(|x| out.extend(x.to_be_bytes())),
            VarData::Int(v) => v.iter().for_each(|x| out.extend(x.to_be_bytes())),
            VarData::Char(v) => out.extend(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct VarDef {
    name: String,
    dims: Vec<String>,
    data: VarData,
}

/// In-memory description of a NetCDF classic file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetBuilder {
    dimensions: Vec<(String, usize)>,
    attributes: Vec<Attribute>,
    variables: Vec<VarDef>,
    variable_attributes: Vec<(String, Attribute)>,
}

fn encode_u32(out: &mut Vec<u8>, value: u32) {
    out.extend(value.to_be_bytes());
}

fn encode_name(out: &mut Vec<u8>, name: &str) {
    encode_u32(out, name.len() as u32);
    out.extend(name.as_bytes());
    out.extend(std::iter::repeat(0u8).take(padding(name.len())));
}

fn encode_attributes<'a>(
    out: &mut Vec<u8>,
    attributes: impl ExactSizeIterator<Item = &'a Attribute>,
) {
    if attributes.len() == 0 {
        encode_u32(out, 0);
        encode_u32(out, 0);
        return;
    }
    encode_u32(out, NC_ATTRIBUTE);
    encode_u32(out, attributes.len() as u32);
    for attribute in attributes {
        encode_name(out, &attribute.name);
        let start = out.len();
        match &attribute.value {
            AttrValue::Text(text) => {
                encode_u32(out, NcType::Char.code());
                encode_u32(out, text.len() as u32);
                out.extend(text.as_bytes());
            }
            AttrValue::Numbers(values) => {
                encode_u32(out, NcType::Double.code());
                encode_u32(out, values.len() as u32);
                values.iter().for_each(|v| out.extend(v.to_be_bytes()));
            }
        }
        let payload = out.len() - start - 8;
        out.extend(std::iter::repeat(0u8).take(padding(payload)));
    }
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(mut self, name: &str, len: usize) -> Self {
        self.dimensions.push((name.to_string(), len));
        self
    }

    /// Add a global attribute.
    pub fn attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.push(Attribute {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn variable_f64(mut self, name: &str, dims: &[&str], data: Vec<f64>) -> Self {
        self.push_variable(name, dims, VarData::Double(data));
        self
    }

    pub fn variable_i32(mut self, name: &str, dims: &[&str], data: Vec<i32>) -> Self {
        self.push_variable(name, dims, VarData::Int(data));
        self
    }

    /// Add a character variable; each string is NUL-padded to the length of the
    /// last dimension.
    pub fn variable_text(mut self, name: &str, dims: &[&str], strings: &[&str]) -> Self {
        let strlen = dims
            .last()
            .and_then(|d| self.dimensions.iter().find(|(n, _)| n == d))
            .map_or(0, |(_, len)| *len);
        let mut bytes = Vec::with_capacity(strings.len() * strlen);
        for s in strings {
            let mut raw = s.as_bytes().to_vec();
            raw.resize(strlen, 0);
            bytes.extend(raw);
        }
        self.push_variable(name, dims, VarData::Char(bytes));
        self
    }

    pub fn variable_attribute(
        mut self,
        variable: &str,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Self {
        self.variable_attributes.push((
            variable.to_string(),
            Attribute {
                name: name.to_string(),
                value: value.into(),
            },
        ));
        self
    }

    fn push_variable(&mut self, name: &str, dims: &[&str], data: VarData) {
        self.variables.push(VarDef {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
        });
    }

    fn validate(&self) -> Result<Vec<Vec<usize>>, CkdkitError> {
        if let Some((variable, _)) = self
            .variable_attributes
            .iter()
            .find(|(v, _)| !self.variables.iter().any(|def| &def.name == v))
        {
            return Err(CkdkitError::InvalidArgument(format!(
                "attribute set on unknown variable '{variable}'"
            )));
        }
        self.variables
            .iter()
            .map(|def| {
                let ids = def
                    .dims
                    .iter()
                    .map(|d| {
                        self.dimensions.iter().position(|(n, _)| n == d).ok_or_else(|| {
                            CkdkitError::InvalidArgument(format!(
                                "variable '{}' uses unknown dimension '{d}'",
                                def.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<usize>, _>>()?;
                let expected: usize = ids.iter().map(|id| self.dimensions[*id].1).product();
                if expected != def.data.len() {
                    return Err(CkdkitError::InvalidArgument(format!(
                        "variable '{}' has {} values, expected {expected}",
                        def.name,
                        def.data.len()
                    )));
                }
                Ok(ids)
            })
            .collect()
    }

    fn encode_header(&self, dim_ids: &[Vec<usize>], begins: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(b"CDF\x01");
        encode_u32(&mut out, 0);

        if self.dimensions.is_empty() {
            encode_u32(&mut out, 0);
            encode_u32(&mut out, 0);
        } else {
            encode_u32(&mut out, NC_DIMENSION);
            encode_u32(&mut out, self.dimensions.len() as u32);
            for (name, len) in &self.dimensions {
                encode_name(&mut out, name);
                encode_u32(&mut out, *len as u32);
            }
        }

        encode_attributes(&mut out, self.attributes.iter());

        if self.variables.is_empty() {
            encode_u32(&mut out, 0);
            encode_u32(&mut out, 0);
        } else {
            encode_u32(&mut out, NC_VARIABLE);
            encode_u32(&mut out, self.variables.len() as u32);
            for (k, def) in self.variables.iter().enumerate() {
                encode_name(&mut out, &def.name);
                encode_u32(&mut out, dim_ids[k].len() as u32);
                for id in &dim_ids[k] {
                    encode_u32(&mut out, *id as u32);
                }
                let attributes: Vec<&Attribute> = self
                    .variable_attributes
                    .iter()
                    .filter(|(v, _)| v == &def.name)
                    .map(|(_, a)| a)
                    .collect();
                encode_attributes(&mut out, attributes.into_iter());
                encode_u32(&mut out, def.data.nc_type().code());
                encode_u32(&mut out, padded_size(&def.data) as u32);
                encode_u32(&mut out, begins[k]);
            }
        }
        out
    }

    /// Serialize to a CDF-1 byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CkdkitError> {
        let dim_ids = self.validate()?;

        // Offsets are fixed-width, so a first pass gives the header length
        let header_len = self
            .encode_header(&dim_ids, &vec![0; self.variables.len()])
            .len();
        let mut begins = Vec::with_capacity(self.variables.len());
        let mut offset = header_len;
        for def in &self.variables {
            begins.push(u32::try_from(offset).map_err(|_| {
                CkdkitError::InvalidArgument("dataset too large for the classic format".into())
            })?);
            offset += padded_size(&def.data);
        }

        let mut out = self.encode_header(&dim_ids, &begins);
        for def in &self.variables {
            let start = out.len();
            def.data.encode(&mut out);
            let written = out.len() - start;
            out.extend(std::iter::repeat(0u8).take(padding(written)));
        }
        Ok(out)
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), CkdkitError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

fn padded_size(data: &VarData) -> usize {
    let size = data.len() * data.nc_type().size();
    size + padding(size)
}

#[cfg(test)]
mod test_builder {
    use super::*;
    use crate::netcdf::Dataset;

    #[test]
    fn test_round_trip_with_padding() {
        let bytes = DatasetBuilder::new()
            .dimension("n", 3)
            .dimension("s", 3)
            .attribute("odd", "abc")
            .variable_text("label", &["s"], &["xyz"])
            .variable_i32("counts", &["n"], vec![1, 2, 3])
            .variable_attribute("counts", "scale", vec![0.5, 2.0])
            .to_bytes()
            .unwrap();
        assert_eq!(bytes.len() % 4, 0);

        let ds = Dataset::from_bytes(Utf8Path::new("memory.nc"), bytes).unwrap();
        assert_eq!(ds.text("label").unwrap(), vec!["xyz"]);
        assert_eq!(ds.values("counts").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(
            ds.attribute("counts", "scale"),
            Some(&AttrValue::Numbers(vec![0.5, 2.0]))
        );
        assert_eq!(ds.global_attribute("odd").and_then(|a| a.as_str()), Some("abc"));
    }

    #[test]
    fn test_invalid_definitions() {
        let result = DatasetBuilder::new()
            .variable_f64("w", &["w"], vec![1.0])
            .to_bytes();
        assert!(matches!(result, Err(CkdkitError::InvalidArgument(_))));

        let result = DatasetBuilder::new()
            .dimension("w", 2)
            .variable_f64("w", &["w"], vec![1.0])
            .to_bytes();
        assert!(matches!(result, Err(CkdkitError::InvalidArgument(_))));

        let result = DatasetBuilder::new()
            .variable_attribute("w", "units", "nm")
            .to_bytes();
        assert!(matches!(result, Err(CkdkitError::InvalidArgument(_))));
    }
}
