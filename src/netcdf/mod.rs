//! # NetCDF classic datasets
//!
//! Absorption datasets are stored as NetCDF files in the **classic** (CDF-1) or
//! **64-bit offset** (CDF-2) format. This module provides:
//!
//! * [`header`]: a `nom` parser for the self-describing file header
//!   (dimensions, global attributes, variable descriptors).
//! * [`dataset`]: the [`Dataset`] handle, which reads variable payloads either
//!   from a fully loaded file (eager) or on demand from an open file (lazy).
//! * [`builder`]: [`DatasetBuilder`], a writer producing CDF-1 files.
//!
//! ## File layout
//!
//! ```text
//! magic      "CDF" + version byte (1 = classic, 2 = 64-bit offset)
//! numrecs    u32, length of the unlimited dimension
//! dim_list   ABSENT | NC_DIMENSION nelems [name len]*
//! gatt_list  ABSENT | NC_ATTRIBUTE nelems [name nc_type nelems values]*
//! var_list   ABSENT | NC_VARIABLE nelems [name ndims dimids vatt_list nc_type vsize begin]*
//! data       fixed-size variables, then interleaved records
//! ```
//!
//! All numbers are big-endian, names and attribute payloads are padded to
//! 4-byte boundaries. `begin` is a 32-bit offset in CDF-1 and a 64-bit offset
//! in CDF-2.
//!
//! NetCDF-4 (HDF5-based) files are not supported.

pub mod builder;
pub mod dataset;
pub mod header;

pub use builder::DatasetBuilder;
pub use dataset::Dataset;
pub use header::Header;

use smallvec::SmallVec;

/// External data types of the classic format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NcType {
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
}

impl NcType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(NcType::Byte),
            2 => Some(NcType::Char),
            3 => Some(NcType::Short),
            4 => Some(NcType::Int),
            5 => Some(NcType::Float),
            6 => Some(NcType::Double),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            NcType::Byte => 1,
            NcType::Char => 2,
            NcType::Short => 3,
            NcType::Int => 4,
            NcType::Float => 5,
            NcType::Double => 6,
        }
    }

    /// Size in bytes of one element.
    pub fn size(&self) -> usize {
        match self {
            NcType::Byte | NcType::Char => 1,
            NcType::Short => 2,
            NcType::Int | NcType::Float => 4,
            NcType::Double => 8,
        }
    }
}

/// Decode big-endian numeric elements to `f64`.
pub(crate) fn decode_numbers(bytes: &[u8], nc_type: NcType) -> Vec<f64> {
    match nc_type {
        NcType::Byte => bytes.iter().map(|b| *b as i8 as f64).collect(),
        NcType::Char => bytes.iter().map(|b| *b as f64).collect(),
        NcType::Short => bytes
            .chunks_exact(2)
            .map(|c| i16::from_be_bytes([c[0], c[1]]) as f64)
            .collect(),
        NcType::Int => bytes
            .chunks_exact(4)
            .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        NcType::Float => bytes
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]) as f64)
            .collect(),
        NcType::Double => bytes
            .chunks_exact(8)
            .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect(),
    }
}

/// Attribute payload: character data or numbers of any numeric type.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Numbers(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Numbers(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Numbers(vec![value])
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::Numbers(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

/// A dimension; the length of the unlimited dimension is the record count.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

/// Variable descriptor as stored in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dim_ids: SmallVec<[usize; 4]>,
    pub attributes: Vec<Attribute>,
    pub nc_type: NcType,
    /// Size of the variable (of one record for record variables), padded to 4 bytes
    pub vsize: u64,
    /// Offset of the first byte of the variable in the file
    pub begin: u64,
}

impl Variable {
    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| &a.value)
    }
}
