//! Read access to NetCDF classic files.
//!
//! A [`Dataset`] is opened in one of two storage modes:
//!
//! * **eager**: the whole file is read into memory at open time;
//! * **lazy**: only the header is read; the file handle is kept and variable
//!   payloads are read on demand. [`Dataset::close`] releases the handle, which
//!   is reopened transparently by the next read.
//!
//! Both modes expose the same API, and a `Dataset` is `Send + Sync`: lazy reads
//! go through a [`parking_lot::Mutex`].

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use ndarray::{ArrayD, IxDyn};
use nom::Err;
use parking_lot::Mutex;

use super::{decode_numbers, header::Header, AttrValue, NcType, Variable};
use crate::ckdkit_errors::CkdkitError;
use crate::labeled_array::LabeledArray;

/// Size of the first read when parsing the header of a lazy dataset
const HEADER_CHUNK: u64 = 8 * 1024;

enum Storage {
    Eager(Vec<u8>),
    Lazy(Mutex<Option<File>>),
}

/// A NetCDF classic dataset.
pub struct Dataset {
    path: Utf8PathBuf,
    header: Header,
    storage: Storage,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("lazy", &self.is_lazy())
            .field("variables", &self.variable_names().collect::<Vec<_>>())
            .finish()
    }
}

fn parse_error(path: &Utf8Path, e: Err<nom::error::Error<&[u8]>>) -> CkdkitError {
    match e {
        Err::Incomplete(_) => {
            CkdkitError::NetcdfParsingError(format!("{path}: truncated header"))
        }
        Err::Error(e) | Err::Failure(e) => CkdkitError::NetcdfParsingError(format!(
            "{path}: invalid header ({:?}, {} bytes left)",
            e.code,
            e.input.len()
        )),
    }
}

impl Dataset {
    /// Open a dataset.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: path to a NetCDF classic file.
    /// * `lazy`: keep the file open and read variables on demand instead of
    ///   loading the whole file.
    ///
    /// Return
    /// ----------
    /// * The dataset, or an I/O or [`CkdkitError::NetcdfParsingError`] error.
    pub fn open(path: &Utf8Path, lazy: bool) -> Result<Self, CkdkitError> {
        if lazy {
            Self::open_lazy(path)
        } else {
            Self::load(path)
        }
    }

    /// Read the whole file into memory.
    pub fn load(path: &Utf8Path) -> Result<Self, CkdkitError> {
        debug!("Loading dataset '{path}'");
        let bytes = std::fs::read(path)?;
        Self::from_bytes(path, bytes)
    }

    /// Wrap an in-memory file; `path` is only used for diagnostics.
    pub fn from_bytes(path: &Utf8Path, bytes: Vec<u8>) -> Result<Self, CkdkitError> {
        let header = match Header::parse(&bytes) {
            Ok((_, header)) => header,
            Err(e) => return Err(parse_error(path, e)),
        };
        Ok(Dataset {
            path: path.to_path_buf(),
            header,
            storage: Storage::Eager(bytes),
        })
    }

    /// Parse the header and keep the file open.
    pub fn open_lazy(path: &Utf8Path) -> Result<Self, CkdkitError> {
        debug!("Opening dataset '{path}' lazily");
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        let mut chunk = HEADER_CHUNK;
        let header = loop {
            let read = (&mut file).take(chunk).read_to_end(&mut buffer)?;
            match Header::parse(&buffer) {
                Ok((_, header)) => break header,
                Err(Err::Incomplete(_)) if read > 0 => chunk *= 2,
                Err(e) => return Err(parse_error(path, e)),
            }
        };
        Ok(Dataset {
            path: path.to_path_buf(),
            header,
            storage: Storage::Lazy(Mutex::new(Some(file))),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.storage, Storage::Lazy(_))
    }

    /// Whether the payload is reachable without reopening the file.
    pub fn is_open(&self) -> bool {
        match &self.storage {
            Storage::Eager(_) => true,
            Storage::Lazy(file) => file.lock().is_some(),
        }
    }

    /// Release the file handle of a lazy dataset; no-op for eager datasets.
    pub fn close(&self) {
        if let Storage::Lazy(file) = &self.storage {
            if file.lock().take().is_some() {
                debug!("Closed dataset '{}'", self.path);
            }
        }
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.header.variables.iter().map(|v| v.name.as_str())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.header.variable(name).is_some()
    }

    pub fn variable(&self, name: &str) -> Result<&Variable, CkdkitError> {
        self.header.variable(name).ok_or_else(|| {
            CkdkitError::MissingCoordinate(format!("variable '{name}' not found in {}", self.path))
        })
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.header.dimension(name).map(|d| d.len)
    }

    pub fn variable_dims(&self, name: &str) -> Result<Vec<String>, CkdkitError> {
        Ok(self.header.dimension_names(self.variable(name)?))
    }

    pub fn variable_shape(&self, name: &str) -> Result<Vec<usize>, CkdkitError> {
        Ok(self.header.shape(self.variable(name)?))
    }

    pub fn attribute(&self, variable: &str, name: &str) -> Option<&AttrValue> {
        self.header.variable(variable)?.attribute(name)
    }

    pub fn global_attribute(&self, name: &str) -> Option<&AttrValue> {
        self.header.global_attribute(name)
    }

    /// The `units` attribute of a variable, if any.
    pub fn units(&self, variable: &str) -> Option<&str> {
        self.attribute(variable, crate::constants::UNITS_ATTR)?.as_str()
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, CkdkitError> {
        match &self.storage {
            Storage::Eager(bytes) => {
                let start = offset as usize;
                bytes
                    .get(start..start + len)
                    .map(|slice| slice.to_vec())
                    .ok_or_else(|| {
                        CkdkitError::NetcdfParsingError(format!(
                            "{}: truncated data section",
                            self.path
                        ))
                    })
            }
            Storage::Lazy(file) => {
                let mut guard = file.lock();
                if guard.is_none() {
                    debug!("Reopening dataset '{}'", self.path);
                    *guard = Some(File::open(&self.path)?);
                }
                let mut buffer = vec![0u8; len];
                if let Some(handle) = guard.as_mut() {
                    handle.seek(SeekFrom::Start(offset))?;
                    handle.read_exact(&mut buffer)?;
                }
                Ok(buffer)
            }
        }
    }

    fn raw_bytes(&self, variable: &Variable) -> Result<Vec<u8>, CkdkitError> {
        let shape = self.header.shape(variable);
        let size = variable.nc_type.size();
        if self.header.is_record_variable(variable) {
            let per_record = shape[1..].iter().product::<usize>() * size;
            let stride = self.header.record_size();
            let mut bytes = Vec::with_capacity(per_record * self.header.numrecs);
            for r in 0..self.header.numrecs as u64 {
                bytes.extend(self.read_at(variable.begin + r * stride, per_record)?);
            }
            Ok(bytes)
        } else {
            self.read_at(variable.begin, shape.iter().product::<usize>() * size)
        }
    }

    /// Numeric values of a variable, flattened in row-major order.
    pub fn values(&self, name: &str) -> Result<Vec<f64>, CkdkitError> {
        let variable = self.variable(name)?;
        if variable.nc_type == NcType::Char {
            return Err(CkdkitError::SchemaMismatch(format!(
                "variable '{name}' of {} holds characters, not numbers",
                self.path
            )));
        }
        Ok(decode_numbers(&self.raw_bytes(variable)?, variable.nc_type))
    }

    /// Numeric values with their dimension names.
    pub fn array(&self, name: &str) -> Result<LabeledArray, CkdkitError> {
        let variable = self.variable(name)?;
        let shape = self.header.shape(variable);
        let dims = self.header.dimension_names(variable);
        let values = self.values(name)?;
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| {
            CkdkitError::SchemaMismatch(format!("variable '{name}' of {}: {e}", self.path))
        })?;
        LabeledArray::new(dims, data)
    }

    /// Strings of a character variable; the last dimension is the string length.
    pub fn text(&self, name: &str) -> Result<Vec<String>, CkdkitError> {
        let variable = self.variable(name)?;
        if variable.nc_type != NcType::Char {
            return Err(CkdkitError::SchemaMismatch(format!(
                "variable '{name}' of {} does not hold characters",
                self.path
            )));
        }
        let shape = self.header.shape(variable);
        let bytes = self.raw_bytes(variable)?;
        let strlen = shape.last().copied().unwrap_or(bytes.len()).max(1);
        Ok(bytes
            .chunks(strlen)
            .map(|c| {
                String::from_utf8_lossy(c)
                    .trim_end_matches('\0')
                    .trim_end()
                    .to_string()
            })
            .collect())
    }
}
