use thiserror::Error;

#[derive(Error, Debug)]
pub enum CkdkitError {
    #[error("Invalid absorption database directory: {0}")]
    InvalidDirectory(String),

    #[error("Missing index file: {0}")]
    MissingIndexFile(String),

    #[error("Absorption database index is empty: {0}")]
    EmptyIndex(String),

    #[error("Absorption database index is not sorted by ascending wavelength: {0}")]
    UnsortedIndex(String),

    #[error(
        "Spectral coordinate {value} is out of the database coverage [{min}, {max}] ({unit})"
    )]
    OutOfBoundsSpectralCoordinate {
        value: f64,
        min: f64,
        max: f64,
        unit: String,
    },

    #[error("Dataset schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error(
        "Bin bound mismatch at index {index}: upper bound {upper} vs next lower bound {lower} \
         (epsilon = {epsilon})"
    )]
    BinBoundMismatch {
        index: usize,
        upper: f64,
        lower: f64,
        epsilon: f64,
    },

    #[error("Unknown absorption database name: {0}")]
    UnknownDatabaseName(String),

    #[error("Unknown quadrature type: {0}")]
    UnknownQuadratureType(String),

    #[error(
        "Interpolation out of bounds along '{dimension}': \
         requested [{requested_min}, {requested_max}], available [{min}, {max}]"
    )]
    InterpolationOutOfBounds {
        dimension: String,
        requested_min: f64,
        requested_max: f64,
        min: f64,
        max: f64,
    },

    #[error("Missing coordinate: {0}")]
    MissingCoordinate(String),

    #[error("Scalar coordinate cannot be interpolated: {0}")]
    ScalarCoordinate(String),

    #[error("Spectral mode mismatch: expected {expected}, got {actual}")]
    SpectralModeMismatch { expected: String, actual: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid units: {0}")]
    InvalidUnits(String),

    #[error("Error during the NetCDF parsing: {0}")]
    NetcdfParsingError(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PartialEq for CkdkitError {
    fn eq(&self, other: &Self) -> bool {
        use CkdkitError::*;
        match (self, other) {
            (InvalidDirectory(a), InvalidDirectory(b)) => a == b,
            (MissingIndexFile(a), MissingIndexFile(b)) => a == b,
            (EmptyIndex(a), EmptyIndex(b)) => a == b,
            (UnsortedIndex(a), UnsortedIndex(b)) => a == b,
            (
                OutOfBoundsSpectralCoordinate {
                    value: v1,
                    min: lo1,
                    max: hi1,
                    unit: u1,
                },
                OutOfBoundsSpectralCoordinate {
                    value: v2,
                    min: lo2,
                    max: hi2,
                    unit: u2,
                },
            ) => v1 == v2 && lo1 == lo2 && hi1 == hi2 && u1 == u2,
            (SchemaMismatch(a), SchemaMismatch(b)) => a == b,
            (
                BinBoundMismatch {
                    index: i1,
                    upper: u1,
                    lower: l1,
                    epsilon: e1,
                },
                BinBoundMismatch {
                    index: i2,
                    upper: u2,
                    lower: l2,
                    epsilon: e2,
                },
            ) => i1 == i2 && u1 == u2 && l1 == l2 && e1 == e2,
            (UnknownDatabaseName(a), UnknownDatabaseName(b)) => a == b,
            (UnknownQuadratureType(a), UnknownQuadratureType(b)) => a == b,
            (
                InterpolationOutOfBounds { dimension: a, .. },
                InterpolationOutOfBounds { dimension: b, .. },
            ) => a == b,
            (MissingCoordinate(a), MissingCoordinate(b)) => a == b,
            (ScalarCoordinate(a), ScalarCoordinate(b)) => a == b,
            (
                SpectralModeMismatch {
                    expected: e1,
                    actual: a1,
                },
                SpectralModeMismatch {
                    expected: e2,
                    actual: a2,
                },
            ) => e1 == e2 && a1 == a2,
            (InvalidArgument(a), InvalidArgument(b)) => a == b,
            (InvalidUnits(a), InvalidUnits(b)) => a == b,
            (NetcdfParsingError(a), NetcdfParsingError(b)) => a == b,

            // Foreign errors are not comparable: equal if same variant
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            _ => false,
        }
    }
}
