//! Error types for forcing file access and interpolation.

use thiserror::Error;

/// Errors that can occur while opening, reading or remapping forcing data.
#[derive(Error, Debug)]
pub enum ForcingError {
    /// The content kind could not be inferred from the file name.
    #[error("cannot decide whether {0} is a state snapshot or a time series; pass the kind explicitly")]
    AmbiguousFileKind(String),

    /// Kind or container format could not be resolved or has no reader.
    #[error("unknown file format for {file}: kind={kind}, format={format}")]
    UnknownFormat {
        file: String,
        kind: String,
        format: String,
    },

    /// Grid-type tag not supported.
    #[error("unsupported grid type: {0}")]
    UnsupportedGrid(String),

    /// Axis name the dimension mapper does not recognise.
    #[error("unsupported axis '{axis}' on variable {variable}")]
    UnsupportedAxis { variable: String, axis: String },

    /// A token could not be parsed as the declared datatype.
    #[error("cannot convert '{token}' to {datatype}")]
    TypeConversion { token: String, datatype: String },

    /// None of the requested valid times exist in the file.
    #[error("valid time not found: {0}")]
    TimeNotFound(String),

    /// Time-series read without a base time or interval.
    #[error("time series needs {0}")]
    MissingTimeBasis(&'static str),

    /// Time-series row does not end on a line boundary.
    #[error("row of {row_len} values does not end a line (line {line}, {remaining} values left)")]
    RowLengthMismatch {
        row_len: usize,
        line: usize,
        remaining: usize,
    },

    /// Value count does not match the geometry.
    #[error("point count mismatch: got {got}, expected {expected}")]
    PointCountMismatch { got: usize, expected: usize },

    /// Source and target geometries are incompatible.
    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// Variable absent from the file.
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// Reader needs a caller-supplied geometry.
    #[error("no geometry available for {0}; supply one when opening")]
    MissingGeometry(String),

    /// Required grid parameter absent from the file.
    #[error("missing grid parameter {0}")]
    MissingParameter(String),

    /// Malformed or unsupported time units / calendar.
    #[error("invalid time units: {0}")]
    InvalidTimeUnits(String),

    /// Mask entry outside the grid.
    #[error("invalid mask: {0}")]
    InvalidMask(String),

    /// Patch/layer index outside the declared axis.
    #[error("index {index} out of range for {axis} axis of length {len}")]
    InvalidSelection {
        axis: &'static str,
        index: usize,
        len: usize,
    },

    /// Patch and layer requests that cannot be paired slot by slot.
    #[error("cannot pair {patches} patches with {layers} layers")]
    IncompatibleSelection { patches: usize, layers: usize },

    /// Interpolation name not recognised.
    #[error("unknown interpolation method: {0}")]
    UnknownInterpolation(String),

    /// Malformed file content.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage/IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF library error.
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),
}

impl ForcingError {
    /// Create an UnknownFormat error.
    pub fn unknown_format(
        file: impl Into<String>,
        kind: impl std::fmt::Debug,
        format: impl std::fmt::Debug,
    ) -> Self {
        Self::UnknownFormat {
            file: file.into(),
            kind: format!("{:?}", kind),
            format: format!("{:?}", format),
        }
    }

    /// Create an UnsupportedGrid error.
    pub fn unsupported_grid(msg: impl Into<String>) -> Self {
        Self::UnsupportedGrid(msg.into())
    }

    /// Create an UnsupportedAxis error.
    pub fn unsupported_axis(variable: impl Into<String>, axis: impl Into<String>) -> Self {
        Self::UnsupportedAxis {
            variable: variable.into(),
            axis: axis.into(),
        }
    }

    /// Create a TypeConversion error.
    pub fn type_conversion(token: impl Into<String>, datatype: impl std::fmt::Display) -> Self {
        Self::TypeConversion {
            token: token.into(),
            datatype: datatype.to_string(),
        }
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a GeometryMismatch error.
    pub fn geometry_mismatch(msg: impl Into<String>) -> Self {
        Self::GeometryMismatch(msg.into())
    }
}

impl From<projection::ProjectionError> for ForcingError {
    fn from(err: projection::ProjectionError) -> Self {
        Self::UnsupportedGrid(err.to_string())
    }
}

/// Result type for forcing I/O operations.
pub type Result<T> = std::result::Result<T, ForcingError>;
