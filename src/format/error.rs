//! Error types for stream and package operations.

use thiserror::Error;

/// Errors raised by the binary annotation codec.
///
/// A decode error is fatal to that single load and is never partially
/// applied: the caller gets the error or a complete annotation, nothing in
/// between.
#[derive(Error, Debug)]
pub enum StreamError {
    /// I/O error while reading or writing a stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was written by a different format revision
    #[error("version mismatch: expected {expected:#06x}, found {found:#06x}")]
    VersionMismatch {
        /// Version constant this build reads and writes
        expected: u32,
        /// Version tag found in the stream
        found: u32,
    },

    /// A tag or count field holds a value the schema does not allow
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// The value found in the stream
        value: u64,
    },

    /// A string field does not hold valid UTF-8
    #[error("invalid UTF-8 in string field")]
    InvalidString,

    /// Bytes remain after a complete annotation was decoded
    #[error("trailing bytes after annotation")]
    TrailingBytes,

    /// Error in the compressed history container
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl StreamError {
    /// Create an invalid-value error.
    pub fn invalid_value(field: &'static str, value: impl Into<u64>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

/// Errors raised while reading a validation package.
///
/// The numeric codes are part of the validation report contract.
#[derive(Error, Debug)]
pub enum PackageError {
    /// The container itself is unreadable
    #[error("package is unreadable: {0}")]
    Container(#[source] zip::result::ZipError),

    /// One entry could not be extracted
    #[error("package entry '{name}' is bad: {message}")]
    Entry {
        /// Entry name inside the package
        name: String,
        /// What went wrong
        message: String,
    },

    /// One entry extracted but its annotation stream failed to decode
    #[error("annotation stream '{name}' is bad: {source}")]
    Stream {
        /// Entry name inside the package
        name: String,
        /// The underlying codec error
        source: StreamError,
    },
}

impl PackageError {
    /// Structured error code for the validation report.
    pub fn code(&self) -> i64 {
        match self {
            PackageError::Container(_) => 2,
            PackageError::Entry { .. } => 3,
            PackageError::Stream { .. } => 4,
        }
    }
}
