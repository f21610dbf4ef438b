use thiserror::Error;

/// I/O errors that can occur when reading from or writing to a byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error reported by the operating system
    #[error("I/O error: {0}")]
    Io(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),

    /// The stream handle was released by `close(true)` and not reopened
    #[error("Stream is closed: {0}")]
    Closed(String),
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(err.to_string()),
            _ => IoError::Io(err.to_string()),
        }
    }
}

/// Errors raised while loading a plugin list
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A line of the plugin list could not be parsed; the line is skipped
    #[error("Malformed plugin entry on line {line} ({content:?}): {reason}")]
    ConfigParse {
        line: usize,
        content: String,
        reason: String,
    },

    /// The identifier does not name any plugin known to the catalog
    #[error("Unresolved plugin: {identifier}")]
    UnresolvedPlugin { identifier: String },

    /// The plugin list file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Errors raised by readers, writers and the dimension math
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading or writing the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Plugin list error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// An accessor or operation was called before `set_id`
    #[error("Current file should not be null; call set_id first ({operation})")]
    NotInitialized { operation: &'static str },

    /// A setting was changed while a file is open
    #[error("Current file should be null, but is '{current}'; call close() first")]
    InvalidState { current: String },

    /// An index (series, resolution, core index, plane, coordinate) is out of range
    #[error("Invalid {kind} index: {index} (valid range 0..{limit})")]
    InvalidIndex {
        kind: &'static str,
        index: usize,
        limit: usize,
    },

    /// A tile rectangle does not fit inside the plane
    #[error("Invalid tile {width}x{height} at ({x}, {y}) for plane of {size_x}x{size_y}")]
    InvalidTile {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        size_x: usize,
        size_y: usize,
    },

    /// Sizes, counts or buffer capacities disagree
    #[error("Size mismatch in {context}: expected {expected}, got {actual}")]
    SizeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A dimension order string is not a valid XY-prefixed permutation
    #[error("Invalid dimension order '{order}': {reason}")]
    InvalidDimensionOrder { order: String, reason: String },

    /// No registered plugin claims the file
    #[error("Unknown file format: {id}")]
    UnrecognizedFormat { id: String },

    /// The plugin recognizes the file but does not support a feature it uses
    #[error("Unsupported: {reason}")]
    Unsupported { reason: String },

    /// The plugin could not parse the file header
    #[error("Malformed {format} file: {reason}")]
    Malformed { format: &'static str, reason: String },

    /// A writer's metadata retrieve lacks a required field
    #[error("Missing metadata field '{field}' for series {series}")]
    MissingMetadata { series: usize, field: &'static str },

    /// Both candidates of a delegate-with-fallback reader failed
    #[error("Both delegates failed: {preferred}; fallback: {fallback}")]
    DelegateFailed {
        preferred: Box<FormatError>,
        fallback: Box<FormatError>,
    },
}

impl FormatError {
    /// Shorthand for an out-of-range index.
    pub fn invalid_index(kind: &'static str, index: usize, limit: usize) -> Self {
        FormatError::InvalidIndex { kind, index, limit }
    }

    /// Shorthand for a size disagreement.
    pub fn size_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        FormatError::SizeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Shorthand for an unsupported feature.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        FormatError::Unsupported {
            reason: reason.into(),
        }
    }
}
