use thiserror::Error;

/// I/O errors from the file layer backing native-format handles
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error reported by the operating system
    #[error("I/O error on {path}: {message}")]
    Os { path: String, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Resource was opened read-only
    #[error("{0} is not open for writing")]
    ReadOnly(String),
}

impl IoError {
    pub(crate) fn os(path: impl Into<String>, err: std::io::Error) -> Self {
        IoError::Os {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Errors from opening, evaluating and closing image handles
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// Missing filename or mode
    #[error("{0}")]
    InvalidArgument(String),

    /// Mode string does not start with a known tag
    #[error("bad mode \"{0}\"")]
    BadMode(String),

    /// Source file missing or unreadable
    #[error("\"{0}\" is not readable")]
    NotReadable(String),

    /// No recognizer claimed the file
    #[error("\"{0}\" is not a supported format")]
    UnsupportedFormat(String),

    /// No save format matches the filename suffix
    #[error("unknown suffix for save")]
    UnknownSuffix(String),

    /// Native file with a coding the byte-order pipeline can't handle
    #[error("unknown coding type")]
    UnknownCoding,

    /// Read-write open of a multi-byte native file in foreign byte order
    #[error("open for read-write for native format images only")]
    ReadWriteNotNative(String),

    /// Error from a format reader or writer
    #[error("{format}: {message}")]
    Codec {
        format: &'static str,
        message: String,
    },

    /// Header fields missing or inconsistent
    #[error("bad header for \"{filename}\": {reason}")]
    BadHeader { filename: String, reason: String },

    /// Handle has nothing to read pixels from
    #[error("\"{0}\" has no pixel data")]
    NoPixels(String),

    /// Operation on a handle that has been closed
    #[error("\"{0}\" has been closed")]
    Closed(String),

    /// Region request outside the image or of the wrong size
    #[error("bad region on \"{filename}\": {reason}")]
    BadRegion { filename: String, reason: String },

    /// Streaming write handle closed before any pixels were written
    #[error("no image data written to \"{0}\"")]
    NothingWritten(String),

    /// I/O error from the file layer
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl ImageError {
    /// Wrap a codec-specific error.
    pub(crate) fn codec(format: &'static str, err: impl std::fmt::Display) -> Self {
        ImageError::Codec {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn bad_header(filename: &str, reason: impl Into<String>) -> Self {
        ImageError::BadHeader {
            filename: filename.to_string(),
            reason: reason.into(),
        }
    }
}
