use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZipError {
    /// No end-of-central-directory signature. The file is something other
    /// than a ZIP archive; callers treat this as a format-detection outcome,
    /// not corruption.
    #[error("not a zip archive: {0}")]
    NotAnArchive(String),

    /// The archive carries ZIP structure but violates it.
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("unsupported compression method {method} for member '{name}'")]
    UnsupportedMethod { name: String, method: u16 },

    #[error("CRC32 mismatch for member '{name}': expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("decompression failed for member '{name}': {reason}")]
    DecompressionFailed { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ZipResult<T> = Result<T, ZipError>;
