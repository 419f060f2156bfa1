use ckpt_archive::ZipError;
use ckpt_pickle::PickleError;
use thiserror::Error;

/// The guarded loader's three-way failure taxonomy.
///
/// Every failure mode of the underlying crates collapses into one of these
/// at the orchestrator boundary; nothing propagates past it as a panic.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file violates its own format: bad container structure, wrong
    /// legacy object count, malformed or unknown bytecode.
    #[error("corrupt checkpoint: {0}")]
    CorruptFormat(String),

    /// The file is well-formed but references something the guard refuses:
    /// a non-allow-listed symbol, a disallowed member name, an unrecognized
    /// persistent-reference tag.
    #[error("forbidden content: {0}")]
    ForbiddenContent(String),

    /// Anything else surfaced while reading the file.
    #[error("error reading checkpoint: {0}")]
    Unknown(String),
}

impl LoadError {
    /// Stable classification label for diagnostics.
    pub fn class(&self) -> &'static str {
        match self {
            Self::CorruptFormat(_) => "corrupt-format",
            Self::ForbiddenContent(_) => "forbidden-content",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<PickleError> for LoadError {
    fn from(err: PickleError) -> Self {
        if err.is_forbidden() {
            Self::ForbiddenContent(err.to_string())
        } else {
            Self::CorruptFormat(err.to_string())
        }
    }
}

impl From<ZipError> for LoadError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => Self::Unknown(e.to_string()),
            other => Self::CorruptFormat(other.to_string()),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::Unknown(err.to_string())
    }
}
