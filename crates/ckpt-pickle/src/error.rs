use thiserror::Error;

/// Errors raised while interpreting a pickle stream.
///
/// Two variants mark content the allow-list refuses; everything else is a
/// structural defect in the stream itself. [`PickleError::is_forbidden`]
/// makes the distinction without matching on every variant.
#[derive(Debug, Error)]
pub enum PickleError {
    /// A GLOBAL/STACK_GLOBAL resolved to a symbol outside the allow-list.
    #[error("global '{module}.{name}' is forbidden")]
    ForbiddenGlobal { module: String, name: String },

    /// A persistent reference carried a tag other than the storage literal.
    #[error("unrecognized persistent reference tag: {0}")]
    ForbiddenPersistentTag(String),

    /// An opcode outside the supported set.
    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// PROTO announced a protocol this interpreter does not speak.
    #[error("unsupported pickle protocol {0}")]
    UnsupportedProtocol(u8),

    /// The stream ended in the middle of an opcode or operand.
    #[error("pickle stream truncated at offset {0}")]
    Truncated(usize),

    /// An opcode needed more operands than the stack holds.
    #[error("operand stack underflow at offset {0}")]
    StackUnderflow(usize),

    /// A collection-building opcode ran without a matching MARK.
    #[error("no open mark at offset {0}")]
    UnmatchedMark(usize),

    /// GET/BINGET of a memo id that was never PUT.
    #[error("memo id {0} read before being set")]
    MemoUnset(u32),

    /// Second PUT to the same memo id. Memo ids are write-once per stream.
    #[error("memo id {0} written twice")]
    MemoRewritten(u32),

    /// An operand was present but unparseable (bad UTF-8, bad digits, ...).
    #[error("malformed operand at offset {offset}: {reason}")]
    MalformedOperand { offset: usize, reason: String },
}

impl PickleError {
    /// Shorthand for [`PickleError::MalformedOperand`].
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedOperand {
            offset,
            reason: reason.into(),
        }
    }

    /// `true` when the stream was well-formed but referenced content the
    /// allow-list refuses; `false` for structural corruption.
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Self::ForbiddenGlobal { .. } | Self::ForbiddenPersistentTag(_)
        )
    }
}

pub type PickleResult<T> = Result<T, PickleError>;
