use crate::allowlist::{AllowedGlobal, StorageKind};

/// Placeholder for external tensor storage.
///
/// Created when the interpreter meets a persistent reference; carries enough
/// metadata to describe the storage without ever touching shard bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageHandle {
    /// Element kind of the referenced storage.
    pub kind: StorageKind,
    /// Element count as recorded in the reference, not verified against
    /// any shard.
    pub numel: u64,
    /// Shard key the delegate loader will resolve at real-load time.
    pub key: String,
}

/// A value built by the restricted interpreter.
///
/// Mirrors the pickle object model structurally. Nothing here is ever
/// executed: constructor applications become [`Value::Object`] records and
/// persistent references become [`Value::Storage`] placeholders.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    /// An integer too wide for i64, kept as its little-endian
    /// two's-complement encoding. Legacy checkpoint magic numbers land here.
    BigInt(Vec<u8>),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    /// Insertion-ordered mapping. Checkpoint metadata is dominated by
    /// OrderedDict, so order is part of the value.
    Dict(Vec<(Value, Value)>),
    Set(Vec<Value>),
    /// A resolved allow-listed symbol, not yet applied.
    Global(AllowedGlobal),
    /// A constructor application recorded but not executed.
    Object {
        ctor: AllowedGlobal,
        args: Vec<Value>,
    },
    /// Deferred external storage.
    Storage(StorageHandle),
}

impl Value {
    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::BigInt(_) => "long",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::Str(_) => "str",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Global(_) => "global",
            Self::Object { .. } => "object",
            Self::Storage(_) => "storage",
        }
    }
}
