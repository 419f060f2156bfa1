//! The class resolution allow-list.
//!
//! This table is the entire trust boundary of the guarded loader: a pickle
//! stream may only name constructors that appear here, and resolution is an
//! exact (module, name) match with no namespace-level allowance. Adding an
//! entry is a deliberate, reviewed change.

/// Element kind of an external tensor storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    Float,
    Half,
    Int,
    Long,
    Double,
}

impl StorageKind {
    /// The storage class name as it appears in checkpoint streams.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Float => "FloatStorage",
            Self::Half => "HalfStorage",
            Self::Int => "IntStorage",
            Self::Long => "LongStorage",
            Self::Double => "DoubleStorage",
        }
    }
}

/// A global symbol the interpreter is willing to resolve.
///
/// Covers only what legitimate checkpoint producers are known to emit:
/// the ordered-mapping constructor, the tensor/parameter rebuild helpers
/// (two legacy variants plus current), the five storage-type markers, one
/// byte-encoding helper, two pytorch-lightning checkpoint-callback symbols
/// kept for older producers, and the builtin set constructor under its
/// historical alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AllowedGlobal {
    OrderedDict,
    RebuildTensor,
    RebuildTensorV2,
    RebuildParameter,
    Storage(StorageKind),
    CodecsEncode,
    LightningCheckpointCallback,
    LightningModelCheckpoint,
    BuiltinSet,
}

impl AllowedGlobal {
    /// Resolve a (module, name) pair against the closed table.
    ///
    /// `None` means the pair is forbidden; there is no fallback.
    pub fn resolve(module: &str, name: &str) -> Option<Self> {
        match (module, name) {
            ("collections", "OrderedDict") => Some(Self::OrderedDict),
            ("torch._utils", "_rebuild_tensor") => Some(Self::RebuildTensor),
            ("torch._utils", "_rebuild_tensor_v2") => Some(Self::RebuildTensorV2),
            ("torch._utils", "_rebuild_parameter") => Some(Self::RebuildParameter),
            ("torch", "FloatStorage") => Some(Self::Storage(StorageKind::Float)),
            ("torch", "HalfStorage") => Some(Self::Storage(StorageKind::Half)),
            ("torch", "IntStorage") => Some(Self::Storage(StorageKind::Int)),
            ("torch", "LongStorage") => Some(Self::Storage(StorageKind::Long)),
            ("torch", "DoubleStorage") => Some(Self::Storage(StorageKind::Double)),
            ("_codecs", "encode") => Some(Self::CodecsEncode),
            ("pytorch_lightning.callbacks", "model_checkpoint") => {
                Some(Self::LightningCheckpointCallback)
            }
            ("pytorch_lightning.callbacks.model_checkpoint", "ModelCheckpoint") => {
                Some(Self::LightningModelCheckpoint)
            }
            ("__builtin__", "set") => Some(Self::BuiltinSet),
            _ => None,
        }
    }

    /// The storage kind, for the five storage-type markers.
    pub fn storage_kind(self) -> Option<StorageKind> {
        match self {
            Self::Storage(kind) => Some(kind),
            _ => None,
        }
    }
}
