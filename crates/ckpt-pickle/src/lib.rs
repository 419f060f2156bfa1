//! Restricted pickle interpreter for checkpoint validation.
//!
//! General-purpose pickle deserialization can invoke arbitrary constructors,
//! so loading an untrusted checkpoint is code execution. This crate executes
//! the same bytecode with two hard restrictions:
//!
//! - **Allow-list resolution**: every global reference must resolve through
//!   [`AllowedGlobal::resolve`], a closed compile-time table. A miss aborts
//!   the stream.
//! - **Deferred storage**: persistent references become [`StorageHandle`]
//!   placeholders; shard payload bytes are never read.
//!
//! The result is a [`Value`] tree describing the checkpoint's structure,
//! with nothing executed and nothing materialized.

pub mod allowlist;
pub mod error;
pub mod machine;
pub mod value;

pub use allowlist::{AllowedGlobal, StorageKind};
pub use error::{PickleError, PickleResult};
pub use machine::RestrictedUnpickler;
pub use value::{StorageHandle, Value};
