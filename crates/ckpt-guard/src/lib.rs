//! Guarded checkpoint loading.
//!
//! Checkpoint files are pickle object graphs, and general-purpose pickle
//! reconstruction can invoke arbitrary constructors — loading an untrusted
//! checkpoint is code execution. This crate proves, before any tensor data
//! is materialized, that reconstructing a file will only touch a fixed set
//! of known-safe constructors, then hands the file to a caller-supplied
//! trusted loader.
//!
//! # Pipeline
//!
//! - **[`CheckpointFormat`]**: container archive vs legacy raw stream
//! - **member-name validation** (container only): a closed name set,
//!   checked before any member content is opened
//! - **restricted interpretation**: the metadata stream (container) or
//!   the five leading top-level objects (legacy) run through
//!   `ckpt-pickle`'s allow-listed machine; shard bytes are never read
//! - **[`guarded_load`]**: orchestrates the above, classifies every failure
//!   into [`LoadError`], and on success invokes the [`DelegateLoader`]
//!
//! Nothing validated here is cached or shared: each call builds and drops
//! its own machine state, so independent loads may run concurrently.

pub mod detect;
pub mod error;
pub mod loader;
pub mod names;

pub use detect::CheckpointFormat;
pub use error::LoadError;
pub use loader::{guarded_load, validate, DelegateFn, DelegateLoader};
pub use names::{is_allowed_member, METADATA_MEMBER, SHARD_PREFIX, VERSION_MEMBER};
