//! Read-only ZIP container access for checkpoint files.
//!
//! Modern checkpoint containers are ZIP archives holding a metadata record,
//! a version marker, and numbered storage shards. This crate parses the
//! archive *structure* — end-of-central-directory record (ZIP64-aware) and
//! central directory — and extracts single named members with CRC32 and
//! size verification. Listing members never touches member data, which is
//! what lets the guard validate names before opening anything.
//!
//! - **[`ZipReader`]**: parse + list + verified extraction (stored and
//!   deflated members)
//! - **[`ZipWriter`]**: minimal stored-only writer for fixtures and tooling

pub mod entry;
pub mod error;
pub mod reader;
pub mod writer;

pub use entry::{ArchiveEntry, METHOD_DEFLATED, METHOD_STORED};
pub use error::{ZipError, ZipResult};
pub use reader::{has_zip_signature, ZipReader};
pub use writer::ZipWriter;
