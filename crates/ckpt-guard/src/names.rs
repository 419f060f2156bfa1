//! Archive member-name validation.
//!
//! Names are checked against a closed set before any member's content is
//! opened, the metadata record included. The check is cheap and catches
//! crafted archives without ever running the interpreter.

use std::path::Path;

use crate::error::LoadError;

/// The serialized metadata record.
pub const METADATA_MEMBER: &str = "archive/data.pkl";
/// The format-version marker.
pub const VERSION_MEMBER: &str = "archive/version";
/// Prefix of numbered storage shards.
pub const SHARD_PREFIX: &str = "archive/data/";

/// `true` iff the name is the metadata record, the version marker, or a
/// numbered shard (`archive/data/<digits>`, nothing else appended).
pub fn is_allowed_member(name: &str) -> bool {
    if name == METADATA_MEMBER || name == VERSION_MEMBER {
        return true;
    }
    match name.strip_prefix(SHARD_PREFIX) {
        Some(suffix) => !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Reject the whole file on the first member name outside the closed set.
pub fn check_member_names<'a, I>(path: &Path, names: I) -> Result<(), LoadError>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        if !is_allowed_member(name) {
            return Err(LoadError::ForbiddenContent(format!(
                "bad file inside {}: {}",
                path.display(),
                name
            )));
        }
    }
    Ok(())
}
