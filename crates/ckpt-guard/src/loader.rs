use std::fs::File;
use std::path::Path;

use ckpt_archive::ZipReader;
use ckpt_pickle::RestrictedUnpickler;
use memmap2::Mmap;

use crate::detect::CheckpointFormat;
use crate::error::LoadError;
use crate::names::{check_member_names, METADATA_MEMBER};

/// Fixed top-level object count in a legacy raw-stream checkpoint.
const LEGACY_OBJECT_COUNT: usize = 5;

/// The trusted full-feature loader invoked after validation succeeds.
///
/// Injection is deliberate: callers choose the guarded entry point at each
/// call site instead of the guard replacing anyone's loader globally, so
/// trust decisions stay visible and testable.
pub trait DelegateLoader {
    type Output;
    type Error: std::error::Error;

    fn load(&self, path: &Path) -> Result<Self::Output, Self::Error>;
}

/// Adapter turning a closure into a [`DelegateLoader`].
pub struct DelegateFn<F>(pub F);

impl<F, T, E> DelegateLoader for DelegateFn<F>
where
    F: Fn(&Path) -> Result<T, E>,
    E: std::error::Error,
{
    type Output = T;
    type Error = E;

    fn load(&self, path: &Path) -> Result<T, E> {
        (self.0)(path)
    }
}

/// Validate a checkpoint, then load it through the delegate.
///
/// On any validation failure the delegate is never invoked: the full
/// diagnostic goes to the error channel via `tracing` and the classified
/// [`LoadError`] is returned. On success the delegate's output is returned
/// unchanged; a delegate failure surfaces as [`LoadError::Unknown`].
pub fn guarded_load<D: DelegateLoader>(path: &Path, delegate: &D) -> Result<D::Output, LoadError> {
    if let Err(err) = validate(path) {
        tracing::error!(
            path = %path.display(),
            class = err.class(),
            "refusing checkpoint: {err}"
        );
        return Err(err);
    }
    tracing::debug!(path = %path.display(), "checkpoint validated, delegating");
    delegate
        .load(path)
        .map_err(|e| LoadError::Unknown(e.to_string()))
}

/// Run the full validation pass without delegating.
///
/// Touches only the archive structure and the metadata stream; shard
/// payloads are behind a memory map and never faulted in.
pub fn validate(path: &Path) -> Result<(), LoadError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(LoadError::CorruptFormat("checkpoint file is empty".into()));
    }
    // Mapping rather than reading keeps bulk tensor bytes out of the
    // validation pass entirely.
    let data = unsafe { Mmap::map(&file)? };
    match CheckpointFormat::detect(&data) {
        CheckpointFormat::Container => validate_container(path, &data),
        CheckpointFormat::LegacyStream => validate_legacy(&data),
    }
}

/// Container path: names first, then one pass over the metadata stream.
fn validate_container(path: &Path, data: &[u8]) -> Result<(), LoadError> {
    let archive = ZipReader::parse(data)?;
    check_member_names(path, archive.member_names())?;
    let metadata = archive.read(METADATA_MEMBER)?;
    let mut machine = RestrictedUnpickler::new(&metadata);
    machine.load()?;
    tracing::debug!(
        path = %path.display(),
        members = archive.member_count(),
        "container checkpoint structure accepted"
    );
    Ok(())
}

/// Legacy path: five top-level objects, with raw storage payload bytes
/// allowed after the fifth. The writer emits each storage's data directly
/// behind the pickled key list, so bytes past the last object are tensor
/// payload, not more objects to interpret.
fn validate_legacy(data: &[u8]) -> Result<(), LoadError> {
    let mut machine = RestrictedUnpickler::new(data);
    for _ in 0..LEGACY_OBJECT_COUNT {
        machine.load()?;
    }
    Ok(())
}
