use ckpt_archive::has_zip_signature;

/// The two checkpoint layouts in the wild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointFormat {
    /// ZIP container: metadata record, version marker, numbered shards.
    Container,
    /// Raw concatenation of five top-level pickle objects.
    LegacyStream,
}

impl CheckpointFormat {
    /// Classify a checkpoint by its archive signatures, locating the end
    /// record from the tail like the archive parser does. Pure
    /// classification: a `Container` answer says nothing about the archive
    /// being valid.
    pub fn detect(data: &[u8]) -> Self {
        if has_zip_signature(data) {
            Self::Container
        } else {
            Self::LegacyStream
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckpt_archive::ZipWriter;

    #[test]
    fn zip_bytes_are_container() {
        let mut writer = ZipWriter::new();
        writer.add("archive/version", b"3\n");
        assert_eq!(
            CheckpointFormat::detect(&writer.finish()),
            CheckpointFormat::Container
        );
    }

    #[test]
    fn archive_behind_prepended_bytes_is_container() {
        let mut writer = ZipWriter::new();
        writer.add("archive/version", b"3\n");
        let mut bytes = b"prefix junk".to_vec();
        bytes.extend_from_slice(&writer.finish());
        assert_eq!(
            CheckpointFormat::detect(&bytes),
            CheckpointFormat::Container
        );
    }

    #[test]
    fn anything_else_falls_back_to_legacy() {
        assert_eq!(
            CheckpointFormat::detect(b"\x80\x02}q\x00."),
            CheckpointFormat::LegacyStream
        );
        assert_eq!(CheckpointFormat::detect(b""), CheckpointFormat::LegacyStream);
        assert_eq!(
            CheckpointFormat::detect(b"PK but not really"),
            CheckpointFormat::LegacyStream
        );
    }
}
