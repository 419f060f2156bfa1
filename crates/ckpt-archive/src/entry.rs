/// No compression.
pub const METHOD_STORED: u16 = 0;
/// Raw deflate.
pub const METHOD_DEFLATED: u16 = 8;

/// One member as described by the central directory.
///
/// Holds everything needed to locate and verify the member's bytes; nothing
/// here requires touching the member's data region.
#[derive(Clone, Debug)]
pub struct ArchiveEntry {
    pub name: String,
    pub method: u16,
    pub flags: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// Offset of the member's local file header from the start of the file.
    pub header_offset: u64,
}

impl ArchiveEntry {
    /// `true` when the member is encrypted (general-purpose flag bit 0).
    pub fn is_encrypted(&self) -> bool {
        self.flags & 0x0001 != 0
    }
}
