use crate::entry::METHOD_STORED;

/// Builds a minimal ZIP archive with stored (uncompressed) members.
///
/// Exists to produce checkpoint containers for tests and tooling; the
/// guarded loader itself only ever reads.
#[derive(Default)]
pub struct ZipWriter {
    buf: Vec<u8>,
    central: Vec<CentralRecord>,
}

struct CentralRecord {
    name: String,
    crc32: u32,
    size: u32,
    header_offset: u32,
}

impl ZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one stored member.
    ///
    /// Panics if the archive would exceed the 32-bit ZIP limits; fixture
    /// archives never come close.
    pub fn add(&mut self, name: &str, data: &[u8]) {
        let header_offset = u32::try_from(self.buf.len()).expect("archive exceeds 4 GiB");
        let size = u32::try_from(data.len()).expect("member exceeds 4 GiB");
        let crc32 = crc32fast::hash(data);

        self.buf.extend_from_slice(&[0x50, 0x4b, 0x03, 0x04]);
        self.buf.extend_from_slice(&20u16.to_le_bytes()); // version needed
        self.buf.extend_from_slice(&0u16.to_le_bytes()); // flags
        self.buf.extend_from_slice(&METHOD_STORED.to_le_bytes());
        self.buf.extend_from_slice(&0u16.to_le_bytes()); // mod time
        self.buf.extend_from_slice(&0u16.to_le_bytes()); // mod date
        self.buf.extend_from_slice(&crc32.to_le_bytes());
        self.buf.extend_from_slice(&size.to_le_bytes()); // compressed
        self.buf.extend_from_slice(&size.to_le_bytes()); // uncompressed
        self.buf
            .extend_from_slice(&(name.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(&0u16.to_le_bytes()); // extra len
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(data);

        self.central.push(CentralRecord {
            name: name.to_string(),
            crc32,
            size,
            header_offset,
        });
    }

    /// Write the central directory and end record, returning the archive.
    pub fn finish(mut self) -> Vec<u8> {
        let cd_offset = self.buf.len() as u32;
        for record in &self.central {
            self.buf.extend_from_slice(&[0x50, 0x4b, 0x01, 0x02]);
            self.buf.extend_from_slice(&20u16.to_le_bytes()); // version made by
            self.buf.extend_from_slice(&20u16.to_le_bytes()); // version needed
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // flags
            self.buf.extend_from_slice(&METHOD_STORED.to_le_bytes());
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // mod time
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // mod date
            self.buf.extend_from_slice(&record.crc32.to_le_bytes());
            self.buf.extend_from_slice(&record.size.to_le_bytes());
            self.buf.extend_from_slice(&record.size.to_le_bytes());
            self.buf
                .extend_from_slice(&(record.name.len() as u16).to_le_bytes());
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // extra len
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // comment len
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // disk number
            self.buf.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            self.buf.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            self.buf.extend_from_slice(&record.header_offset.to_le_bytes());
            self.buf.extend_from_slice(record.name.as_bytes());
        }
        let cd_size = self.buf.len() as u32 - cd_offset;
        let count = self.central.len() as u16;

        self.buf.extend_from_slice(&[0x50, 0x4b, 0x05, 0x06]);
        self.buf.extend_from_slice(&0u16.to_le_bytes()); // this disk
        self.buf.extend_from_slice(&0u16.to_le_bytes()); // central dir disk
        self.buf.extend_from_slice(&count.to_le_bytes());
        self.buf.extend_from_slice(&count.to_le_bytes());
        self.buf.extend_from_slice(&cd_size.to_le_bytes());
        self.buf.extend_from_slice(&cd_offset.to_le_bytes());
        self.buf.extend_from_slice(&0u16.to_le_bytes()); // comment len
        self.buf
    }
}
