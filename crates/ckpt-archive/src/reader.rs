use std::io::Read;

use crate::entry::{ArchiveEntry, METHOD_DEFLATED, METHOD_STORED};
use crate::error::{ZipError, ZipResult};

const LOCAL_SIG: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const CENTRAL_SIG: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const EOCD_SIG: [u8; 4] = [0x50, 0x4b, 0x05, 0x06];
const EOCD64_SIG: [u8; 4] = [0x50, 0x4b, 0x06, 0x06];
const EOCD64_LOCATOR_SIG: [u8; 4] = [0x50, 0x4b, 0x06, 0x07];

/// Fixed size of the end-of-central-directory record, excluding comment.
const EOCD_LEN: usize = 22;
/// Fixed size of a central directory file header, excluding variable fields.
const CENTRAL_LEN: usize = 46;
/// Fixed size of a local file header, excluding variable fields.
const LOCAL_LEN: usize = 30;

/// `true` when the buffer begins with a ZIP local-header signature or holds
/// a locatable end-of-central-directory record near its tail, the same probe
/// [`ZipReader::parse`] starts from. Cheap classification only; says nothing
/// about validity.
pub fn has_zip_signature(data: &[u8]) -> bool {
    data.starts_with(&LOCAL_SIG) || find_eocd(data).is_some()
}

/// Read-only view of a ZIP archive over a borrowed byte slice.
///
/// Parsing walks the end-of-central-directory record (ZIP64-aware) and the
/// central directory; member data regions are untouched until [`ZipReader::read`]
/// is called for a specific name, so listing an archive never faults in
/// member payloads.
#[derive(Debug)]
pub struct ZipReader<'a> {
    data: &'a [u8],
    entries: Vec<ArchiveEntry>,
}

impl<'a> ZipReader<'a> {
    /// Parse the archive structure without reading any member data.
    pub fn parse(data: &'a [u8]) -> ZipResult<Self> {
        let eocd = find_eocd(data).ok_or_else(|| {
            ZipError::NotAnArchive("no end-of-central-directory record".into())
        })?;
        let mut entry_count = u64::from(u16_at(data, eocd + 10)?);
        let cd_size = u64::from(u32_at(data, eocd + 12)?);
        let mut cd_offset = u64::from(u32_at(data, eocd + 16)?);
        let mut shift = 0u64;

        // Saturated EOCD fields redirect through the ZIP64 records.
        if entry_count == 0xffff || cd_offset == 0xffff_ffff {
            let locator = eocd
                .checked_sub(20)
                .filter(|&at| bytes_at(data, at, 4).map_or(false, |sig| sig == EOCD64_LOCATOR_SIG))
                .ok_or_else(|| ZipError::Corrupt("zip64 locator missing".into()))?;
            let eocd64 = usize::try_from(u64_at(data, locator + 8)?)
                .map_err(|_| ZipError::Corrupt("zip64 record offset out of range".into()))?;
            if bytes_at(data, eocd64, 4)? != EOCD64_SIG {
                return Err(ZipError::Corrupt(
                    "bad zip64 end-of-central-directory signature".into(),
                ));
            }
            entry_count = u64_at(data, eocd64 + 32)?;
            cd_offset = u64_at(data, eocd64 + 48)?;
        } else {
            // Stored offsets are relative to the archive start. Any bytes
            // prepended to the file (self-extracting prefixes) show up as
            // the gap between where the central directory claims to end and
            // where the end record actually sits.
            shift = (eocd as u64)
                .checked_sub(cd_size)
                .and_then(|v| v.checked_sub(cd_offset))
                .ok_or_else(|| {
                    ZipError::Corrupt("central directory overruns its end record".into())
                })?;
        }

        let mut pos = usize::try_from(cd_offset + shift)
            .map_err(|_| ZipError::Corrupt("central directory offset out of range".into()))?;
        let mut entries = Vec::new();
        for _ in 0..entry_count {
            let (mut entry, record_len) = parse_central_record(data, pos)?;
            entry.header_offset += shift;
            entries.push(entry);
            pos += record_len;
        }
        Ok(Self { data, entries })
    }

    /// Member names in central-directory order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn member_count(&self) -> usize {
        self.entries.len()
    }

    /// Extract one member, verifying its CRC32 and declared size.
    pub fn read(&self, name: &str) -> ZipResult<Vec<u8>> {
        let entry = self
            .entry(name)
            .ok_or_else(|| ZipError::MemberNotFound(name.to_string()))?;
        if entry.is_encrypted() {
            return Err(ZipError::Corrupt(format!("member '{name}' is encrypted")));
        }
        let offset = usize::try_from(entry.header_offset)
            .map_err(|_| ZipError::Corrupt(format!("bad local header offset for '{name}'")))?;
        if bytes_at(self.data, offset, 4)? != LOCAL_SIG {
            return Err(ZipError::Corrupt(format!(
                "bad local header signature for member '{name}'"
            )));
        }
        let name_len = u16_at(self.data, offset + 26)? as usize;
        let extra_len = u16_at(self.data, offset + 28)? as usize;
        let data_start = offset + LOCAL_LEN + name_len + extra_len;
        let csize = usize::try_from(entry.compressed_size)
            .map_err(|_| ZipError::Corrupt(format!("member '{name}' size out of range")))?;
        let raw = bytes_at(self.data, data_start, csize)?;

        let data = match entry.method {
            METHOD_STORED => raw.to_vec(),
            METHOD_DEFLATED => {
                let mut out = Vec::new();
                flate2::read::DeflateDecoder::new(raw)
                    .read_to_end(&mut out)
                    .map_err(|e| ZipError::DecompressionFailed {
                        name: name.to_string(),
                        reason: e.to_string(),
                    })?;
                out
            }
            method => {
                return Err(ZipError::UnsupportedMethod {
                    name: name.to_string(),
                    method,
                })
            }
        };

        let actual = crc32fast::hash(&data);
        if actual != entry.crc32 {
            return Err(ZipError::CrcMismatch {
                name: name.to_string(),
                expected: entry.crc32,
                actual,
            });
        }
        if data.len() as u64 != entry.uncompressed_size {
            return Err(ZipError::Corrupt(format!(
                "member '{name}' size mismatch: expected {}, got {}",
                entry.uncompressed_size,
                data.len()
            )));
        }
        Ok(data)
    }
}

/// Scan backwards for the end-of-central-directory signature, allowing for
/// a trailing comment of up to 64 KiB.
fn find_eocd(data: &[u8]) -> Option<usize> {
    if data.len() < EOCD_LEN {
        return None;
    }
    let floor = data.len().saturating_sub(EOCD_LEN + 0xffff);
    let mut pos = data.len() - EOCD_LEN;
    loop {
        if data[pos..pos + 4] == EOCD_SIG {
            return Some(pos);
        }
        if pos == floor {
            return None;
        }
        pos -= 1;
    }
}

fn parse_central_record(data: &[u8], pos: usize) -> ZipResult<(ArchiveEntry, usize)> {
    if bytes_at(data, pos, 4)? != CENTRAL_SIG {
        return Err(ZipError::Corrupt(format!(
            "bad central directory signature at offset {pos}"
        )));
    }
    let flags = u16_at(data, pos + 8)?;
    let method = u16_at(data, pos + 10)?;
    let crc32 = u32_at(data, pos + 16)?;
    let mut compressed_size = u64::from(u32_at(data, pos + 20)?);
    let mut uncompressed_size = u64::from(u32_at(data, pos + 24)?);
    let name_len = u16_at(data, pos + 28)? as usize;
    let extra_len = u16_at(data, pos + 30)? as usize;
    let comment_len = u16_at(data, pos + 32)? as usize;
    let mut header_offset = u64::from(u32_at(data, pos + 42)?);

    let name = std::str::from_utf8(bytes_at(data, pos + CENTRAL_LEN, name_len)?)
        .map_err(|_| ZipError::Corrupt(format!("member name at offset {pos} is not valid UTF-8")))?
        .to_string();
    let extra = bytes_at(data, pos + CENTRAL_LEN + name_len, extra_len)?;
    apply_zip64_extra(
        extra,
        &mut uncompressed_size,
        &mut compressed_size,
        &mut header_offset,
    )?;

    let entry = ArchiveEntry {
        name,
        method,
        flags,
        crc32,
        compressed_size,
        uncompressed_size,
        header_offset,
    };
    Ok((entry, CENTRAL_LEN + name_len + extra_len + comment_len))
}

/// Replace saturated 32-bit fields from the ZIP64 extended-information extra
/// field (id 0x0001). Field order in the record is fixed: uncompressed size,
/// compressed size, local header offset.
fn apply_zip64_extra(
    extra: &[u8],
    uncompressed_size: &mut u64,
    compressed_size: &mut u64,
    header_offset: &mut u64,
) -> ZipResult<()> {
    let mut pos = 0;
    while pos + 4 <= extra.len() {
        let id = u16::from_le_bytes([extra[pos], extra[pos + 1]]);
        let len = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;
        pos += 4;
        let field = extra
            .get(pos..pos + len)
            .ok_or_else(|| ZipError::Corrupt("extra field overruns record".into()))?;
        if id == 0x0001 {
            let mut at = 0;
            for target in [&mut *uncompressed_size, &mut *compressed_size, &mut *header_offset] {
                if *target == 0xffff_ffff {
                    let bytes = field.get(at..at + 8).ok_or_else(|| {
                        ZipError::Corrupt("zip64 extra field too short".into())
                    })?;
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(bytes);
                    *target = u64::from_le_bytes(buf);
                    at += 8;
                }
            }
        }
        pos += len;
    }
    Ok(())
}

fn bytes_at(data: &[u8], pos: usize, len: usize) -> ZipResult<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| data.get(pos..end))
        .ok_or_else(|| ZipError::Corrupt(format!("truncated record at offset {pos}")))
}

fn u16_at(data: &[u8], pos: usize) -> ZipResult<u16> {
    let bytes = bytes_at(data, pos, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn u32_at(data: &[u8], pos: usize) -> ZipResult<u32> {
    let bytes = bytes_at(data, pos, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn u64_at(data: &[u8], pos: usize) -> ZipResult<u64> {
    let bytes = bytes_at(data, pos, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ZipWriter;

    fn two_member_archive() -> Vec<u8> {
        let mut writer = ZipWriter::new();
        writer.add("archive/version", b"3\n");
        writer.add("archive/data.pkl", b"not really a pickle");
        writer.finish()
    }

    #[test]
    fn lists_members_in_order() {
        let bytes = two_member_archive();
        let reader = ZipReader::parse(&bytes).unwrap();
        let names: Vec<&str> = reader.member_names().collect();
        assert_eq!(names, ["archive/version", "archive/data.pkl"]);
    }

    #[test]
    fn reads_stored_member() {
        let bytes = two_member_archive();
        let reader = ZipReader::parse(&bytes).unwrap();
        assert_eq!(reader.read("archive/version").unwrap(), b"3\n");
        assert_eq!(reader.read("archive/data.pkl").unwrap(), b"not really a pickle");
    }

    #[test]
    fn empty_archive_parses() {
        let bytes = ZipWriter::new().finish();
        let reader = ZipReader::parse(&bytes).unwrap();
        assert_eq!(reader.member_count(), 0);
    }

    #[test]
    fn missing_member() {
        let bytes = two_member_archive();
        let reader = ZipReader::parse(&bytes).unwrap();
        assert!(matches!(
            reader.read("archive/data/0").unwrap_err(),
            ZipError::MemberNotFound(_)
        ));
    }

    #[test]
    fn non_archive_is_classified_not_corrupt() {
        let err = ZipReader::parse(b"PK-definitely-not-a-zip").unwrap_err();
        assert!(matches!(err, ZipError::NotAnArchive(_)));
    }

    #[test]
    fn signature_probe() {
        assert!(has_zip_signature(&two_member_archive()));
        assert!(has_zip_signature(&ZipWriter::new().finish()));
        assert!(!has_zip_signature(b"\x80\x02}q\x00."));
        assert!(!has_zip_signature(b""));
    }

    #[test]
    fn signature_probe_sees_archive_behind_prepended_bytes() {
        // The end record is located from the tail, so a self-extracting
        // style prefix does not hide the archive.
        let mut bytes = b"#!/bin/sh\nexit 0\n".to_vec();
        bytes.extend_from_slice(&two_member_archive());
        assert!(has_zip_signature(&bytes));
    }

    #[test]
    fn prepended_bytes_shift_all_offsets() {
        let mut bytes = b"#!/bin/sh\nexit 0\n".to_vec();
        bytes.extend_from_slice(&two_member_archive());
        let reader = ZipReader::parse(&bytes).unwrap();
        assert_eq!(reader.member_count(), 2);
        assert_eq!(reader.read("archive/version").unwrap(), b"3\n");
    }

    #[test]
    fn corrupt_member_data_fails_crc() {
        let mut bytes = two_member_archive();
        // Flip a byte inside the first member's data region.
        let at = bytes
            .windows(2)
            .position(|w| w == b"3\n")
            .expect("member data present");
        bytes[at] ^= 0xff;
        let reader = ZipReader::parse(&bytes).unwrap();
        assert!(matches!(
            reader.read("archive/version").unwrap_err(),
            ZipError::CrcMismatch { .. }
        ));
    }

    #[test]
    fn truncated_central_directory() {
        let bytes = two_member_archive();
        // Point the EOCD's central-directory offset past the end of file.
        let mut bytes = bytes;
        let eocd = find_eocd(&bytes).unwrap();
        bytes[eocd + 16..eocd + 20].copy_from_slice(&u32::MAX.saturating_sub(1).to_le_bytes());
        assert!(matches!(
            ZipReader::parse(&bytes).unwrap_err(),
            ZipError::Corrupt(_)
        ));
    }

    #[test]
    fn saturated_eocd_without_zip64_locator() {
        let mut bytes = two_member_archive();
        let eocd = find_eocd(&bytes).unwrap();
        // Claim 0xffff entries, which demands a zip64 locator.
        bytes[eocd + 10..eocd + 12].copy_from_slice(&0xffffu16.to_le_bytes());
        let err = ZipReader::parse(&bytes).unwrap_err();
        assert!(matches!(err, ZipError::Corrupt(_)));
        assert!(err.to_string().contains("zip64"));
    }

    #[test]
    fn deflated_member_roundtrip() {
        // Hand-build a one-member archive with a deflated payload.
        let payload = b"deflate me deflate me deflate me";
        let mut compressed = Vec::new();
        {
            use std::io::Write;
            let mut enc =
                flate2::write::DeflateEncoder::new(&mut compressed, flate2::Compression::fast());
            enc.write_all(payload).unwrap();
            enc.finish().unwrap();
        }
        let crc = crc32fast::hash(payload);
        let name = b"archive/data.pkl";

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&LOCAL_SIG);
        bytes.extend_from_slice(&20u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&METHOD_DEFLATED.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]); // time + date
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(name);
        bytes.extend_from_slice(&compressed);

        let cd_offset = bytes.len() as u32;
        bytes.extend_from_slice(&CENTRAL_SIG);
        bytes.extend_from_slice(&20u16.to_le_bytes());
        bytes.extend_from_slice(&20u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&METHOD_DEFLATED.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]); // time + date
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]); // extra/comment/disk/attrs
        bytes.extend_from_slice(&0u32.to_le_bytes()); // header offset
        bytes.extend_from_slice(name);
        let cd_size = bytes.len() as u32 - cd_offset;

        bytes.extend_from_slice(&EOCD_SIG);
        bytes.extend_from_slice(&[0u8; 4]); // disk numbers
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&cd_size.to_le_bytes());
        bytes.extend_from_slice(&cd_offset.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());

        let reader = ZipReader::parse(&bytes).unwrap();
        assert_eq!(reader.read("archive/data.pkl").unwrap(), payload);
    }

    #[test]
    fn zip64_extra_after_other_extra_records() {
        // Extra field with an unrelated record (extended timestamp) before
        // the zip64 record, so the scan has to walk past it.
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x5455u16.to_le_bytes());
        extra.extend_from_slice(&5u16.to_le_bytes());
        extra.extend_from_slice(&[0u8; 5]);
        extra.extend_from_slice(&0x0001u16.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&0x1_2345_6789u64.to_le_bytes());
        extra.extend_from_slice(&0x1_0000_0001u64.to_le_bytes());

        let mut uncompressed = 0xffff_ffffu64;
        let mut compressed = 0xffff_ffffu64;
        let mut offset = 7u64;
        apply_zip64_extra(&extra, &mut uncompressed, &mut compressed, &mut offset).unwrap();
        assert_eq!(uncompressed, 0x1_2345_6789);
        assert_eq!(compressed, 0x1_0000_0001);
        assert_eq!(offset, 7);
    }

    #[test]
    fn unsupported_method_is_refused() {
        let mut bytes = two_member_archive();
        // Patch the central directory record's method field for the first
        // member to an unsupported value (bzip2 = 12).
        let cd = bytes
            .windows(4)
            .position(|w| w == CENTRAL_SIG)
            .expect("central directory present");
        bytes[cd + 10..cd + 12].copy_from_slice(&12u16.to_le_bytes());
        let reader = ZipReader::parse(&bytes).unwrap();
        assert!(matches!(
            reader.read("archive/version").unwrap_err(),
            ZipError::UnsupportedMethod { method: 12, .. }
        ));
    }
}
