use serde::{Serialize, Serializer};
use tracing::debug;

use super::{field, hash_hex};
use crate::error::Result;
use crate::util::cursor::ByteCursor;

pub const HEADER_LEN: usize = 44;
pub const ENTRY_PREFIX_LEN: usize = 32;

/// `push_id` of entries the client cached on its own rather than
/// receiving as a pushed hotfix.
pub const CACHED_PUSH_ID: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    /// Carries data that replaces the source record.
    Valid,
    /// Deletes the source record.
    Delete,
    /// Reverts to the local or server-side record.
    Invalid,
    NotPublic,
    /// A status byte this reader has no meaning for. Kept as read.
    Unknown(u8),
}

impl From<u8> for RecordStatus {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::Valid,
            2 => Self::Delete,
            3 => Self::Invalid,
            4 => Self::NotPublic,
            other => Self::Unknown(other),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => f.write_str("Valid"),
            Self::Delete => f.write_str("Delete"),
            Self::Invalid => f.write_str("Invalid"),
            Self::NotPublic => f.write_str("NotPublic"),
            Self::Unknown(v) => write!(f, "Unknown({v})"),
        }
    }
}

impl Serialize for RecordStatus {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFileHeader {
    pub magic: u32,
    pub version: u32,
    pub build_id: u32,
    pub verification_hash: [u8; 32],
}

impl CacheFileHeader {
    pub fn read_from(cur: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            magic: field(cur, "header.magic", ByteCursor::read_u32)?,
            version: field(cur, "header.version", ByteCursor::read_u32)?,
            build_id: field(cur, "header.build_id", ByteCursor::read_u32)?,
            verification_hash: field(cur, "header.verification_hash", |c| c.read_array())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub magic: u32,
    pub region_id: i32,
    pub push_id: i32,
    pub unique_id: u32,
    pub table_hash: u32,
    pub record_id: u32,
    pub status: RecordStatus,
    pub data: Vec<u8>,
}

impl CacheEntry {
    pub fn read_from(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let magic = field(cur, "entry.magic", ByteCursor::read_u32)?;
        let region_id = field(cur, "entry.region_id", ByteCursor::read_i32)?;
        let push_id = field(cur, "entry.push_id", ByteCursor::read_i32)?;
        let unique_id = field(cur, "entry.unique_id", ByteCursor::read_u32)?;
        let table_hash = field(cur, "entry.table_hash", ByteCursor::read_u32)?;
        let record_id = field(cur, "entry.record_id", ByteCursor::read_u32)?;
        let data_size = field(cur, "entry.data_size", ByteCursor::read_u32)?;

        let status = RecordStatus::from(field(cur, "entry.status", ByteCursor::read_u8)?);
        field(cur, "entry.padding", |c| c.read_array::<3>())?;

        let data = field(cur, "entry.data", |c| c.read_bytes(data_size as usize))?.to_vec();

        Ok(Self {
            magic,
            region_id,
            push_id,
            unique_id,
            table_hash,
            record_id,
            status,
            data,
        })
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn table_hash_hex(&self) -> String {
        hash_hex(self.table_hash)
    }

    pub fn is_cached(&self) -> bool {
        self.push_id == CACHED_PUSH_ID
    }
}

#[derive(Debug, Clone)]
pub struct CacheFile {
    pub header: CacheFileHeader,
    pub entries: Vec<CacheEntry>,
}

impl CacheFile {
    /// Parse a whole cache file: header, then entries until the bytes run out.
    ///
    /// There is no entry count in the file, so a truncated final entry is an
    /// error rather than a silently shorter list.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cur = ByteCursor::new(bytes);
        let header = CacheFileHeader::read_from(&mut cur)?;
        let mut entries = Vec::new();
        while !cur.is_empty() {
            entries.push(CacheEntry::read_from(&mut cur)?);
        }
        debug!(
            "cache file parsed: version={} build={} entries={}",
            header.version,
            header.build_id,
            entries.len()
        );
        Ok(Self { header, entries })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::HotfixError;

    pub(crate) fn header_bytes(magic: u32, version: u32, build_id: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&magic.to_le_bytes());
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&build_id.to_le_bytes());
        out.extend_from_slice(&[0xaa; 32]);
        out
    }

    pub(crate) fn entry_bytes(push_id: i32, table_hash: u32, status: u8, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENTRY_PREFIX_LEN + data.len());
        out.extend_from_slice(&0x5846_5448u32.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes());
        out.extend_from_slice(&push_id.to_le_bytes());
        out.extend_from_slice(&77u32.to_le_bytes());
        out.extend_from_slice(&table_hash.to_le_bytes());
        out.extend_from_slice(&1234u32.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.push(status);
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn parses_header_and_entries() {
        let mut bytes = header_bytes(0x4142_4344, 9, 55000);
        assert_eq!(bytes.len(), HEADER_LEN);
        let entry = entry_bytes(10, 0x1234_5678, 1, &[1, 2, 3]);
        assert_eq!(entry.len(), ENTRY_PREFIX_LEN + 3);
        bytes.extend_from_slice(&entry);
        bytes.extend_from_slice(&entry_bytes(-1, 0xdead_beef, 2, &[]));

        let file = CacheFile::parse(&bytes).unwrap();
        assert_eq!(file.header.magic, 0x4142_4344);
        assert_eq!(file.header.version, 9);
        assert_eq!(file.header.build_id, 55000);
        assert_eq!(file.header.verification_hash, [0xaa; 32]);
        assert_eq!(file.entries.len(), 2);

        let first = &file.entries[0];
        assert_eq!(first.push_id, 10);
        assert_eq!(first.unique_id, 77);
        assert_eq!(first.record_id, 1234);
        assert_eq!(first.table_hash_hex(), "12345678");
        assert_eq!(first.status, RecordStatus::Valid);
        assert_eq!(first.data, vec![1, 2, 3]);

        let second = &file.entries[1];
        assert!(second.is_cached());
        assert_eq!(second.status, RecordStatus::Delete);
        assert_eq!(second.data_size(), 0);
    }

    #[test]
    fn header_only_file_has_no_entries() {
        let file = CacheFile::parse(&header_bytes(1, 2, 3)).unwrap();
        assert!(file.entries.is_empty());
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut bytes = header_bytes(1, 2, 3);
        let entry = entry_bytes(5, 1, 1, &[9, 9, 9, 9]);
        bytes.extend_from_slice(&entry[..entry.len() - 2]);
        let err = CacheFile::parse(&bytes).unwrap_err();
        match err {
            HotfixError::MalformedContainer { offset, field, .. } => {
                assert_eq!(field, "entry.data");
                assert_eq!(offset, HEADER_LEN + ENTRY_PREFIX_LEN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_header_is_malformed() {
        let bytes = header_bytes(1, 2, 3);
        let err = CacheFile::parse(&bytes[..20]).unwrap_err();
        assert!(matches!(
            err,
            HotfixError::MalformedContainer {
                offset: 12,
                field: "header.verification_hash",
                ..
            }
        ));
    }

    #[test]
    fn unknown_status_keeps_siblings() {
        let mut bytes = header_bytes(1, 2, 3);
        bytes.extend_from_slice(&entry_bytes(5, 1, 1, &[1, 2]));
        bytes.extend_from_slice(&entry_bytes(6, 1, 5, &[7, 7, 7]));
        bytes.extend_from_slice(&entry_bytes(7, 1, 1, &[3]));
        let file = CacheFile::parse(&bytes).unwrap();
        assert_eq!(file.entries.len(), 3);
        assert_eq!(file.entries[1].status, RecordStatus::Unknown(5));
        assert_eq!(file.entries[1].data, vec![7, 7, 7]);
        assert_eq!(file.entries[2].push_id, 7);
        assert_eq!(file.entries[2].data, vec![3]);
        assert_eq!(RecordStatus::Unknown(5).to_string(), "Unknown(5)");
    }
}
