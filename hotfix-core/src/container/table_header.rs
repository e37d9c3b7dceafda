use super::{field, hash_hex};
use crate::error::Result;
use crate::util::cursor::ByteCursor;

pub const TABLE_HEADER_LEN: usize = 160;
pub const SCHEMA_STRING_LEN: usize = 128;

/// Fixed header at the start of an exported client table file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub magic: u32,
    pub version: u32,
    /// ASCII, space/zero padded. Structural only.
    pub schema_string: String,
    pub record_count: u32,
    pub field_count: u32,
    pub record_size: u32,
    pub string_table_size: u32,
    pub table_hash: u32,
    pub layout_hash: u32,
}

impl TableHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cur = ByteCursor::new(bytes);
        Self::read_from(&mut cur)
    }

    pub fn read_from(cur: &mut ByteCursor<'_>) -> Result<Self> {
        let magic = field(cur, "table.magic", ByteCursor::read_u32)?;
        let version = field(cur, "table.version", ByteCursor::read_u32)?;
        let raw_schema = field(cur, "table.schema_string", |c| c.read_bytes(SCHEMA_STRING_LEN))?;
        let schema_string = String::from_utf8_lossy(raw_schema)
            .trim_end_matches(['\0', ' '])
            .to_string();
        Ok(Self {
            magic,
            version,
            schema_string,
            record_count: field(cur, "table.record_count", ByteCursor::read_u32)?,
            field_count: field(cur, "table.field_count", ByteCursor::read_u32)?,
            record_size: field(cur, "table.record_size", ByteCursor::read_u32)?,
            string_table_size: field(cur, "table.string_table_size", ByteCursor::read_u32)?,
            table_hash: field(cur, "table.table_hash", ByteCursor::read_u32)?,
            layout_hash: field(cur, "table.layout_hash", ByteCursor::read_u32)?,
        })
    }

    pub fn layout_hash_hex(&self) -> String {
        hash_hex(self.layout_hash)
    }
}
