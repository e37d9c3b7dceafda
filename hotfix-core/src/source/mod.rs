//! Collaborators that supply schema text, table names and layout hashes.
//!
//! The decode path only ever talks to these traits; where the data comes
//! from (a definitions checkout, exported tables, something remote) is up
//! to the implementation.

pub mod fs;

use std::collections::HashMap;

use crate::error::{HotfixError, Result};
use crate::version::Build;

/// Table name used when a hash is missing from the manifest.
pub const UNKNOWN_TABLE: &str = "Unknown";

pub trait SchemaSource: Send + Sync {
    /// Raw schema text for `table`, or [`HotfixError::NotFound`].
    fn schema_text(&self, table: &str) -> Result<String>;
}

pub trait TableNameLookup: Send + Sync {
    /// Name of the table with the given upper-case hex hash, or
    /// [`UNKNOWN_TABLE`].
    fn table_name(&self, hash_hex: &str) -> String;
}

pub trait LayoutHashSource: Send + Sync {
    /// Upper-case hex layout hash of `table` as shipped in `build`, if an
    /// exported table header is available.
    fn layout_hash(&self, table: &str, build: &Build) -> Option<String>;
}

/// In-memory schema texts keyed by table name.
#[derive(Clone, Debug, Default)]
pub struct MemorySchemas {
    texts: HashMap<String, String>,
}

impl MemorySchemas {
    pub fn insert(&mut self, table: impl Into<String>, text: impl Into<String>) {
        self.texts.insert(table.into(), text.into());
    }
}

impl SchemaSource for MemorySchemas {
    fn schema_text(&self, table: &str) -> Result<String> {
        self.texts
            .get(table)
            .cloned()
            .ok_or_else(|| HotfixError::NotFound(format!("no definitions for table {table}")))
    }
}

/// Hash → name mapping. Lookups are case-insensitive on the hash.
#[derive(Clone, Debug, Default)]
pub struct TableNames {
    by_hash: HashMap<String, String>,
}

impl TableNames {
    pub fn insert(&mut self, hash_hex: &str, table: impl Into<String>) {
        self.by_hash.insert(hash_hex.to_ascii_uppercase(), table.into());
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

impl TableNameLookup for TableNames {
    fn table_name(&self, hash_hex: &str) -> String {
        self.by_hash
            .get(&hash_hex.to_ascii_uppercase())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TABLE.to_string())
    }
}

/// Layout hashes keyed by table name, valid for whatever build is asked.
#[derive(Clone, Debug, Default)]
pub struct FixedLayoutHashes {
    by_table: HashMap<String, String>,
}

impl FixedLayoutHashes {
    pub fn insert(&mut self, table: impl Into<String>, hash_hex: &str) {
        self.by_table.insert(table.into(), hash_hex.to_ascii_uppercase());
    }
}

impl LayoutHashSource for FixedLayoutHashes {
    fn layout_hash(&self, table: &str, _build: &Build) -> Option<String> {
        self.by_table.get(table).cloned()
    }
}

/// Source that never has a layout hash.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLayoutHashes;

impl LayoutHashSource for NoLayoutHashes {
    fn layout_hash(&self, _table: &str, _build: &Build) -> Option<String> {
        None
    }
}
