pub mod parser;

use serde::Serialize;

use crate::version::{Build, BuildSpec};

pub use parser::parse_catalogue;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Locstring,
    U8,
    U16,
    /// A type token the decoder has no conversion for.
    Unsupported(String),
}

impl ColumnType {
    pub fn from_token(token: &str) -> Self {
        match token {
            "int" | "uint" => Self::Integer,
            "float" => Self::Float,
            "string" => Self::String,
            "locstring" => Self::Locstring,
            "u8" => Self::U8,
            "u16" => Self::U16,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub const fn is_text(&self) -> bool {
        matches!(self, Self::String | Self::Locstring)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Foreign {
    pub table: String,
    pub column: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Column {
    pub ty: ColumnType,
    pub name: String,
    /// False when the name carried a trailing `?` in the schema.
    pub name_confirmed: bool,
    pub foreign: Option<Foreign>,
    pub comment: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldEntry {
    pub column: String,
    /// Declared width in bits; 0 when the schema gives none.
    pub bit_width: u32,
    pub unsigned: bool,
    /// 0 for a scalar, otherwise the repeat count.
    pub array_size: u32,
    pub annotation: String,
    pub comment: String,
}

impl FieldEntry {
    pub fn has_annotation(&self, marker: &str) -> bool {
        self.annotation.split(',').any(|a| a.trim() == marker)
    }

    pub fn is_noninline(&self) -> bool {
        self.has_annotation("noninline")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldLayoutDefinition {
    pub builds: Vec<BuildSpec>,
    /// Upper-case layout hashes.
    pub layout_hashes: Vec<String>,
    pub comments: Vec<String>,
    pub entries: Vec<FieldEntry>,
}

impl FieldLayoutDefinition {
    pub fn supports_build(&self, build: &Build) -> bool {
        self.builds.iter().any(|b| b.matches(build))
    }

    pub fn has_layout_hash(&self, hash: &str) -> bool {
        self.layout_hashes.iter().any(|h| h.eq_ignore_ascii_case(hash))
    }
}

/// Parsed schema of one table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableCatalogue {
    pub columns: Vec<Column>,
    pub layouts: Vec<FieldLayoutDefinition>,
}

impl TableCatalogue {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn entries_for_build(&self, build: &Build) -> Vec<&FieldEntry> {
        self.layouts
            .iter()
            .filter(|l| l.supports_build(build))
            .flat_map(|l| &l.entries)
            .collect()
    }

    pub fn entries_for_layout_hash(&self, hash: &str) -> Vec<&FieldEntry> {
        self.layouts
            .iter()
            .filter(|l| l.has_layout_hash(hash))
            .flat_map(|l| &l.entries)
            .collect()
    }
}
