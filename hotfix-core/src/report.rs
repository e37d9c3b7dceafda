//! What a decode run produces: one record per selected cache entry plus
//! a tally of how each one went.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::container::cache_file::{CacheEntry, CacheFileHeader, RecordStatus};
use crate::container::magic_ascii;
use crate::decode::Fields;
use crate::resolve::ResolvedBy;
use crate::version::Build;

/// Region an entry was pushed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    Us,
    Kr,
    Eu,
    Tw,
    Cn,
    Tr1,
    Tr2,
    Other(i32),
}

impl From<i32> for Region {
    fn from(id: i32) -> Self {
        match id {
            1 => Self::Us,
            2 => Self::Kr,
            3 => Self::Eu,
            4 => Self::Tw,
            5 => Self::Cn,
            50 => Self::Tr1,
            60 => Self::Tr2,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Us => f.write_str("US"),
            Self::Kr => f.write_str("KR"),
            Self::Eu => f.write_str("EU"),
            Self::Tw => f.write_str("TW"),
            Self::Cn => f.write_str("CN"),
            Self::Tr1 => f.write_str("TR1"),
            Self::Tr2 => f.write_str("TR2"),
            Self::Other(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// How decoding a single entry went.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Decoded {
        resolved_by: ResolvedBy,
        /// Blob bytes the layout did not account for.
        trailing: usize,
    },
    /// Status other than `Valid`; there is nothing to decode.
    NoPayload,
    /// Status byte outside the known set; the entry is kept undecoded.
    UnknownStatus,
    /// `Valid` with a zero-length blob.
    Empty,
    SchemaUnavailable(String),
    /// The table's schema text exists but does not parse.
    SchemaInvalid(String),
    LayoutUnresolved(String),
    DecodeFailed(String),
}

impl Outcome {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Decoded { .. } => "decoded",
            Self::NoPayload => "no_payload",
            Self::UnknownStatus => "unknown_status",
            Self::Empty => "empty",
            Self::SchemaUnavailable(_) => "schema_unavailable",
            Self::SchemaInvalid(_) => "schema_invalid",
            Self::LayoutUnresolved(_) => "layout_unresolved",
            Self::DecodeFailed(_) => "decode_failed",
        }
    }

    pub const fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecodedHotfix {
    pub push_id: i32,
    pub region: Region,
    pub unique_id: u32,
    /// Upper-case hex.
    pub table_hash: String,
    pub table_name: String,
    pub status: RecordStatus,
    pub record_id: u32,
    pub data_size: usize,
    /// `None` whenever the entry was not decoded.
    pub fields: Option<Fields>,
    pub outcome: Outcome,
}

impl DecodedHotfix {
    pub(crate) fn new(entry: &CacheEntry, table_name: String, outcome: Outcome) -> Self {
        Self {
            push_id: entry.push_id,
            region: Region::from(entry.region_id),
            unique_id: entry.unique_id,
            table_hash: entry.table_hash_hex(),
            table_name,
            status: entry.status,
            record_id: entry.record_id,
            data_size: entry.data_size(),
            fields: None,
            outcome,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub decoded: usize,
    /// Entries not decoded, by outcome kind.
    pub skipped: BTreeMap<&'static str, usize>,
}

impl Summary {
    pub fn tally<'a>(hotfixes: impl IntoIterator<Item = &'a DecodedHotfix>) -> Self {
        let mut summary = Self::default();
        for h in hotfixes {
            summary.total += 1;
            if h.outcome.is_decoded() {
                summary.decoded += 1;
            } else {
                *summary.skipped.entry(h.outcome.kind()).or_default() += 1;
            }
        }
        summary
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hotfixes: {} decoded, {} skipped",
            self.total,
            self.decoded,
            self.skipped_total()
        )?;
        for (kind, n) in &self.skipped {
            write!(f, "\n  {kind}: {n}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HotfixReport {
    /// Magic rendered as ASCII.
    pub magic: String,
    pub version: u32,
    pub build_id: u32,
    /// Build the layouts were resolved against.
    pub build: Build,
    pub hotfixes: Vec<DecodedHotfix>,
    pub summary: Summary,
}

impl HotfixReport {
    pub fn new(header: &CacheFileHeader, build: Build, hotfixes: Vec<DecodedHotfix>) -> Self {
        let summary = Summary::tally(&hotfixes);
        Self {
            magic: magic_ascii(header.magic),
            version: header.version,
            build_id: header.build_id,
            build,
            hotfixes,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_names() {
        assert_eq!(Region::from(1).to_string(), "US");
        assert_eq!(Region::from(60).to_string(), "TR2");
        assert_eq!(Region::from(7), Region::Other(7));
        assert_eq!(serde_json::to_string(&Region::from(3)).unwrap(), r#""EU""#);
        assert_eq!(serde_json::to_string(&Region::from(9)).unwrap(), r#""9""#);
    }

    #[test]
    fn outcome_serializes_with_kind() {
        let json = serde_json::to_string(&Outcome::DecodeFailed("short".into())).unwrap();
        assert_eq!(json, r#"{"kind":"decode_failed","detail":"short"}"#);
        let json = serde_json::to_string(&Outcome::Empty).unwrap();
        assert_eq!(json, r#"{"kind":"empty"}"#);
    }

    #[test]
    fn summary_counts_by_kind() {
        let entry = CacheEntry {
            magic: 0,
            region_id: 1,
            push_id: 5,
            unique_id: 1,
            table_hash: 0xAB,
            record_id: 1,
            status: RecordStatus::Valid,
            data: Vec::new(),
        };
        let hotfixes = vec![
            DecodedHotfix::new(&entry, "A".into(), Outcome::Empty),
            DecodedHotfix::new(&entry, "A".into(), Outcome::Empty),
            DecodedHotfix::new(&entry, "A".into(), Outcome::NoPayload),
            DecodedHotfix::new(
                &entry,
                "A".into(),
                Outcome::Decoded {
                    resolved_by: ResolvedBy::Build,
                    trailing: 0,
                },
            ),
        ];
        let summary = Summary::tally(&hotfixes);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.decoded, 1);
        assert_eq!(summary.skipped["empty"], 2);
        assert_eq!(summary.skipped["no_payload"], 1);
        assert_eq!(summary.skipped_total(), 3);
        assert_eq!(hotfixes[0].table_hash, "000000AB");
    }
}
