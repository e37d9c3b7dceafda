use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{LayoutHashSource, SchemaSource, TableNames};
use crate::build_info::{BuildInfo, Flavor};
use crate::container::table_header::{TABLE_HEADER_LEN, TableHeader};
use crate::error::{HotfixError, Result};
use crate::version::Build;

/// Schema files from a definitions checkout (`<root>/definitions/<Table>.dbd`).
#[derive(Clone, Debug)]
pub struct DirSchemaSource {
    by_table: HashMap<String, PathBuf>,
}

impl DirSchemaSource {
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join("definitions");
        if !dir.is_dir() {
            return Err(HotfixError::NotFound(format!(
                "definitions directory {}",
                dir.display()
            )));
        }
        let mut by_table = HashMap::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| HotfixError::Io(e.into()))?;
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "dbd")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                by_table.insert(stem.to_string(), path.to_path_buf());
            }
        }
        debug!("indexed {} definition files in {}", by_table.len(), dir.display());
        Ok(Self { by_table })
    }

    pub fn len(&self) -> usize {
        self.by_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_table.is_empty()
    }
}

impl SchemaSource for DirSchemaSource {
    fn schema_text(&self, table: &str) -> Result<String> {
        let path = self
            .by_table
            .get(table)
            .ok_or_else(|| HotfixError::NotFound(format!("no definitions for table {table}")))?;
        Ok(std::fs::read_to_string(path)?)
    }
}

#[derive(Deserialize)]
struct ManifestRow {
    #[serde(rename = "tableName")]
    table_name: String,
    #[serde(rename = "tableHash")]
    table_hash: String,
}

/// Load `manifest.json` (`[{"tableName": .., "tableHash": ..}, ..]`).
pub fn load_manifest(path: &Path) -> Result<TableNames> {
    let bytes = std::fs::read(path)?;
    parse_manifest(&bytes)
}

pub fn parse_manifest(bytes: &[u8]) -> Result<TableNames> {
    let rows: Vec<ManifestRow> =
        serde_json::from_slice(bytes).map_err(|e| HotfixError::Manifest(e.to_string()))?;
    let mut names = TableNames::default();
    for row in rows {
        names.insert(&row.table_hash, row.table_name);
    }
    Ok(names)
}

/// Layout hashes read from exported tables under
/// `<root>/<build>/dbfilesclient/<table>.db2`.
///
/// Each (table, build) is looked up once; misses are remembered too.
#[derive(Clone, Debug)]
pub struct Db2ExportLayoutSource {
    root: PathBuf,
    seen: DashMap<(String, Build), Option<String>>,
}

impl Db2ExportLayoutSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seen: DashMap::new(),
        }
    }

    pub fn table_path(&self, table: &str, build: &Build) -> PathBuf {
        self.root
            .join(build.to_string())
            .join("dbfilesclient")
            .join(format!("{}.db2", table.to_lowercase()))
    }

    fn read_header(path: &Path) -> Result<TableHeader> {
        let mut buf = Vec::with_capacity(TABLE_HEADER_LEN);
        File::open(path)?
            .take(TABLE_HEADER_LEN as u64)
            .read_to_end(&mut buf)?;
        TableHeader::parse(&buf)
    }

    fn lookup(&self, table: &str, build: &Build) -> Option<String> {
        let path = self.table_path(table, build);
        if !path.is_file() {
            warn!("exported table not found: {table} build {build} ({})", path.display());
            return None;
        }
        match Self::read_header(&path) {
            Ok(header) => Some(header.layout_hash_hex()),
            Err(e) => {
                warn!("unreadable table header {}: {e}", path.display());
                None
            }
        }
    }

    /// Number of distinct (table, build) lookups made so far.
    pub fn lookups(&self) -> usize {
        self.seen.len()
    }
}

impl LayoutHashSource for Db2ExportLayoutSource {
    fn layout_hash(&self, table: &str, build: &Build) -> Option<String> {
        self.seen
            .entry((table.to_string(), *build))
            .or_insert_with(|| self.lookup(table, build))
            .value()
            .clone()
    }
}

/// A client installation: `.build.info` at the root, one directory per flavor.
#[derive(Clone, Debug)]
pub struct GameInstall {
    pub root: PathBuf,
    pub flavor: Flavor,
}

impl GameInstall {
    pub fn new(root: impl Into<PathBuf>, flavor: Flavor) -> Self {
        Self {
            root: root.into(),
            flavor,
        }
    }

    pub fn build_info(&self) -> Result<BuildInfo> {
        let text = std::fs::read_to_string(self.root.join(".build.info"))?;
        BuildInfo::parse(&text)
    }

    pub fn current_build(&self) -> Result<Build> {
        self.build_info()?.build_for(self.flavor)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root
            .join(self.flavor.dir_name())
            .join("Cache")
            .join("ADB")
            .join("enUS")
            .join("DBCache.bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::table_header::tests::table_header_bytes;
    use crate::source::{TableNameLookup, UNKNOWN_TABLE};

    #[test]
    fn manifest_maps_hashes() {
        let json = br#"[{"tableName":"Spell","tableHash":"e111669e","dbcFile":"x"},
                        {"tableName":"Map","tableHash":"8A5A4E1A"}]"#;
        let names = parse_manifest(json).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names.table_name("E111669E"), "Spell");
        assert_eq!(names.table_name("8a5a4e1a"), "Map");
        assert_eq!(names.table_name("00000001"), UNKNOWN_TABLE);
    }

    #[test]
    fn bad_manifest_is_reported() {
        assert!(matches!(
            parse_manifest(b"{not json"),
            Err(HotfixError::Manifest(_))
        ));
    }

    #[test]
    fn dir_source_reads_definitions() {
        let tmp = tempfile::tempdir().unwrap();
        let defs = tmp.path().join("definitions");
        std::fs::create_dir_all(&defs).unwrap();
        std::fs::write(defs.join("Spell.dbd"), "COLUMNS\nint ID\n").unwrap();
        std::fs::write(defs.join("README.md"), "ignored").unwrap();

        let src = DirSchemaSource::open(tmp.path()).unwrap();
        assert_eq!(src.len(), 1);
        assert_eq!(src.schema_text("Spell").unwrap(), "COLUMNS\nint ID\n");
        assert!(matches!(
            src.schema_text("Map"),
            Err(HotfixError::NotFound(_))
        ));
    }

    #[test]
    fn db2_export_supplies_layout_hash() {
        let tmp = tempfile::tempdir().unwrap();
        let build = Build::new(10, 2, 0, 52000);
        let src = Db2ExportLayoutSource::new(tmp.path());

        let path = src.table_path("Spell", &build);
        assert!(path.ends_with("10.2.0.52000/dbfilesclient/spell.db2"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, table_header_bytes(0xe111_669e, 0x0e84_a21c)).unwrap();
        assert_eq!(src.layout_hash("Spell", &build).as_deref(), Some("0E84A21C"));
    }

    #[test]
    fn db2_lookups_are_remembered_per_table_and_build() {
        let tmp = tempfile::tempdir().unwrap();
        let build = Build::new(10, 2, 0, 52000);
        let src = Db2ExportLayoutSource::new(tmp.path());
        for _ in 0..5 {
            assert_eq!(src.layout_hash("Spell", &build), None);
        }
        assert_eq!(src.lookups(), 1);

        // A miss stays a miss for the rest of the session.
        let path = src.table_path("Spell", &build);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, table_header_bytes(1, 2)).unwrap();
        assert_eq!(src.layout_hash("Spell", &build), None);

        assert_eq!(src.layout_hash("Map", &build), None);
        assert_eq!(src.layout_hash("Spell", &Build::new(10, 2, 0, 52001)), None);
        assert_eq!(src.lookups(), 3);
    }

    #[test]
    fn truncated_db2_header_yields_none() {
        let tmp = tempfile::tempdir().unwrap();
        let build = Build::new(1, 0, 0, 1);
        let src = Db2ExportLayoutSource::new(tmp.path());
        let path = src.table_path("Map", &build);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, [0u8; 20]).unwrap();
        assert_eq!(src.layout_hash("Map", &build), None);
    }
}
