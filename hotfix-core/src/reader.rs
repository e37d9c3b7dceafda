//! Decode session: ties a parsed cache file to schema, name and layout
//! sources, and decodes the selected entries across a worker pool.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::catalogue::CatalogueCache;
use crate::container::cache_file::{CacheEntry, CacheFile, RecordStatus};
use crate::decode::decode_record;
use crate::error::{HotfixError, Result};
use crate::report::{DecodedHotfix, HotfixReport, Outcome};
use crate::resolve::{ResolvedBy, resolve};
use crate::schema::{FieldEntry, TableCatalogue};
use crate::source::{LayoutHashSource, SchemaSource, TableNameLookup};
use crate::version::Build;

#[derive(Clone, Debug)]
pub struct ReaderConfig {
    /// Build layouts are resolved against.
    pub build: Build,
    /// Worker threads; `None` uses the global pool.
    pub jobs: Option<usize>,
    /// Keep entries the client cached itself (`push_id == -1`).
    pub include_cached: bool,
    /// Only entries of this table, compared case-insensitively.
    pub table_filter: Option<String>,
}

impl ReaderConfig {
    pub fn new(build: Build) -> Self {
        Self {
            build,
            jobs: None,
            include_cached: false,
            table_filter: None,
        }
    }
}

pub struct HotfixReader {
    config: ReaderConfig,
    schemas: Arc<dyn SchemaSource>,
    names: Arc<dyn TableNameLookup>,
    layouts: Arc<dyn LayoutHashSource>,
    catalogues: CatalogueCache,
    pool: Option<ThreadPool>,
}

impl HotfixReader {
    pub fn new(
        config: ReaderConfig,
        schemas: Arc<dyn SchemaSource>,
        names: Arc<dyn TableNameLookup>,
        layouts: Arc<dyn LayoutHashSource>,
    ) -> Result<Self> {
        let pool = match config.jobs {
            Some(n) => Some(ThreadPoolBuilder::new().num_threads(n).build()?),
            None => None,
        };
        Ok(Self {
            config,
            schemas,
            names,
            layouts,
            catalogues: CatalogueCache::new(),
            pool,
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn catalogues(&self) -> &CatalogueCache {
        &self.catalogues
    }

    /// Parsed schema of `table`, built once per session.
    pub fn catalogue(&self, table: &str) -> Result<Arc<TableCatalogue>> {
        self.catalogues.load(table, self.schemas.as_ref())
    }

    /// Layout entries of `table` at the configured build.
    pub fn layout_for(&self, table: &str) -> Result<(ResolvedBy, Vec<FieldEntry>)> {
        let catalogue = self.catalogue(table)?;
        let resolution = resolve(&catalogue, table, &self.config.build, self.layouts.as_ref())?;
        Ok((
            resolution.by,
            resolution.entries.into_iter().cloned().collect(),
        ))
    }

    pub fn table_name(&self, entry: &CacheEntry) -> String {
        self.names.table_name(&entry.table_hash_hex())
    }

    fn selects(&self, entry: &CacheEntry, table: &str) -> bool {
        if entry.is_cached() && !self.config.include_cached {
            return false;
        }
        match &self.config.table_filter {
            Some(filter) => table.eq_ignore_ascii_case(filter),
            None => true,
        }
    }

    /// Decode one entry. Failures are recorded in the outcome rather than
    /// returned, so one bad record never stops a run.
    pub fn decode_entry(&self, entry: &CacheEntry) -> DecodedHotfix {
        let table = self.table_name(entry);
        self.decode_named(entry, table)
    }

    fn decode_named(&self, entry: &CacheEntry, table: String) -> DecodedHotfix {
        match entry.status {
            RecordStatus::Valid => {}
            RecordStatus::Unknown(v) => {
                debug!("{table} record {}: unknown status {v}", entry.record_id);
                return DecodedHotfix::new(entry, table, Outcome::UnknownStatus);
            }
            _ => return DecodedHotfix::new(entry, table, Outcome::NoPayload),
        }
        if entry.data.is_empty() {
            return DecodedHotfix::new(entry, table, Outcome::Empty);
        }

        let catalogue = match self.catalogue(&table) {
            Ok(c) => c,
            Err(e @ HotfixError::SchemaParse { .. }) => {
                warn!("{table} record {}: {e}", entry.record_id);
                return DecodedHotfix::new(entry, table, Outcome::SchemaInvalid(e.to_string()));
            }
            Err(e) => {
                debug!("{table} record {}: {e}", entry.record_id);
                return DecodedHotfix::new(entry, table, Outcome::SchemaUnavailable(e.to_string()));
            }
        };
        let resolution =
            match resolve(&catalogue, &table, &self.config.build, self.layouts.as_ref()) {
                Ok(r) => r,
                Err(e) => {
                    debug!("{table} record {}: {e}", entry.record_id);
                    return DecodedHotfix::new(
                        entry,
                        table,
                        Outcome::LayoutUnresolved(e.to_string()),
                    );
                }
            };

        match decode_record(&resolution.entries, &catalogue, &entry.data) {
            Ok(decoded) => {
                if decoded.trailing > 0 {
                    debug!(
                        "{table} record {}: {} trailing bytes",
                        entry.record_id, decoded.trailing
                    );
                }
                let mut out = DecodedHotfix::new(
                    entry,
                    table,
                    Outcome::Decoded {
                        resolved_by: resolution.by,
                        trailing: decoded.trailing,
                    },
                );
                out.fields = Some(decoded.fields);
                out
            }
            Err(e) => {
                warn!("{table} record {}: {e}", entry.record_id);
                DecodedHotfix::new(entry, table, Outcome::DecodeFailed(e.to_string()))
            }
        }
    }

    /// Decode every selected entry of `file`, preserving file order.
    pub fn decode_file(&self, file: &CacheFile) -> HotfixReport {
        let selected: Vec<(&CacheEntry, String)> = file
            .entries
            .iter()
            .filter_map(|e| {
                let table = self.table_name(e);
                self.selects(e, &table).then_some((e, table))
            })
            .collect();
        debug!(
            "{} of {} entries selected",
            selected.len(),
            file.entries.len()
        );

        let run = || -> Vec<DecodedHotfix> {
            selected
                .par_iter()
                .map(|(entry, table)| self.decode_named(entry, table.clone()))
                .collect()
        };
        let hotfixes = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        let report = HotfixReport::new(&file.header, self.config.build, hotfixes);
        info!(
            "{} decoded, {} skipped",
            report.summary.decoded,
            report.summary.skipped_total()
        );
        report
    }

    /// Read, parse and decode the cache file at `path`.
    pub fn read_path(&self, path: &Path) -> Result<HotfixReport> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                HotfixError::NotFound(format!("cache file {}: {e}", path.display()))
            }
            _ => HotfixError::Io(e),
        })?;
        let file = CacheFile::parse(&bytes)?;
        Ok(self.decode_file(&file))
    }
}
