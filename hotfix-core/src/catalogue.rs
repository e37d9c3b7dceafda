use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::debug;

use crate::error::{HotfixError, Result};
use crate::schema::{TableCatalogue, parse_catalogue};
use crate::source::SchemaSource;

type Slot = Arc<Mutex<Option<Arc<TableCatalogue>>>>;

/// Parsed catalogues keyed by table name, shared across decode workers.
///
/// Each table has its own slot lock: a second caller asking for a table
/// that is being built waits for that build and reuses it. Once a slot is
/// filled it never changes. Failed builds leave the slot empty so a later
/// caller may try again.
#[derive(Debug, Default)]
pub struct CatalogueCache {
    slots: DashMap<String, Slot>,
    builds: AtomicUsize,
}

impl CatalogueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &self,
        table: &str,
        build: impl FnOnce() -> Result<TableCatalogue>,
    ) -> Result<Arc<TableCatalogue>> {
        let slot = Arc::clone(self.slots.entry(table.to_string()).or_default().value());
        let mut guard = slot.lock().map_err(|_| HotfixError::LockPoisoned)?;
        if let Some(cat) = guard.as_ref() {
            return Ok(Arc::clone(cat));
        }
        let cat = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        debug!(
            "catalogue built for {table}: {} columns, {} layouts",
            cat.columns.len(),
            cat.layouts.len()
        );
        *guard = Some(Arc::clone(&cat));
        Ok(cat)
    }

    /// Fetch and parse the schema of `table` on first use.
    pub fn load(&self, table: &str, source: &dyn SchemaSource) -> Result<Arc<TableCatalogue>> {
        self.get_or_build(table, || parse_catalogue(&source.schema_text(table)?))
    }

    pub fn get(&self, table: &str) -> Option<Arc<TableCatalogue>> {
        let slot = Arc::clone(self.slots.get(table)?.value());
        let guard = slot.lock().ok()?;
        guard.clone()
    }

    /// Number of successful builds so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}
