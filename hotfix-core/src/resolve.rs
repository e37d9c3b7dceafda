//! Picks the field layout that applies to a table at a given build.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{HotfixError, Result};
use crate::schema::{FieldEntry, TableCatalogue};
use crate::source::LayoutHashSource;
use crate::version::Build;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ResolvedBy {
    Build,
    LayoutHash(String),
}

#[derive(Clone, Debug)]
pub struct Resolution<'a> {
    pub by: ResolvedBy,
    pub entries: Vec<&'a FieldEntry>,
}

/// Resolve the layout entries for `table` at `build`.
///
/// Definitions listing the build win. Build lists are sparse, so when none
/// does, the layout hash of the shipped table is matched against the
/// definitions' hash lists instead.
pub fn resolve<'a>(
    catalogue: &'a TableCatalogue,
    table: &str,
    build: &Build,
    layouts: &dyn LayoutHashSource,
) -> Result<Resolution<'a>> {
    let entries = catalogue.entries_for_build(build);
    if !entries.is_empty() {
        return Ok(Resolution {
            by: ResolvedBy::Build,
            entries,
        });
    }

    debug!("{table}: no layout lists build {build}, trying layout hash");
    let Some(hash) = layouts.layout_hash(table, build) else {
        warn!("{table}: no layout hash available for build {build}");
        return Err(HotfixError::LayoutUnresolved {
            table: table.to_string(),
            build: build.to_string(),
            layout_hash: None,
        });
    };

    let entries = catalogue.entries_for_layout_hash(&hash);
    if entries.is_empty() {
        return Err(HotfixError::LayoutUnresolved {
            table: table.to_string(),
            build: build.to_string(),
            layout_hash: Some(hash),
        });
    }
    Ok(Resolution {
        by: ResolvedBy::LayoutHash(hash),
        entries,
    })
}
