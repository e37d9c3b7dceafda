#![forbid(unsafe_code)]

pub mod build_info;
pub mod catalogue;
pub mod container;
pub mod decode;
pub mod error;
pub mod reader;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod source;
pub mod version;

pub mod util {
    pub mod cursor;
}

// Re-exports: stable API surface
pub use build_info::{BuildInfo, Flavor};
pub use catalogue::CatalogueCache;
pub use container::cache_file::{CacheEntry, CacheFile, CacheFileHeader, RecordStatus};
pub use container::table_header::TableHeader;
pub use decode::{FieldValue, Fields, Integer, decode_record};
pub use error::{HotfixError, Result};
pub use reader::{HotfixReader, ReaderConfig};
pub use report::{DecodedHotfix, HotfixReport, Outcome, Region, Summary};
pub use resolve::{ResolvedBy, resolve};
pub use schema::{TableCatalogue, parse_catalogue};
pub use source::fs::{Db2ExportLayoutSource, DirSchemaSource, GameInstall, load_manifest};
pub use source::{LayoutHashSource, SchemaSource, TableNameLookup, TableNames};
pub use version::{Build, BuildRange, BuildSpec};
