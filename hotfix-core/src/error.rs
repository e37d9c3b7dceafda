use thiserror::Error;

#[derive(Error, Debug)]
pub enum HotfixError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cursor read ran past the end of its buffer.
    #[error("out of data at offset {offset}: wanted {wanted} bytes, {remaining} left")]
    OutOfData {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },

    #[error("malformed container at offset {offset} while reading `{field}`: {reason}")]
    MalformedContainer {
        offset: usize,
        field: &'static str,
        reason: String,
    },

    #[error("schema parse error on line {line}: {reason}")]
    SchemaParse { line: usize, reason: String },

    #[error("invalid build string: {0:?}")]
    InvalidBuild(String),

    #[error("no layout for table {table} at build {build} (layout hash: {})", layout_hash.as_deref().unwrap_or("unavailable"))]
    LayoutUnresolved {
        table: String,
        build: String,
        layout_hash: Option<String>,
    },

    #[error("column `{column}` has unsupported type `{ty}`")]
    UnsupportedColumnType { column: String, ty: String },

    #[error("column `{column}` cannot be read as {kind} with {width} bytes")]
    UnsupportedWidth {
        column: String,
        kind: &'static str,
        width: usize,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("build info error: {0}")]
    BuildInfo(String),

    #[error("a cache lock was poisoned by a panicking thread")]
    LockPoisoned,

    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, HotfixError>;
