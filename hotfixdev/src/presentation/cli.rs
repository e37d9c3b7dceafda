use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "hotfixdev: read client hotfix caches", long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). HOTFIX_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the current build and the cache file come from.
#[derive(Args, Clone, Debug)]
pub struct BuildArgs {
    /// Build to resolve layouts for (a.b.c.d)
    #[arg(long)]
    pub build: Option<String>,

    /// Client install root; supplies the build and the cache path
    #[arg(long = "game-path")]
    pub game_path: Option<PathBuf>,

    /// Client flavor under the install root
    #[arg(long, default_value = "live")]
    pub flavor: String,
}

#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// Definitions checkout (definitions/*.dbd and manifest.json)
    #[arg(long)]
    pub dbdefs: PathBuf,

    /// Exported tables (<root>/<build>/dbfilesclient/<table>.db2)
    #[arg(long = "db2-root")]
    pub db2_root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode and print the hotfixes in a cache file
    List {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        build: BuildArgs,

        /// Cache file; defaults to the install's DBCache.bin
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Worker threads (defaults to one per core)
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Only this table (case-insensitive)
        #[arg(long)]
        table: Option<String>,

        /// Also list entries the client cached itself
        #[arg(long)]
        include_cached: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a cache file's header and entry count
    Header {
        cache: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Parse a table's definitions and print its columns and layouts
    Schema {
        table: String,

        #[arg(long)]
        dbdefs: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Show the layout a table resolves to at a build
    Resolve {
        table: String,

        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        build: BuildArgs,
    },
}
