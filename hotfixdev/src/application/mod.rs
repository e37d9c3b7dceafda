pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use hotfix_core::error::Result;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("HOTFIX_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::List {
            sources,
            build,
            cache,
            jobs,
            table,
            include_cached,
            json,
        } => handlers::handle_list(sources, build, cache, jobs, table, include_cached, json),
        Commands::Header { cache, json } => handlers::handle_header(cache, json),
        Commands::Schema {
            table,
            dbdefs,
            json,
        } => handlers::handle_schema(table, dbdefs, json),
        Commands::Resolve {
            table,
            sources,
            build,
        } => handlers::handle_resolve(table, sources, build),
    }
}
