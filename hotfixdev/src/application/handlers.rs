use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hotfix_core::error::{HotfixError, Result};
use hotfix_core::source::NoLayoutHashes;
use hotfix_core::{
    Build, CacheFile, Db2ExportLayoutSource, DecodedHotfix, DirSchemaSource, Flavor, GameInstall,
    HotfixReader, LayoutHashSource, ReaderConfig, TableCatalogue, load_manifest,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::presentation::cli::{BuildArgs, SourceArgs};

const MANIFEST_FILE: &str = "manifest.json";

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

fn manifest_path(dbdefs: &Path) -> PathBuf {
    dbdefs.join(MANIFEST_FILE)
}

fn install_from_args(args: &BuildArgs) -> Result<Option<GameInstall>> {
    match &args.game_path {
        Some(root) => {
            let flavor: Flavor = args.flavor.parse()?;
            Ok(Some(GameInstall::new(root.clone(), flavor)))
        }
        None => Ok(None),
    }
}

/// `--build` wins; otherwise the install's `.build.info` decides.
fn build_from_args(args: &BuildArgs, install: Option<&GameInstall>) -> Result<Build> {
    if let Some(b) = &args.build {
        return b.parse();
    }
    match install {
        Some(install) => {
            let build = install.current_build()?;
            info!("build {build} from {}", install.root.display());
            Ok(build)
        }
        None => Err(HotfixError::NotFound(
            "build: pass --build or --game-path".into(),
        )),
    }
}

fn cache_from_args(cache: Option<PathBuf>, install: Option<&GameInstall>) -> Result<PathBuf> {
    cache
        .or_else(|| install.map(GameInstall::cache_path))
        .ok_or_else(|| HotfixError::NotFound("cache file: pass --cache or --game-path".into()))
}

fn reader_from_args(sources: &SourceArgs, config: ReaderConfig) -> Result<HotfixReader> {
    let schemas = DirSchemaSource::open(&sources.dbdefs)?;
    let names = load_manifest(&manifest_path(&sources.dbdefs))?;
    debug!("{} definitions, {} manifest rows", schemas.len(), names.len());
    let layouts: Arc<dyn LayoutHashSource> = match &sources.db2_root {
        Some(root) => Arc::new(Db2ExportLayoutSource::new(root)),
        None => Arc::new(NoLayoutHashes),
    };
    HotfixReader::new(config, Arc::new(schemas), Arc::new(names), layouts)
}

fn print_hotfix(out: &mut impl Write, h: &DecodedHotfix) -> std::io::Result<()> {
    writeln!(
        out,
        "push {:>8} {:<4} {} ({}) record {} {}",
        h.push_id, h.region, h.table_name, h.table_hash, h.record_id, h.status
    )?;
    match &h.fields {
        Some(fields) => {
            for (name, value) in fields.iter() {
                writeln!(out, "    {name} = {value}")?;
            }
        }
        None => writeln!(out, "    [{}] {} bytes", h.outcome.kind(), h.data_size)?,
    }
    Ok(())
}

pub fn handle_list(
    sources: SourceArgs,
    build: BuildArgs,
    cache: Option<PathBuf>,
    jobs: Option<usize>,
    table: Option<String>,
    include_cached: bool,
    json: bool,
) -> Result<()> {
    let install = install_from_args(&build)?;
    let current = build_from_args(&build, install.as_ref())?;
    let cache = cache_from_args(cache, install.as_ref())?;

    let mut config = ReaderConfig::new(current);
    config.jobs = jobs;
    config.table_filter = table;
    config.include_cached = include_cached;

    let reader = reader_from_args(&sources, config)?;
    let report = reader.read_path(&cache)?;

    if json {
        return print_json(&report);
    }
    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "{} v{} client build {}, layouts for {}",
        report.magic, report.version, report.build_id, report.build
    )?;
    for h in &report.hotfixes {
        print_hotfix(&mut out, h)?;
    }
    writeln!(out, "{}", report.summary)?;
    Ok(())
}

#[derive(Serialize)]
struct HeaderView {
    magic: String,
    version: u32,
    build_id: u32,
    verification_hash: String,
    entries: usize,
    cached: usize,
}

pub fn handle_header(cache: PathBuf, json: bool) -> Result<()> {
    let bytes = std::fs::read(&cache)?;
    let file = CacheFile::parse(&bytes)?;
    let view = HeaderView {
        magic: hotfix_core::container::magic_ascii(file.header.magic),
        version: file.header.version,
        build_id: file.header.build_id,
        verification_hash: hex::encode_upper(file.header.verification_hash),
        entries: file.entries.len(),
        cached: file.entries.iter().filter(|e| e.is_cached()).count(),
    };
    if json {
        return print_json(&view);
    }
    println!("magic:             {}", view.magic);
    println!("version:           {}", view.version);
    println!("build:             {}", view.build_id);
    println!("verification hash: {}", view.verification_hash);
    println!("entries:           {} ({} cached)", view.entries, view.cached);
    Ok(())
}

fn print_catalogue(out: &mut impl Write, table: &str, cat: &TableCatalogue) -> std::io::Result<()> {
    writeln!(out, "{table}: {} columns, {} layouts", cat.columns.len(), cat.layouts.len())?;
    for c in &cat.columns {
        let foreign = c
            .foreign
            .as_ref()
            .map(|f| format!("<{}::{}>", f.table, f.column))
            .unwrap_or_default();
        let unconfirmed = if c.name_confirmed { "" } else { "?" };
        writeln!(out, "  {:?}{foreign} {}{unconfirmed}", c.ty, c.name)?;
    }
    for (i, layout) in cat.layouts.iter().enumerate() {
        let builds: Vec<String> = layout.builds.iter().map(ToString::to_string).collect();
        writeln!(
            out,
            "layout #{i} hashes [{}] builds [{}]",
            layout.layout_hashes.join(", "),
            builds.join(", ")
        )?;
        for e in &layout.entries {
            writeln!(out, "    {}", describe_entry(e))?;
        }
    }
    Ok(())
}

fn describe_entry(e: &hotfix_core::schema::FieldEntry) -> String {
    let mut s = String::new();
    if !e.annotation.is_empty() {
        s.push_str(&format!("${}$", e.annotation));
    }
    s.push_str(&e.column);
    if e.bit_width > 0 {
        let u = if e.unsigned { "u" } else { "" };
        s.push_str(&format!("<{u}{}>", e.bit_width));
    }
    if e.array_size > 0 {
        s.push_str(&format!("[{}]", e.array_size));
    }
    s
}

pub fn handle_schema(table: String, dbdefs: PathBuf, json: bool) -> Result<()> {
    let source = DirSchemaSource::open(&dbdefs)?;
    let text = hotfix_core::SchemaSource::schema_text(&source, &table)?;
    let catalogue = hotfix_core::parse_catalogue(&text)?;
    if json {
        return print_json(&catalogue);
    }
    print_catalogue(&mut std::io::stdout().lock(), &table, &catalogue)?;
    Ok(())
}

pub fn handle_resolve(table: String, sources: SourceArgs, build: BuildArgs) -> Result<()> {
    let install = install_from_args(&build)?;
    let current = build_from_args(&build, install.as_ref())?;
    let reader = reader_from_args(&sources, ReaderConfig::new(current))?;
    let (by, entries) = reader.layout_for(&table)?;

    let mut out = std::io::stdout().lock();
    writeln!(out, "{table} at {current}: resolved by {by:?}")?;
    for e in &entries {
        writeln!(out, "    {}", describe_entry(e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(build: Option<&str>, game: Option<&Path>, flavor: &str) -> BuildArgs {
        BuildArgs {
            build: build.map(String::from),
            game_path: game.map(Path::to_path_buf),
            flavor: flavor.to_string(),
        }
    }

    #[test]
    fn explicit_build_wins() {
        let a = args(Some("11.0.2.56421"), None, "live");
        let install = install_from_args(&a).unwrap();
        assert_eq!(
            build_from_args(&a, install.as_ref()).unwrap(),
            Build::new(11, 0, 2, 56421)
        );
    }

    #[test]
    fn install_supplies_build_and_cache() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(".build.info"),
            "Version!STRING:0|Product!STRING:0\n11.0.5.57212|wowt\n",
        )
        .unwrap();
        let a = args(None, Some(tmp.path()), "ptr");
        let install = install_from_args(&a).unwrap();
        assert_eq!(
            build_from_args(&a, install.as_ref()).unwrap(),
            Build::new(11, 0, 5, 57212)
        );
        let cache = cache_from_args(None, install.as_ref()).unwrap();
        assert!(cache.ends_with("_ptr_/Cache/ADB/enUS/DBCache.bin"));
    }

    #[test]
    fn missing_build_and_cache_are_reported() {
        let a = args(None, None, "live");
        assert!(matches!(
            build_from_args(&a, None),
            Err(HotfixError::NotFound(_))
        ));
        assert!(cache_from_args(None, None).is_err());
        assert_eq!(
            cache_from_args(Some("x.bin".into()), None).unwrap(),
            PathBuf::from("x.bin")
        );
    }

    #[test]
    fn entries_render_like_definitions() {
        let cat = hotfix_core::parse_catalogue(
            "COLUMNS\nint ID\nint Flags\n\nLAYOUT 1\nBUILD 1.0.0.1\n$noninline,id$ID<32>\nFlags<u16>[2]\n",
        )
        .unwrap();
        let rendered: Vec<_> = cat.layouts[0].entries.iter().map(describe_entry).collect();
        assert_eq!(rendered, vec!["$noninline,id$ID<32>", "Flags<u16>[2]"]);
    }
}
