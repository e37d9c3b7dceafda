//! Parser for table schema text.
//!
//! The text is a series of blank-line separated sections:
//!
//! ```text
//! COLUMNS
//! int ID
//! int<Map::ID> MapID
//! locstring Name_lang // display name
//! float Scale?
//!
//! LAYOUT 0E84A21C, 1F2E3D4C
//! BUILD 9.0.1.33978-9.0.1.36000
//! BUILD 9.0.2.37176, 9.0.2.37474
//! COMMENT optional free text
//! $noninline,id$ID<32>
//! MapID<u16>
//! Name_lang
//! Scale<32>[3]
//! ```
//!
//! Inside a layout section every line is classified before it is consumed.
//! Build lines are only accepted directly after the header; field lines
//! follow until the section ends. The first line that fits neither ends
//! the section.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{Column, ColumnType, FieldEntry, FieldLayoutDefinition, Foreign, TableCatalogue};
use crate::error::{HotfixError, Result};
use crate::version::BuildSpec;

static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)(?:<(\w+)::(\w+)>)?\s+(\w+)(\?)?(.*)$").expect("valid column regex")
});
static LAYOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^LAYOUT\s+(.+)$").expect("valid layout regex"));
static BUILD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BUILD\s+(.+?)\s*$").expect("valid build regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^COMMENT\b\s*(.*)$").expect("valid comment regex"));
static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\$([^$]*)\$)?([A-Za-z_]\w*)(?:<(u?)(\d+)>)?(?:\[(\d+)\])?(.*)$")
        .expect("valid field regex")
});

/// A line with its 1-based number in the source text.
type Line<'a> = (usize, &'a str);

#[derive(Debug)]
enum LayoutLine {
    Builds(Vec<BuildSpec>),
    Comment(String),
    Field(FieldEntry),
    Unrecognized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Builds,
    Fields,
}

/// Parse the full schema text of one table.
pub fn parse_catalogue(text: &str) -> Result<TableCatalogue> {
    let mut columns = None;
    let mut layouts = Vec::new();

    for section in split_sections(text) {
        let (first_no, first) = section[0];
        if first == "COLUMNS" {
            columns = Some(parse_columns(&section[1..])?);
        } else if let Some(caps) = LAYOUT_RE.captures(first) {
            let hashes = caps[1]
                .split(',')
                .map(|h| h.trim().to_ascii_uppercase())
                .filter(|h| !h.is_empty())
                .collect();
            layouts.push(parse_layout(hashes, &section[1..])?);
        } else if first == "LAYOUT" {
            layouts.push(parse_layout(Vec::new(), &section[1..])?);
        } else if BUILD_RE.is_match(first) {
            // Older definitions list builds with no layout hash header.
            layouts.push(parse_layout(Vec::new(), &section)?);
        } else {
            debug!("ignoring schema section starting on line {first_no}: {first:?}");
        }
    }

    let columns = columns.ok_or_else(|| HotfixError::SchemaParse {
        line: 1,
        reason: "missing COLUMNS section".to_string(),
    })?;
    Ok(TableCatalogue { columns, layouts })
}

fn split_sections(text: &str) -> Vec<Vec<Line<'_>>> {
    let mut sections = Vec::new();
    let mut current = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
        } else {
            current.push((i + 1, line));
        }
    }
    if !current.is_empty() {
        sections.push(current);
    }
    sections
}

fn trailing_comment(rest: &str) -> Option<String> {
    rest.trim()
        .strip_prefix("//")
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

fn parse_columns(lines: &[Line<'_>]) -> Result<Vec<Column>> {
    let mut columns: Vec<Column> = Vec::with_capacity(lines.len());
    for &(no, line) in lines {
        let caps = COLUMN_RE.captures(line).ok_or_else(|| HotfixError::SchemaParse {
            line: no,
            reason: format!("unparseable column definition {line:?}"),
        })?;
        let name = caps[4].to_string();
        if columns.iter().any(|c| c.name == name) {
            return Err(HotfixError::SchemaParse {
                line: no,
                reason: format!("duplicate column `{name}`"),
            });
        }
        let foreign = match (caps.get(2), caps.get(3)) {
            (Some(t), Some(c)) => Some(Foreign {
                table: t.as_str().to_string(),
                column: c.as_str().to_string(),
            }),
            _ => None,
        };
        columns.push(Column {
            ty: ColumnType::from_token(&caps[1]),
            name,
            name_confirmed: caps.get(5).is_none(),
            foreign,
            comment: trailing_comment(&caps[6]),
        });
    }
    Ok(columns)
}

fn classify(no: usize, line: &str) -> Result<LayoutLine> {
    if let Some(caps) = BUILD_RE.captures(line) {
        let builds = caps[1]
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(BuildSpec::parse)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| HotfixError::SchemaParse {
                line: no,
                reason: e.to_string(),
            })?;
        return Ok(LayoutLine::Builds(builds));
    }
    if let Some(caps) = COMMENT_RE.captures(line) {
        return Ok(LayoutLine::Comment(caps[1].trim().to_string()));
    }
    let Some(caps) = FIELD_RE.captures(line) else {
        return Ok(LayoutLine::Unrecognized);
    };

    let rest = caps[6].trim();
    let has_width = caps.get(4).is_some();
    // Without an explicit width only a trailing comment may follow the name.
    if !rest.is_empty() && !rest.starts_with("//") && !has_width {
        return Ok(LayoutLine::Unrecognized);
    }
    let number = |idx: usize| -> Result<u32> {
        caps.get(idx).map_or(Ok(0), |m| {
            m.as_str().parse().map_err(|_| HotfixError::SchemaParse {
                line: no,
                reason: format!("number out of range in {line:?}"),
            })
        })
    };
    Ok(LayoutLine::Field(FieldEntry {
        column: caps[2].to_string(),
        bit_width: number(4)?,
        unsigned: caps.get(3).is_some_and(|m| m.as_str() == "u"),
        array_size: number(5)?,
        annotation: caps.get(1).map_or_else(String::new, |m| m.as_str().to_string()),
        comment: trailing_comment(rest).unwrap_or_default(),
    }))
}

fn parse_layout(layout_hashes: Vec<String>, lines: &[Line<'_>]) -> Result<FieldLayoutDefinition> {
    let mut def = FieldLayoutDefinition {
        layout_hashes,
        ..Default::default()
    };
    let mut phase = Phase::Builds;

    for &(no, line) in lines {
        match (phase, classify(no, line)?) {
            (Phase::Builds, LayoutLine::Builds(builds)) => def.builds.extend(builds),
            (_, LayoutLine::Comment(c)) => def.comments.push(c),
            (_, LayoutLine::Field(entry)) => {
                phase = Phase::Fields;
                def.entries.push(entry);
            }
            (Phase::Fields, LayoutLine::Builds(_)) | (_, LayoutLine::Unrecognized) => {
                debug!("layout section ends early at line {no}: {line:?}");
                break;
            }
        }
    }
    Ok(def)
}
