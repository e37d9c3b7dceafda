//! Turns a hotfix blob into named, typed fields using a resolved layout.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::error::{HotfixError, Result};
use crate::schema::{ColumnType, FieldEntry, TableCatalogue};
use crate::util::cursor::ByteCursor;

/// Float fields declared without a width are single precision.
const DEFAULT_FLOAT_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Integer {
    Signed(i64),
    Unsigned(u64),
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed(v) => fmt::Display::fmt(v, f),
            Self::Unsigned(v) => fmt::Display::fmt(v, f),
        }
    }
}

/// One decoded value. `List` elements are always scalars.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Integer(Integer),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => fmt::Display::fmt(i, f),
            Self::Float(v) => fmt::Display::fmt(v, f),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Integer(Integer::Signed(v)) => s.serialize_i64(*v),
            Self::Integer(Integer::Unsigned(v)) => s.serialize_u64(*v),
            Self::Float(v) => s.serialize_f64(*v),
            Self::Text(v) => s.serialize_str(v),
            Self::List(items) => items.serialize(s),
        }
    }
}

/// Decoded fields in layout order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub fields: Fields,
    /// Bytes left in the blob after the last field.
    pub trailing: usize,
}

/// Decode `blob` field by field.
///
/// Entries annotated `noninline` and entries whose column is missing from
/// the catalogue consume nothing and produce nothing.
pub fn decode_record(
    entries: &[&FieldEntry],
    catalogue: &TableCatalogue,
    blob: &[u8],
) -> Result<Decoded> {
    let mut cur = ByteCursor::new(blob);
    let mut fields = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.is_noninline() {
            continue;
        }
        let Some(column) = catalogue.column(&entry.column) else {
            debug!("layout references unknown column `{}`, skipping", entry.column);
            continue;
        };

        let value = if entry.array_size == 0 {
            read_value(&mut cur, entry, &column.ty)?
        } else {
            let items = (0..entry.array_size)
                .map(|_| read_value(&mut cur, entry, &column.ty))
                .collect::<Result<Vec<_>>>()?;
            FieldValue::List(items)
        };
        fields.push((entry.column.clone(), value));
    }

    Ok(Decoded {
        fields: Fields(fields),
        trailing: cur.remaining(),
    })
}

fn read_value(cur: &mut ByteCursor<'_>, entry: &FieldEntry, ty: &ColumnType) -> Result<FieldValue> {
    let width = (entry.bit_width / 8) as usize;
    let unsupported_width = |kind| HotfixError::UnsupportedWidth {
        column: entry.column.clone(),
        kind,
        width,
    };
    match ty {
        ColumnType::String | ColumnType::Locstring => Ok(FieldValue::Text(cur.read_cstr()?)),
        ColumnType::Integer | ColumnType::U8 | ColumnType::U16 => {
            if !(1..=8).contains(&width) {
                return Err(unsupported_width("integer"));
            }
            let raw = cur.read_uint(width, !entry.unsigned)?;
            Ok(FieldValue::Integer(if entry.unsigned {
                Integer::Unsigned(raw)
            } else {
                Integer::Signed(raw as i64)
            }))
        }
        ColumnType::Float => {
            let width = if entry.bit_width == 0 {
                DEFAULT_FLOAT_WIDTH
            } else {
                width
            };
            cur.read_float(width)?
                .map(FieldValue::Float)
                .ok_or_else(|| HotfixError::UnsupportedWidth {
                    column: entry.column.clone(),
                    kind: "float",
                    width,
                })
        }
        ColumnType::Unsupported(ty) => Err(HotfixError::UnsupportedColumnType {
            column: entry.column.clone(),
            ty: ty.clone(),
        }),
    }
}
