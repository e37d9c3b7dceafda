//! `.build.info`: the client's record of installed products and versions.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{HotfixError, Result};
use crate::version::Build;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Flavor {
    Live,
    Beta,
    Ptr,
    Xptr,
}

impl Flavor {
    /// Directory of this flavor under the install root.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Live => "_retail_",
            Self::Beta => "_beta_",
            Self::Ptr => "_ptr_",
            Self::Xptr => "_xptr_",
        }
    }

    /// Product code listed in `.build.info`.
    pub const fn product(self) -> &'static str {
        match self {
            Self::Live => "wow",
            Self::Beta => "wow_beta",
            Self::Ptr => "wowt",
            Self::Xptr => "wowxptr",
        }
    }
}

impl FromStr for Flavor {
    type Err = HotfixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().trim_matches('_') {
            "live" | "retail" | "wow" => Ok(Self::Live),
            "beta" | "wow_beta" => Ok(Self::Beta),
            "ptr" | "wowt" => Ok(Self::Ptr),
            "xptr" | "wowxptr" => Ok(Self::Xptr),
            other => Err(HotfixError::BuildInfo(format!("unknown flavor {other:?}"))),
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Rows of `.build.info`, each keyed by column name with spaces removed
/// (`Build Key!HEX:16` becomes `BuildKey`).
#[derive(Clone, Debug, Default)]
pub struct BuildInfo {
    pub rows: Vec<BTreeMap<String, String>>,
}

impl BuildInfo {
    pub fn parse(text: &str) -> Result<Self> {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        for line in text.lines() {
            let cells: Vec<&str> = line.split('|').collect();
            if cells.len() < 2 {
                continue;
            }
            if columns.is_empty() {
                columns = cells
                    .iter()
                    .map(|c| {
                        c.split('!')
                            .next()
                            .unwrap_or_default()
                            .replace(' ', "")
                    })
                    .collect();
                continue;
            }
            if cells.len() != columns.len() {
                return Err(HotfixError::BuildInfo(format!(
                    "row has {} cells, header has {}",
                    cells.len(),
                    columns.len()
                )));
            }
            rows.push(
                columns
                    .iter()
                    .cloned()
                    .zip(cells.iter().map(|c| c.to_string()))
                    .collect(),
            );
        }
        Ok(Self { rows })
    }

    /// Version string of `product`; later rows win.
    pub fn version_of(&self, product: &str) -> Option<&str> {
        self.rows
            .iter()
            .rev()
            .find(|r| r.get("Product").is_some_and(|p| p == product))
            .and_then(|r| r.get("Version"))
            .map(String::as_str)
    }

    pub fn build_for(&self, flavor: Flavor) -> Result<Build> {
        let version = self.version_of(flavor.product()).ok_or_else(|| {
            HotfixError::BuildInfo(format!("no version listed for product {}", flavor.product()))
        })?;
        version.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD_INFO: &str = "Branch!STRING:0|Active!DEC:1|Build Key!HEX:16|Version!STRING:0|Product!STRING:0
us|1|aaaa|11.0.2.56421|wow
us|1|bbbb|11.0.5.57212|wowt
us|1|cccc|11.1.0.57689|wow_beta
";

    #[test]
    fn parses_rows_and_columns() {
        let info = BuildInfo::parse(BUILD_INFO).unwrap();
        assert_eq!(info.rows.len(), 3);
        assert_eq!(info.rows[0]["BuildKey"], "aaaa");
        assert_eq!(info.version_of("wowt"), Some("11.0.5.57212"));
    }

    #[test]
    fn resolves_flavor_build() {
        let info = BuildInfo::parse(BUILD_INFO).unwrap();
        assert_eq!(info.build_for(Flavor::Live).unwrap(), Build::new(11, 0, 2, 56421));
        assert_eq!(info.build_for(Flavor::Beta).unwrap(), Build::new(11, 1, 0, 57689));
        assert!(matches!(
            info.build_for(Flavor::Xptr),
            Err(HotfixError::BuildInfo(_))
        ));
    }

    #[test]
    fn ragged_row_is_an_error() {
        assert!(BuildInfo::parse("A!x|B!y\n1|2|3\n").is_err());
    }

    #[test]
    fn flavor_names() {
        assert_eq!("ptr".parse::<Flavor>().unwrap(), Flavor::Ptr);
        assert_eq!("_retail_".parse::<Flavor>().unwrap(), Flavor::Live);
        assert_eq!(Flavor::Xptr.product(), "wowxptr");
        assert!("classic".parse::<Flavor>().is_err());
    }
}
