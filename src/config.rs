use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::lines::LineCatalog;

/// Line catalog override, stored as a JSON object on disk:
/// ```json
/// {
///   "lines": ["1", "2", "GS", "SI"],
///   "aliases": { "SIR": "SI", "S": "GS" }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub lines: Vec<String>,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl CatalogFile {
    /// Loads the catalog file from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read line catalog {}", path.display()))?;
        let file: CatalogFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse line catalog {}", path.display()))?;
        Ok(file)
    }

    pub fn into_catalog(self) -> Result<LineCatalog> {
        if self.lines.is_empty() {
            anyhow::bail!("line catalog must list at least one line");
        }
        Ok(LineCatalog::new(self.lines, self.aliases)?)
    }
}

/// Returns the catalog at `path`, or the built-in subway lines when unset.
pub fn load_catalog(path: Option<&Path>) -> Result<LineCatalog> {
    match path {
        Some(path) => CatalogFile::load(path)?.into_catalog(),
        None => Ok(LineCatalog::default()),
    }
}
