//! Subway line identifiers and the catalog of lines the monitor recognizes.
//!
//! A [`LineId`] can only be obtained through [`LineCatalog::resolve`], so every
//! identifier that reaches the tracker has already been case-normalized,
//! alias-resolved and checked against the catalog.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::InvalidLineError;

/// Lines tracked when no catalog file is configured.
pub const DEFAULT_LINES: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "A", "B", "C", "D", "E", "F", "G", "J", "L", "M", "N", "Q",
    "R", "SI", "W", "Z",
];

/// `(alias, line)` pairs accepted in place of the canonical code.
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[("SIR", "SI")];

/// A validated, uppercase subway line code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LineId(String);

impl LineId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for LineId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// The closed set of known lines plus the aliases that map onto them.
#[derive(Debug, Clone)]
pub struct LineCatalog {
    lines: BTreeSet<LineId>,
    aliases: BTreeMap<String, LineId>,
}

impl LineCatalog {
    /// Builds a catalog from raw codes and `(alias, target)` pairs.
    ///
    /// # Errors
    ///
    /// Fails on an empty code, or on an alias whose target is not one of
    /// `lines`.
    pub fn new<L, A, S, T>(lines: L, aliases: A) -> Result<Self, InvalidLineError>
    where
        L: IntoIterator<Item = S>,
        A: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for raw in lines {
            let code = raw.as_ref().trim().to_uppercase();
            if code.is_empty() {
                return Err(InvalidLineError(raw.as_ref().to_string()));
            }
            set.insert(LineId(code));
        }

        let mut alias_map = BTreeMap::new();
        for (alias, target) in aliases {
            let target_code = target.as_ref().trim().to_uppercase();
            let line = set
                .get(target_code.as_str())
                .cloned()
                .ok_or_else(|| InvalidLineError(target.as_ref().to_string()))?;
            alias_map.insert(alias.as_ref().trim().to_uppercase(), line);
        }

        Ok(Self {
            lines: set,
            aliases: alias_map,
        })
    }

    /// Uppercases `raw`, applies aliases and looks the result up.
    pub fn resolve(&self, raw: &str) -> Result<LineId, InvalidLineError> {
        let code = raw.to_uppercase();
        if let Some(line) = self.aliases.get(&code) {
            return Ok(line.clone());
        }
        self.lines
            .get(code.as_str())
            .cloned()
            .ok_or_else(|| InvalidLineError(raw.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineId> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for LineCatalog {
    fn default() -> Self {
        let lines = DEFAULT_LINES
            .iter()
            .map(|code| LineId(code.to_string()))
            .collect::<BTreeSet<_>>();
        let aliases = DEFAULT_ALIASES
            .iter()
            .map(|(alias, target)| (alias.to_string(), LineId(target.to_string())))
            .collect();
        Self { lines, aliases }
    }
}
