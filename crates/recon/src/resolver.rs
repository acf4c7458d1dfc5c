//! Drug name → canonical code / unit lookup built from the stock-value export.

use std::collections::HashMap;

use crate::config::CodeMappingColumns;
use crate::error::{ReconError, Stage};
use crate::model::CodeMappingEntry;
use crate::schema::ResolvedColumns;
use crate::table::Table;

/// Result of resolving one drug name. Absence is `None`, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub code: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CodeMapping {
    entries: HashMap<String, Resolution>,
    /// Source rows that replaced an earlier entry for the same drug name.
    duplicates: usize,
}

impl CodeMapping {
    /// Build from entries in source order; the last entry for a name wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CodeMappingEntry>,
    {
        let mut mapping = Self::default();
        for entry in entries {
            mapping.insert(entry);
        }
        mapping
    }

    /// Build from the code-mapping table.
    ///
    /// An empty table yields an empty mapping; a non-empty table must carry
    /// the drug-name and code columns.
    pub fn build(table: &Table, columns: &CodeMappingColumns) -> Result<Self, ReconError> {
        if table.is_empty() {
            log::warn!("{}: table is empty, every drug resolves to no code", table.kind);
            return Ok(Self::default());
        }

        let cols = ResolvedColumns::resolve(table, &columns.specs(), Stage::Resolve)?;
        let entries = (0..table.row_count()).map(|row| CodeMappingEntry {
            drug_name: cols.text(table, row, "drug_name"),
            code: cols.text(table, row, "code"),
            unit: cols.text(table, row, "unit"),
        });
        let mapping = Self::from_entries(entries);

        log::debug!(
            "{}: {} drug names mapped ({} duplicate rows overridden)",
            table.kind,
            mapping.len(),
            mapping.duplicates
        );
        Ok(mapping)
    }

    fn insert(&mut self, entry: CodeMappingEntry) {
        let key = entry.drug_name.trim();
        if key.is_empty() {
            return;
        }
        let resolution = Resolution {
            code: non_blank(&entry.code),
            unit: non_blank(&entry.unit),
        };
        if self.entries.insert(key.to_string(), resolution).is_some() {
            self.duplicates += 1;
        }
    }

    /// Look up a drug name (trimmed). Pure and total.
    pub fn resolve(&self, drug_name: &str) -> Resolution {
        self.entries.get(drug_name.trim()).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
