//! Required/optional column policy, checked once when a table is ingested.

use crate::error::{ReconError, Stage};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Absence fails the run.
    Required,
    /// Absence is synthesized as an empty-string column.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Field name in the typed record.
    pub field: &'static str,
    /// Header expected in the input table.
    pub column: String,
    pub requirement: Requirement,
}

impl ColumnSpec {
    pub fn new(field: &'static str, column: &str, requirement: Requirement) -> Self {
        Self { field, column: column.to_string(), requirement }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSlot {
    Present(usize),
    Synthesized,
}

/// Column positions for one table, in the order of the specs they came from.
#[derive(Debug, Clone)]
pub struct ResolvedColumns {
    slots: Vec<(&'static str, ColumnSlot)>,
    synthesized: Vec<String>,
}

impl ResolvedColumns {
    /// Resolve every spec against the table header.
    pub fn resolve(table: &Table, specs: &[ColumnSpec], stage: Stage) -> Result<Self, ReconError> {
        let mut slots = Vec::with_capacity(specs.len());
        let mut synthesized = Vec::new();

        for spec in specs {
            match (table.column_index(&spec.column), spec.requirement) {
                (Some(idx), _) => slots.push((spec.field, ColumnSlot::Present(idx))),
                (None, Requirement::Required) => {
                    return Err(ReconError::MissingColumn {
                        stage,
                        table: table.kind,
                        column: spec.column.clone(),
                    });
                }
                (None, Requirement::Optional) => {
                    log::warn!(
                        "{}: column '{}' not found, using empty values",
                        table.kind,
                        spec.column
                    );
                    slots.push((spec.field, ColumnSlot::Synthesized));
                    synthesized.push(spec.column.clone());
                }
            }
        }

        Ok(Self { slots, synthesized })
    }

    pub fn slot(&self, field: &str) -> ColumnSlot {
        self.slots
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, s)| *s)
            .unwrap_or(ColumnSlot::Synthesized)
    }

    /// Raw cell for `field` in `row`; `None` for null cells and synthesized columns.
    pub fn get<'t>(&self, table: &'t Table, row: usize, field: &str) -> Option<&'t str> {
        match self.slot(field) {
            ColumnSlot::Present(col) => table.cell(row, col),
            ColumnSlot::Synthesized => None,
        }
    }

    /// Cell for `field` with null and synthesized values read as `""`.
    pub fn text(&self, table: &Table, row: usize, field: &str) -> String {
        self.get(table, row, field).unwrap_or("").to_string()
    }

    /// Header names that were absent and filled with empty strings.
    pub fn synthesized(&self) -> &[String] {
        &self.synthesized
    }
}
