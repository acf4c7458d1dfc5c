use crate::error::ReconError;
use crate::model::MergedRow;

/// Receives the finalized rows of a run.
pub trait ResultSink {
    /// Persist `rows` in order; returns the number of rows written.
    fn save(&mut self, rows: &[MergedRow]) -> Result<usize, ReconError>;
}

/// Keeps rows in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<MergedRow>,
}

impl ResultSink for MemorySink {
    fn save(&mut self, rows: &[MergedRow]) -> Result<usize, ReconError> {
        self.rows.extend_from_slice(rows);
        Ok(rows.len())
    }
}
