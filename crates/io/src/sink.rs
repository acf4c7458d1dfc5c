// Result sinks: finalized rows to CSV or JSON files

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use stockback_recon::model::MergedRow;
use stockback_recon::{ReconError, ResultSink};

/// Writes a header row plus one record per row. Dates are ISO-8601.
#[derive(Debug, Clone)]
pub struct CsvResultSink {
    path: PathBuf,
}

impl CsvResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for CsvResultSink {
    fn save(&mut self, rows: &[MergedRow]) -> Result<usize, ReconError> {
        write_csv(&self.path, rows).map_err(ReconError::Sink)?;
        Ok(rows.len())
    }
}

fn write_csv(path: &Path, rows: &[MergedRow]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| format!("cannot create {}: {e}", path.display()))?;
    writer.write_record(MergedRow::FIELDS).map_err(|e| e.to_string())?;
    for row in rows {
        writer.write_record(row.to_record()).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

/// Writes the rows as a pretty-printed JSON array of objects.
#[derive(Debug, Clone)]
pub struct JsonResultSink {
    path: PathBuf,
}

impl JsonResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for JsonResultSink {
    fn save(&mut self, rows: &[MergedRow]) -> Result<usize, ReconError> {
        let file = File::create(&self.path)
            .map_err(|e| ReconError::Sink(format!("cannot create {}: {e}", self.path.display())))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, rows).map_err(|e| ReconError::Sink(e.to_string()))?;
        Ok(rows.len())
    }
}
