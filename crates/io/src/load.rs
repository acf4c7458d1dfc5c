// Table source dispatch by file extension

use std::path::Path;

use stockback_recon::{Table, TableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Delimited,
    Spreadsheet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            "" => Err(format!("{}: missing file extension", path.display())),
            other => Err(format!("{}: unsupported file type '.{other}'", path.display())),
        }
    }
}

/// Load a table from a CSV-like or spreadsheet file.
pub fn load_table(path: &Path, kind: TableKind, skip_rows: usize) -> Result<Table, String> {
    let table = match TableFormat::from_path(path)? {
        TableFormat::Delimited => crate::csv::read_table(path, kind, skip_rows)?,
        TableFormat::Spreadsheet => crate::xlsx::read_table(path, kind, None, skip_rows)?,
    };
    log::info!(
        "{}: loaded {} rows, {} columns from {}",
        kind,
        table.row_count(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a.CSV")).unwrap(), TableFormat::Delimited);
        assert_eq!(TableFormat::from_path(Path::new("a.xlsx")).unwrap(), TableFormat::Spreadsheet);
        assert!(TableFormat::from_path(Path::new("a.pdf")).is_err());
        assert!(TableFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_load_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.csv");
        fs::write(&path, "薬品名,ＹＪコード,単位\nAspirin,YJ001,mg\n").unwrap();
        let table = load_table(&path, TableKind::CodeMapping, 0).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.kind, TableKind::CodeMapping);
    }
}
