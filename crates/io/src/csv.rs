// CSV/TSV table loading

use std::path::Path;

use stockback_recon::table::skip_lines;
use stockback_recon::{Table, TableKind};

/// Read a delimited file into a table, skipping `skip_rows` preamble records.
pub fn read_table(path: &Path, kind: TableKind, skip_rows: usize) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    table_from_str(kind, &content, skip_rows)
        .map_err(|e| format!("{}: {e}", path.display()))
}

/// Parse decoded text; the delimiter is sniffed from the lines after the preamble.
pub fn table_from_str(kind: TableKind, content: &str, skip_rows: usize) -> Result<Table, String> {
    let delimiter = sniff_delimiter(content, skip_rows);
    Table::from_delimited_str(kind, content, delimiter, skip_rows).map_err(|e| e.to_string())
}

const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Pick the delimiter that splits the header line and keeps the same field
/// count on the most sample lines. Comma wins ties and empty input.
fn sniff_delimiter(content: &str, skip_rows: usize) -> u8 {
    let sample: Vec<&str> = skip_lines(content, skip_rows)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    DELIMITERS
        .iter()
        .filter_map(|&d| consistency(&sample, d).map(|score| (d, score)))
        .fold((b',', 0), |best, (d, score)| if score > best.1 { (d, score) } else { best })
        .0
}

/// Width of the first line times the number of lines sharing that width.
fn consistency(sample: &[&str], delimiter: u8) -> Option<usize> {
    let (header, rest) = sample.split_first()?;
    let width = field_count(header, delimiter);
    if width < 2 {
        return None;
    }
    let matching = 1 + rest.iter().filter(|l| field_count(l, delimiter) == width).count();
    Some(matching * width)
}

fn field_count(line: &str, delimiter: u8) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => record.len(),
        _ => 1,
    }
}

/// Read a file and decode it to UTF-8.
///
/// A UTF-8 BOM is stripped. Bytes that are not valid UTF-8 are tried as
/// Shift_JIS (Japanese pharmacy exports), then Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(decode_bytes(bytes))
}

pub fn decode_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => match s.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => s,
        },
        Err(e) => {
            let bytes = e.into_bytes();
            if let Some(decoded) =
                encoding_rs::SHIFT_JIS.decode_without_bom_handling_and_without_replacement(&bytes)
            {
                log::debug!("decoded {} bytes as Shift_JIS", bytes.len());
                return decoded.into_owned();
            }
            log::warn!("input is neither UTF-8 nor Shift_JIS, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}
