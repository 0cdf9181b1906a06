// CSV/TSV table import/export

use std::io::Read;
use std::path::Path;

use sheetrecon_recon::model::{CellValue, Table};

use crate::error::IoError;
use crate::header::{header_names, is_blank_row};

/// Read a delimited file into a table. First record is the header row.
pub fn read_table(path: &Path, name: &str) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    table_from_str(&content, delimiter, name).map_err(|message| IoError::Read {
        path: path.display().to_string(),
        message,
    })
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let open_err = |e: std::io::Error| IoError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut file = std::fs::File::open(path).map_err(open_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(open_err)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.trim_start_matches('\u{feff}').to_string()),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: lines agreeing with line 1, weighted by field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

fn table_from_str(content: &str, delimiter: u8, name: &str) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record.map_err(|e| e.to_string())?,
        None => return Err("file is empty, expected a header row".into()),
    };
    let raw_header: Vec<CellValue> = header.iter().map(CellValue::from).collect();
    let mut table = Table::new(name, header_names(name, &raw_header));

    for result in records {
        let record = result.map_err(|e| e.to_string())?;
        let row: Vec<CellValue> = record.iter().map(CellValue::from).collect();
        if is_blank_row(&row) {
            continue;
        }
        table.push_row(row);
    }

    Ok(table)
}

pub fn write_table(table: &Table, path: &Path) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.display().to_string(),
        message,
    };
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|e| write_err(e.to_string()))?;

    writer
        .write_record(&table.columns)
        .map_err(|e| write_err(e.to_string()))?;
    for row in 0..table.len() {
        let fields: Vec<String> = table.record(row).iter().map(|c| c.to_string()).collect();
        writer
            .write_record(&fields)
            .map_err(|e| write_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| write_err(e.to_string()))?;
    Ok(())
}
