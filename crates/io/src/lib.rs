// File I/O for reconciliation inputs and reports
//
// Inputs: any calamine workbook (xlsx, xlsm, xls, xlsb, ods) or a delimited
// text file. Outputs: one xlsx workbook, or one CSV file per table.

pub mod csv;
pub mod error;
mod header;
pub mod xlsx;

use std::path::{Path, PathBuf};

use sheetrecon_recon::model::Table;
use tracing::info;

pub use error::IoError;
pub use xlsx::SheetInfo;

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Delimited text rather than a workbook.
pub fn is_delimited(path: &Path) -> bool {
    matches!(extension(path).as_str(), "csv" | "tsv" | "txt")
}

/// Load one table. For delimited files `sheet` only names the table.
pub fn load_table(path: &Path, sheet: &str) -> Result<Table, IoError> {
    let table = if is_delimited(path) {
        csv::read_table(path, sheet)?
    } else {
        xlsx::read_sheet(path, sheet)?
    };
    info!(
        path = %path.display(),
        sheet,
        rows = table.len(),
        columns = table.width(),
        "loaded table"
    );
    Ok(table)
}

/// Sheets of a workbook. A delimited file reports itself as one sheet.
pub fn list_sheets(path: &Path) -> Result<Vec<SheetInfo>, IoError> {
    if is_delimited(path) {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sheet1")
            .to_string();
        let table = csv::read_table(path, &name)?;
        return Ok(vec![SheetInfo {
            rows: table.len() + 1,
            cols: table.width(),
            name,
        }]);
    }
    xlsx::list_sheets(path)
}

/// Save report tables, returning every file written.
///
/// `.xlsx` gets one worksheet per table. `.csv` gets the table itself when
/// there is only one, otherwise `<stem>_<sheet>.csv` next to it per table.
pub fn save_tables(path: &Path, tables: &[&Table]) -> Result<Vec<PathBuf>, IoError> {
    let written = match extension(path).as_str() {
        "xlsx" => {
            xlsx::write_tables(path, tables)?;
            vec![path.to_path_buf()]
        }
        "csv" => {
            if let [only] = tables {
                csv::write_table(only, path)?;
                vec![path.to_path_buf()]
            } else {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("report");
                let mut written = Vec::with_capacity(tables.len());
                for table in tables {
                    let target = path.with_file_name(format!("{stem}_{}.csv", table.name));
                    csv::write_table(table, &target)?;
                    written.push(target);
                }
                written
            }
        }
        other => {
            return Err(IoError::Unsupported(format!(
                "cannot write '.{other}' output (use .xlsx or .csv): {}",
                path.display()
            )))
        }
    };
    for file in &written {
        info!(path = %file.display(), "wrote output");
    }
    Ok(written)
}

/// Write tables into an existing xlsx workbook, replacing same-named sheets.
pub fn save_in_place(path: &Path, tables: &[&Table]) -> Result<(), IoError> {
    xlsx::write_into_workbook(path, tables)?;
    info!(path = %path.display(), sheets = tables.len(), "updated workbook in place");
    Ok(())
}
