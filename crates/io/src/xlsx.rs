// Spreadsheet import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import reads one named sheet into a Table: first row is the header.
// Export writes one worksheet per Table. In-place export rewrites the whole
// workbook, carrying unrelated sheets over as values only.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use sheetrecon_recon::model::{CellValue, Table};
use tracing::{debug, warn};

use crate::error::IoError;
use crate::header::{header_names, is_blank_row};

/// Excel sheet limits
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

/// Name and used-range size of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
}

fn open(path: &Path) -> Result<Sheets<std::io::BufReader<std::fs::File>>, IoError> {
    open_workbook_auto(path).map_err(|e| IoError::Open {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_range(
    workbook: &mut Sheets<std::io::BufReader<std::fs::File>>,
    path: &Path,
    sheet: &str,
) -> Result<Range<Data>, IoError> {
    let available = workbook.sheet_names();
    if !available.iter().any(|s| s == sheet) {
        return Err(IoError::SheetNotFound {
            path: path.display().to_string(),
            sheet: sheet.into(),
            available,
        });
    }
    workbook.worksheet_range(sheet).map_err(|e| IoError::Read {
        path: path.display().to_string(),
        message: format!("sheet '{sheet}': {e}"),
    })
}

/// Convert a calamine cell. Dates become ISO text, errors their `#...` text.
fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => {
                let time = ndt.format("%H:%M:%S").to_string();
                if time == "00:00:00" {
                    CellValue::Text(ndt.format("%Y-%m-%d").to_string())
                } else {
                    CellValue::Text(ndt.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::text(s.as_str()),
        Data::DurationIso(s) => CellValue::text(s.as_str()),
    }
}

fn table_from_range(name: &str, range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::new(name, Vec::new());
    };
    let raw_header: Vec<CellValue> = header.iter().map(cell_value).collect();
    let mut table = Table::new(name, header_names(name, &raw_header));

    let mut skipped = 0usize;
    for row in rows {
        let record: Vec<CellValue> = row.iter().map(cell_value).collect();
        if is_blank_row(&record) {
            skipped += 1;
            continue;
        }
        table.push_row(record);
    }
    debug!(
        sheet = name,
        rows = table.len(),
        columns = table.width(),
        blank_rows_skipped = skipped,
        "sheet imported"
    );
    table
}

/// Read one named sheet. The first row of the used range is the header.
pub fn read_sheet(path: &Path, sheet: &str) -> Result<Table, IoError> {
    let mut workbook = open(path)?;
    let range = read_range(&mut workbook, path, sheet)?;
    Ok(table_from_range(sheet, &range))
}

/// List every sheet with its used-range size.
pub fn list_sheets(path: &Path) -> Result<Vec<SheetInfo>, IoError> {
    let mut workbook = open(path)?;
    let mut out = Vec::new();
    for name in workbook.sheet_names() {
        let range = read_range(&mut workbook, path, &name)?;
        let (rows, cols) = range.get_size();
        out.push(SheetInfo { name, rows, cols });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

fn write_err(path: &Path, message: impl Into<String>) -> IoError {
    IoError::Write {
        path: path.display().to_string(),
        message: message.into(),
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<(), XlsxError> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Number(n) if n.is_finite() => {
            worksheet.write_number(row, col, *n)?;
        }
        // NaN is a missing value; infinities have no xlsx number form
        CellValue::Number(n) if n.is_nan() => {}
        CellValue::Number(n) => {
            worksheet.write_string(row, col, n.to_string())?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
    }
    Ok(())
}

fn check_limits(table: &Table) -> Result<(), String> {
    if table.width() > MAX_COLS {
        return Err(format!(
            "sheet '{}' has {} columns, xlsx allows {MAX_COLS}",
            table.name,
            table.width()
        ));
    }
    if table.len() + 1 > MAX_ROWS {
        return Err(format!(
            "sheet '{}' has {} rows, xlsx allows {}",
            table.name,
            table.len(),
            MAX_ROWS - 1
        ));
    }
    Ok(())
}

/// Add one table as a worksheet: bold frozen header, typed cells, autofit.
fn add_table_sheet(workbook: &mut XlsxWorkbook, table: &Table) -> Result<(), String> {
    check_limits(table)?;
    let sheet_err = |e: XlsxError| format!("sheet '{}': {e}", table.name);

    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&table.name).map_err(sheet_err)?;

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(sheet_err)?;
    }
    for row in 0..table.len() {
        for col in 0..table.width() {
            write_cell(worksheet, row as u32 + 1, col as u16, table.cell(row, col))
                .map_err(sheet_err)?;
        }
    }

    worksheet.set_freeze_panes(1, 0).map_err(sheet_err)?;
    worksheet.autofit();
    Ok(())
}

/// Write tables to a new xlsx file, one worksheet each, in order.
pub fn write_tables(path: &Path, tables: &[&Table]) -> Result<(), IoError> {
    let mut workbook = XlsxWorkbook::new();
    for table in tables {
        add_table_sheet(&mut workbook, table).map_err(|m| write_err(path, m))?;
    }
    workbook
        .save(path)
        .map_err(|e| write_err(path, format!("failed to save XLSX file: {e}")))?;
    debug!(path = %path.display(), sheets = tables.len(), "workbook written");
    Ok(())
}

/// A sheet carried over untouched (values only) during an in-place rewrite.
struct RawSheet {
    name: String,
    start: (u32, u32),
    cells: Vec<Vec<CellValue>>,
}

fn add_raw_sheet(workbook: &mut XlsxWorkbook, raw: &RawSheet) -> Result<(), String> {
    let sheet_err = |e: XlsxError| format!("sheet '{}': {e}", raw.name);
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&raw.name).map_err(sheet_err)?;
    let (row0, col0) = raw.start;
    for (r, row) in raw.cells.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            write_cell(worksheet, row0 + r as u32, (col0 as usize + c) as u16, value)
                .map_err(sheet_err)?;
        }
    }
    Ok(())
}

/// Write tables into an existing xlsx workbook.
///
/// Sheets named like a table are replaced in place; the rest are kept as
/// values (formatting and formulas are not preserved). New tables are
/// appended after the existing sheets.
pub fn write_into_workbook(path: &Path, tables: &[&Table]) -> Result<(), IoError> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if !is_xlsx {
        return Err(IoError::Unsupported(format!(
            "in-place output needs an .xlsx workbook, got {}",
            path.display()
        )));
    }

    let mut existing = Vec::new();
    {
        let mut workbook = open(path)?;
        for name in workbook.sheet_names() {
            let range = read_range(&mut workbook, path, &name)?;
            let cells = range
                .rows()
                .map(|row| row.iter().map(cell_value).collect())
                .collect();
            existing.push(RawSheet {
                start: range.start().unwrap_or((0, 0)),
                name,
                cells,
            });
        }
    }
    warn!(
        path = %path.display(),
        kept_sheets = existing.len(),
        "rewriting workbook in place; existing sheets keep values only"
    );

    let mut pending: Vec<&Table> = tables.to_vec();
    let mut workbook = XlsxWorkbook::new();
    for raw in &existing {
        let result = match pending.iter().position(|t| t.name == raw.name) {
            Some(pos) => add_table_sheet(&mut workbook, pending.remove(pos)),
            None => add_raw_sheet(&mut workbook, raw),
        };
        result.map_err(|m| write_err(path, m))?;
    }
    for table in pending {
        add_table_sheet(&mut workbook, table).map_err(|m| write_err(path, m))?;
    }

    workbook
        .save(path)
        .map_err(|e| write_err(path, format!("failed to save XLSX file: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> Table {
        Table::with_rows(
            name,
            vec!["Table Field Name".into(), "Biz Name".into(), "Rank".into(), "Active".into()],
            vec![
                vec!["Age".into(), "cust_age".into(), CellValue::Number(1.0), CellValue::Bool(true)],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty, CellValue::Empty],
                vec!["Zip".into(), CellValue::Empty, CellValue::Number(2.5), CellValue::Bool(false)],
            ],
        )
    }

    #[test]
    fn export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compare.xlsx");
        write_tables(&path, &[&sample("CDL"), &sample("GITHUB")]).unwrap();

        let table = read_sheet(&path, "GITHUB").unwrap();
        assert_eq!(table.columns, vec!["Table Field Name", "Biz Name", "Rank", "Active"]);
        // Blank row skipped on import
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), &CellValue::from("Age"));
        assert_eq!(table.cell(0, 2), &CellValue::Number(1.0));
        assert_eq!(table.cell(0, 3), &CellValue::Bool(true));
        assert_eq!(table.cell(1, 1), &CellValue::Empty);
    }

    #[test]
    fn missing_sheet_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.xlsx");
        write_tables(&path, &[&sample("CDL")]).unwrap();

        let err = read_sheet(&path, "GITHUB").unwrap_err();
        assert!(matches!(err, IoError::SheetNotFound { .. }));
        assert!(err.to_string().contains("available: CDL"));
    }

    #[test]
    fn list_sheets_reports_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.xlsx");
        write_tables(&path, &[&sample("CDL"), &Table::new("Empty", vec!["a".into()])]).unwrap();

        let sheets = list_sheets(&path).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "CDL");
        assert_eq!(sheets[0].cols, 4);
        assert_eq!(sheets[1].rows, 1);
    }

    #[test]
    fn invalid_sheet_name_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        let err = write_tables(&path, &[&sample("bad/name")]).unwrap_err();
        assert!(matches!(err, IoError::Write { .. }));
    }

    #[test]
    fn in_place_replaces_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        write_tables(&path, &[&sample("CDL"), &sample("Merged"), &sample("GITHUB")]).unwrap();

        let merged = Table::with_rows("Merged", vec!["only".into()], vec![vec!["x".into()]]);
        let extra = Table::with_rows("Extra", vec!["e".into()], vec![vec!["y".into()]]);
        write_into_workbook(&path, &[&merged, &extra]).unwrap();

        let names: Vec<String> = list_sheets(&path).unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["CDL", "Merged", "GITHUB", "Extra"]);
        assert_eq!(read_sheet(&path, "Merged").unwrap().columns, vec!["only"]);
        // Untouched sheets keep their data
        assert_eq!(read_sheet(&path, "CDL").unwrap().len(), 2);
    }

    #[test]
    fn in_place_requires_xlsx() {
        let err = write_into_workbook(Path::new("book.ods"), &[]).unwrap_err();
        assert!(matches!(err, IoError::Unsupported(_)));
    }
}
