use std::collections::HashMap;

use sheetrecon_recon::model::CellValue;
use tracing::warn;

/// Turn a raw header row into column names.
///
/// Header text is trimmed, so `Biz Name ` is addressed as `Biz Name`.
/// Blank headers become `Unnamed: <idx>`; repeated names get `.1`, `.2`, ...
/// so every input column stays addressable by name.
pub(crate) fn header_names(sheet: &str, raw: &[CellValue]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());

    for (idx, cell) in raw.iter().enumerate() {
        let mut name = cell.to_string().trim().to_string();
        if name.is_empty() {
            name = format!("Unnamed: {idx}");
        }
        let base = name.clone();
        while seen.contains_key(&name) {
            let n = seen.entry(base.clone()).or_insert(0);
            *n += 1;
            name = format!("{base}.{n}");
        }
        if name != base {
            warn!(sheet, column = %base, renamed = %name, "duplicate header renamed");
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }

    names
}

pub(crate) fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_blank)
}
