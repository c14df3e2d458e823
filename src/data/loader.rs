use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use serde_json::Value as JsonValue;

use super::error::{DataError, Result};
use super::model::{CellValue, Column, ColumnData, Sheet, Table, Workbook};

/// Repository-default dataset, tried when the user picks no file.
pub const DEFAULT_WORKBOOK_PATH: &str = "data/clinic_waitlist.xlsx";
/// Flat-file fallback next to the default workbook.
pub const DEFAULT_CSV_PATH: &str = "data/clinic_waitlist_sample.csv";

// ---------------------------------------------------------------------------
// Load outcome – decoded sheets plus skip diagnostics
// ---------------------------------------------------------------------------

/// A sheet that failed to decode and was omitted from the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSkip {
    pub sheet: String,
    pub reason: String,
}

/// Result of a load: the successfully decoded sheets together with the
/// sheets that had to be skipped. A load only fails outright when *zero*
/// sheets decode ([`DataError::NoDataAvailable`]) or the container itself
/// cannot be opened.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub workbook: Workbook,
    pub skipped: Vec<SheetSkip>,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a workbook from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` – multi-sheet spreadsheet workbooks
/// * `.csv`  – flat delimited file, loaded as a single-sheet workbook
/// * `.json` – records orientation (`df.to_json(orient='records')`)
pub fn load_path(path: &Path) -> Result<LoadOutcome> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet_path(path),
        "csv" => load_csv_path(path),
        "json" => load_json_path(path),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a spreadsheet workbook from an in-memory byte buffer (uploads).
pub fn load_workbook_bytes(bytes: &[u8]) -> Result<LoadOutcome> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    collect_sheets(&mut workbook)
}

/// Try the repository-default dataset paths in order: the workbook first,
/// then the flat CSV next to it.
pub fn load_default() -> Result<LoadOutcome> {
    for candidate in [DEFAULT_WORKBOOK_PATH, DEFAULT_CSV_PATH] {
        let path = Path::new(candidate);
        if path.exists() {
            log::info!("loading repository dataset {candidate}");
            return load_path(path);
        }
    }
    Err(DataError::NoDataAvailable)
}

// ---------------------------------------------------------------------------
// Spreadsheet loader (calamine)
// ---------------------------------------------------------------------------

fn load_spreadsheet_path(path: &Path) -> Result<LoadOutcome> {
    let mut workbook = open_workbook_auto(path)?;
    collect_sheets(&mut workbook)
}

/// Decode every sheet independently; a failed sheet is skipped, not fatal.
fn collect_sheets<RS>(workbook: &mut Sheets<RS>) -> Result<LoadOutcome>
where
    RS: std::io::Read + std::io::Seek,
{
    let sheet_names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());
    let mut skipped = Vec::new();

    for name in &sheet_names {
        match workbook.worksheet_range(name) {
            Ok(range) => match sheet_from_range(name, &range) {
                Ok(table) => sheets.push(Sheet {
                    name: name.clone(),
                    table,
                }),
                Err(e) => skip(&mut skipped, name, e.to_string()),
            },
            Err(e) => skip(&mut skipped, name, e.to_string()),
        }
    }

    if sheets.is_empty() {
        return Err(DataError::NoDataAvailable);
    }

    log::info!(
        "decoded {} of {} sheets",
        sheets.len(),
        sheet_names.len()
    );
    Ok(LoadOutcome {
        workbook: Workbook::new(sheets),
        skipped,
    })
}

fn skip(skipped: &mut Vec<SheetSkip>, sheet: &str, reason: String) {
    log::warn!("skipping sheet '{sheet}': {reason}");
    skipped.push(SheetSkip {
        sheet: sheet.to_string(),
        reason,
    });
}

/// Build a [`Table`] from a calamine cell range. The first row is always
/// the header row; headers are stringified so column identity stays textual.
fn sheet_from_range(name: &str, range: &calamine::Range<Data>) -> Result<Table> {
    let mut rows = range.rows();
    let header_row = rows.next().ok_or_else(|| DataError::SheetDecode {
        sheet: name.to_string(),
        reason: "sheet is empty".to_string(),
    })?;

    let headers = normalize_headers(header_row.iter().map(sheet_cell_to_string));

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (idx, slot) in cells.iter_mut().enumerate() {
            let value = row.get(idx).map_or(CellValue::Null, sheet_cell_to_value);
            slot.push(value);
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, data)| Column::new(name, ColumnData::Mixed(data)))
        .collect();
    Table::new(columns)
}

fn sheet_cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{f:.0}")
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("{e:?}"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn sheet_cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        // Formula errors carry no usable value.
        Data::Error(_) => CellValue::Null,
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Stringify and de-duplicate headers: blanks become positional labels,
/// repeats get a numeric suffix so the table invariant holds.
fn normalize_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for (idx, h) in raw.enumerate() {
        let mut name = if h.is_empty() {
            format!("column_{idx}")
        } else {
            h
        };
        if headers.contains(&name) {
            name = format!("{name}_{idx}");
        }
        headers.push(name);
    }
    headers
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv_path(path: &Path) -> Result<LoadOutcome> {
    let bytes = std::fs::read(path)?;
    load_csv_bytes(&file_stem(path), &bytes)
}

/// Parse delimited bytes into a single-sheet workbook named `sheet_name`.
pub fn load_csv_bytes(sheet_name: &str, bytes: &[u8]) -> Result<LoadOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = normalize_headers(
        reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string()),
    );

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (idx, slot) in cells.iter_mut().enumerate() {
            slot.push(guess_cell(record.get(idx).unwrap_or("")));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, data)| Column::new(name, ColumnData::Mixed(data)))
        .collect();

    single_sheet(sheet_name, Table::new(columns)?)
}

/// Best-effort raw typing of a delimited text cell.
fn guess_cell(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Int(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader (records orientation)
// ---------------------------------------------------------------------------

fn load_json_path(path: &Path) -> Result<LoadOutcome> {
    let bytes = std::fs::read(path)?;
    load_json_bytes(&file_stem(path), &bytes)
}

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "year": 2020, "district": "North", "wait_days": 12.5 },
///   ...
/// ]
/// ```
pub fn load_json_bytes(sheet_name: &str, bytes: &[u8]) -> Result<LoadOutcome> {
    let root: JsonValue = serde_json::from_slice(bytes)?;
    let records = root.as_array().ok_or_else(|| DataError::SheetDecode {
        sheet: sheet_name.to_string(),
        reason: "expected a top-level JSON array of records".to_string(),
    })?;

    // Column order is first-seen across all records.
    let mut headers: Vec<String> = Vec::new();
    for rec in records {
        if let Some(obj) = rec.as_object() {
            for key in obj.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }
    }

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); headers.len()];
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| DataError::SheetDecode {
            sheet: sheet_name.to_string(),
            reason: format!("record {i} is not a JSON object"),
        })?;
        for (idx, header) in headers.iter().enumerate() {
            let value = obj.get(header).map_or(CellValue::Null, json_to_cell);
            cells[idx].push(value);
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, data)| Column::new(name, ColumnData::Mixed(data)))
        .collect();

    single_sheet(sheet_name, Table::new(columns)?)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn single_sheet(name: &str, table: Table) -> Result<LoadOutcome> {
    Ok(LoadOutcome {
        workbook: Workbook::new(vec![Sheet {
            name: name.to_string(),
            table,
        }]),
        skipped: Vec::new(),
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_bytes_single_sheet() {
        let csv = b"year,district,wait_days\n2020,North,12.5\n2021,South,\n";
        let outcome = load_csv_bytes("sample", csv).unwrap();

        assert_eq!(outcome.workbook.len(), 1);
        assert!(outcome.skipped.is_empty());

        let table = outcome.workbook.get("sample").unwrap();
        assert_eq!(table.n_rows(), 2);
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["year", "district", "wait_days"]);

        let wait = table.column("wait_days").unwrap();
        assert_eq!(wait.cell(0), CellValue::Float(12.5));
        assert_eq!(wait.cell(1), CellValue::Null);
    }

    #[test]
    fn csv_short_rows_pad_with_null() {
        let csv = b"a,b,c\n1,2,3\n4\n";
        let outcome = load_csv_bytes("t", csv).unwrap();
        let table = outcome.workbook.get("t").unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column("b").unwrap().cell(1), CellValue::Null);
        assert_eq!(table.column("c").unwrap().cell(1), CellValue::Null);
    }

    #[test]
    fn json_records_union_of_keys() {
        let json = br#"[
            {"year": 2020, "district": "North"},
            {"year": 2021, "wait_days": 3.5}
        ]"#;
        let outcome = load_json_bytes("records", json).unwrap();
        let table = outcome.workbook.get("records").unwrap();

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["year", "district", "wait_days"]);
        assert_eq!(table.column("wait_days").unwrap().cell(0), CellValue::Null);
        assert_eq!(table.column("district").unwrap().cell(1), CellValue::Null);
    }

    #[test]
    fn json_rejects_non_records() {
        let err = load_json_bytes("bad", br#"{"not": "records"}"#).unwrap_err();
        assert!(matches!(err, DataError::SheetDecode { .. }));
    }

    #[test]
    fn malformed_workbook_bytes_rejected() {
        assert!(load_workbook_bytes(b"definitely not a workbook").is_err());
    }

    #[test]
    fn unsupported_extension() {
        let err = load_path(Path::new("something.pkl")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(_)));
    }

    #[test]
    fn load_path_dispatches_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"facility,visits\nA,10\nB,20\n").unwrap();

        let outcome = load_path(&path).unwrap();
        assert_eq!(outcome.workbook.len(), 1);
        // Sheet named after the file stem.
        assert!(outcome.workbook.get("clinic").is_some());
        assert_eq!(outcome.workbook.get("clinic").unwrap().n_rows(), 2);
    }

    #[test]
    fn headers_normalized_and_deduplicated() {
        let headers =
            normalize_headers(vec![String::new(), "a".to_string(), "a".to_string()].into_iter());
        assert_eq!(headers, vec!["column_0", "a", "a_2"]);
    }

    #[test]
    fn guess_cell_types() {
        assert_eq!(guess_cell("42"), CellValue::Int(42));
        assert_eq!(guess_cell("3.5"), CellValue::Float(3.5));
        assert_eq!(guess_cell("true"), CellValue::Bool(true));
        assert_eq!(guess_cell("  "), CellValue::Null);
        assert_eq!(guess_cell("North"), CellValue::Text("North".to_string()));
    }
}
