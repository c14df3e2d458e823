use super::model::{CellValue, Column, ColumnData, Table};

/// Column name treated as the year/period axis. Dually used as a numeric
/// plotting axis and a discrete filter axis, so it gets its own storage.
pub const YEAR_COLUMN: &str = "year";

// ---------------------------------------------------------------------------
// Schema inference – classify each column and coerce its values
// ---------------------------------------------------------------------------

/// Assign every column a semantic type and coerce its cells accordingly.
///
/// Source spreadsheets mix locales and blank cells; inference maximises
/// usable numeric columns without ever failing on a single malformed cell.
/// Running it on an already-inferred table is a no-op.
pub fn infer_schema(table: Table) -> Table {
    let columns = table
        .columns()
        .iter()
        .cloned()
        .map(infer_column)
        .collect();
    // Names and lengths are untouched, so the invariants still hold.
    Table::new(columns).expect("inference preserves table shape")
}

fn infer_column(col: Column) -> Column {
    if col.name.eq_ignore_ascii_case(YEAR_COLUMN) {
        return coerce_year(col);
    }

    let cells = match &col.data {
        ColumnData::Mixed(cells) => cells,
        // Already inferred.
        _ => return col,
    };

    // Entirely numeric as loaded (nulls allowed).
    if cells
        .iter()
        .all(|c| matches!(c, CellValue::Int(_) | CellValue::Float(_) | CellValue::Null))
    {
        let values = cells.iter().map(CellValue::as_f64).collect();
        return Column::new(col.name, ColumnData::Numeric(values));
    }

    // Text→numeric repair, cell by cell. A cell that fails to parse becomes
    // null; it never aborts coercion for the whole column.
    let coerced: Vec<Option<f64>> = cells
        .iter()
        .map(|c| match c {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Text(s) => coerce_numeric(s),
            CellValue::Bool(_) | CellValue::Null => None,
        })
        .collect();

    if coerced.iter().any(Option::is_some) {
        Column::new(col.name, ColumnData::Numeric(coerced))
    } else {
        let values = cells
            .iter()
            .map(|c| match c {
                CellValue::Null => None,
                other => Some(other.to_string()),
            })
            .collect();
        Column::new(col.name, ColumnData::Categorical(values))
    }
}

/// Parse a text cell as a number: strip whitespace, normalise a comma
/// decimal separator to a period, then parse.
pub fn coerce_numeric(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok()
}

/// Force the year/period column to integer storage, whatever it was
/// inferred as before. Non-integer cells become null.
fn coerce_year(col: Column) -> Column {
    if matches!(col.data, ColumnData::Year(_)) {
        return col;
    }
    let values = (0..col.len())
        .map(|row| match col.cell(row) {
            CellValue::Int(i) => Some(i),
            CellValue::Float(f) if f.fract() == 0.0 => Some(f as i64),
            CellValue::Text(s) => {
                coerce_numeric(&s).filter(|f| f.fract() == 0.0).map(|f| f as i64)
            }
            _ => None,
        })
        .collect();
    Column::new(col.name, ColumnData::Year(values))
}
