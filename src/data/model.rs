use std::fmt;

use super::error::{DataError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single raw cell as decoded from a sheet
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value, as it comes out of a decoded sheet and
/// before schema inference has assigned the column a semantic type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Interpret the raw value as an `f64` where it already is numeric.
    /// Textual numbers are *not* parsed here; that is schema inference's job.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnData – tagged storage per semantic type
// ---------------------------------------------------------------------------

/// Semantic column type assigned by schema inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Not yet inferred; the column still holds raw mixed cells.
    Unknown,
    Numeric,
    Categorical,
    /// Integer year/period axis; numeric for plotting, discrete for filters.
    Year,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Unknown => "unknown",
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Year => "year",
        };
        write!(f, "{s}")
    }
}

/// Column storage. `Mixed` is the pre-inference state; the other variants
/// hold values fully coerced to the column's semantic type, with `None` as
/// the null marker. No mixed representations remain after inference.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Mixed(Vec<CellValue>),
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Year(Vec<Option<i64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Mixed(v) => v.len(),
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
            ColumnData::Year(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn column_type(&self) -> ColumnType {
        match self.data {
            ColumnData::Mixed(_) => ColumnType::Unknown,
            ColumnData::Numeric(_) => ColumnType::Numeric,
            ColumnData::Categorical(_) => ColumnType::Categorical,
            ColumnData::Year(_) => ColumnType::Year,
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Mixed(v) => v[row].is_null(),
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Categorical(v) => v[row].is_none(),
            ColumnData::Year(v) => v[row].is_none(),
        }
    }

    /// Number of null cells in the column.
    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&r| self.is_null(r)).count()
    }

    /// The cell at `row` as an `f64`, if the column stores it numerically.
    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Mixed(v) => v[row].as_f64(),
            ColumnData::Numeric(v) => v[row],
            ColumnData::Year(v) => v[row].map(|y| y as f64),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Materialise the cell at `row` as a raw [`CellValue`], whatever the
    /// storage variant. Used by unification and display.
    pub fn cell(&self, row: usize) -> CellValue {
        match &self.data {
            ColumnData::Mixed(v) => v[row].clone(),
            ColumnData::Numeric(v) => match v[row] {
                Some(x) => CellValue::Float(x),
                None => CellValue::Null,
            },
            ColumnData::Categorical(v) => match &v[row] {
                Some(s) => CellValue::Text(s.clone()),
                None => CellValue::Null,
            },
            ColumnData::Year(v) => match v[row] {
                Some(y) => CellValue::Int(y),
                None => CellValue::Null,
            },
        }
    }

    /// Display text for the cell at `row`; empty string for null.
    pub fn display(&self, row: usize) -> String {
        self.cell(row).to_string()
    }

    /// A copy of this column restricted to the given row indices.
    pub(crate) fn take_rows(&self, indices: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Mixed(v) => {
                ColumnData::Mixed(indices.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Numeric(v) => {
                ColumnData::Numeric(indices.iter().map(|&i| v[i]).collect())
            }
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Year(v) => ColumnData::Year(indices.iter().map(|&i| v[i]).collect()),
        };
        Column::new(self.name.clone(), data)
    }
}

// ---------------------------------------------------------------------------
// Table – ordered, equal-length, uniquely named columns
// ---------------------------------------------------------------------------

/// An in-memory rectangular dataset with typed, named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, validating that column names are unique and all
    /// columns have the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut seen: Vec<&str> = Vec::with_capacity(columns.len());
        for col in &columns {
            if seen.contains(&col.name.as_str()) {
                return Err(DataError::DuplicateColumn(col.name.clone()));
            }
            seen.push(&col.name);
            if col.len() != n_rows {
                return Err(DataError::ColumnLengthMismatch {
                    column: col.name.clone(),
                    expected: n_rows,
                    actual: col.len(),
                });
            }
        }
        Ok(Table { columns, n_rows })
    }

    pub fn empty() -> Self {
        Table {
            columns: Vec::new(),
            n_rows: 0,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// A new table containing only the given rows, in the given order.
    /// The copy never aliases this table's storage.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self.columns.iter().map(|c| c.take_rows(indices)).collect();
        Table {
            columns,
            n_rows: indices.len(),
        }
    }

    /// The first `n` rows (all rows if the table is shorter).
    pub fn head(&self, n: usize) -> Table {
        let take = n.min(self.n_rows);
        let indices: Vec<usize> = (0..take).collect();
        self.take_rows(&indices)
    }

    /// Drop rows whose every cell is null (the "drop all-null rows" toggle).
    pub fn drop_all_null_rows(&self) -> Table {
        let keep: Vec<usize> = (0..self.n_rows)
            .filter(|&r| self.columns.iter().any(|c| !c.is_null(r)))
            .collect();
        self.take_rows(&keep)
    }
}

// ---------------------------------------------------------------------------
// Workbook – named sheets in source order
// ---------------------------------------------------------------------------

/// One named sheet of a workbook.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// A collection of named sheets loaded from one source, in the order the
/// source listed them. Immutable once loaded; replaced wholesale when a new
/// source is opened.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Workbook { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.table)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed(cells: Vec<CellValue>) -> ColumnData {
        ColumnData::Mixed(cells)
    }

    #[test]
    fn table_rejects_duplicate_names() {
        let cols = vec![
            Column::new("a", mixed(vec![CellValue::Int(1)])),
            Column::new("a", mixed(vec![CellValue::Int(2)])),
        ];
        assert!(matches!(
            Table::new(cols),
            Err(DataError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let cols = vec![
            Column::new("a", mixed(vec![CellValue::Int(1), CellValue::Int(2)])),
            Column::new("b", mixed(vec![CellValue::Int(3)])),
        ];
        assert!(matches!(
            Table::new(cols),
            Err(DataError::ColumnLengthMismatch { .. })
        ));
    }

    #[test]
    fn take_rows_copies_without_aliasing() {
        let table = Table::new(vec![Column::new(
            "v",
            ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)]),
        )])
        .unwrap();

        let derived = table.take_rows(&[2, 0]);
        assert_eq!(derived.n_rows(), 2);
        assert_eq!(derived.column("v").unwrap().numeric_at(0), Some(3.0));
        assert_eq!(derived.column("v").unwrap().numeric_at(1), Some(1.0));
        // Source unchanged.
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn drop_all_null_rows_keeps_partial_rows() {
        let table = Table::new(vec![
            Column::new("a", ColumnData::Numeric(vec![None, Some(1.0), None])),
            Column::new(
                "b",
                ColumnData::Categorical(vec![None, None, Some("x".into())]),
            ),
        ])
        .unwrap();

        let cleaned = table.drop_all_null_rows();
        assert_eq!(cleaned.n_rows(), 2);
    }

    #[test]
    fn cell_round_trips_typed_storage() {
        let col = Column::new("y", ColumnData::Year(vec![Some(2020), None]));
        assert_eq!(col.cell(0), CellValue::Int(2020));
        assert_eq!(col.cell(1), CellValue::Null);
        assert_eq!(col.display(0), "2020");
        assert_eq!(col.display(1), "");
    }

    #[test]
    fn workbook_preserves_sheet_order() {
        let wb = Workbook::new(vec![
            Sheet {
                name: "2021".into(),
                table: Table::empty(),
            },
            Sheet {
                name: "2020".into(),
                table: Table::empty(),
            },
        ]);
        let names: Vec<&str> = wb.sheet_names().collect();
        assert_eq!(names, vec!["2021", "2020"]);
    }
}
