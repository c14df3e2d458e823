use super::model::{CellValue, Column, ColumnData, Table, Workbook};

/// Sheet name assumed to be pre-unified upstream; used verbatim if present.
pub const ALL_SHEET: &str = "all";

/// Canonical period-labelled sheet names, concatenated in this order when
/// no "all" sheet exists.
pub const CANONICAL_SHEETS: [&str; 3] = ["2020", "2021", "2022"];

// ---------------------------------------------------------------------------
// Unification – one logical table out of a workbook
// ---------------------------------------------------------------------------

/// Which precedence rule produced the unified table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifySource {
    /// The "all" sheet was used verbatim.
    AllSheet,
    /// Canonical period sheets concatenated in canonical order.
    Canonical(Vec<String>),
    /// No "all" sheet and no canonical sheet: every sheet concatenated in
    /// workbook order. Best-effort for arbitrary workbooks; callers should
    /// surface this in diagnostics rather than trust the merge.
    Fallback(Vec<String>),
}

impl UnifySource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, UnifySource::Fallback(_))
    }
}

/// A unified table plus the rule that produced it.
#[derive(Debug, Clone)]
pub struct Unified {
    pub table: Table,
    pub source: UnifySource,
}

/// Merge a workbook into one logical table.
///
/// Precedence: an `all` sheet verbatim; else the canonical period sheets
/// present, row-concatenated in canonical order; else every sheet in
/// workbook order. Concatenation takes the outer union of columns, padding
/// rows of sheets lacking a column with null. The result's row count is the
/// sum of the selected sheets' row counts.
pub fn unify(workbook: &Workbook) -> Unified {
    if let Some(table) = workbook.get(ALL_SHEET) {
        return Unified {
            table: table.clone(),
            source: UnifySource::AllSheet,
        };
    }

    let canonical: Vec<&str> = CANONICAL_SHEETS
        .iter()
        .copied()
        .filter(|name| workbook.get(name).is_some())
        .collect();

    if !canonical.is_empty() {
        let parts: Vec<&Table> = canonical
            .iter()
            .map(|name| workbook.get(name).expect("sheet presence checked"))
            .collect();
        return Unified {
            table: concat_outer(&parts),
            source: UnifySource::Canonical(
                canonical.iter().map(|s| s.to_string()).collect(),
            ),
        };
    }

    let names: Vec<String> = workbook.sheet_names().map(String::from).collect();
    let parts: Vec<&Table> = workbook.sheets().iter().map(|s| &s.table).collect();
    Unified {
        table: concat_outer(&parts),
        source: UnifySource::Fallback(names),
    }
}

/// Row-wise concatenation under the outer union of columns, in first-seen
/// column order. Produces raw `Mixed` columns; schema inference runs after
/// unification.
fn concat_outer(parts: &[&Table]) -> Table {
    let mut names: Vec<String> = Vec::new();
    for part in parts {
        for name in part.column_names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    let total_rows: usize = parts.iter().map(|p| p.n_rows()).sum();
    let mut cells: Vec<Vec<CellValue>> = names
        .iter()
        .map(|_| Vec::with_capacity(total_rows))
        .collect();

    for part in parts {
        for (slot, name) in cells.iter_mut().zip(&names) {
            match part.column(name) {
                Some(col) => slot.extend((0..part.n_rows()).map(|r| col.cell(r))),
                None => slot.extend(std::iter::repeat(CellValue::Null).take(part.n_rows())),
            }
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, data)| Column::new(name, ColumnData::Mixed(data)))
        .collect();
    Table::new(columns).expect("union columns are unique and equal length")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Sheet;

    fn sheet(name: &str, cols: Vec<(&str, Vec<CellValue>)>) -> Sheet {
        let columns = cols
            .into_iter()
            .map(|(n, cells)| Column::new(n, ColumnData::Mixed(cells)))
            .collect();
        Sheet {
            name: name.to_string(),
            table: Table::new(columns).unwrap(),
        }
    }

    fn int(i: i64) -> CellValue {
        CellValue::Int(i)
    }

    #[test]
    fn all_sheet_wins() {
        let wb = Workbook::new(vec![
            sheet("2020", vec![("v", vec![int(1)])]),
            sheet("all", vec![("v", vec![int(7), int(8)])]),
        ]);
        let unified = unify(&wb);
        assert_eq!(unified.source, UnifySource::AllSheet);
        assert_eq!(unified.table.n_rows(), 2);
    }

    #[test]
    fn canonical_sheets_concatenated_in_canonical_order() {
        // Workbook lists 2021 before 2020; canonical order must win.
        let wb = Workbook::new(vec![
            sheet("2021", vec![("v", vec![int(21)])]),
            sheet("2020", vec![("v", vec![int(20), int(20)])]),
            sheet("notes", vec![("v", vec![int(99)])]),
        ]);
        let unified = unify(&wb);
        assert_eq!(
            unified.source,
            UnifySource::Canonical(vec!["2020".to_string(), "2021".to_string()])
        );
        // Only canonical sheets counted; "notes" is ignored.
        assert_eq!(unified.table.n_rows(), 3);
        let v = unified.table.column("v").unwrap();
        assert_eq!(v.cell(0), int(20));
        assert_eq!(v.cell(2), int(21));
    }

    #[test]
    fn outer_union_pads_missing_columns_with_null() {
        let wb = Workbook::new(vec![
            sheet("2020", vec![("year", vec![int(2020)]), ("a", vec![int(1)])]),
            sheet("2021", vec![("year", vec![int(2021)]), ("b", vec![int(2)])]),
        ]);
        let unified = unify(&wb);
        let table = &unified.table;

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["year", "a", "b"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column("a").unwrap().cell(1), CellValue::Null);
        assert_eq!(table.column("b").unwrap().cell(0), CellValue::Null);
    }

    #[test]
    fn fallback_concatenates_everything_in_workbook_order() {
        let wb = Workbook::new(vec![
            sheet("march", vec![("v", vec![int(1), int(2)])]),
            sheet("april", vec![("v", vec![int(3)])]),
        ]);
        let unified = unify(&wb);
        assert!(unified.source.is_fallback());
        assert_eq!(
            unified.source,
            UnifySource::Fallback(vec!["march".to_string(), "april".to_string()])
        );
        assert_eq!(unified.table.n_rows(), 3);
        assert_eq!(unified.table.column("v").unwrap().cell(2), int(3));
    }

    #[test]
    fn row_count_is_sum_of_selected_sheets() {
        let wb = Workbook::new(vec![
            sheet("2020", vec![("v", vec![int(1), int(2), int(3)])]),
            sheet("2022", vec![("v", vec![int(4)])]),
        ]);
        let unified = unify(&wb);
        let expected: usize = ["2020", "2022"]
            .iter()
            .map(|n| wb.get(n).unwrap().n_rows())
            .sum();
        assert_eq!(unified.table.n_rows(), expected);
    }
}
