use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{DataError, Result};
use super::model::{Column, ColumnData, Table};

// ---------------------------------------------------------------------------
// Aggregation functions
// ---------------------------------------------------------------------------

/// Reduction applied to the value column of each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFn {
    Mean,
    Median,
    Sum,
    Count,
}

impl AggFn {
    pub const ALL: [AggFn; 4] = [AggFn::Mean, AggFn::Median, AggFn::Sum, AggFn::Count];

    pub fn label(&self) -> &'static str {
        match self {
            AggFn::Mean => "mean",
            AggFn::Median => "median",
            AggFn::Sum => "sum",
            AggFn::Count => "count",
        }
    }
}

/// A validated-on-use aggregation request: group by one or more columns,
/// reduce one numeric value column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub group_by: Vec<String>,
    pub value: String,
    pub func: AggFn,
}

// ---------------------------------------------------------------------------
// Group keys – ordered so output rows sort by key tuple
// ---------------------------------------------------------------------------

/// One component of a group key. Numeric parts order numerically, textual
/// parts lexically; numbers sort before text when a column mixes them.
#[derive(Debug, Clone, PartialEq)]
enum KeyPart {
    Num(f64),
    Text(String),
}

impl Eq for KeyPart {}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (KeyPart::Num(a), KeyPart::Num(b)) => a.total_cmp(b),
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Num(_), KeyPart::Text(_)) => std::cmp::Ordering::Less,
            (KeyPart::Text(_), KeyPart::Num(_)) => std::cmp::Ordering::Greater,
        }
    }
}

fn key_part(col: &Column, row: usize) -> KeyPart {
    match col.numeric_at(row) {
        Some(v) => KeyPart::Num(v),
        None => KeyPart::Text(col.display(row)),
    }
}

// ---------------------------------------------------------------------------
// Group-reduce
// ---------------------------------------------------------------------------

/// Group a table by one or more key columns and reduce the value column.
///
/// `Count` counts the rows of each group regardless of the value column;
/// the other functions skip null value cells, and a group whose value cells
/// are all null reduces to null. Rows with a null group key are excluded
/// from grouping. Output rows are ordered ascending by group-key tuple.
pub fn group_reduce(table: &Table, req: &AggregationRequest) -> Result<Table> {
    validate(table, req)?;

    let key_cols: Vec<&Column> = req
        .group_by
        .iter()
        .map(|name| table.column(name).expect("validated"))
        .collect();
    let value_col = table.column(&req.value).expect("validated");

    let mut groups: BTreeMap<Vec<KeyPart>, Vec<usize>> = BTreeMap::new();
    'rows: for row in 0..table.n_rows() {
        let mut key = Vec::with_capacity(key_cols.len());
        for col in &key_cols {
            if col.is_null(row) {
                continue 'rows;
            }
            key.push(key_part(col, row));
        }
        groups.entry(key).or_default().push(row);
    }

    // One representative row per group carries the typed key values.
    let reps: Vec<usize> = groups.values().map(|rows| rows[0]).collect();
    let mut columns: Vec<Column> = key_cols.iter().map(|c| c.take_rows(&reps)).collect();

    let reduced: Vec<Option<f64>> = groups
        .values()
        .map(|rows| match req.func {
            AggFn::Count => Some(rows.len() as f64),
            func => reduce(
                rows.iter().filter_map(|&r| value_col.numeric_at(r)),
                func,
            ),
        })
        .collect();

    let value_name = match req.func {
        AggFn::Count => "count".to_string(),
        _ => req.value.clone(),
    };
    columns.push(Column::new(value_name, ColumnData::Numeric(reduced)));

    Table::new(columns)
}

/// Pivot mode: identical reduction semantics, with the group-by columns as
/// the row index of the output table.
pub fn pivot(table: &Table, req: &AggregationRequest) -> Result<Table> {
    group_reduce(table, req)
}

fn validate(table: &Table, req: &AggregationRequest) -> Result<()> {
    if req.group_by.is_empty() {
        return Err(DataError::InvalidAggregationRequest(
            "at least one group-by column is required".to_string(),
        ));
    }
    for (i, name) in req.group_by.iter().enumerate() {
        if table.column(name).is_none() {
            return Err(DataError::InvalidAggregationRequest(format!(
                "unknown group-by column '{name}'"
            )));
        }
        if req.group_by[..i].contains(name) {
            return Err(DataError::InvalidAggregationRequest(format!(
                "duplicate group-by column '{name}'"
            )));
        }
    }
    if table.column(&req.value).is_none() {
        return Err(DataError::InvalidAggregationRequest(format!(
            "unknown value column '{}'",
            req.value
        )));
    }
    if req.func != AggFn::Count && req.group_by.contains(&req.value) {
        return Err(DataError::InvalidAggregationRequest(format!(
            "value column '{}' is also a group-by column",
            req.value
        )));
    }
    Ok(())
}

/// Null-skipping reduction over a group's value cells. `None` when the
/// group has no non-null cells.
fn reduce(values: impl Iterator<Item = f64>, func: AggFn) -> Option<f64> {
    let mut values: Vec<f64> = values.collect();
    if values.is_empty() {
        return None;
    }
    match func {
        AggFn::Sum => Some(values.iter().sum()),
        AggFn::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        AggFn::Median => {
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            if values.len() % 2 == 1 {
                Some(values[mid])
            } else {
                Some((values[mid - 1] + values[mid]) / 2.0)
            }
        }
        AggFn::Count => unreachable!("count never reaches reduce"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, ColumnType};

    fn years_table() -> Table {
        Table::new(vec![
            Column::new(
                "year",
                ColumnData::Year(vec![Some(2020), Some(2020), Some(2021)]),
            ),
            Column::new(
                "val",
                ColumnData::Numeric(vec![Some(10.0), Some(20.0), Some(5.0)]),
            ),
        ])
        .unwrap()
    }

    fn request(group_by: &[&str], value: &str, func: AggFn) -> AggregationRequest {
        AggregationRequest {
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            value: value.to_string(),
            func,
        }
    }

    #[test]
    fn mean_by_year() {
        let out = group_reduce(&years_table(), &request(&["year"], "val", AggFn::Mean)).unwrap();
        assert_eq!(out.n_rows(), 2);
        let year = out.column("year").unwrap();
        let val = out.column("val").unwrap();
        assert_eq!(year.cell(0), CellValue::Int(2020));
        assert_eq!(val.numeric_at(0), Some(15.0));
        assert_eq!(year.cell(1), CellValue::Int(2021));
        assert_eq!(val.numeric_at(1), Some(5.0));
    }

    #[test]
    fn count_ignores_value_column() {
        let out = group_reduce(&years_table(), &request(&["year"], "val", AggFn::Count)).unwrap();
        let count = out.column("count").unwrap();
        assert_eq!(count.numeric_at(0), Some(2.0));
        assert_eq!(count.numeric_at(1), Some(1.0));
    }

    #[test]
    fn mean_skips_null_cells() {
        let table = Table::new(vec![
            Column::new(
                "g",
                ColumnData::Categorical(vec![Some("A".into()), Some("A".into())]),
            ),
            Column::new("val", ColumnData::Numeric(vec![None, Some(4.0)])),
        ])
        .unwrap();
        let out = group_reduce(&table, &request(&["g"], "val", AggFn::Mean)).unwrap();
        assert_eq!(out.column("val").unwrap().numeric_at(0), Some(4.0));
    }

    #[test]
    fn all_null_group_reduces_to_null() {
        let table = Table::new(vec![
            Column::new(
                "g",
                ColumnData::Categorical(vec![Some("A".into()), Some("B".into())]),
            ),
            Column::new("val", ColumnData::Numeric(vec![None, Some(1.0)])),
        ])
        .unwrap();
        let out = group_reduce(&table, &request(&["g"], "val", AggFn::Sum)).unwrap();
        assert_eq!(out.column("val").unwrap().numeric_at(0), None);
        assert_eq!(out.column("val").unwrap().numeric_at(1), Some(1.0));
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(reduce([1.0, 3.0, 2.0].into_iter(), AggFn::Median), Some(2.0));
        assert_eq!(
            reduce([4.0, 1.0, 3.0, 2.0].into_iter(), AggFn::Median),
            Some(2.5)
        );
    }

    #[test]
    fn zero_group_by_columns_rejected() {
        let err = group_reduce(&years_table(), &request(&[], "val", AggFn::Mean)).unwrap_err();
        assert!(matches!(err, DataError::InvalidAggregationRequest(_)));
    }

    #[test]
    fn unknown_value_column_rejected() {
        let err =
            group_reduce(&years_table(), &request(&["year"], "nope", AggFn::Mean)).unwrap_err();
        assert!(matches!(err, DataError::InvalidAggregationRequest(_)));
    }

    #[test]
    fn value_equal_to_group_key_rejected_unless_count() {
        let err =
            group_reduce(&years_table(), &request(&["year"], "year", AggFn::Mean)).unwrap_err();
        assert!(matches!(err, DataError::InvalidAggregationRequest(_)));
        // Count ignores the value column, so the same shape is fine.
        assert!(group_reduce(&years_table(), &request(&["year"], "year", AggFn::Count)).is_ok());
    }

    #[test]
    fn output_ordered_by_key_tuple() {
        let table = Table::new(vec![
            Column::new(
                "district",
                ColumnData::Categorical(vec![
                    Some("South".into()),
                    Some("North".into()),
                    Some("South".into()),
                ]),
            ),
            Column::new(
                "year",
                ColumnData::Year(vec![Some(2021), Some(2020), Some(2020)]),
            ),
            Column::new(
                "val",
                ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0)]),
            ),
        ])
        .unwrap();
        let out = pivot(&table, &request(&["district", "year"], "val", AggFn::Sum)).unwrap();
        let district = out.column("district").unwrap();
        let year = out.column("year").unwrap();
        assert_eq!(
            (district.display(0), year.cell(0)),
            ("North".to_string(), CellValue::Int(2020))
        );
        assert_eq!(
            (district.display(1), year.cell(1)),
            ("South".to_string(), CellValue::Int(2020))
        );
        assert_eq!(
            (district.display(2), year.cell(2)),
            ("South".to_string(), CellValue::Int(2021))
        );
    }

    #[test]
    fn key_columns_keep_their_type() {
        let out = group_reduce(&years_table(), &request(&["year"], "val", AggFn::Mean)).unwrap();
        assert_eq!(out.column("year").unwrap().column_type(), ColumnType::Year);
    }

    #[test]
    fn null_group_keys_are_excluded() {
        let table = Table::new(vec![
            Column::new(
                "g",
                ColumnData::Categorical(vec![Some("A".into()), None, Some("A".into())]),
            ),
            Column::new(
                "val",
                ColumnData::Numeric(vec![Some(1.0), Some(100.0), Some(3.0)]),
            ),
        ])
        .unwrap();
        let out = group_reduce(&table, &request(&["g"], "val", AggFn::Sum)).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.column("val").unwrap().numeric_at(0), Some(4.0));
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let table = Table::new(vec![
            Column::new("g", ColumnData::Categorical(vec![])),
            Column::new("val", ColumnData::Numeric(vec![])),
        ])
        .unwrap();
        let out = group_reduce(&table, &request(&["g"], "val", AggFn::Mean)).unwrap();
        assert_eq!(out.n_rows(), 0);
        assert_eq!(out.n_cols(), 2);
    }
}
