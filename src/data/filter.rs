use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{Column, ColumnData, Table};

/// Categorical columns with more distinct values than this are not offered
/// as filter axes at all (not truncated).
pub const MAX_FILTER_CHOICES: usize = 30;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Per-column filter predicate.
///
/// * `OneOf` – admitted value set for a categorical column; an empty set
///   admits nothing (distinct from "no filter", which is the column being
///   absent from the [`FilterState`]).
/// * `Range` – closed interval for a numeric or year column; both ends
///   inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterSpec {
    OneOf(BTreeSet<String>),
    Range { lo: f64, hi: f64 },
}

/// Active filter state: column name → predicate. Columns not present are
/// unconstrained. Filters compose by logical AND across columns.
pub type FilterState = BTreeMap<String, FilterSpec>;

/// A column offered for filtering, with its full domain derived from the
/// column's current values.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterAxis {
    pub column: String,
    pub domain: FilterSpec,
}

// ---------------------------------------------------------------------------
// Domain construction
// ---------------------------------------------------------------------------

/// Build the filterable axes of a table from its *current* values:
/// distinct sets for categorical columns (bounded by
/// [`MAX_FILTER_CHOICES`]), observed [min, max] for numeric/year columns.
/// Columns with no non-null values are not offered.
pub fn filter_domains(table: &Table) -> Vec<FilterAxis> {
    table
        .columns()
        .iter()
        .filter_map(|col| {
            let domain = column_domain(col)?;
            Some(FilterAxis {
                column: col.name.clone(),
                domain,
            })
        })
        .collect()
}

fn column_domain(col: &Column) -> Option<FilterSpec> {
    match &col.data {
        ColumnData::Categorical(values) => {
            let distinct: BTreeSet<String> =
                values.iter().flatten().cloned().collect();
            if distinct.is_empty() || distinct.len() > MAX_FILTER_CHOICES {
                return None;
            }
            Some(FilterSpec::OneOf(distinct))
        }
        ColumnData::Numeric(_) | ColumnData::Year(_) => {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for row in 0..col.len() {
                if let Some(v) = col.numeric_at(row) {
                    min = min.min(v);
                    max = max.max(v);
                }
            }
            if min > max {
                return None;
            }
            Some(FilterSpec::Range { lo: min, hi: max })
        }
        // Uninferred columns are never offered.
        ColumnData::Mixed(_) => None,
    }
}

/// Initialise a [`FilterState`] covering every axis's full domain.
pub fn init_filter_state(axes: &[FilterAxis]) -> FilterState {
    axes.iter()
        .map(|axis| (axis.column.clone(), axis.domain.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Application – pure row selection
// ---------------------------------------------------------------------------

/// Select the rows passing every active filter, as a new table.
///
/// A row survives iff, for every column with an active spec, its value is
/// admitted. Null cells fail any active spec. Specs naming columns the
/// table does not have impose no constraint.
pub fn apply_filters(table: &Table, filters: &FilterState) -> Table {
    let active: Vec<(&Column, &FilterSpec)> = filters
        .iter()
        .filter_map(|(name, spec)| table.column(name).map(|col| (col, spec)))
        .collect();

    let keep: Vec<usize> = (0..table.n_rows())
        .filter(|&row| active.iter().all(|(col, spec)| admits(col, row, spec)))
        .collect();
    table.take_rows(&keep)
}

fn admits(col: &Column, row: usize, spec: &FilterSpec) -> bool {
    match spec {
        FilterSpec::OneOf(selected) => {
            if col.is_null(row) {
                return false;
            }
            selected.contains(&col.display(row))
        }
        FilterSpec::Range { lo, hi } => match col.numeric_at(row) {
            Some(v) => *lo <= v && v <= *hi,
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnData, Table};

    fn sample() -> Table {
        Table::new(vec![
            Column::new(
                "district",
                ColumnData::Categorical(vec![
                    Some("North".into()),
                    Some("South".into()),
                    Some("North".into()),
                    None,
                ]),
            ),
            Column::new(
                "wait",
                ColumnData::Numeric(vec![Some(5.0), Some(7.5), Some(10.0), Some(3.0)]),
            ),
            Column::new(
                "year",
                ColumnData::Year(vec![Some(2020), Some(2021), Some(2022), Some(2020)]),
            ),
        ])
        .unwrap()
    }

    fn one_of(values: &[&str]) -> FilterSpec {
        FilterSpec::OneOf(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn domains_reflect_current_values() {
        let axes = filter_domains(&sample());
        let district = axes.iter().find(|a| a.column == "district").unwrap();
        assert_eq!(district.domain, one_of(&["North", "South"]));

        let wait = axes.iter().find(|a| a.column == "wait").unwrap();
        assert_eq!(wait.domain, FilterSpec::Range { lo: 3.0, hi: 10.0 });

        let year = axes.iter().find(|a| a.column == "year").unwrap();
        assert_eq!(
            year.domain,
            FilterSpec::Range {
                lo: 2020.0,
                hi: 2022.0
            }
        );
    }

    #[test]
    fn high_cardinality_column_not_offered() {
        let values: Vec<Option<String>> =
            (0..40).map(|i| Some(format!("facility_{i}"))).collect();
        let table =
            Table::new(vec![Column::new("facility", ColumnData::Categorical(values))]).unwrap();
        assert!(filter_domains(&table).is_empty());
    }

    #[test]
    fn all_null_column_not_offered() {
        let table = Table::new(vec![Column::new(
            "empty",
            ColumnData::Numeric(vec![None, None]),
        )])
        .unwrap();
        assert!(filter_domains(&table).is_empty());
    }

    #[test]
    fn no_active_filter_keeps_all_rows() {
        let table = sample();
        let filtered = apply_filters(&table, &FilterState::new());
        assert_eq!(filtered.n_rows(), table.n_rows());
    }

    #[test]
    fn empty_admitted_set_yields_zero_rows() {
        let mut filters = FilterState::new();
        filters.insert("district".into(), one_of(&[]));
        assert_eq!(apply_filters(&sample(), &filters).n_rows(), 0);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let mut filters = FilterState::new();
        filters.insert("wait".into(), FilterSpec::Range { lo: 5.0, hi: 10.0 });
        let filtered = apply_filters(&sample(), &filters);
        // 5.0 and 10.0 admitted, 7.5 inside, 3.0 out.
        assert_eq!(filtered.n_rows(), 3);
    }

    #[test]
    fn filters_compose_with_and() {
        let mut filters = FilterState::new();
        filters.insert("district".into(), one_of(&["North"]));
        filters.insert(
            "year".into(),
            FilterSpec::Range {
                lo: 2021.0,
                hi: 2022.0,
            },
        );
        let filtered = apply_filters(&sample(), &filters);
        assert_eq!(filtered.n_rows(), 1);
        assert_eq!(filtered.column("wait").unwrap().numeric_at(0), Some(10.0));
    }

    #[test]
    fn null_cell_fails_active_spec() {
        let mut filters = FilterState::new();
        filters.insert("district".into(), one_of(&["North", "South"]));
        let filtered = apply_filters(&sample(), &filters);
        // Row with null district dropped.
        assert_eq!(filtered.n_rows(), 3);
    }

    #[test]
    fn filtered_rows_satisfy_every_spec() {
        let table = sample();
        let mut filters = FilterState::new();
        filters.insert("wait".into(), FilterSpec::Range { lo: 4.0, hi: 9.0 });
        filters.insert("district".into(), one_of(&["North", "South"]));

        let filtered = apply_filters(&table, &filters);
        assert!(filtered.n_rows() <= table.n_rows());
        for row in 0..filtered.n_rows() {
            let wait = filtered.column("wait").unwrap().numeric_at(row).unwrap();
            assert!((4.0..=9.0).contains(&wait));
            let district = filtered.column("district").unwrap().display(row);
            assert!(district == "North" || district == "South");
        }
    }
}
