use std::collections::BTreeSet;

use crate::color::ColorMap;
use crate::data::aggregate::{pivot, AggFn, AggregationRequest};
use crate::data::filter::{
    apply_filters, filter_domains, init_filter_state, FilterAxis, FilterSpec,
};
use crate::data::infer::YEAR_COLUMN;
use crate::data::loader::{LoadOutcome, SheetSkip};
use crate::data::model::{ColumnData, ColumnType, Table, Workbook};
use crate::data::pipeline::{prepare, Diagnostics, PipelineParams, SheetChoice};

/// At most this many rows of any table are rendered in the preview.
pub const PREVIEW_ROWS: usize = 200;

/// At most this many categorical columns are offered as filter axes,
/// alongside the year axis.
pub const MAX_CATEGORICAL_FILTERS: usize = 3;

// ---------------------------------------------------------------------------
// Plot selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Line,
    Bar,
    Scatter,
    Histogram,
}

impl PlotKind {
    pub const ALL: [PlotKind; 4] = [
        PlotKind::Line,
        PlotKind::Bar,
        PlotKind::Scatter,
        PlotKind::Histogram,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PlotKind::Line => "Line (over year)",
            PlotKind::Bar => "Bar (by category)",
            PlotKind::Scatter => "Scatter",
            PlotKind::Histogram => "Histogram",
        }
    }
}

/// Which table the preview panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSource {
    Filtered,
    Pivot,
    Stats,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering. All "current selection"
/// state lives here and is threaded into the pure pipeline functions; the
/// derived tables are recomputed whenever a parameter changes.
pub struct AppState {
    /// Loaded workbook (None until a source is opened).
    pub workbook: Option<Workbook>,

    /// Sheets the loader had to skip, surfaced as a non-fatal warning.
    pub skipped_sheets: Vec<SheetSkip>,

    /// Sheet choice, null-row handling and active filters.
    pub params: PipelineParams,

    /// Prepared table: selected/unified, inferred, null rows dropped.
    pub prepared: Option<Table>,

    /// Diagnostics from the last pipeline run.
    pub diagnostics: Diagnostics,

    /// Columns offered for filtering: year interval plus up to
    /// [`MAX_CATEGORICAL_FILTERS`] categorical sets.
    pub filter_axes: Vec<FilterAxis>,

    /// Prepared table after filtering (cached).
    pub filtered: Option<Table>,

    // ---- plotting ----
    pub plot_kind: PlotKind,
    pub plot_agg: AggFn,
    /// Numeric column plotted on the y axis.
    pub plot_value: Option<String>,
    /// Bar category column.
    pub plot_x: Option<String>,
    /// Scatter x column (numeric, year allowed).
    pub scatter_x: Option<String>,
    pub hist_bins: usize,
    pub show_trend: bool,

    /// Which categorical column colours scatter points and bars.
    pub color_column: Option<String>,
    pub color_map: Option<ColorMap>,

    // ---- pivot ----
    pub pivot_group_by: Vec<String>,
    pub pivot_value: Option<String>,
    pub pivot_func: AggFn,
    pub pivot_result: Option<Table>,

    pub preview_source: PreviewSource,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            workbook: None,
            skipped_sheets: Vec::new(),
            params: PipelineParams::default(),
            prepared: None,
            diagnostics: Diagnostics::default(),
            filter_axes: Vec::new(),
            filtered: None,
            plot_kind: PlotKind::Line,
            plot_agg: AggFn::Mean,
            plot_value: None,
            plot_x: None,
            scatter_x: None,
            hist_bins: 20,
            show_trend: true,
            color_column: None,
            color_map: None,
            pivot_group_by: Vec::new(),
            pivot_value: None,
            pivot_func: AggFn::Mean,
            pivot_result: None,
            preview_source: PreviewSource::Filtered,
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a freshly loaded workbook and rebuild everything downstream.
    pub fn set_load_outcome(&mut self, outcome: LoadOutcome) {
        // Default to the first sheet, like the sheet picker shows it.
        self.params.sheet = outcome
            .workbook
            .sheet_names()
            .next()
            .map(|n| SheetChoice::Sheet(n.to_string()))
            .unwrap_or_default();
        self.skipped_sheets = outcome.skipped;
        self.workbook = Some(outcome.workbook);
        self.status_message = None;
        self.rebuild();
    }

    /// Recompute the prepared table, filter axes and everything derived
    /// from them. Called after sheet choice or null-row toggle changes.
    pub fn rebuild(&mut self) {
        let Some(workbook) = &self.workbook else {
            return;
        };

        match prepare(workbook, &self.params) {
            Ok((table, diagnostics)) => {
                self.diagnostics = diagnostics;
                self.rebuild_axes(&table);
                self.params.filters = init_filter_state(&self.filter_axes);
                self.refresh_column_choices(&table);
                self.prepared = Some(table);
                self.status_message = None;
                self.refilter();
            }
            Err(e) => {
                log::error!("pipeline failed: {e}");
                self.prepared = None;
                self.filtered = None;
                self.pivot_result = None;
                self.filter_axes.clear();
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Recompute the filtered table and the pivot after a filter change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.prepared {
            let filtered = apply_filters(table, &self.params.filters);
            self.diagnostics.rows_filtered = filtered.n_rows();
            self.filtered = Some(filtered);
        }
        self.recompute_pivot();
    }

    pub fn set_sheet_choice(&mut self, choice: SheetChoice) {
        if self.params.sheet != choice {
            self.params.sheet = choice;
            self.rebuild();
        }
    }

    pub fn set_drop_null_rows(&mut self, drop: bool) {
        if self.params.drop_null_rows != drop {
            self.params.drop_null_rows = drop;
            self.rebuild();
        }
    }

    // ---- filter editing -------------------------------------------------

    /// Toggle a single admitted value in a categorical filter.
    pub fn toggle_filter_value(&mut self, column: &str, value: &str) {
        let Some(FilterSpec::OneOf(selected)) = self.params.filters.get_mut(column) else {
            return;
        };
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Admit every value of the column's domain.
    pub fn select_all(&mut self, column: &str) {
        if let Some(axis) = self.filter_axes.iter().find(|a| a.column == column) {
            self.params
                .filters
                .insert(column.to_string(), axis.domain.clone());
            self.refilter();
        }
    }

    /// Admit nothing: zero surviving rows, distinct from "no filter".
    pub fn select_none(&mut self, column: &str) {
        self.params
            .filters
            .insert(column.to_string(), FilterSpec::OneOf(BTreeSet::new()));
        self.refilter();
    }

    /// Set an inclusive numeric/year interval filter.
    pub fn set_range(&mut self, column: &str, lo: f64, hi: f64) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        self.params
            .filters
            .insert(column.to_string(), FilterSpec::Range { lo, hi });
        self.refilter();
    }

    // ---- plotting / pivot configuration ---------------------------------

    pub fn set_color_column(&mut self, column: Option<String>) {
        self.color_column = column;
        self.rebuild_color_map();
    }

    pub fn recompute_pivot(&mut self) {
        self.pivot_result = None;
        let (Some(table), Some(value)) = (&self.filtered, &self.pivot_value) else {
            return;
        };
        if self.pivot_group_by.is_empty() {
            return;
        }
        let request = AggregationRequest {
            group_by: self.pivot_group_by.clone(),
            value: value.clone(),
            func: self.pivot_func,
        };
        match pivot(table, &request) {
            Ok(result) => self.pivot_result = Some(result),
            Err(e) => self.status_message = Some(format!("Pivot: {e}")),
        }
    }

    /// Numeric (including year) column names of the prepared table.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of(&[ColumnType::Numeric, ColumnType::Year])
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns_of(&[ColumnType::Categorical])
    }

    fn columns_of(&self, types: &[ColumnType]) -> Vec<String> {
        self.prepared
            .as_ref()
            .map(|t| {
                t.columns()
                    .iter()
                    .filter(|c| types.contains(&c.column_type()))
                    .map(|c| c.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- internal rebuilds ----------------------------------------------

    /// Offer the year interval plus the first few low-cardinality
    /// categorical columns as filter axes.
    fn rebuild_axes(&mut self, table: &Table) {
        let domains = filter_domains(table);
        let mut axes: Vec<FilterAxis> = domains
            .iter()
            .filter(|a| a.column.eq_ignore_ascii_case(YEAR_COLUMN))
            .cloned()
            .collect();
        axes.extend(
            domains
                .into_iter()
                .filter(|a| {
                    matches!(a.domain, FilterSpec::OneOf(_))
                        && !a.column.eq_ignore_ascii_case(YEAR_COLUMN)
                })
                .take(MAX_CATEGORICAL_FILTERS),
        );
        self.filter_axes = axes;
    }

    /// Keep column-based selections valid for the new table, falling back
    /// to the first candidate of the right type.
    fn refresh_column_choices(&mut self, table: &Table) {
        let numeric_all: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| matches!(c.column_type(), ColumnType::Numeric | ColumnType::Year))
            .map(|c| c.name.clone())
            .collect();
        let numeric: Vec<String> = numeric_all
            .iter()
            .filter(|n| !n.eq_ignore_ascii_case(YEAR_COLUMN))
            .cloned()
            .collect();
        let categorical: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| matches!(c.data, ColumnData::Categorical(_)))
            .map(|c| c.name.clone())
            .collect();

        let keep = |choice: &mut Option<String>, candidates: &[String]| {
            let valid = choice
                .as_ref()
                .is_some_and(|c| candidates.iter().any(|n| n == c));
            if !valid {
                *choice = candidates.first().cloned();
            }
        };

        keep(&mut self.plot_value, &numeric);
        keep(&mut self.plot_x, &categorical);
        keep(&mut self.scatter_x, &numeric_all);
        keep(&mut self.pivot_value, &numeric);
        keep(&mut self.color_column, &categorical);

        self.pivot_group_by.retain(|c| categorical.iter().any(|n| n == c));
        if self.pivot_group_by.is_empty() {
            if let Some(first) = categorical.first() {
                self.pivot_group_by.push(first.clone());
            }
        }
        self.rebuild_color_map_from(table);
    }

    fn rebuild_color_map(&mut self) {
        if let Some(table) = self.prepared.clone() {
            self.rebuild_color_map_from(&table);
        }
    }

    fn rebuild_color_map_from(&mut self, table: &Table) {
        self.color_map = self.color_column.as_ref().and_then(|name| {
            let col = table.column(name)?;
            let ColumnData::Categorical(values) = &col.data else {
                return None;
            };
            let distinct: BTreeSet<String> = values.iter().flatten().cloned().collect();
            Some(ColorMap::new(name, &distinct))
        });
    }
}
