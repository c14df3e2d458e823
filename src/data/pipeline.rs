use serde::{Deserialize, Serialize};

use super::error::{DataError, Result};
use super::filter::{apply_filters, FilterState};
use super::infer::infer_schema;
use super::model::{Table, Workbook};
use super::summary::null_counts;
use super::unify::{unify, UnifySource};

// ---------------------------------------------------------------------------
// Pipeline parameters – all "current selection" state, threaded explicitly
// ---------------------------------------------------------------------------

/// Which part of the workbook feeds the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SheetChoice {
    /// A single named sheet.
    Sheet(String),
    /// Merge all sheets per the unification precedence rule.
    UnifyAll,
}

impl Default for SheetChoice {
    fn default() -> Self {
        SheetChoice::UnifyAll
    }
}

/// Caller-held configuration for one pipeline run. No ambient state: the
/// same workbook and params always produce the same table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub sheet: SheetChoice,
    pub drop_null_rows: bool,
    pub filters: FilterState,
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            sheet: SheetChoice::default(),
            drop_null_rows: true,
            filters: FilterState::default(),
        }
    }
}

/// Non-fatal observations from a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Set when unification had to fall back to concatenating arbitrary
    /// sheets; the merge is best-effort, not guaranteed correct.
    pub unify_fallback: Option<String>,
    /// Null tallies per column of the prepared (pre-filter) table.
    pub null_counts: Vec<(String, usize)>,
    /// Row count before filtering.
    pub rows_total: usize,
    /// Row count after filtering.
    pub rows_filtered: usize,
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Sheet selection / unification plus schema inference and the optional
/// all-null row drop: the table that filter domains derive from.
pub fn prepare(workbook: &Workbook, params: &PipelineParams) -> Result<(Table, Diagnostics)> {
    if workbook.is_empty() {
        return Err(DataError::NoDataAvailable);
    }

    let mut diagnostics = Diagnostics::default();
    let base = match &params.sheet {
        SheetChoice::Sheet(name) => workbook
            .get(name)
            .cloned()
            .ok_or_else(|| DataError::SheetNotFound(name.clone()))?,
        SheetChoice::UnifyAll => {
            let unified = unify(workbook);
            if let UnifySource::Fallback(names) = &unified.source {
                let msg = format!(
                    "no 'all' or canonical period sheet found; concatenated {} sheet(s) \
                     in workbook order as a best effort",
                    names.len()
                );
                log::warn!("{msg}");
                diagnostics.unify_fallback = Some(msg);
            }
            unified.table
        }
    };

    let mut table = infer_schema(base);
    if params.drop_null_rows {
        table = table.drop_all_null_rows();
    }

    diagnostics.rows_total = table.n_rows();
    diagnostics.rows_filtered = table.n_rows();
    diagnostics.null_counts = null_counts(&table);
    Ok((table, diagnostics))
}

/// Full pipeline: [`prepare`] then filtering. Invoked once per external
/// parameter change; recomputation is deterministic, so repeated calls with
/// identical inputs return value-equal tables.
pub fn process(workbook: &Workbook, params: &PipelineParams) -> Result<(Table, Diagnostics)> {
    let (table, mut diagnostics) = prepare(workbook, params)?;
    let filtered = apply_filters(&table, &params.filters);
    diagnostics.rows_filtered = filtered.n_rows();
    Ok((filtered, diagnostics))
}
