use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::aggregate::AggFn;
use crate::data::export::csv_download;
use crate::data::filter::FilterSpec;
use crate::data::infer::YEAR_COLUMN;
use crate::data::model::Table;
use crate::data::pipeline::SheetChoice;
use crate::data::summary::{describe, null_counts};
use crate::data::{loader, unify};
use crate::state::{AppState, PlotKind, PreviewSource, PREVIEW_ROWS};

// ---------------------------------------------------------------------------
// Left side panel – data source, filters, plot and pivot controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Controls");
    ui.separator();

    if state.workbook.is_none() {
        ui.label("No workbook loaded.");
        ui.label("Use File → Open…, or File → Open repository dataset.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            data_section(ui, state);
            ui.separator();
            filter_section(ui, state);
            ui.separator();
            plot_section(ui, state);
            ui.separator();
            pivot_section(ui, state);
        });
}

fn data_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Data");

    let sheet_names: Vec<String> = state
        .workbook
        .as_ref()
        .map(|wb| wb.sheet_names().map(String::from).collect())
        .unwrap_or_default();

    let selected_text = match &state.params.sheet {
        SheetChoice::Sheet(name) => name.clone(),
        SheetChoice::UnifyAll => "Unify all sheets".to_string(),
    };

    egui::ComboBox::from_id_salt("sheet_choice")
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            for name in &sheet_names {
                let current = state.params.sheet == SheetChoice::Sheet(name.clone());
                if ui.selectable_label(current, name).clicked() {
                    state.set_sheet_choice(SheetChoice::Sheet(name.clone()));
                }
            }
            let unify_all = state.params.sheet == SheetChoice::UnifyAll;
            if ui.selectable_label(unify_all, "Unify all sheets").clicked() {
                state.set_sheet_choice(SheetChoice::UnifyAll);
            }
        });

    let mut drop = state.params.drop_null_rows;
    if ui.checkbox(&mut drop, "Drop all-null rows").changed() {
        state.set_drop_null_rows(drop);
    }

    if let Some(table) = &state.prepared {
        egui::CollapsingHeader::new("Columns")
            .default_open(false)
            .show(ui, |ui: &mut Ui| {
                for col in table.columns() {
                    ui.label(format!("{}: {}", col.name, col.column_type()));
                }
            });
    }
}

fn filter_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Filters");

    if state.filter_axes.is_empty() {
        ui.label("No filterable columns.");
        return;
    }

    // Clone so filter edits can mutate state inside the loop.
    let axes = state.filter_axes.clone();
    for axis in &axes {
        match &axis.domain {
            FilterSpec::Range { lo: dom_lo, hi: dom_hi } => {
                range_filter(ui, state, &axis.column, *dom_lo, *dom_hi);
            }
            FilterSpec::OneOf(domain) => {
                set_filter(ui, state, &axis.column, domain);
            }
        }
    }
}

fn range_filter(ui: &mut Ui, state: &mut AppState, column: &str, dom_lo: f64, dom_hi: f64) {
    let (cur_lo, cur_hi) = match state.params.filters.get(column) {
        Some(FilterSpec::Range { lo, hi }) => (*lo, *hi),
        _ => (dom_lo, dom_hi),
    };

    ui.label(RichText::new(format!("{column} range")).strong());
    let mut changed = false;

    if column.eq_ignore_ascii_case(YEAR_COLUMN) {
        let (mut lo, mut hi) = (cur_lo as i64, cur_hi as i64);
        ui.horizontal(|ui: &mut Ui| {
            changed |= ui
                .add(egui::DragValue::new(&mut lo).range(dom_lo as i64..=dom_hi as i64))
                .changed();
            ui.label("to");
            changed |= ui
                .add(egui::DragValue::new(&mut hi).range(dom_lo as i64..=dom_hi as i64))
                .changed();
        });
        if changed {
            state.set_range(column, lo as f64, hi as f64);
        }
    } else {
        let (mut lo, mut hi) = (cur_lo, cur_hi);
        let speed = ((dom_hi - dom_lo) / 100.0).max(0.01);
        ui.horizontal(|ui: &mut Ui| {
            changed |= ui
                .add(egui::DragValue::new(&mut lo).range(dom_lo..=dom_hi).speed(speed))
                .changed();
            ui.label("to");
            changed |= ui
                .add(egui::DragValue::new(&mut hi).range(dom_lo..=dom_hi).speed(speed))
                .changed();
        });
        if changed {
            state.set_range(column, lo, hi);
        }
    }
}

fn set_filter(
    ui: &mut Ui,
    state: &mut AppState,
    column: &str,
    domain: &std::collections::BTreeSet<String>,
) {
    let selected = match state.params.filters.get(column) {
        Some(FilterSpec::OneOf(s)) => s.clone(),
        _ => domain.clone(),
    };

    let header_text = format!("{column}  ({}/{})", selected.len(), domain.len());
    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(column)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(column);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(column);
                }
            });

            for val in domain {
                let mut checked = selected.contains(val);
                if ui.checkbox(&mut checked, val).changed() {
                    state.toggle_filter_value(column, val);
                }
            }
        });
}

fn plot_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Plot");

    let numeric = state.numeric_columns();
    let numeric_no_year: Vec<String> = numeric
        .iter()
        .filter(|n| !n.eq_ignore_ascii_case(YEAR_COLUMN))
        .cloned()
        .collect();
    let categorical = state.categorical_columns();

    egui::ComboBox::from_id_salt("plot_kind")
        .selected_text(state.plot_kind.label())
        .show_ui(ui, |ui: &mut Ui| {
            for kind in PlotKind::ALL {
                ui.selectable_value(&mut state.plot_kind, kind, kind.label());
            }
        });

    column_combo(ui, "plot_value", "Value", &mut state.plot_value, &numeric_no_year);

    match state.plot_kind {
        PlotKind::Line | PlotKind::Bar => {
            if state.plot_kind == PlotKind::Bar {
                column_combo(ui, "plot_x", "Category", &mut state.plot_x, &categorical);
            }
            agg_combo(ui, "plot_agg", &mut state.plot_agg);
        }
        PlotKind::Scatter => {
            column_combo(ui, "scatter_x", "X", &mut state.scatter_x, &numeric);
            ui.checkbox(&mut state.show_trend, "Trend line");
        }
        PlotKind::Histogram => {
            ui.add(egui::Slider::new(&mut state.hist_bins, 5..=100).text("Bins"));
        }
    }

    // Colour-by selector (scatter points, bar fills).
    let current = state
        .color_column
        .clone()
        .unwrap_or_else(|| "(none)".to_string());
    egui::ComboBox::from_id_salt("color_by")
        .selected_text(format!("Color by: {current}"))
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(state.color_column.is_none(), "(none)")
                .clicked()
            {
                state.set_color_column(None);
            }
            for col in &categorical {
                if ui
                    .selectable_label(state.color_column.as_deref() == Some(col), col)
                    .clicked()
                {
                    state.set_color_column(Some(col.clone()));
                }
            }
        });
}

fn pivot_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Pivot");

    let categorical = state.categorical_columns();
    if categorical.is_empty() {
        ui.label("No categorical columns to group by.");
        return;
    }

    let mut changed = false;
    ui.label("Group by:");
    for col in &categorical {
        let mut checked = state.pivot_group_by.contains(col);
        if ui.checkbox(&mut checked, col).changed() {
            if checked {
                state.pivot_group_by.push(col.clone());
            } else {
                state.pivot_group_by.retain(|c| c != col);
            }
            changed = true;
        }
    }

    let numeric: Vec<String> = state
        .numeric_columns()
        .into_iter()
        .filter(|n| !n.eq_ignore_ascii_case(YEAR_COLUMN))
        .collect();
    changed |= column_combo(ui, "pivot_value", "Value", &mut state.pivot_value, &numeric);
    changed |= agg_combo(ui, "pivot_func", &mut state.pivot_func);

    if state.pivot_group_by.is_empty() {
        ui.label("Pick at least one group-by column.");
    }
    if changed {
        state.recompute_pivot();
    }
}

/// Combo box over a list of column names. Returns true when the selection
/// changed.
fn column_combo(
    ui: &mut Ui,
    id: &str,
    label: &str,
    choice: &mut Option<String>,
    options: &[String],
) -> bool {
    let mut changed = false;
    let selected = choice.clone().unwrap_or_else(|| "(none)".to_string());
    egui::ComboBox::from_id_salt(id)
        .selected_text(format!("{label}: {selected}"))
        .show_ui(ui, |ui: &mut Ui| {
            for col in options {
                if ui
                    .selectable_label(choice.as_deref() == Some(col), col)
                    .clicked()
                {
                    *choice = Some(col.clone());
                    changed = true;
                }
            }
        });
    changed
}

fn agg_combo(ui: &mut Ui, id: &str, func: &mut AggFn) -> bool {
    let mut changed = false;
    egui::ComboBox::from_id_salt(id)
        .selected_text(format!("Aggregation: {}", func.label()))
        .show_ui(ui, |ui: &mut Ui| {
            for f in AggFn::ALL {
                changed |= ui.selectable_value(func, f, f.label()).changed();
            }
        });
    changed
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open repository dataset").clicked() {
                open_default_dataset(state);
                ui.close_menu();
            }
            ui.separator();
            let filtered = state.filtered.clone();
            if ui
                .add_enabled(filtered.is_some(), egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                if let Some(table) = &filtered {
                    export_csv(state, table, "filtered_data.csv");
                }
                ui.close_menu();
            }
            let pivot = state.pivot_result.clone();
            if ui
                .add_enabled(pivot.is_some(), egui::Button::new("Export pivot CSV…"))
                .clicked()
            {
                if let Some(table) = &pivot {
                    export_csv(state, table, "pivot.csv");
                }
                ui.close_menu();
            }
        });

        ui.separator();

        if state.workbook.is_some() {
            ui.label(format!(
                "{} rows, {} after filters",
                state.diagnostics.rows_total, state.diagnostics.rows_filtered
            ));
        }

        if !state.skipped_sheets.is_empty() {
            let details: Vec<String> = state
                .skipped_sheets
                .iter()
                .map(|s| format!("{}: {}", s.sheet, s.reason))
                .collect();
            ui.label(
                RichText::new(format!("{} sheet(s) skipped", state.skipped_sheets.len()))
                    .color(Color32::ORANGE),
            )
            .on_hover_text(details.join("\n"));
        }

        if let Some(note) = &state.diagnostics.unify_fallback {
            ui.label(RichText::new("best-effort merge").color(Color32::YELLOW))
                .on_hover_text(note);
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Bottom preview panel
// ---------------------------------------------------------------------------

/// Render the table preview: filtered data, pivot result, or descriptive
/// statistics.
pub fn preview_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.strong("Preview");
        ui.selectable_value(&mut state.preview_source, PreviewSource::Filtered, "Filtered");
        ui.selectable_value(&mut state.preview_source, PreviewSource::Pivot, "Pivot");
        ui.selectable_value(&mut state.preview_source, PreviewSource::Stats, "Statistics");
    });

    let table = match state.preview_source {
        PreviewSource::Filtered => state.filtered.as_ref().map(|t| t.head(PREVIEW_ROWS)),
        PreviewSource::Pivot => state.pivot_result.as_ref().map(|t| t.head(PREVIEW_ROWS)),
        PreviewSource::Stats => state.filtered.as_ref().map(describe),
    };

    let Some(table) = table else {
        ui.label("Nothing to preview yet.");
        return;
    };

    if state.preview_source == PreviewSource::Stats {
        if let Some(filtered) = &state.filtered {
            let nulls: Vec<String> = null_counts(filtered)
                .into_iter()
                .filter(|(_, n)| *n > 0)
                .take(5)
                .map(|(name, n)| format!("{name} ({n})"))
                .collect();
            if !nulls.is_empty() {
                ui.label(format!("Most nulls: {}", nulls.join(", ")));
            }
        }
    }

    if table.n_rows() == 0 {
        ui.label("No rows to show.");
        return;
    }
    render_table(ui, &table);
}

fn render_table(ui: &mut Ui, table: &Table) {
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .columns(TableColumn::auto().at_least(60.0), table.n_cols())
        .header(20.0, |mut header| {
            for col in table.columns() {
                header.col(|ui: &mut Ui| {
                    ui.strong(&col.name);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, table.n_rows(), |mut row| {
                let r = row.index();
                for col in table.columns() {
                    row.col(|ui: &mut Ui| {
                        ui.label(col.display(r));
                    });
                }
            });
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open tabular data")
        .add_filter("Supported files", &["xlsx", "xlsm", "xls", "ods", "csv", "json"])
        .add_filter("Spreadsheet", &["xlsx", "xlsm", "xls", "ods"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        match loader::load_path(&path) {
            Ok(outcome) => ingest(state, outcome),
            Err(e) => {
                log::error!("failed to load file: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}

/// Ingest a file dropped onto the window. Web drops carry bytes, native
/// drops carry a path.
pub fn handle_dropped_file(state: &mut AppState, file: &egui::DroppedFile) {
    let result = if let Some(path) = &file.path {
        loader::load_path(path)
    } else if let Some(bytes) = &file.bytes {
        let name = file.name.to_ascii_lowercase();
        let stem = file.name.trim_end_matches(|c| c != '.').trim_end_matches('.');
        let stem = if stem.is_empty() { "upload" } else { stem };
        if name.ends_with(".csv") {
            loader::load_csv_bytes(stem, bytes)
        } else if name.ends_with(".json") {
            loader::load_json_bytes(stem, bytes)
        } else {
            loader::load_workbook_bytes(bytes)
        }
    } else {
        return;
    };

    match result {
        Ok(outcome) => ingest(state, outcome),
        Err(e) => {
            log::error!("failed to load dropped file: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}

pub fn open_default_dataset(state: &mut AppState) {
    match loader::load_default() {
        Ok(outcome) => ingest(state, outcome),
        Err(e) => {
            log::error!("failed to load repository dataset: {e}");
            state.status_message =
                Some("No repository dataset found. Use File → Open… to upload one.".to_string());
        }
    }
}

fn ingest(state: &mut AppState, outcome: loader::LoadOutcome) {
    let names: Vec<&str> = outcome.workbook.sheet_names().collect();
    log::info!("loaded sheets: {names:?}");
    if outcome.workbook.get(unify::ALL_SHEET).is_none()
        && !names.iter().any(|n| unify::CANONICAL_SHEETS.contains(n))
    {
        log::info!("no canonical period sheets; unify-all will use the fallback merge");
    }
    state.set_load_outcome(outcome);
}

fn export_csv(state: &mut AppState, table: &Table, filename: &str) {
    let download = match csv_download(table, filename) {
        Ok(d) => d,
        Err(e) => {
            state.status_message = Some(format!("Export failed: {e}"));
            return;
        }
    };

    let target = rfd::FileDialog::new()
        .set_title("Save CSV")
        .set_file_name(&download.filename)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = target {
        match std::fs::write(&path, &download.bytes) {
            Ok(()) => {
                log::info!("exported {} bytes to {}", download.bytes.len(), path.display());
                state.status_message = Some(format!("Saved {}", path.display()));
            }
            Err(e) => state.status_message = Some(format!("Export failed: {e}")),
        }
    }
}
