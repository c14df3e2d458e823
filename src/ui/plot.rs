use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

use crate::data::aggregate::{group_reduce, AggFn, AggregationRequest};
use crate::data::infer::YEAR_COLUMN;
use crate::data::model::Table;
use crate::data::summary::{histogram, linear_trend};
use crate::state::{AppState, PlotKind};

// ---------------------------------------------------------------------------
// Analytics plot (central panel)
// ---------------------------------------------------------------------------

/// Render the selected plot over the filtered table.
pub fn analytics_plot(ui: &mut Ui, state: &AppState) {
    let Some(table) = &state.filtered else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a workbook to explore it  (File → Open…)");
        });
        return;
    };

    if table.n_rows() == 0 {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No rows match the current filters.");
        });
        return;
    }

    match state.plot_kind {
        PlotKind::Line => line_plot(ui, state, table),
        PlotKind::Bar => bar_plot(ui, state, table),
        PlotKind::Scatter => scatter_plot(ui, state, table),
        PlotKind::Histogram => histogram_plot(ui, state, table),
    }
}

/// Aggregated value over the year axis.
fn line_plot(ui: &mut Ui, state: &AppState, table: &Table) {
    let Some(year) = table
        .columns()
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(YEAR_COLUMN))
        .map(|c| c.name.clone())
    else {
        ui.label("No 'year' column found for a time series.");
        return;
    };
    let Some(value) = &state.plot_value else {
        ui.label("Pick a numeric column to plot.");
        return;
    };

    let request = AggregationRequest {
        group_by: vec![year.clone()],
        value: value.clone(),
        func: state.plot_agg,
    };
    let grouped = match group_reduce(table, &request) {
        Ok(g) => g,
        Err(e) => {
            ui.label(e.to_string());
            return;
        }
    };

    let y_name = value_column_name(value, state.plot_agg);
    let points = xy_points(&grouped, &year, &y_name);
    let name = format!("{} of {value} by year", state.plot_agg.label());

    Plot::new("line_plot")
        .legend(Legend::default())
        .x_axis_label(&year)
        .y_axis_label(&y_name)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(points))
                    .name(&name)
                    .width(2.0),
            );
        });
}

/// Aggregated value per category, one bar per group.
fn bar_plot(ui: &mut Ui, state: &AppState, table: &Table) {
    let (Some(x), Some(value)) = (&state.plot_x, &state.plot_value) else {
        ui.label("Pick a category and a numeric column.");
        return;
    };

    let request = AggregationRequest {
        group_by: vec![x.clone()],
        value: value.clone(),
        func: state.plot_agg,
    };
    let grouped = match group_reduce(table, &request) {
        Ok(g) => g,
        Err(e) => {
            ui.label(e.to_string());
            return;
        }
    };

    let y_name = value_column_name(value, state.plot_agg);
    let key_col = grouped.column(x).expect("group key column present");
    let val_col = grouped.column(&y_name).expect("value column present");

    let mut bars = Vec::with_capacity(grouped.n_rows());
    for row in 0..grouped.n_rows() {
        let Some(v) = val_col.numeric_at(row) else {
            continue;
        };
        let label = key_col.display(row);
        let color = state
            .color_map
            .as_ref()
            .filter(|cm| cm.column == *x)
            .map(|cm| cm.color_for(&label))
            .unwrap_or(Color32::LIGHT_BLUE);
        bars.push(Bar::new(row as f64, v).name(label).fill(color));
    }

    let chart_name = format!("{} of {value} by {x}", state.plot_agg.label());
    Plot::new("bar_plot")
        .legend(Legend::default())
        .y_axis_label(&y_name)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(&chart_name));
        });
}

/// Raw points, optionally coloured by a categorical column, with a
/// least-squares trend overlay.
fn scatter_plot(ui: &mut Ui, state: &AppState, table: &Table) {
    let (Some(x_name), Some(y_name)) = (&state.scatter_x, &state.plot_value) else {
        ui.label("Pick two numeric columns.");
        return;
    };
    let (Some(x_col), Some(y_col)) = (table.column(x_name), table.column(y_name)) else {
        ui.label("Selected columns are missing from the filtered table.");
        return;
    };

    let color_col = state
        .color_map
        .as_ref()
        .and_then(|cm| table.column(&cm.column));

    // One Points series per colour value so the legend lists categories.
    let mut series: Vec<(String, Color32, Vec<[f64; 2]>)> = Vec::new();
    let mut all_points: Vec<(f64, f64)> = Vec::new();

    for row in 0..table.n_rows() {
        let (Some(x), Some(y)) = (x_col.numeric_at(row), y_col.numeric_at(row)) else {
            continue;
        };
        all_points.push((x, y));

        let (label, color) = match (color_col, &state.color_map) {
            (Some(col), Some(cm)) if !col.is_null(row) => {
                let value = col.display(row);
                let color = cm.color_for(&value);
                (value, color)
            }
            _ => ("points".to_string(), Color32::LIGHT_BLUE),
        };

        match series.iter_mut().find(|(name, _, _)| *name == label) {
            Some((_, _, pts)) => pts.push([x, y]),
            None => series.push((label, color, vec![[x, y]])),
        }
    }

    Plot::new("scatter_plot")
        .legend(Legend::default())
        .x_axis_label(x_name)
        .y_axis_label(y_name)
        .show(ui, |plot_ui| {
            for (name, color, pts) in series {
                plot_ui.points(
                    Points::new(PlotPoints::from(pts))
                        .name(&name)
                        .color(color)
                        .radius(3.0),
                );
            }

            if state.show_trend {
                if let Some((slope, intercept)) = linear_trend(&all_points) {
                    let (x_min, x_max) = all_points.iter().fold(
                        (f64::INFINITY, f64::NEG_INFINITY),
                        |(lo, hi), (x, _)| (lo.min(*x), hi.max(*x)),
                    );
                    let ends = vec![
                        [x_min, slope * x_min + intercept],
                        [x_max, slope * x_max + intercept],
                    ];
                    plot_ui.line(
                        Line::new(PlotPoints::from(ends))
                            .name("trend")
                            .color(Color32::GRAY)
                            .width(1.5),
                    );
                }
            }
        });
}

fn histogram_plot(ui: &mut Ui, state: &AppState, table: &Table) {
    let Some(value) = &state.plot_value else {
        ui.label("Pick a numeric column.");
        return;
    };
    let Some(col) = table.column(value) else {
        ui.label("Selected column is missing from the filtered table.");
        return;
    };

    let values: Vec<f64> = (0..col.len()).filter_map(|r| col.numeric_at(r)).collect();
    let bins = histogram(&values, state.hist_bins);
    if bins.is_empty() {
        ui.label("No numeric values to bin.");
        return;
    }

    let width = if bins.len() > 1 {
        (bins[1].0 - bins[0].0) * 0.95
    } else {
        1.0
    };
    let bars: Vec<Bar> = bins
        .into_iter()
        .map(|(center, count)| Bar::new(center, count).width(width))
        .collect();

    Plot::new("histogram_plot")
        .legend(Legend::default())
        .x_axis_label(value)
        .y_axis_label("count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(format!("{value} histogram")));
        });
}

fn value_column_name(value: &str, func: AggFn) -> String {
    match func {
        AggFn::Count => "count".to_string(),
        _ => value.to_string(),
    }
}

fn xy_points(grouped: &Table, x: &str, y: &str) -> Vec<[f64; 2]> {
    let (Some(x_col), Some(y_col)) = (grouped.column(x), grouped.column(y)) else {
        return Vec::new();
    };
    (0..grouped.n_rows())
        .filter_map(|row| {
            let x = x_col.numeric_at(row)?;
            let y = y_col.numeric_at(row)?;
            Some([x, y])
        })
        .collect()
}
