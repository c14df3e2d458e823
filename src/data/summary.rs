use super::model::{Column, ColumnData, ColumnType, Table};

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics for every numeric and year column, one row per
/// column: count / mean / std / min / 25% / 50% / 75% / max. Null cells are
/// skipped; the std is the sample standard deviation and needs at least two
/// values.
pub fn describe(table: &Table) -> Table {
    let numeric: Vec<&Column> = table
        .columns()
        .iter()
        .filter(|c| {
            matches!(
                c.column_type(),
                ColumnType::Numeric | ColumnType::Year
            )
        })
        .collect();

    let mut names = Vec::with_capacity(numeric.len());
    let mut stats: [Vec<Option<f64>>; 8] = Default::default();

    for col in numeric {
        let mut values: Vec<f64> = (0..col.len()).filter_map(|r| col.numeric_at(r)).collect();
        values.sort_by(f64::total_cmp);

        names.push(Some(col.name.clone()));
        stats[0].push(Some(values.len() as f64));
        stats[1].push(mean(&values));
        stats[2].push(sample_std(&values));
        stats[3].push(values.first().copied());
        stats[4].push(quantile(&values, 0.25));
        stats[5].push(quantile(&values, 0.5));
        stats[6].push(quantile(&values, 0.75));
        stats[7].push(values.last().copied());
    }

    let labels = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
    let mut columns = vec![Column::new("column", ColumnData::Categorical(names))];
    for (label, data) in labels.into_iter().zip(stats) {
        columns.push(Column::new(label, ColumnData::Numeric(data)));
    }
    Table::new(columns).expect("stat columns are unique and equal length")
}

/// Per-column null tallies, most nulls first.
pub fn null_counts(table: &Table) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = table
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.null_count()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Linearly interpolated quantile of an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

// ---------------------------------------------------------------------------
// Histogram binning
// ---------------------------------------------------------------------------

/// Equal-width histogram: (bin center, count) per bin. A degenerate value
/// range collapses to a single bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<(f64, f64)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return vec![(min, values.len() as f64)];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| (min + width * (i as f64 + 0.5), n as f64))
        .collect()
}

// ---------------------------------------------------------------------------
// Linear trend (scatter overlay)
// ---------------------------------------------------------------------------

/// Least-squares line through the points: `Some((slope, intercept))`, or
/// `None` when fewer than two points or the x values do not vary.
pub fn linear_trend(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let ss_xx: f64 = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
    if ss_xx.abs() < f64::EPSILON {
        return None;
    }
    let ss_xy: f64 = points
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();

    let slope = ss_xy / ss_xx;
    Some((slope, mean_y - slope * mean_x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Column, ColumnData, Table};

    #[test]
    fn describe_basic_stats() {
        let table = Table::new(vec![
            Column::new(
                "wait",
                ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), None]),
            ),
            Column::new(
                "district",
                ColumnData::Categorical(vec![Some("N".into()); 5]),
            ),
        ])
        .unwrap();

        let stats = describe(&table);
        // Only the numeric column appears.
        assert_eq!(stats.n_rows(), 1);
        assert_eq!(stats.column("column").unwrap().display(0), "wait");
        assert_eq!(stats.column("count").unwrap().numeric_at(0), Some(4.0));
        assert_eq!(stats.column("mean").unwrap().numeric_at(0), Some(2.5));
        assert_eq!(stats.column("min").unwrap().numeric_at(0), Some(1.0));
        assert_eq!(stats.column("max").unwrap().numeric_at(0), Some(4.0));
        assert_eq!(stats.column("50%").unwrap().numeric_at(0), Some(2.5));
        assert_eq!(stats.column("25%").unwrap().numeric_at(0), Some(1.75));

        let std = stats.column("std").unwrap().numeric_at(0).unwrap();
        assert!((std - 1.2909944).abs() < 1e-6);
    }

    #[test]
    fn describe_of_all_null_column() {
        let table = Table::new(vec![Column::new(
            "empty",
            ColumnData::Numeric(vec![None, None]),
        )])
        .unwrap();
        let stats = describe(&table);
        assert_eq!(stats.column("count").unwrap().numeric_at(0), Some(0.0));
        assert_eq!(stats.column("mean").unwrap().numeric_at(0), None);
    }

    #[test]
    fn null_counts_sorted_descending() {
        let table = Table::new(vec![
            Column::new("a", ColumnData::Numeric(vec![Some(1.0), Some(2.0)])),
            Column::new("b", ColumnData::Numeric(vec![None, None])),
            Column::new("c", ColumnData::Numeric(vec![None, Some(3.0)])),
        ])
        .unwrap();
        assert_eq!(
            null_counts(&table),
            vec![
                ("b".to_string(), 2),
                ("c".to_string(), 1),
                ("a".to_string(), 0)
            ]
        );
    }

    #[test]
    fn histogram_counts_cover_all_values() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 5.0];
        let hist = histogram(&values, 4);
        assert_eq!(hist.len(), 4);
        let total: f64 = hist.iter().map(|(_, n)| n).sum();
        assert_eq!(total, values.len() as f64);
        // Max value lands in the last bin, not out of range.
        assert_eq!(hist[3].1, 3.0);
    }

    #[test]
    fn histogram_degenerate_range() {
        assert_eq!(histogram(&[2.0, 2.0, 2.0], 10), vec![(2.0, 3.0)]);
    }

    #[test]
    fn linear_trend_recovers_exact_line() {
        let points: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let (slope, intercept) = linear_trend(&points).unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn linear_trend_degenerate_inputs() {
        assert_eq!(linear_trend(&[(1.0, 2.0)]), None);
        assert_eq!(linear_trend(&[(1.0, 2.0), (1.0, 5.0)]), None);
    }
}
