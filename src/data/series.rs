use super::model::{CellValue, LoadedData};

/// Cells inspected when deciding whether a column is numeric.
const NUMERIC_PROBE_ROWS: usize = 10;

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

/// One plottable column: `(row index, value)` points, gaps dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub key: String,
    pub points: Vec<[f64; 2]>,
}

/// Every non-datetime column that holds a finite number in any of its first
/// few cells, in header order.
pub fn numeric_series(data: &LoadedData, datetime_key: Option<&str>) -> Vec<Series> {
    data.headers
        .iter()
        .filter(|h| Some(h.as_str()) != datetime_key)
        .filter(|h| is_numeric_column(data, h))
        .map(|h| Series {
            key: h.clone(),
            points: data
                .rows
                .iter()
                .enumerate()
                .filter_map(|(i, row)| {
                    let v = row.numeric(h);
                    v.is_finite().then_some([i as f64, v])
                })
                .collect(),
        })
        .collect()
}

fn is_numeric_column(data: &LoadedData, key: &str) -> bool {
    data.rows
        .iter()
        .take(NUMERIC_PROBE_ROWS)
        .any(|row| row.numeric(key).is_finite())
}

/// Y range covering all series, padded by 5%. A flat range is widened by ±1.
/// `None` when there is nothing to draw.
pub fn value_bounds(series: &[Series]) -> Option<(f64, f64)> {
    let (min, max) = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p[1]))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return None;
    }

    let (min, max) = if min == max { (min - 1.0, max + 1.0) } else { (min, max) };
    let pad = (max - min) * 0.05;
    Some((min - pad, max + pad))
}

/// X-axis label for a row: the datetime cell when a datetime column is
/// selected, else the row index.
pub fn axis_label(data: &LoadedData, datetime_key: Option<&str>, index: usize) -> String {
    match (datetime_key, data.rows.get(index)) {
        (Some(key), Some(row)) => row.get(key).map(CellValue::to_string).unwrap_or_default(),
        _ => index.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_from_csv;

    #[test]
    fn picks_numeric_columns_and_skips_gaps() {
        let data = load_from_csv("date,label,a,b\n2025-01-01,x,1,\n2025-01-02,y,,2\n2025-01-03,z,3,4\n")
            .unwrap();
        let series = numeric_series(&data, data.datetime_key.as_deref());

        let keys: Vec<&str> = series.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(series[0].points, vec![[0.0, 1.0], [2.0, 3.0]]);
        assert_eq!(series[1].points, vec![[1.0, 2.0], [2.0, 4.0]]);
    }

    #[test]
    fn bounds_are_padded_and_flat_ranges_widened() {
        let s = vec![Series {
            key: "a".into(),
            points: vec![[0.0, 0.0], [1.0, 10.0]],
        }];
        assert_eq!(value_bounds(&s), Some((-0.5, 10.5)));

        let flat = vec![Series {
            key: "a".into(),
            points: vec![[0.0, 3.0]],
        }];
        let (lo, hi) = value_bounds(&flat).unwrap();
        assert!((lo - 1.9).abs() < 1e-12 && (hi - 4.1).abs() < 1e-12);

        assert_eq!(value_bounds(&[]), None);
    }

    #[test]
    fn axis_labels_use_datetime_cells() {
        let data = load_from_csv("time,v\n08:00,1\n09:00,2\n").unwrap();
        assert_eq!(axis_label(&data, Some("time"), 1), "09:00");
        assert_eq!(axis_label(&data, None, 1), "1");
        assert_eq!(axis_label(&data, Some("time"), 7), "7");
    }
}
