//! Feature construction for tree models that know nothing about time.
//!
//! Each row becomes the numeric values of every exogenous column, followed by
//! a trend term (the row index `t`) and two fixed seasonal sine/cosine pairs:
//!
//! ```text
//!  [ exog_0 .. exog_k | t | sin(2πt/24) cos(2πt/24) | sin(2πt/168) cos(2πt/168) ]
//! ```
//!
//! Row position is the time step; the datetime cells themselves are never
//! parsed.

use std::f64::consts::PI;

use crate::data::model::Record;

/// Daily cycle, in steps.
pub const DAILY_PERIOD: f64 = 24.0;
/// Weekly cycle, in steps.
pub const WEEKLY_PERIOD: f64 = 168.0;
/// Features appended after the exogenous columns: index + two seasonal pairs.
pub const TIME_FEATURES: usize = 5;

/// Design matrix, targets and the synthesized next-step row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBundle {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
    pub last_feature_row: Vec<f64>,
    /// Exogenous column names, in the order they appear in each vector.
    pub feature_keys: Vec<String>,
}

impl FeatureBundle {
    /// Length of every feature vector.
    pub fn width(&self) -> usize {
        self.feature_keys.len() + TIME_FEATURES
    }
}

/// Build features from `rows` for predicting `target_key`.
///
/// Exogenous columns are the keys of the *first* row minus the datetime and
/// target keys. A later row lacking one of those keys yields NaN for it; keys
/// that only appear in later rows are ignored.
///
/// The next-step row uses `t = rows.len()` and carries the last row's
/// exogenous values forward unchanged.
///
/// Returns `None` when `rows` is empty.
pub fn build_features(
    rows: &[Record],
    datetime_key: Option<&str>,
    target_key: &str,
) -> Option<FeatureBundle> {
    let first = rows.first()?;
    let last = rows.last()?;

    let feature_keys: Vec<String> = first
        .keys()
        .filter(|k| Some(*k) != datetime_key && *k != target_key)
        .map(str::to_string)
        .collect();

    let ragged = rows.iter().filter(|r| r.len() != first.len()).count();
    if ragged > 0 {
        log::warn!(
            "{ragged} rows have a different column count than the first row; \
             missing exogenous values become NaN"
        );
    }

    let x: Vec<Vec<f64>> = rows
        .iter()
        .enumerate()
        .map(|(t, row)| feature_vector(row, &feature_keys, t))
        .collect();
    let y: Vec<f64> = rows.iter().map(|row| row.numeric(target_key)).collect();
    let last_feature_row = feature_vector(last, &feature_keys, rows.len());

    log::debug!(
        "Built {} feature rows of width {} (exogenous: {:?})",
        x.len(),
        last_feature_row.len(),
        feature_keys
    );

    Some(FeatureBundle {
        x,
        y,
        last_feature_row,
        feature_keys,
    })
}

fn feature_vector(row: &Record, feature_keys: &[String], t: usize) -> Vec<f64> {
    let mut feats = Vec::with_capacity(feature_keys.len() + TIME_FEATURES);
    feats.extend(feature_keys.iter().map(|k| row.numeric(k)));
    feats.extend(time_features(t));
    feats
}

/// `[t, sin/cos daily, sin/cos weekly]` for time step `t`.
pub fn time_features(t: usize) -> [f64; TIME_FEATURES] {
    let tf = t as f64;
    let daily = 2.0 * PI * tf / DAILY_PERIOD;
    let weekly = 2.0 * PI * tf / WEEKLY_PERIOD;
    [tf, daily.sin(), daily.cos(), weekly.sin(), weekly.cos()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn row(cells: &[(&str, CellValue)]) -> Record {
        cells.iter().cloned().collect()
    }

    fn date_v_rows() -> Vec<Record> {
        vec![
            row(&[
                ("date", CellValue::String("2025-01-01".into())),
                ("v", CellValue::Integer(1)),
            ]),
            row(&[
                ("date", CellValue::String("2025-01-02".into())),
                ("v", CellValue::Integer(2)),
            ]),
        ]
    }

    #[test]
    fn two_row_series_without_exogenous_columns() {
        let b = build_features(&date_v_rows(), Some("date"), "v").unwrap();

        assert_eq!(b.y, vec![1.0, 2.0]);
        assert_eq!(b.x.len(), 2);
        assert!(b.x.iter().all(|r| r.len() == 5));
        assert_eq!(b.x[0][0], 0.0);
        assert_eq!(b.x[1][0], 1.0);
        assert_eq!(b.last_feature_row.len(), 5);
        assert_eq!(b.last_feature_row[0], 2.0);
        assert!(b.feature_keys.is_empty());
    }

    #[test]
    fn seasonal_terms_follow_fixed_periods() {
        let f = time_features(6);
        assert!((f[1] - 1.0).abs() < 1e-12); // sin(π/2)
        assert!(f[2].abs() < 1e-12);

        let f = time_features(168);
        assert!(f[3].abs() < 1e-9);
        assert!((f[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn exogenous_values_lead_and_carry_forward() {
        let rows = vec![
            row(&[
                ("time", CellValue::String("t0".into())),
                ("a", CellValue::Integer(1)),
                ("target", CellValue::Integer(10)),
                ("b", CellValue::Float(0.5)),
            ]),
            row(&[
                ("time", CellValue::String("t1".into())),
                ("a", CellValue::Integer(2)),
                ("target", CellValue::Integer(20)),
                ("b", CellValue::Null),
            ]),
        ];
        let b = build_features(&rows, Some("time"), "target").unwrap();

        assert_eq!(b.feature_keys, vec!["a", "b"]);
        assert_eq!(b.width(), 7);
        assert_eq!(&b.x[0][..3], &[1.0, 0.5, 0.0]);
        assert!(b.x[1][1].is_nan());
        assert_eq!(b.last_feature_row[0], 2.0);
        assert!(b.last_feature_row[1].is_nan());
        assert_eq!(b.last_feature_row[2], 2.0);
    }

    #[test]
    fn shape_invariants_hold() {
        let rows: Vec<Record> = (0..50)
            .map(|i| {
                row(&[
                    ("x", CellValue::Integer(i)),
                    ("y", CellValue::Float(i as f64 * 0.5)),
                ])
            })
            .collect();
        let b = build_features(&rows, None, "y").unwrap();

        assert_eq!(b.x.len(), rows.len());
        assert_eq!(b.y.len(), rows.len());
        assert!(b.x.iter().all(|r| r.len() == b.last_feature_row.len()));
    }

    #[test]
    fn target_values_do_not_affect_features() {
        let rows = date_v_rows();
        let mut changed = rows.clone();
        changed[0].insert("v", CellValue::Integer(100));
        changed[1].insert("v", CellValue::String("oops".into()));

        let a = build_features(&rows, Some("date"), "v").unwrap();
        let b = build_features(&changed, Some("date"), "v").unwrap();

        assert_eq!(a.x, b.x);
        assert_eq!(a.last_feature_row, b.last_feature_row);
        assert_eq!(b.y[0], 100.0);
        assert!(b.y[1].is_nan());
    }

    #[test]
    fn building_twice_is_identical() {
        let rows = date_v_rows();
        assert_eq!(
            build_features(&rows, Some("date"), "v"),
            build_features(&rows, Some("date"), "v")
        );
    }

    #[test]
    fn later_rows_use_first_row_key_set() {
        let rows = vec![
            row(&[("a", CellValue::Integer(1)), ("y", CellValue::Integer(1))]),
            row(&[
                ("y", CellValue::Integer(2)),
                ("extra", CellValue::Integer(5)),
            ]),
        ];
        let b = build_features(&rows, None, "y").unwrap();

        assert_eq!(b.feature_keys, vec!["a"]);
        assert!(b.x[1][0].is_nan());
        assert_eq!(b.x[1].len(), b.x[0].len());
    }

    #[test]
    fn empty_rows_build_nothing() {
        assert!(build_features(&[], Some("date"), "v").is_none());
    }
}
