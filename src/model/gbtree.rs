//! Built-in gradient-boosted regression trees.
//!
//! Second-order boosting on squared error:
//! - leaf weight `w* = -G / (H + lambda)`
//! - split gain `0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)] - gamma`
//! - exact greedy split search over sorted feature values
//! - NaN feature values follow a learned default direction per split
//! - per-tree row subsampling and column subsampling, seeded

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::OnceCell;

use super::{BoosterConfig, ModelFactory, ModelInitializer, Regressor};
use crate::error::ModelError;

// ---------------------------------------------------------------------------
// Initializer / factory
// ---------------------------------------------------------------------------

/// Resolves the gbtree factory once and hands out the same instance after.
#[derive(Default)]
pub struct GbtreeInitializer {
    factory: OnceCell<Arc<dyn ModelFactory>>,
}

impl GbtreeInitializer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelInitializer for GbtreeInitializer {
    async fn initialize(&self) -> Result<Arc<dyn ModelFactory>, ModelError> {
        let factory = self
            .factory
            .get_or_try_init(|| async {
                log::info!("Initialising gbtree backend");
                Ok::<_, ModelError>(Arc::new(GbtreeFactory) as Arc<dyn ModelFactory>)
            })
            .await?;
        Ok(Arc::clone(factory))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GbtreeFactory;

impl ModelFactory for GbtreeFactory {
    fn construct(&self, config: &BoosterConfig) -> Result<Box<dyn Regressor>, ModelError> {
        config.validate()?;
        Ok(Box::new(GbtreeRegressor::new(config.clone())))
    }
}

// ---------------------------------------------------------------------------
// Regressor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GbtreeRegressor {
    config: BoosterConfig,
    ensemble: Option<Ensemble>,
}

impl GbtreeRegressor {
    pub fn new(config: BoosterConfig) -> Self {
        Self {
            config,
            ensemble: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.ensemble.is_some()
    }
}

#[async_trait]
impl Regressor for GbtreeRegressor {
    async fn train(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        let config = self.config.clone();
        let x = x.to_vec();
        let y = y.to_vec();

        let ensemble = tokio::task::spawn_blocking(move || fit(&config, &x, &y))
            .await
            .map_err(|e| ModelError::Train(format!("training task failed: {e}")))??;

        self.ensemble = Some(ensemble);
        Ok(())
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let ensemble = self.ensemble.as_ref().ok_or(ModelError::NotTrained)?;
        rows.iter()
            .map(|row| {
                if row.len() != ensemble.n_features {
                    return Err(ModelError::FeatureMismatch {
                        expected: ensemble.n_features,
                        got: row.len(),
                    });
                }
                Ok(ensemble.predict_row(row))
            })
            .collect()
    }

    fn free(&mut self) -> Result<(), ModelError> {
        self.ensemble = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        /// Where NaN values go.
        default_left: bool,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf { weight } => *weight,
            Node::Split {
                feature,
                threshold,
                default_left,
                left,
                right,
            } => {
                if goes_left(row[*feature], *threshold, *default_left) {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

fn goes_left(value: f64, threshold: f64, default_left: bool) -> bool {
    if value.is_nan() {
        default_left
    } else {
        value < threshold
    }
}

/// A fitted model: `base_score + eta * Σ tree(row)`.
#[derive(Debug, Clone)]
pub struct Ensemble {
    base_score: f64,
    eta: f64,
    n_features: usize,
    trees: Vec<Node>,
}

impl Ensemble {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.base_score + self.eta * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    default_left: bool,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    config: &'a BoosterConfig,
}

impl TreeBuilder<'_> {
    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.config.lambda;
        if denom <= 0.0 {
            0.0
        } else {
            g * g / denom
        }
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]))
    }

    fn build(&self, rows: &[usize], features: &[usize], depth: usize) -> Node {
        let (g, h) = self.sums(rows);
        let weight = if h + self.config.lambda > 0.0 {
            -g / (h + self.config.lambda)
        } else {
            0.0
        };

        if depth >= self.config.max_depth || rows.len() < 2 || h < self.config.min_child_weight {
            return Node::Leaf { weight };
        }

        let best = features
            .iter()
            .filter_map(|&f| self.best_split(rows, f, g, h))
            .max_by(|a, b| a.gain.total_cmp(&b.gain));

        let Some(split) = best else {
            return Node::Leaf { weight };
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().copied().partition(|&i| {
                goes_left(self.x[i][split.feature], split.threshold, split.default_left)
            });
        if left_rows.is_empty() || right_rows.is_empty() {
            return Node::Leaf { weight };
        }

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            default_left: split.default_left,
            left: Box::new(self.build(&left_rows, features, depth + 1)),
            right: Box::new(self.build(&right_rows, features, depth + 1)),
        }
    }

    /// Best positive-gain split on one feature, trying NaNs on both sides.
    fn best_split(
        &self,
        rows: &[usize],
        feature: usize,
        g_total: f64,
        h_total: f64,
    ) -> Option<SplitCandidate> {
        let mut present: Vec<(f64, usize)> = rows
            .iter()
            .filter_map(|&i| {
                let v = self.x[i][feature];
                (!v.is_nan()).then_some((v, i))
            })
            .collect();
        if present.is_empty() {
            return None;
        }
        present.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (g_present, h_present) = present
            .iter()
            .fold((0.0, 0.0), |(g, h), &(_, i)| (g + self.grad[i], h + self.hess[i]));
        let g_missing = g_total - g_present;
        let h_missing = h_total - h_present;
        let parent = self.score(g_total, h_total);
        let min_child = self.config.min_child_weight;

        let mut best: Option<SplitCandidate> = None;
        let mut consider = |threshold: f64, default_left: bool, gl: f64, hl: f64, gr: f64, hr: f64| {
            if hl < min_child || hr < min_child {
                return;
            }
            let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent) - self.config.gamma;
            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    default_left,
                    gain,
                });
            }
        };

        let (mut g_left, mut h_left) = (0.0, 0.0);
        for pos in 0..present.len() - 1 {
            let (value, idx) = present[pos];
            g_left += self.grad[idx];
            h_left += self.hess[idx];

            let next = present[pos + 1].0;
            if next <= value {
                continue;
            }
            let threshold = value / 2.0 + next / 2.0;
            if !threshold.is_finite() || threshold <= value {
                continue;
            }

            let g_right = g_present - g_left;
            let h_right = h_present - h_left;
            consider(
                threshold,
                true,
                g_left + g_missing,
                h_left + h_missing,
                g_right,
                h_right,
            );
            consider(
                threshold,
                false,
                g_left,
                h_left,
                g_right + g_missing,
                h_right + h_missing,
            );
        }

        // Missing values alone on the right, every present value on the left.
        if present.len() < rows.len() {
            consider(f64::INFINITY, false, g_present, h_present, g_missing, h_missing);
        }

        best.filter(|b| b.gain > 0.0)
    }
}

// ---------------------------------------------------------------------------
// Training loop
// ---------------------------------------------------------------------------

/// Fit an ensemble synchronously. Rows whose target is not finite are skipped.
pub fn fit(config: &BoosterConfig, x: &[Vec<f64>], y: &[f64]) -> Result<Ensemble, ModelError> {
    config.validate()?;
    if x.len() != y.len() {
        return Err(ModelError::Train(format!(
            "x has {} rows but y has {}",
            x.len(),
            y.len()
        )));
    }
    let n_features = x
        .first()
        .map(Vec::len)
        .ok_or_else(|| ModelError::Train("no training rows".into()))?;
    if let Some((i, row)) = x.iter().enumerate().find(|(_, r)| r.len() != n_features) {
        return Err(ModelError::Train(format!(
            "row {i} has {} features, expected {n_features}",
            row.len()
        )));
    }

    let labelled: Vec<usize> = (0..y.len()).filter(|&i| y[i].is_finite()).collect();
    if labelled.is_empty() {
        return Err(ModelError::Train("no rows with a numeric target".into()));
    }
    if labelled.len() < y.len() {
        log::warn!(
            "Skipping {} rows with a missing or non-numeric target",
            y.len() - labelled.len()
        );
    }

    let base_score = labelled.iter().map(|&i| y[i]).sum::<f64>() / labelled.len() as f64;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut preds = vec![base_score; x.len()];
    let mut grad = vec![0.0; x.len()];
    let hess = vec![1.0; x.len()];
    let n_sampled_features = if n_features == 0 {
        0
    } else {
        ((config.colsample_bytree * n_features as f64).round() as usize).clamp(1, n_features)
    };

    let mut trees = Vec::with_capacity(config.iterations);
    for round in 0..config.iterations {
        for &i in &labelled {
            grad[i] = preds[i] - y[i];
        }

        let rows: Vec<usize> = if config.subsample < 1.0 {
            labelled
                .iter()
                .copied()
                .filter(|_| rng.gen::<f64>() < config.subsample)
                .collect()
        } else {
            labelled.clone()
        };
        if rows.is_empty() {
            log::debug!("Round {round}: empty row sample, skipped");
            continue;
        }

        let mut features = rand::seq::index::sample(&mut rng, n_features, n_sampled_features)
            .into_vec();
        features.sort_unstable();

        let builder = TreeBuilder {
            x,
            grad: &grad,
            hess: &hess,
            config,
        };
        let tree = builder.build(&rows, &features, 0);

        for &i in &labelled {
            preds[i] += config.eta * tree.predict(&x[i]);
        }
        trees.push(tree);
    }

    let rmse = (labelled
        .iter()
        .map(|&i| (preds[i] - y[i]).powi(2))
        .sum::<f64>()
        / labelled.len() as f64)
        .sqrt();
    log::info!(
        "Trained {} trees on {} rows x {} features (train rmse {rmse:.4})",
        trees.len(),
        labelled.len(),
        n_features
    );

    Ok(Ensemble {
        base_score,
        eta: config.eta,
        n_features,
        trees,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(iterations: usize) -> BoosterConfig {
        BoosterConfig {
            iterations,
            eta: 0.3,
            subsample: 1.0,
            ..BoosterConfig::default()
        }
    }

    #[test]
    fn fits_a_step_function() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 10.0 }).collect();

        let model = fit(&config(60), &x, &y).unwrap();
        assert!(model.predict_row(&[2.0]).abs() < 0.5);
        assert!((model.predict_row(&[15.0]) - 10.0).abs() < 0.5);
        assert!((model.predict_row(&[100.0]) - 10.0).abs() < 0.5);
    }

    #[test]
    fn nan_features_follow_learned_default_direction() {
        let mut x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let mut y = vec![0.0; 10];
        for _ in 0..10 {
            x.push(vec![f64::NAN]);
            y.push(5.0);
        }

        let model = fit(&config(60), &x, &y).unwrap();
        assert!((model.predict_row(&[f64::NAN]) - 5.0).abs() < 0.5);
        assert!(model.predict_row(&[3.0]).abs() < 0.5);
    }

    #[test]
    fn missing_targets_are_skipped() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        let y = vec![4.0, f64::NAN, 4.0];
        let model = fit(&config(10), &x, &y).unwrap();
        assert!((model.predict_row(&[1.0]) - 4.0).abs() < 1e-9);

        let err = fit(&config(10), &x, &[f64::NAN; 3]).unwrap_err();
        assert!(matches!(err, ModelError::Train(_)));
    }

    #[test]
    fn rejects_misshapen_input() {
        assert!(fit(&config(1), &[vec![1.0]], &[1.0, 2.0]).is_err());
        assert!(fit(&config(1), &[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0]).is_err());
        assert!(fit(&config(1), &[], &[]).is_err());
    }

    #[test]
    fn seeded_subsampling_is_deterministic() {
        let cfg = BoosterConfig {
            iterations: 30,
            subsample: 0.7,
            colsample_bytree: 0.5,
            ..BoosterConfig::default()
        };
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| (i % 7) as f64 * 2.0 + i as f64 * 0.1).collect();

        let a = fit(&cfg, &x, &y).unwrap();
        let b = fit(&cfg, &x, &y).unwrap();
        for row in &x {
            assert_eq!(a.predict_row(row), b.predict_row(row));
        }
        assert_eq!(a.n_trees(), 30);
    }

    #[tokio::test]
    async fn initializer_resolves_once_and_models_train() {
        let init = GbtreeInitializer::new();
        let first = init.initialize().await.unwrap();
        let second = init.initialize().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let mut model = first.construct(&config(20)).unwrap();
        assert!(matches!(
            model.predict(&[vec![1.0]]),
            Err(ModelError::NotTrained)
        ));

        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        model.train(&x, &y).await.unwrap();

        let preds = model.predict(&[vec![0.0], vec![9.0]]).unwrap();
        assert_eq!(preds.len(), 2);
        assert!(preds[0] < preds[1]);
        assert!(matches!(
            model.predict(&[vec![1.0, 2.0]]),
            Err(ModelError::FeatureMismatch { expected: 1, got: 2 })
        ));

        model.free().unwrap();
        assert!(model.predict(&[vec![1.0]]).is_err());
    }

    #[test]
    fn factory_rejects_invalid_config() {
        let bad = BoosterConfig {
            eta: 0.0,
            ..BoosterConfig::default()
        };
        assert!(matches!(
            GbtreeFactory.construct(&bad),
            Err(ModelError::InvalidConfig(_))
        ));
    }
}
