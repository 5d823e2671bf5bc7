use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Tree booster family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoosterKind {
    Gbtree,
}

/// Learning objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Squared-error regression. `reg:linear` is the legacy name.
    #[serde(rename = "reg:squarederror", alias = "reg:linear")]
    SquaredError,
}

/// Hyperparameters handed to a [`ModelFactory`](super::ModelFactory).
///
/// Field names follow the XGBoost parameter names so configs can be shared
/// with other boosted-tree tools. Missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterConfig {
    pub booster: BoosterKind,
    pub objective: Objective,
    pub max_depth: usize,
    /// Learning rate (shrinkage applied to every tree).
    pub eta: f64,
    pub min_child_weight: f64,
    /// Fraction of rows sampled per tree.
    pub subsample: f64,
    /// Fraction of columns sampled per tree.
    pub colsample_bytree: f64,
    /// Number of boosting rounds.
    pub iterations: usize,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    /// Minimum loss reduction required to split.
    pub gamma: f64,
    pub seed: u64,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            booster: BoosterKind::Gbtree,
            objective: Objective::SquaredError,
            max_depth: 4,
            eta: 0.1,
            min_child_weight: 1.0,
            subsample: 0.8,
            colsample_bytree: 1.0,
            iterations: 200,
            lambda: 1.0,
            gamma: 0.0,
            seed: 42,
        }
    }
}

impl BoosterConfig {
    /// Read a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ModelError::InvalidConfig(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let config: BoosterConfig =
            serde_json::from_str(text).map_err(|e| ModelError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let fraction = |name: &str, v: f64| {
            if v > 0.0 && v <= 1.0 {
                Ok(())
            } else {
                Err(ModelError::InvalidConfig(format!("{name} must be in (0, 1], got {v}")))
            }
        };
        fraction("subsample", self.subsample)?;
        fraction("colsample_bytree", self.colsample_bytree)?;

        if !(self.eta > 0.0 && self.eta.is_finite()) {
            return Err(ModelError::InvalidConfig(format!(
                "eta must be positive, got {}",
                self.eta
            )));
        }
        if self.max_depth == 0 {
            return Err(ModelError::InvalidConfig("max_depth must be at least 1".into()));
        }
        if self.iterations == 0 {
            return Err(ModelError::InvalidConfig("iterations must be at least 1".into()));
        }
        if self.lambda < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return Err(ModelError::InvalidConfig(
                "lambda, gamma and min_child_weight must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BoosterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.iterations, 200);
    }

    #[test]
    fn json_overrides_and_legacy_objective() {
        let config =
            BoosterConfig::from_json(r#"{ "objective": "reg:linear", "eta": 0.3, "iterations": 50 }"#)
                .unwrap();
        assert_eq!(config.objective, Objective::SquaredError);
        assert_eq!(config.eta, 0.3);
        assert_eq!(config.iterations, 50);
        assert_eq!(config.subsample, 0.8);
    }

    #[test]
    fn rejects_unknown_booster_and_bad_ranges() {
        assert!(BoosterConfig::from_json(r#"{ "booster": "gblinear" }"#).is_err());
        assert!(BoosterConfig::from_json(r#"{ "subsample": 0.0 }"#).is_err());
        assert!(BoosterConfig::from_json(r#"{ "max_depth": 0 }"#).is_err());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("booster.json");
        std::fs::write(&path, r#"{ "max_depth": 6 }"#).unwrap();
        assert_eq!(BoosterConfig::from_json_file(&path).unwrap().max_depth, 6);
        assert!(BoosterConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
