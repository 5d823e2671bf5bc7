/// Model layer: the capability seam between the session and a regression
/// backend.
///
/// ```text
///   ModelInitializer  (async, resolved once)
///         │
///         ▼
///   ModelFactory      construct(config)
///         │
///         ▼
///   Regressor         train(x, y).await → predict(rows) → free()
/// ```
///
/// The built-in backend is [`gbtree`]; anything implementing the traits can
/// stand in for it.

pub mod config;
pub mod gbtree;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ModelError;

pub use config::{BoosterConfig, BoosterKind, Objective};
pub use gbtree::GbtreeInitializer;

/// A trainable regression model.
#[async_trait]
pub trait Regressor: Send {
    /// Fit on `x` / `y`. The model is unusable until this resolves `Ok`.
    async fn train(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError>;

    /// One prediction per feature vector.
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    /// Release backend resources. Called best-effort; failures are logged.
    fn free(&mut self) -> Result<(), ModelError> {
        Ok(())
    }
}

/// Builds untrained models from a configuration.
pub trait ModelFactory: Send + Sync {
    fn construct(&self, config: &BoosterConfig) -> Result<Box<dyn Regressor>, ModelError>;
}

/// Asynchronously provides a [`ModelFactory`].
#[async_trait]
pub trait ModelInitializer: Send + Sync {
    async fn initialize(&self) -> Result<Arc<dyn ModelFactory>, ModelError>;
}

/// Free a model, logging instead of propagating failures.
pub fn free_quietly(model: &mut dyn Regressor) {
    if let Err(e) = model.free() {
        log::warn!("Ignoring failure while freeing model: {e}");
    }
}
