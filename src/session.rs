use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::data::loader::{self, LoadOptions};
use crate::data::model::LoadedData;
use crate::error::{ModelError, SessionError};
use crate::features::{build_features, FeatureBundle};
use crate::model::{free_quietly, BoosterConfig, ModelInitializer, Regressor};

// ---------------------------------------------------------------------------
// Model lifecycle
// ---------------------------------------------------------------------------

/// Where the session's model is in its lifecycle. Predictions are only
/// served from `Trained`.
pub enum ModelState {
    Untrained,
    Training { job_id: u64 },
    Trained(Box<dyn Regressor>),
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Untrained => write!(f, "Untrained"),
            ModelState::Training { job_id } => write!(f, "Training {{ job_id: {job_id} }}"),
            ModelState::Trained(_) => write!(f, "Trained"),
        }
    }
}

/// Everything a training run needs, detached from the session so it can be
/// awaited elsewhere (e.g. on a runtime thread while the UI keeps drawing).
#[derive(Debug, Clone)]
pub struct TrainingJob {
    id: u64,
    target: String,
    features: FeatureBundle,
    config: BoosterConfig,
}

/// Result of [`TrainingJob::run`], handed back to [`Session::complete_training`].
pub struct TrainingOutcome {
    pub job_id: u64,
    pub result: Result<Box<dyn Regressor>, ModelError>,
}

impl TrainingJob {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Resolve the backend, construct a model and await its training.
    pub async fn run(self, initializer: Arc<dyn ModelInitializer>) -> TrainingOutcome {
        let result = self.train_model(initializer.as_ref()).await;
        TrainingOutcome {
            job_id: self.id,
            result,
        }
    }

    async fn train_model(
        &self,
        initializer: &dyn ModelInitializer,
    ) -> Result<Box<dyn Regressor>, ModelError> {
        let factory = initializer.initialize().await?;
        let mut model = factory.construct(&self.config)?;

        log::info!(
            "Training on {} rows x {} features for target {:?}",
            self.features.x.len(),
            self.features.width(),
            self.target
        );
        if let Err(e) = model.train(&self.features.x, &self.features.y).await {
            free_quietly(model.as_mut());
            return Err(e);
        }
        Ok(model)
    }
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

/// A one-step-ahead prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub target: String,
    pub value: f64,
    /// Time index of the predicted step (= number of known rows).
    pub step: usize,
    /// Exogenous columns whose last known value was assumed to persist.
    pub carried_forward: Vec<String>,
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_finite() {
            write!(f, "Target=\"{}\" → next(+1) forecast: {:.4}", self.target, self.value)
        } else {
            write!(f, "Target=\"{}\" → next(+1) forecast: {}", self.target, self.value)
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One user's working set: the loaded table, the column choices and the model.
/// Loading a new file replaces all of it.
pub struct Session {
    data: Option<LoadedData>,
    datetime_key: Option<String>,
    target_key: Option<String>,
    /// Hyperparameters for the next training run.
    pub config: BoosterConfig,
    model: ModelState,
    last_job_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(BoosterConfig::default())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.discard_model();
    }
}

impl Session {
    pub fn new(config: BoosterConfig) -> Self {
        Self {
            data: None,
            datetime_key: None,
            target_key: None,
            config,
            model: ModelState::Untrained,
            last_job_id: 0,
        }
    }

    // -- data & selection --

    /// Read and load a file, replacing the current data.
    pub async fn load_file(&mut self, path: &Path, options: LoadOptions) -> Result<(), SessionError> {
        let data = loader::load_file(path, options).await?;
        self.set_data(data);
        Ok(())
    }

    /// Install freshly loaded data. Preselects the inferred datetime column
    /// and the first other column as target.
    pub fn set_data(&mut self, data: LoadedData) {
        self.discard_model();
        self.datetime_key = data.datetime_key.clone();
        self.target_key = data
            .headers
            .iter()
            .find(|h| Some(h.as_str()) != self.datetime_key.as_deref())
            .cloned();
        self.data = Some(data);
    }

    pub fn data(&self) -> Option<&LoadedData> {
        self.data.as_ref()
    }

    pub fn datetime_key(&self) -> Option<&str> {
        self.datetime_key.as_deref()
    }

    pub fn target_key(&self) -> Option<&str> {
        self.target_key.as_deref()
    }

    /// Choose the datetime column (`None` = use row order only).
    pub fn select_datetime(&mut self, key: Option<&str>) -> Result<(), SessionError> {
        if let Some(k) = key {
            self.require_column(k)?;
        }
        if self.datetime_key.as_deref() != key {
            self.datetime_key = key.map(str::to_string);
            self.discard_model();
        }
        Ok(())
    }

    pub fn select_target(&mut self, key: &str) -> Result<(), SessionError> {
        self.require_column(key)?;
        if self.target_key.as_deref() != Some(key) {
            self.target_key = Some(key.to_string());
            self.discard_model();
        }
        Ok(())
    }

    fn require_column(&self, key: &str) -> Result<(), SessionError> {
        let data = self.data.as_ref().ok_or(SessionError::NoData)?;
        if data.has_column(key) {
            Ok(())
        } else {
            Err(SessionError::UnknownColumn(key.to_string()))
        }
    }

    /// Build features for the current data and column choices.
    pub fn features(&self) -> Result<FeatureBundle, SessionError> {
        let data = self.data.as_ref().ok_or(SessionError::NoData)?;
        let target = self.target_key.as_deref().ok_or(SessionError::NoTarget)?;
        if self.datetime_key.as_deref() == Some(target) {
            return Err(SessionError::TargetIsDatetime);
        }
        build_features(&data.rows, self.datetime_key.as_deref(), target).ok_or(SessionError::NoRows)
    }

    // -- model lifecycle --

    pub fn model_state(&self) -> &ModelState {
        &self.model
    }

    pub fn is_training(&self) -> bool {
        matches!(self.model, ModelState::Training { .. })
    }

    pub fn can_train(&self) -> bool {
        !self.is_training() && self.data.is_some() && self.target_key.is_some()
    }

    pub fn can_predict(&self) -> bool {
        matches!(self.model, ModelState::Trained(_))
    }

    /// Build features and move into `Training`. The returned job must be run
    /// and its outcome passed to [`complete_training`](Self::complete_training).
    pub fn prepare_training(&mut self) -> Result<TrainingJob, SessionError> {
        if self.is_training() {
            return Err(SessionError::TrainingInProgress);
        }
        let features = self.features()?;
        let target = self.target_key.clone().ok_or(SessionError::NoTarget)?;

        self.discard_model();
        self.last_job_id += 1;
        let id = self.last_job_id;
        self.model = ModelState::Training { job_id: id };

        Ok(TrainingJob {
            id,
            target,
            features,
            config: self.config.clone(),
        })
    }

    /// Install the model from a finished job. Outcomes of jobs superseded by a
    /// newer load or selection are dropped.
    pub fn complete_training(&mut self, outcome: TrainingOutcome) -> Result<(), SessionError> {
        let current = matches!(self.model, ModelState::Training { job_id } if job_id == outcome.job_id);
        if !current {
            log::debug!("Discarding outcome of superseded training job {}", outcome.job_id);
            if let Ok(mut model) = outcome.result {
                free_quietly(model.as_mut());
            }
            return Ok(());
        }

        match outcome.result {
            Ok(model) => {
                log::info!("Training job {} finished", outcome.job_id);
                self.model = ModelState::Trained(model);
                Ok(())
            }
            Err(e) => {
                log::error!("Training job {} failed: {e}", outcome.job_id);
                self.model = ModelState::Untrained;
                Err(e.into())
            }
        }
    }

    /// Prepare, run and complete a training job in one go.
    pub async fn train(&mut self, initializer: Arc<dyn ModelInitializer>) -> Result<(), SessionError> {
        let job = self.prepare_training()?;
        let outcome = job.run(initializer).await;
        self.complete_training(outcome)
    }

    /// Forecast the step after the last row. Only allowed once training has
    /// completed successfully.
    pub fn predict_next(&self) -> Result<Forecast, SessionError> {
        let ModelState::Trained(model) = &self.model else {
            return Err(SessionError::NotTrained);
        };
        let features = self.features()?;
        let target = self.target_key.clone().ok_or(SessionError::NoTarget)?;

        let predictions = model.predict(std::slice::from_ref(&features.last_feature_row))?;
        let [value] = predictions[..] else {
            return Err(ModelError::PredictionCount {
                expected: 1,
                got: predictions.len(),
            }
            .into());
        };

        let forecast = Forecast {
            target,
            value,
            step: features.x.len(),
            carried_forward: features.feature_keys,
        };
        log::info!("{forecast}");
        Ok(forecast)
    }

    fn discard_model(&mut self) {
        if let ModelState::Trained(model) = &mut self.model {
            free_quietly(model.as_mut());
        }
        self.model = ModelState::Untrained;
    }
}
