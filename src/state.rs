use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tokio::sync::oneshot::{self, error::TryRecvError};

use ts_forecaster::data::loader::LoadOptions;
use ts_forecaster::data::series::{axis_label, numeric_series, value_bounds, Series};
use ts_forecaster::model::{free_quietly, BoosterConfig, GbtreeInitializer, ModelInitializer};
use ts_forecaster::{ModelError, Forecast, Session, TrainingOutcome};

use crate::color::SeriesColors;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// A training job running on the runtime, awaited by polling each frame.
struct PendingTraining {
    job_id: u64,
    rx: oneshot::Receiver<TrainingOutcome>,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded data, column choices and model.
    pub session: Session,

    /// Numeric columns of the loaded data, ready to plot.
    pub series: Vec<Series>,

    /// Colour per plotted column.
    pub colors: SeriesColors,

    /// Padded y range over all series.
    pub value_bounds: Option<(f64, f64)>,

    /// X-axis tick labels (datetime cells or row indices).
    pub x_labels: Arc<[String]>,

    /// Last forecast, cleared whenever data or columns change.
    pub forecast: Option<Forecast>,

    /// Path of the loaded file.
    pub loaded_path: Option<PathBuf>,

    pub load_options: LoadOptions,

    /// Status / error message shown in the UI.
    pub status: String,
    pub status_is_error: bool,

    pending: Option<PendingTraining>,
    runtime: Runtime,
    initializer: Arc<dyn ModelInitializer>,
}

impl AppState {
    pub fn new(config: BoosterConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("starting async runtime")?;

        Ok(Self {
            session: Session::new(config),
            series: Vec::new(),
            colors: SeriesColors::default(),
            value_bounds: None,
            x_labels: Arc::from(Vec::new()),
            forecast: None,
            loaded_path: None,
            load_options: LoadOptions::default(),
            status: "idle".to_string(),
            status_is_error: false,
            pending: None,
            runtime,
            initializer: Arc::new(GbtreeInitializer::new()),
        })
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = msg.into();
        self.status_is_error = false;
    }

    fn set_error(&mut self, msg: String) {
        log::error!("{msg}");
        self.status = format!("error: {msg}");
        self.status_is_error = true;
    }

    pub fn is_training(&self) -> bool {
        self.pending.is_some()
    }

    // -- data --

    /// Load a file, replacing the current data and model.
    pub fn open_file(&mut self, path: &Path) {
        self.set_status(format!("reading {} ...", path.display()));
        let result = self
            .runtime
            .block_on(self.session.load_file(path, self.load_options));

        match result {
            Ok(()) => {
                self.loaded_path = Some(path.to_path_buf());
                self.forecast = None;
                self.refresh_series();
                self.set_status("data loaded");
            }
            Err(e) => self.set_error(format!("{e:#}")),
        }
    }

    /// Recompute plot series after a data or datetime-column change.
    pub fn refresh_series(&mut self) {
        let Some(data) = self.session.data() else {
            return;
        };
        let datetime_key = self.session.datetime_key();

        self.series = numeric_series(data, datetime_key);
        self.colors = SeriesColors::new(self.series.iter().map(|s| s.key.as_str()));
        self.value_bounds = value_bounds(&self.series);
        self.x_labels = (0..data.len())
            .map(|i| axis_label(data, datetime_key, i))
            .collect();

        if self.series.is_empty() {
            log::warn!("No numeric series detected in columns {:?}", data.headers);
        }
    }

    pub fn select_datetime(&mut self, key: Option<String>) {
        match self.session.select_datetime(key.as_deref()) {
            Ok(()) => {
                self.forecast = None;
                self.refresh_series();
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }

    pub fn select_target(&mut self, key: String) {
        match self.session.select_target(&key) {
            Ok(()) => self.forecast = None,
            Err(e) => self.set_error(e.to_string()),
        }
    }

    // -- model --

    /// Build features and start training on the runtime.
    pub fn start_training(&mut self) {
        let job = match self.session.prepare_training() {
            Ok(job) => job,
            Err(e) => {
                self.set_error(e.to_string());
                return;
            }
        };

        let job_id = job.id();
        let initializer = Arc::clone(&self.initializer);
        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            let outcome = job.run(initializer).await;
            if let Err(outcome) = tx.send(outcome) {
                if let Ok(mut model) = outcome.result {
                    free_quietly(model.as_mut());
                }
            }
        });

        self.pending = Some(PendingTraining { job_id, rx });
        self.forecast = None;
        self.set_status("training (gbtree) ...");
    }

    /// Pick up a finished training job, if any.
    pub fn poll_training(&mut self) {
        let Some(pending) = &mut self.pending else {
            return;
        };

        let outcome = match pending.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Closed) => TrainingOutcome {
                job_id: pending.job_id,
                result: Err(ModelError::Train("training task ended unexpectedly".into())),
            },
        };
        self.pending = None;

        match self.session.complete_training(outcome) {
            Ok(()) if self.session.can_predict() => self.set_status("trained"),
            Ok(()) => self.set_status("training result discarded (data changed)"),
            Err(e) => self.set_error(format!("failed to initialize or train model ({e})")),
        }
    }

    pub fn predict(&mut self) {
        match self.session.predict_next() {
            Ok(forecast) => {
                self.forecast = Some(forecast);
                self.set_status("predicted");
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }
}
