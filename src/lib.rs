//! Load a time-series table, engineer time features, train a boosted-tree
//! regressor and forecast the next step.

pub mod data;
pub mod error;
pub mod features;
pub mod model;
pub mod session;

pub use data::loader::{load_file, load_from_csv, load_from_xlsx, LoadOptions};
pub use data::model::{CellValue, Columns, LoadedData, Record};
pub use error::{ModelError, ParseError, SessionError};
pub use features::{build_features, FeatureBundle};
pub use model::{BoosterConfig, GbtreeInitializer, ModelFactory, ModelInitializer, Regressor};
pub use session::{Forecast, ModelState, Session, TrainingJob, TrainingOutcome};
