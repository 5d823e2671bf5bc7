use thiserror::Error;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Failure to turn a file into [`LoadedData`](crate::data::model::LoadedData).
/// No partial data is ever produced alongside one of these.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("input is empty")]
    Empty,

    #[error("input has no header row")]
    MissingHeader,

    #[error("unsupported file type: .{0} (use .csv or .xlsx)")]
    UnsupportedFileType(String),

    #[error("input is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Model collaborator
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to initialise model backend: {0}")]
    Init(String),

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("training failed: {0}")]
    Train(String),

    #[error("model has not been trained")]
    NotTrained,

    #[error("expected {expected} features per row, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("model returned {got} predictions for {expected} rows")]
    PredictionCount { expected: usize, got: usize },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no data loaded")]
    NoData,

    #[error("loaded data has no rows")]
    NoRows,

    #[error("no target column selected")]
    NoTarget,

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("target column must differ from the datetime column")]
    TargetIsDatetime,

    #[error("training is already in progress")]
    TrainingInProgress,

    #[error("no trained model; train before predicting")]
    NotTrained,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
