use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use ts_forecaster::{BoosterConfig, GbtreeInitializer, LoadOptions, Session};

/// Train a boosted-tree model on a time-series table and forecast the next step.
#[derive(Parser, Debug)]
#[command(name = "forecast", version, about, long_about = None)]
struct Args {
    /// Input data file (.csv or .xlsx)
    file: PathBuf,

    /// Column to forecast (default: first column that is not the datetime column)
    #[arg(short, long)]
    target: Option<String>,

    /// Column holding timestamps (default: first header containing "date" or "time")
    #[arg(long, conflicts_with = "no_datetime")]
    datetime: Option<String>,

    /// Treat every column as data; row order is the time axis
    #[arg(long)]
    no_datetime: bool,

    /// JSON file with booster hyperparameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Split CSV lines on commas without quoting support
    #[arg(long)]
    simple_csv: bool,
}

impl Args {
    /// `Some(None)` clears the inferred datetime column.
    fn datetime_choice(&self) -> Option<Option<&str>> {
        if self.no_datetime {
            Some(None)
        } else {
            self.datetime.as_deref().map(Some)
        }
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            comma_split_csv: self.simple_csv,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BoosterConfig::from_json_file(path)?,
        None => BoosterConfig::default(),
    };

    let mut session = Session::new(config);
    session
        .load_file(&args.file, args.load_options())
        .await
        .with_context(|| format!("loading {}", args.file.display()))?;

    if let Some(dt) = args.datetime_choice() {
        session.select_datetime(dt)?;
    }
    if let Some(target) = &args.target {
        session.select_target(target)?;
    }

    session
        .train(Arc::new(GbtreeInitializer::new()))
        .await
        .context("failed to initialize or train model")?;
    let forecast = session.predict_next()?;

    println!("{forecast}");
    if !forecast.carried_forward.is_empty() {
        println!(
            "(assumes the last values of {} persist one step ahead)",
            forecast.carried_forward.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_file_and_column_choices() {
        let args = Args::try_parse_from([
            "forecast", "load.csv", "--target", "load", "--datetime", "ts", "--simple-csv",
        ])
        .unwrap();
        assert_eq!(args.file, PathBuf::from("load.csv"));
        assert_eq!(args.target.as_deref(), Some("load"));
        assert_eq!(args.datetime_choice(), Some(Some("ts")));
        assert!(args.load_options().comma_split_csv);

        let args = Args::try_parse_from(["forecast", "load.csv", "--no-datetime"]).unwrap();
        assert_eq!(args.datetime_choice(), Some(None));

        let args = Args::try_parse_from(["forecast", "load.csv"]).unwrap();
        assert_eq!(args.datetime_choice(), None);
        assert!(!args.load_options().comma_split_csv);
    }

    #[test]
    fn rejects_conflicting_or_unknown_flags() {
        assert!(Args::try_parse_from([
            "forecast", "a.csv", "--datetime", "ts", "--no-datetime"
        ])
        .is_err());
        assert!(Args::try_parse_from(["forecast", "a.csv", "--bogus"]).is_err());
        assert!(Args::try_parse_from(["forecast"]).is_err());
    }
}
