mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::ForecasterApp;
use clap::Parser;
use eframe::egui;
use state::AppState;
use ts_forecaster::BoosterConfig;

/// Desktop time-series forecaster.
#[derive(Parser, Debug)]
#[command(name = "ts-forecaster", version, about, long_about = None)]
struct Args {
    /// CSV or XLSX file to open on startup
    data_file: Option<PathBuf>,

    /// JSON file with booster hyperparameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Split CSV lines on commas without quoting support
    #[arg(long)]
    simple_csv: bool,
}

fn main() -> eframe::Result {
    env_logger::init();
    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Time-series Forecaster",
        options,
        Box::new(move |_cc| {
            let config = match &args.config {
                Some(path) => BoosterConfig::from_json_file(path)?,
                None => BoosterConfig::default(),
            };
            let mut state = AppState::new(config)?;
            state.load_options.comma_split_csv = args.simple_csv;
            if let Some(path) = &args.data_file {
                state.open_file(path);
            }
            Ok(Box::new(ForecasterApp::new(state)))
        }),
    )
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn startup_arguments() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(["ts-forecaster", "--config", "b.json", "data.xlsx"]).unwrap();
        assert_eq!(args.data_file, Some(PathBuf::from("data.xlsx")));
        assert_eq!(args.config, Some(PathBuf::from("b.json")));
        assert!(!args.simple_csv);

        assert!(Args::try_parse_from(["ts-forecaster"]).unwrap().data_file.is_none());
    }
}
