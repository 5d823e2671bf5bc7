use eframe::egui::Ui;
use egui_plot::{Legend, Line, MarkerShape, Plot, PlotPoints, Points};

use crate::color::FORECAST_COLOR;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Time-series plot (central panel)
// ---------------------------------------------------------------------------

/// Render every numeric column against row index, plus the forecast marker.
pub fn series_plot(ui: &mut Ui, state: &AppState) {
    if state.session.data().is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a CSV or XLSX file to begin  (File → Open…)");
        });
        return;
    }
    if state.series.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("No numeric columns to plot.");
        });
        return;
    }

    let labels = state.x_labels.clone();
    let x_title = state.session.datetime_key().unwrap_or("row");

    let mut plot = Plot::new("series_plot")
        .legend(Legend::default())
        .x_axis_label(x_title)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .x_axis_formatter(move |mark, _range| {
            let x = mark.value;
            if x.fract() != 0.0 || x < 0.0 {
                return String::new();
            }
            labels
                .get(x as usize)
                .cloned()
                .unwrap_or_else(|| format!("{x}"))
        });
    if let Some((lo, hi)) = state.value_bounds {
        plot = plot.include_y(lo).include_y(hi);
    }

    plot.show(ui, |plot_ui| {
        for series in &state.series {
            let line = Line::new(PlotPoints::from(series.points.clone()))
                .name(&series.key)
                .color(state.colors.color_for(&series.key))
                .width(1.5);
            plot_ui.line(line);
        }

        if let Some(forecast) = &state.forecast {
            if forecast.value.is_finite() {
                let marker = Points::new(vec![[forecast.step as f64, forecast.value]])
                    .name(format!("{} (+1)", forecast.target))
                    .shape(MarkerShape::Diamond)
                    .radius(5.0)
                    .color(FORECAST_COLOR);
                plot_ui.points(marker);
            }
        }
    });
}
