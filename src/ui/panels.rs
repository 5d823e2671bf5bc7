use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;

/// Label for "no datetime column" in the selector.
const ROW_ORDER: &str = "(row order)";

// ---------------------------------------------------------------------------
// Left side panel – column selection, hyperparameters, forecast
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Columns");
    ui.separator();

    let Some(data) = state.session.data() else {
        ui.label("No dataset loaded.");
        return;
    };
    let headers = data.headers.clone();
    let current_dt = state.session.datetime_key().map(str::to_string);
    let current_target = state.session.target_key().unwrap_or_default().to_string();
    let locked = state.is_training();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.add_enabled_ui(!locked, |ui: &mut Ui| {
                // ---- Datetime selector ----
                ui.strong("Datetime column");
                egui::ComboBox::from_id_salt("datetime_column")
                    .selected_text(current_dt.as_deref().unwrap_or(ROW_ORDER))
                    .show_ui(ui, |ui: &mut Ui| {
                        if ui.selectable_label(current_dt.is_none(), ROW_ORDER).clicked() {
                            state.select_datetime(None);
                        }
                        for col in &headers {
                            if ui
                                .selectable_label(current_dt.as_deref() == Some(col.as_str()), col)
                                .clicked()
                            {
                                state.select_datetime(Some(col.clone()));
                            }
                        }
                    });

                // ---- Target selector ----
                ui.strong("Target");
                egui::ComboBox::from_id_salt("target_column")
                    .selected_text(&current_target)
                    .show_ui(ui, |ui: &mut Ui| {
                        for col in &headers {
                            if ui.selectable_label(current_target == *col, col).clicked() {
                                state.select_target(col.clone());
                            }
                        }
                    });
                ui.separator();

                // ---- Hyperparameters ----
                egui::CollapsingHeader::new(RichText::new("Model (gbtree)").strong())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| booster_settings(ui, state));
            });
            ui.separator();

            // ---- Forecast ----
            ui.strong("Forecast");
            match &state.forecast {
                Some(forecast) => {
                    ui.monospace(forecast.to_string());
                    if !forecast.carried_forward.is_empty() {
                        ui.label(
                            RichText::new(format!(
                                "Assumes the last values of {} persist one step ahead.",
                                forecast.carried_forward.join(", ")
                            ))
                            .weak(),
                        );
                    }
                }
                None => {
                    ui.label("Train, then Predict +1.");
                }
            }
        });
}

fn booster_settings(ui: &mut Ui, state: &mut AppState) {
    let cfg = &mut state.session.config;
    egui::Grid::new("booster_settings")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("max_depth");
            ui.add(egui::DragValue::new(&mut cfg.max_depth).range(1..=16));
            ui.end_row();

            ui.label("eta");
            ui.add(egui::DragValue::new(&mut cfg.eta).range(0.001..=1.0).speed(0.005));
            ui.end_row();

            ui.label("iterations");
            ui.add(egui::DragValue::new(&mut cfg.iterations).range(1..=5000));
            ui.end_row();

            ui.label("subsample");
            ui.add(egui::DragValue::new(&mut cfg.subsample).range(0.05..=1.0).speed(0.01));
            ui.end_row();

            ui.label("colsample_bytree");
            ui.add(egui::DragValue::new(&mut cfg.colsample_bytree).range(0.05..=1.0).speed(0.01));
            ui.end_row();

            ui.label("min_child_weight");
            ui.add(egui::DragValue::new(&mut cfg.min_child_weight).range(0.0..=100.0).speed(0.1));
            ui.end_row();

            ui.label("lambda");
            ui.add(egui::DragValue::new(&mut cfg.lambda).range(0.0..=100.0).speed(0.1));
            ui.end_row();

            ui.label("gamma");
            ui.add(egui::DragValue::new(&mut cfg.gamma).range(0.0..=100.0).speed(0.1));
            ui.end_row();

            ui.label("seed");
            ui.add(egui::DragValue::new(&mut cfg.seed));
            ui.end_row();
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            ui.checkbox(&mut state.load_options.comma_split_csv, "Plain comma-split CSV");
        });

        ui.separator();

        let can_train = state.session.can_train() && !state.is_training();
        if ui.add_enabled(can_train, egui::Button::new("Train")).clicked() {
            state.start_training();
        }
        let can_predict = state.session.can_predict() && !state.is_training();
        if ui.add_enabled(can_predict, egui::Button::new("Predict +1")).clicked() {
            state.predict();
        }
        if state.is_training() {
            ui.spinner();
        }

        ui.separator();

        if let Some(data) = state.session.data() {
            ui.label(format!("{} rows, {} columns", data.len(), data.headers.len()));
            ui.separator();
        }

        let status = RichText::new(format!("Status: {}", state.status));
        if state.status_is_error {
            ui.label(status.color(Color32::RED));
        } else {
            ui.label(status);
        }
    });
}

// ---------------------------------------------------------------------------
// Bottom panel – data preview
// ---------------------------------------------------------------------------

/// Render the loaded rows as a table.
pub fn data_table(ui: &mut Ui, state: &AppState) {
    let Some(data) = state.session.data() else {
        ui.label("No dataset loaded.");
        return;
    };

    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .column(Column::auto().at_least(40.0))
            .columns(Column::auto().at_least(80.0), data.headers.len())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("#");
                });
                for h in &data.headers {
                    header.col(|ui| {
                        ui.strong(h);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, data.len(), |mut row| {
                    let idx = row.index();
                    let record = &data.rows[idx];
                    row.col(|ui| {
                        ui.label(idx.to_string());
                    });
                    for h in &data.headers {
                        row.col(|ui| {
                            let text = record.get(h).map(|v| v.to_string()).unwrap_or_default();
                            ui.label(text);
                        });
                    }
                });
            });
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open time-series data")
        .add_filter("Supported files", &["csv", "xlsx"])
        .add_filter("CSV", &["csv"])
        .add_filter("Excel workbook", &["xlsx"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}
