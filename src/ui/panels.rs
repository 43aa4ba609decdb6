use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::{AppState, Tab};
use crate::ui::format;

// ---------------------------------------------------------------------------
// Left side panel – constraint widgets
// ---------------------------------------------------------------------------

/// Render the left panel with the four constraints.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Policy Simulation Controls");
    ui.separator();

    let Some(tables) = state.tables.clone() else {
        ui.label("No derived tables loaded.");
        return;
    };
    let all_states = tables.state_codes();
    let all_specialties = tables.specialties();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Income band ----
            ui.strong("State Income Percentile Range");
            let (mut lo, mut hi) = state.constraints.income_range;
            let lo_changed = ui
                .add(egui::Slider::new(&mut lo, 0.0..=100.0).text("from"))
                .changed();
            let hi_changed = ui
                .add(egui::Slider::new(&mut hi, 0.0..=100.0).text("to"))
                .changed();
            if lo_changed || hi_changed {
                state.set_income_range(lo, hi);
            }
            ui.separator();

            // ---- Top % focus ----
            ui.strong("Focus on Top % Recipients");
            let mut top = state.constraints.top_percent;
            if ui
                .add(egui::Slider::new(&mut top, 1.0..=100.0).suffix("%"))
                .changed()
            {
                state.set_top_percent(top);
            }
            ui.separator();

            // ---- States ----
            let header = format!(
                "States  ({}/{})",
                state.constraints.states.len(),
                all_states.len()
            );
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("states")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    select_buttons(ui, |all| state.select_all_states(all));
                    for code in &all_states {
                        let mut checked = state.constraints.states.contains(code);
                        if ui.checkbox(&mut checked, code).changed() {
                            state.toggle_state(code);
                        }
                    }
                });

            // ---- Specialties ----
            let header = format!(
                "Medical Specialties  ({}/{})",
                state.constraints.specialties.len(),
                all_specialties.len()
            );
            egui::CollapsingHeader::new(RichText::new(header).strong())
                .id_salt("specialties")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    select_buttons(ui, |all| state.select_all_specialties(all));
                    for specialty in &all_specialties {
                        let mut checked = state.constraints.specialties.contains(specialty);
                        if ui.checkbox(&mut checked, specialty).changed() {
                            state.toggle_specialty(specialty);
                        }
                    }
                });
        });
}

fn select_buttons(ui: &mut Ui, mut select: impl FnMut(bool)) {
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            select(true);
        }
        if ui.small_button("None").clicked() {
            select(false);
        }
    });
}

// ---------------------------------------------------------------------------
// KPI row and tab selector
// ---------------------------------------------------------------------------

pub fn kpi_row(ui: &mut Ui, state: &AppState) {
    let outcome = &state.outcome;
    ui.columns(3, |cols| {
        metric(&mut cols[0], "Total Filtered Payments", &format::millions(outcome.total_payments));
        metric(&mut cols[1], "Top 1% Share", &format::percent(outcome.top_1_share));
        metric(&mut cols[2], "Number of Payments", &format::count(outcome.record_count));
    });
}

fn metric(ui: &mut Ui, label: &str, value: &str) {
    ui.vertical(|ui: &mut Ui| {
        ui.label(RichText::new(label).weak());
        ui.label(RichText::new(value).size(28.0).strong());
    });
}

pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.tab, Tab::Structure, "📊 Structure");
        ui.selectable_value(&mut state.tab, Tab::Inequality, "📈 Inequality");
        ui.selectable_value(&mut state.tab, Tab::Map, "🗺 Map");
        ui.selectable_value(&mut state.tab, Tab::Rows, "Rows");
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open derived-data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                let dir = state.data_dir.clone();
                state.load_dir(dir);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(tables) = &state.tables {
            ui.label(format!(
                "{} aggregate rows loaded from {}, {} visible",
                format::count(tables.details.len()),
                state.data_dir.display(),
                format::count(state.outcome.record_count)
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Folder dialog
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open derived-data folder")
        .set_directory(&state.data_dir)
        .pick_folder();

    if let Some(dir) = folder {
        state.load_dir(dir);
    }
}
