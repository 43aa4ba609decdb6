use std::path::PathBuf;

use eframe::egui;

use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct PaymentLensApp {
    pub state: AppState,
}

impl PaymentLensApp {
    /// Load the derived tables once at start-up.
    pub fn new(data_dir: PathBuf) -> Self {
        let mut state = AppState::new(data_dir.clone());
        state.load_dir(data_dir);
        Self { state }
    }
}

impl eframe::App for PaymentLensApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: constraints ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: KPIs and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Healthcare Industry Payment Inequality");
            match self.state.tables.as_deref() {
                None => {
                    ui.label("Run `preprocess`, then open the derived-data folder (File → Open…).");
                    return;
                }
                Some(tables) if tables.is_empty() => {
                    ui.label("The loaded tables contain no payment rows.");
                    return;
                }
                Some(_) => {}
            }
            panels::kpi_row(ui, &self.state);
            ui.separator();
            panels::tab_bar(ui, &mut self.state);
            ui.separator();

            match self.state.tab {
                Tab::Structure => plot::specialty_chart(ui, &self.state),
                Tab::Inequality => plot::lorenz_plot(ui, &self.state),
                Tab::Map => plot::intensity_chart(ui, &self.state),
                Tab::Rows => table::rows_table(ui, &self.state),
            }
        });
    }
}
