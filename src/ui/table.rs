use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::state::AppState;
use crate::ui::format;

const ROW_HEIGHT: f32 = 18.0;

/// Filtered aggregate rows, in table order.
pub fn rows_table(ui: &mut Ui, state: &AppState) {
    let Some(tables) = &state.tables else {
        return;
    };
    let rows = &state.outcome.rows;

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(50.0))
        .column(Column::auto().at_least(180.0).resizable(true))
        .column(Column::auto().at_least(160.0).resizable(true))
        .column(Column::remainder())
        .header(ROW_HEIGHT + 2.0, |mut header| {
            header.col(|ui| {
                ui.strong("State");
            });
            header.col(|ui| {
                ui.strong("Specialty");
            });
            header.col(|ui| {
                ui.strong("Payment type");
            });
            header.col(|ui| {
                ui.strong("Amount");
            });
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let d = &tables.details[rows[row.index()]];
                row.col(|ui| {
                    ui.label(&d.state);
                });
                row.col(|ui| {
                    ui.label(&d.specialty_clean);
                });
                row.col(|ui| {
                    ui.label(&d.payment_type_clean);
                });
                row.col(|ui| {
                    ui.label(format::dollars(d.payment_amount));
                });
            });
        });
}
