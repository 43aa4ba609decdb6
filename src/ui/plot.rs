use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Line, LineStyle, Plot, PlotPoints};

use payment_lens::data::lookup;

use crate::color::{intensity_color, BAR_COLOR, EQUALITY_COLOR, LORENZ_COLOR};
use crate::state::AppState;
use crate::ui::format;

fn empty_notice(ui: &mut Ui, text: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading(text);
    });
}

// ---------------------------------------------------------------------------
// Structure tab: funding by specialty
// ---------------------------------------------------------------------------

pub fn specialty_chart(ui: &mut Ui, state: &AppState) {
    if state.specialty_totals.is_empty() {
        empty_notice(ui, "No payments match the current filters");
        return;
    }

    // Largest specialty on top.
    let bars: Vec<Bar> = state
        .specialty_totals
        .iter()
        .enumerate()
        .map(|(i, (name, total))| {
            Bar::new(-(i as f64), *total)
                .name(name)
                .fill(BAR_COLOR)
                .width(0.7)
        })
        .collect();

    let chart = BarChart::new(bars)
        .horizontal()
        .color(BAR_COLOR)
        .element_formatter(Box::new(|bar: &Bar, _chart: &BarChart| {
            format!("{}\n{}", bar.name, format::dollars(bar.value))
        }));

    Plot::new("specialty_plot")
        .x_axis_label("Total Payment (USD)")
        .y_axis_label("Specialty (hover for name)")
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
        });
}

// ---------------------------------------------------------------------------
// Inequality tab: Lorenz curve
// ---------------------------------------------------------------------------

pub fn lorenz_plot(ui: &mut Ui, state: &AppState) {
    if state.outcome.lorenz.is_empty() {
        empty_notice(ui, "No payments match the current filters");
        return;
    }

    let curve: PlotPoints = std::iter::once([0.0, 0.0])
        .chain(state.outcome.lorenz.iter().map(|p| [p.x, p.y]))
        .collect();

    let equality = Line::new(vec![[0.0, 0.0], [1.0, 1.0]])
        .name("Equality")
        .color(EQUALITY_COLOR)
        .style(LineStyle::dashed_loose());
    let lorenz = Line::new(curve)
        .name("Lorenz curve")
        .color(LORENZ_COLOR)
        .width(3.0);

    Plot::new("lorenz_plot")
        .legend(Legend::default())
        .x_axis_label("Cumulative Share of Recipients")
        .y_axis_label("Cumulative Share of Payments")
        .data_aspect(1.0)
        .include_x(0.0)
        .include_x(1.0)
        .include_y(0.0)
        .include_y(1.0)
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.line(equality);
            plot_ui.line(lorenz);
        });
}

// ---------------------------------------------------------------------------
// Map tab: payment intensity per state
// ---------------------------------------------------------------------------

pub fn intensity_chart(ui: &mut Ui, state: &AppState) {
    if state.state_intensity.is_empty() {
        empty_notice(ui, "No state has a payment-per-household value");
        return;
    }

    let (min, max) = state
        .state_intensity
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });

    let bars: Vec<Bar> = state
        .state_intensity
        .iter()
        .enumerate()
        .map(|(i, (code, value))| {
            let label = match lookup::state_name(code) {
                Some(name) => format!("{name} ({code})"),
                None => code.clone(),
            };
            Bar::new(i as f64, *value)
                .name(label)
                .fill(intensity_color(*value, min, max))
                .width(0.8)
        })
        .collect();

    let chart = BarChart::new(bars).element_formatter(Box::new(|bar: &Bar, _chart: &BarChart| {
        format!("{}\n{} per household", bar.name, format::dollars(bar.value))
    }));

    Plot::new("intensity_plot")
        .x_axis_label("State (ranked, hover for name)")
        .y_axis_label("USD per Household")
        .allow_drag(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
        });
}
