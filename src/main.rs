mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::PaymentLensApp;
use clap::Parser;
use eframe::egui;
use payment_lens::config::DEFAULT_DERIVED_DIR;

/// Interactive explorer for the derived payment tables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder holding the derived state-summary and detail tables
    #[arg(long, default_value = DEFAULT_DERIVED_DIR, env = "PAYMENT_LENS_DATA_DIR")]
    data_dir: PathBuf,
}

fn main() -> eframe::Result {
    env_logger::init();
    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Payment Lens – Healthcare Payment Inequality",
        options,
        Box::new(move |_cc| Ok(Box::new(PaymentLensApp::new(args.data_dir)))),
    )
}
