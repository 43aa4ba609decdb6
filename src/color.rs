use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Fixed chart colours
// ---------------------------------------------------------------------------

pub const BAR_COLOR: Color32 = Color32::from_rgb(0x45, 0x7b, 0x9d);
pub const LORENZ_COLOR: Color32 = Color32::from_rgb(0xe6, 0x39, 0x46);
pub const EQUALITY_COLOR: Color32 = Color32::GRAY;

const BLUE_HUE: f32 = 210.0;
const LIGHTEST: f32 = 0.88;
const DARKEST: f32 = 0.28;

fn hsl_to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Sequential blue ramp: value → Color32
// ---------------------------------------------------------------------------

/// Colour for `value` on a light-to-dark blue ramp spanning `[min, max]`.
/// A degenerate range maps everything to the middle of the ramp.
pub fn intensity_color(value: f64, min: f64, max: f64) -> Color32 {
    let range = max - min;
    let t = if range.abs() < f64::EPSILON {
        0.5
    } else {
        ((value - min) / range).clamp(0.0, 1.0) as f32
    };
    let lightness = LIGHTEST + (DARKEST - LIGHTEST) * t;
    hsl_to_color32(Hsl::new(BLUE_HUE, 0.65, lightness))
}
