//! Startup banner: "TIMETABLE" in the standard FIGlet font with a vertical gradient.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Amber (#ffb000).
const AMBER: (u8, u8, u8) = (0xff, 0xb0, 0x00);
/// Teal (#00c2a8).
const TEAL: (u8, u8, u8) = (0x00, 0xc2, 0xa8);

const TITLE: &str = "TIMETABLE";

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// ASCII-art title lines. Falls back to the plain title if the font cannot render it.
fn title_lines() -> Vec<String> {
    let Ok(font) = FIGfont::standard() else {
        return vec![TITLE.to_string()];
    };
    font.convert(TITLE)
        .map(|figure| figure.to_string().lines().map(str::to_string).collect())
        .unwrap_or_else(|| vec![TITLE.to_string()])
}

/// Prints the banner, then the version line. Terminal write errors are ignored.
pub fn print_welcome() {
    let mut out = stdout();
    let lines = title_lines();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(AMBER, TEAL, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: TEAL.0,
        g: TEAL.1,
        b: TEAL.2,
    }));
    let _ = out.execute(Print(format!(
        "timetable-sync v{}\r\n",
        env!("CARGO_PKG_VERSION")
    )));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}
