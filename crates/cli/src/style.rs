//! Terminal styling for command output.

use console::Style;

/// `✓ msg` in green.
pub fn success(msg: &str) -> String {
    format!("{} {}", Style::new().green().apply_to("✓"), msg)
}

/// `⚠ msg` in yellow.
pub fn warn(msg: &str) -> String {
    format!("{} {}", Style::new().yellow().apply_to("⚠"), msg)
}

pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// De-emphasized text for skipped or absent entries.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Side labels shown above each conflict preview.
pub fn local_label() -> String {
    Style::new().blue().bold().apply_to("local").to_string()
}

pub fn incoming_label() -> String {
    Style::new().green().bold().apply_to("incoming").to_string()
}
