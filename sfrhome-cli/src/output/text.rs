//! Text output formatting with colors.

use sfrhome_core::{Device, DeviceSnapshot, LEVEL_NOT_APPLICABLE};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

const TYPE_WIDTH: usize = 16;
const NAME_WIDTH: usize = 26;
const STATUS_WIDTH: usize = 10;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the device table.
    pub fn format_summary(&self, snapshot: &DeviceSnapshot) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} {}",
            self.bold("SFR Home devices"),
            self.dim(&format!("({})", snapshot.source))
        ));
        lines.push("─".repeat(TYPE_WIDTH + NAME_WIDTH + STATUS_WIDTH + 10));

        if snapshot.is_empty() {
            lines.push(self.dim("No devices"));
            return lines.join("\n");
        }

        lines.push(self.dim(&format!(
            "{:<TYPE_WIDTH$} {:<NAME_WIDTH$} {:<STATUS_WIDTH$} {}",
            "TYPE", "NAME", "STATUS", "BATTERY"
        )));

        for device in &snapshot.devices {
            lines.push(self.format_row(device));
        }

        let values: usize = snapshot.devices.iter().map(Device::sensor_value_count).sum();
        lines.push(String::new());
        lines.push(format!(
            "{} devices, {} sensor values",
            snapshot.devices.len(),
            values
        ));

        lines.join("\n")
    }

    /// Formats one table row.
    pub fn format_row(&self, device: &Device) -> String {
        let kind = device.device_type.as_deref().unwrap_or("?");
        let status = device.status.as_deref().unwrap_or("-");

        format!(
            "{:<TYPE_WIDTH$} {:<NAME_WIDTH$} {:<STATUS_WIDTH$} {}",
            fit(kind, TYPE_WIDTH),
            fit(device.display_name(), NAME_WIDTH),
            fit(status, STATUS_WIDTH),
            self.format_battery(device.battery_level.as_deref()),
        )
    }

    /// Formats a battery level as a percentage.
    pub fn format_battery(&self, level: Option<&str>) -> String {
        match level.map(str::trim) {
            None | Some("") => "-".to_string(),
            Some(LEVEL_NOT_APPLICABLE) => self.dim("n/a"),
            Some(raw) => match raw.parse::<f64>() {
                Ok(pct) => self.color_for_percent(pct, &format!("{pct:.0}%")),
                Err(_) => raw.to_string(),
            },
        }
    }

    /// Formats an error message.
    pub fn format_error(&self, label: &str, error: &str) -> String {
        format!("{}: {} - {}", self.bold(label), self.red("Error"), error)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }
}

/// Truncates `text` to `width` characters, marking the cut with `…`.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit() {
        assert_eq!(fit("Salon", 10), "Salon");
        assert_eq!(fit("Détecteur de mouvement", 10), "Détecteur…");
    }

    #[test]
    fn test_color_for_percent() {
        let formatter = TextFormatter::new(true);
        let low = formatter.color_for_percent(15.0, "test");
        assert!(low.contains(RED));

        let mid = formatter.color_for_percent(35.0, "test");
        assert!(mid.contains(YELLOW));

        let high = formatter.color_for_percent(75.0, "test");
        assert!(high.contains(GREEN));
    }

    #[test]
    fn test_format_battery() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_battery(Some("90")), "90%");
        assert_eq!(formatter.format_battery(Some("-2")), "n/a");
        assert_eq!(formatter.format_battery(None), "-");
        assert_eq!(formatter.format_battery(Some("low")), "low");
    }
}
