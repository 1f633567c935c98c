//! Human-readable sizes and dates

use chrono::{DateTime, Local, Utc};

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with binary prefixes and at most two decimals.
///
/// Trailing zeros are trimmed, so 2048 is `"2 KB"` and 1536 is `"1.5 KB"`.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

/// Parse a formatted size such as `"2.45 MB"` back into bytes.
///
/// Unknown unit suffixes count as bytes. Returns `None` when no number leads
/// the string.
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let value: f64 = number.parse().ok()?;
    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    };

    Some((value * multiplier).round() as u64)
}

/// Short local date, e.g. `"Jan 5, 2024"`
pub fn format_date(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%b %-d, %Y")
        .to_string()
}
