//! Human-readable number formatting.

use crate::models::Currency;

/// Format a monetary value with a magnitude suffix.
///
/// PKR values scale up to billions (`Rs1.20B`), USD values to millions
/// (`$3.40M`). Zero is printed bare as `Rs0` or `$0`.
pub fn format_value(value: f64, currency: Currency) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 {
        return match currency {
            Currency::Usd => "$0".to_string(),
            Currency::Pkr => "Rs0".to_string(),
        };
    }

    match currency {
        Currency::Usd => {
            if magnitude >= 1_000_000.0 {
                format!("${:.2}M", value / 1_000_000.0)
            } else if magnitude >= 1_000.0 {
                format!("${:.2}K", value / 1_000.0)
            } else {
                format!("${:.2}", value)
            }
        }
        Currency::Pkr => {
            if magnitude >= 1_000_000_000.0 {
                format!("Rs{:.2}B", value / 1_000_000_000.0)
            } else if magnitude >= 1_000_000.0 {
                format!("Rs{:.2}M", value / 1_000_000.0)
            } else if magnitude >= 1_000.0 {
                format!("Rs{:.2}K", value / 1_000.0)
            } else {
                format!("Rs{:.2}", value)
            }
        }
    }
}

/// Format a traded volume in metric tonnes.
pub fn format_volume(value: f64) -> String {
    if value == 0.0 {
        "0 MT".to_string()
    } else if value >= 1_000_000.0 {
        format!("{:.2}M MT", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.2}K MT", value / 1_000.0)
    } else {
        format!("{:.2} MT", value)
    }
}

/// Format a percentage change with a direction marker.
pub fn format_trend(percent: f64) -> String {
    if percent > 0.0 {
        format!("▲ {:.1}%", percent)
    } else if percent < 0.0 {
        format!("▼ {:.1}%", percent.abs())
    } else {
        "– 0.0%".to_string()
    }
}

/// Truncate a label for narrow columns, appending `...` when cut.
pub fn truncate_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() > max_chars {
        let cut: String = label.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        label.to_string()
    }
}
