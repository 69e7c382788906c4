//! CSV fetching, parsing and row normalization.
//!
//! Sources are read either from disk or over HTTP, parsed with the `csv`
//! crate and turned into [`TradeRow`]s. Row-level validation failures abort
//! the whole load; malformed records are skipped with a warning.

use crate::error::TradeDataError;
use crate::models::{Category, TradeRow, TradeType};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Where a CSV file is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// An `http://` or `https://` URL.
    Url(String),
}

impl DataSource {
    /// Interpret a configured location as a path or URL.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            DataSource::Url(location.to_string())
        } else {
            DataSource::Path(PathBuf::from(location))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Path(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// One CSV record as it appears in the file.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawTradeRecord {
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Commodity")]
    pub commodity: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Quantity_2025")]
    pub quantity_2025: String,
    #[serde(rename = "Quantity_2024")]
    pub quantity_2024: String,
    #[serde(rename = "Rupees_2025")]
    pub rupees_2025: String,
    #[serde(rename = "Rupees_2024")]
    pub rupees_2024: String,
    #[serde(rename = "Dollar_2025")]
    pub dollar_2025: String,
    #[serde(rename = "Dollar_2024")]
    pub dollar_2024: String,
}

/// Read the raw text of a source.
pub async fn fetch_text(source: &DataSource) -> Result<String, TradeDataError> {
    debug!("Fetching {}", source);

    match source {
        DataSource::Path(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| TradeDataError::Fetch {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
        }
        DataSource::Url(url) => {
            let response = reqwest::get(url)
                .await
                .map_err(|e| TradeDataError::Fetch {
                    path: url.clone(),
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(TradeDataError::Fetch {
                    path: url.clone(),
                    reason: status
                        .canonical_reason()
                        .map(String::from)
                        .unwrap_or_else(|| status.as_u16().to_string()),
                });
            }

            response.text().await.map_err(|e| TradeDataError::Fetch {
                path: url.clone(),
                reason: e.to_string(),
            })
        }
    }
}

/// Parse CSV text into raw records.
///
/// Headers and values are trimmed and blank lines skipped. Only records with
/// a month, group and commodity and a positive quantity in either year are
/// kept.
pub fn parse_csv_text(text: &str) -> Result<Vec<RawTradeRecord>, TradeDataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    // Surface a broken header row as a hard failure.
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, result) in reader.records().enumerate() {
        // Short rows are kept; their missing trailing cells read as empty.
        let decoded = result.and_then(|mut record| {
            while record.len() < headers.len() {
                record.push_field("");
            }
            record.deserialize::<RawTradeRecord>(Some(&headers))
        });

        match decoded {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!("Skipping malformed CSV record {}: {}", index + 1, e);
            }
        }
    }

    let total = records.len();
    records.retain(|r| {
        !r.month.is_empty()
            && !r.group.is_empty()
            && !r.commodity.is_empty()
            && (parse_amount(&r.quantity_2025).is_some()
                || parse_amount(&r.quantity_2024).is_some())
    });

    debug!(
        "Parsed {} records ({} kept, {} malformed)",
        total,
        records.len(),
        skipped
    );

    Ok(records)
}

/// Turn a raw record into a trade row.
pub fn transform_row(
    raw: &RawTradeRecord,
    trade_type: TradeType,
) -> Result<TradeRow, TradeDataError> {
    let month = raw.month.trim();
    if !is_valid_month(month) {
        return Err(TradeDataError::InvalidMonth(month.to_string()));
    }

    let group = raw.group.trim();
    let commodity = raw.commodity.trim();
    let unit = raw.unit.trim();
    if group.is_empty() || commodity.is_empty() || unit.is_empty() {
        return Err(TradeDataError::MissingFields);
    }

    Ok(TradeRow {
        month: month.to_string(),
        group: group.to_string(),
        commodity: commodity.to_string(),
        unit: unit.to_string(),
        quantity: amount_with_fallback(&raw.quantity_2025, &raw.quantity_2024),
        value_pkr: amount_with_fallback(&raw.rupees_2025, &raw.rupees_2024),
        value_usd: amount_with_fallback(&raw.dollar_2025, &raw.dollar_2024),
        trade_type,
    })
}

/// Map a source trade group onto its normalized category.
///
/// Unknown groups fall into [`Category::Manufacturing`]; an empty group is
/// [`Category::Other`].
pub fn normalize_trade_group(group: &str) -> Category {
    let group = group.trim();
    if group.is_empty() {
        return Category::Other;
    }

    match group {
        "Food Group" => Category::Food,
        "Textile Group" => Category::Textile,
        "Petroleum Group" => Category::Petroleum,
        "Machinery Group" | "Transport Group" => Category::Machinery,
        "Metal Group" | "Miscellaneous Group" => Category::Manufacturing,
        "Chemical Group" => Category::Chemicals,
        _ => Category::Manufacturing,
    }
}

/// Check that every row carries the required fields.
pub fn validate_trade_data(rows: Vec<TradeRow>) -> Result<Vec<TradeRow>, TradeDataError> {
    let invalid = rows.iter().any(|row| {
        row.month.is_empty()
            || row.group.is_empty()
            || row.commodity.is_empty()
            || row.unit.is_empty()
            || !row.quantity.is_finite()
            || !row.value_pkr.is_finite()
            || !row.value_usd.is_finite()
    });

    if invalid {
        return Err(TradeDataError::InvalidData);
    }

    Ok(rows)
}

/// Parse and transform one source's text, tagging rows with `trade_type`.
pub fn rows_from_text(text: &str, trade_type: TradeType) -> Result<Vec<TradeRow>, TradeDataError> {
    parse_csv_text(text)?
        .iter()
        .map(|raw| transform_row(raw, trade_type))
        .collect()
}

/// `YYYY-MM`, digits only.
fn is_valid_month(month: &str) -> bool {
    let bytes = month.as_bytes();
    bytes.len() == 7
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

/// A usable amount: finite and strictly positive.
fn parse_amount(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn amount_with_fallback(primary: &str, fallback: &str) -> f64 {
    parse_amount(primary)
        .or_else(|| parse_amount(fallback))
        .unwrap_or(0.0)
}
