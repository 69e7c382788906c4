//! Data models for the trade dashboard.
//!
//! This module contains the core data structures used throughout
//! the application for representing trade rows and their aggregates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a trade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeType {
    Import,
    Export,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Import => write!(f, "Import"),
            TradeType::Export => write!(f, "Export"),
        }
    }
}

/// Normalized trade category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum Category {
    Food,
    Manufacturing,
    Textile,
    Petroleum,
    Machinery,
    Chemicals,
    /// Rows with no group at all.
    Other,
}

impl Category {
    /// The categories offered for filtering, in display order.
    pub const TRADE_CATEGORIES: [Category; 6] = [
        Category::Food,
        Category::Manufacturing,
        Category::Textile,
        Category::Petroleum,
        Category::Machinery,
        Category::Chemicals,
    ];

    /// Whether this category is one of the filterable trade categories.
    pub fn is_trade_category(&self) -> bool {
        Self::TRADE_CATEGORIES.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Manufacturing => "Manufacturing",
            Category::Textile => "Textile",
            Category::Petroleum => "Petroleum",
            Category::Machinery => "Machinery",
            Category::Chemicals => "Chemicals",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currency used to project aggregate values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    #[value(name = "pkr")]
    Pkr,
    #[value(name = "usd")]
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Pkr => write!(f, "PKR"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

/// One normalized import/export record derived from a CSV line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    /// Month in `YYYY-MM` form.
    pub month: String,
    /// Source trade group, as written in the CSV.
    pub group: String,
    pub commodity: String,
    pub unit: String,
    pub quantity: f64,
    pub value_pkr: f64,
    pub value_usd: f64,
    pub trade_type: TradeType,
}

/// Running import/export sums shared by every aggregate view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeTotals {
    pub imports: f64,
    pub exports: f64,
    pub imports_usd: f64,
    pub exports_usd: f64,
    pub quantity: f64,
}

impl TradeTotals {
    /// Sum a set of rows.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a TradeRow>) -> Self {
        let mut totals = Self::default();
        for row in rows {
            totals.add(row);
        }
        totals
    }

    /// Add a single row to the running sums.
    pub fn add(&mut self, row: &TradeRow) {
        match row.trade_type {
            TradeType::Import => {
                self.imports += row.value_pkr;
                self.imports_usd += row.value_usd;
            }
            TradeType::Export => {
                self.exports += row.value_pkr;
                self.exports_usd += row.value_usd;
            }
        }
        self.quantity += row.quantity;
    }

    pub fn balance(&self) -> f64 {
        self.exports - self.imports
    }

    pub fn balance_usd(&self) -> f64 {
        self.exports_usd - self.imports_usd
    }

    pub fn total(&self) -> f64 {
        self.imports + self.exports
    }

    pub fn total_usd(&self) -> f64 {
        self.imports_usd + self.exports_usd
    }
}

/// Aggregate figures for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: String,
    pub imports: f64,
    pub exports: f64,
    pub imports_usd: f64,
    pub exports_usd: f64,
    pub quantity: f64,
    pub balance: f64,
    pub balance_usd: f64,
    pub total: f64,
    pub total_usd: f64,
}

impl MonthlyAggregate {
    pub fn new(month: impl Into<String>, totals: TradeTotals) -> Self {
        Self {
            month: month.into(),
            imports: totals.imports,
            exports: totals.exports,
            imports_usd: totals.imports_usd,
            exports_usd: totals.exports_usd,
            quantity: totals.quantity,
            balance: totals.balance(),
            balance_usd: totals.balance_usd(),
            total: totals.total(),
            total_usd: totals.total_usd(),
        }
    }
}

/// Aggregate figures for one normalized category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    pub category: Category,
    pub imports: f64,
    pub exports: f64,
    pub imports_usd: f64,
    pub exports_usd: f64,
    pub quantity: f64,
    pub balance: f64,
    pub balance_usd: f64,
    pub total: f64,
    pub total_usd: f64,
}

impl CategoryAggregate {
    pub fn new(category: Category, totals: TradeTotals) -> Self {
        Self {
            category,
            imports: totals.imports,
            exports: totals.exports,
            imports_usd: totals.imports_usd,
            exports_usd: totals.exports_usd,
            quantity: totals.quantity,
            balance: totals.balance(),
            balance_usd: totals.balance_usd(),
            total: totals.total(),
            total_usd: totals.total_usd(),
        }
    }
}

/// Aggregate figures for one commodity within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityAggregate {
    pub commodity: String,
    pub unit: String,
    pub imports: f64,
    pub exports: f64,
    pub imports_usd: f64,
    pub exports_usd: f64,
    pub quantity: f64,
    pub import_quantity: f64,
    pub export_quantity: f64,
    pub balance: f64,
    pub balance_usd: f64,
    pub total: f64,
    pub total_usd: f64,
}

/// A currency-projected view of any aggregate.
///
/// Implemented by the aggregate types so views can pick the PKR or USD
/// column without caring which aggregate they hold.
pub trait Projected {
    fn value(&self, currency: Currency) -> f64;
    fn imports_in(&self, currency: Currency) -> f64;
    fn exports_in(&self, currency: Currency) -> f64;
    fn quantity(&self) -> f64;

    fn balance_in(&self, currency: Currency) -> f64 {
        self.exports_in(currency) - self.imports_in(currency)
    }
}

macro_rules! impl_projected {
    ($ty:ty) => {
        impl Projected for $ty {
            fn value(&self, currency: Currency) -> f64 {
                match currency {
                    Currency::Pkr => self.total,
                    Currency::Usd => self.total_usd,
                }
            }

            fn imports_in(&self, currency: Currency) -> f64 {
                match currency {
                    Currency::Pkr => self.imports,
                    Currency::Usd => self.imports_usd,
                }
            }

            fn exports_in(&self, currency: Currency) -> f64 {
                match currency {
                    Currency::Pkr => self.exports,
                    Currency::Usd => self.exports_usd,
                }
            }

            fn quantity(&self) -> f64 {
                self.quantity
            }
        }
    };
}

impl_projected!(MonthlyAggregate);
impl_projected!(CategoryAggregate);
impl_projected!(CommodityAggregate);
