//! Trade aggregation and statistics.
//!
//! This module groups the rows held in a [`TradeStore`] by month, category
//! or commodity and sums their values. Every function is a pure query over
//! the store.

use crate::data::TradeStore;
use crate::models::{
    Category, CategoryAggregate, CommodityAggregate, MonthlyAggregate, TradeRow, TradeTotals,
    TradeType,
};
use std::collections::HashMap;

/// Per-month totals over every row, sorted by month.
pub fn monthly_aggregates(store: &TradeStore) -> Vec<MonthlyAggregate> {
    monthly_series(store.months(), store.rows())
}

/// Per-category totals, largest total first.
pub fn category_aggregates(store: &TradeStore) -> Vec<CategoryAggregate> {
    let mut aggregates: Vec<CategoryAggregate> = store
        .grouped()
        .map(|(category, rows)| CategoryAggregate::new(category, TradeTotals::from_rows(rows)))
        .collect();

    aggregates.sort_by(|a, b| b.total.total_cmp(&a.total));
    aggregates
}

/// Monthly series for one category, or for all rows when `category` is `None`.
///
/// Every available month is present; a category without rows yields zeros.
pub fn time_series(store: &TradeStore, category: Option<Category>) -> Vec<MonthlyAggregate> {
    let rows = match category {
        Some(category) => store.rows_for(category).unwrap_or(&[]),
        None => store.rows(),
    };

    monthly_series(store.months(), rows)
}

/// Monthly series for a category, empty when the category has no rows.
pub fn data_by_category(store: &TradeStore, category: Category) -> Vec<MonthlyAggregate> {
    match store.rows_for(category) {
        Some(rows) => monthly_series(store.months(), rows),
        None => Vec::new(),
    }
}

/// Commodity-level totals within a category, largest total first.
pub fn commodities_by_category(store: &TradeStore, category: Category) -> Vec<CommodityAggregate> {
    let Some(rows) = store.rows_for(category) else {
        return Vec::new();
    };

    let mut order: Vec<CommodityAggregate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let name = if row.commodity.is_empty() {
            "Unknown".to_string()
        } else {
            row.commodity.clone()
        };

        let slot = *index.entry(name.clone()).or_insert_with(|| {
            order.push(empty_commodity(name, &row.unit));
            order.len() - 1
        });

        add_to_commodity(&mut order[slot], row);
    }

    for item in &mut order {
        item.balance = item.exports - item.imports;
        item.balance_usd = item.exports_usd - item.imports_usd;
        item.total = item.imports + item.exports;
        item.total_usd = item.imports_usd + item.exports_usd;
    }

    order.sort_by(|a, b| b.total.total_cmp(&a.total));
    order
}

/// Totals across every row.
pub fn grand_totals(store: &TradeStore) -> TradeTotals {
    TradeTotals::from_rows(store.rows())
}

fn monthly_series(months: &[String], rows: &[TradeRow]) -> Vec<MonthlyAggregate> {
    let mut by_month: HashMap<&str, TradeTotals> = HashMap::new();
    for row in rows {
        by_month.entry(row.month.as_str()).or_default().add(row);
    }

    let mut series: Vec<MonthlyAggregate> = months
        .iter()
        .map(|month| {
            let totals = by_month.get(month.as_str()).copied().unwrap_or_default();
            MonthlyAggregate::new(month.clone(), totals)
        })
        .collect();

    series.sort_by(|a, b| a.month.cmp(&b.month));
    series
}

fn empty_commodity(name: String, unit: &str) -> CommodityAggregate {
    CommodityAggregate {
        commodity: name,
        unit: if unit.is_empty() {
            "N/A".to_string()
        } else {
            unit.to_string()
        },
        imports: 0.0,
        exports: 0.0,
        imports_usd: 0.0,
        exports_usd: 0.0,
        quantity: 0.0,
        import_quantity: 0.0,
        export_quantity: 0.0,
        balance: 0.0,
        balance_usd: 0.0,
        total: 0.0,
        total_usd: 0.0,
    }
}

fn add_to_commodity(item: &mut CommodityAggregate, row: &TradeRow) {
    match row.trade_type {
        TradeType::Import => {
            item.imports += row.value_pkr;
            item.imports_usd += row.value_usd;
            item.import_quantity += row.quantity;
        }
        TradeType::Export => {
            item.exports += row.value_pkr;
            item.exports_usd += row.value_usd;
            item.export_quantity += row.quantity;
        }
    }
    item.quantity += row.quantity;
}
