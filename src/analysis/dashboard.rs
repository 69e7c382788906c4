//! Currency-projected dashboard views.
//!
//! A [`DashboardView`] is what the terminal dashboard and exported reports
//! render: a monthly trend, the leading categories with an `Others` slice,
//! headline totals and the month-over-month trend.

use crate::analysis::aggregator::{
    category_aggregates, commodities_by_category, monthly_aggregates, time_series,
};
use crate::data::TradeStore;
use crate::models::{Category, Currency, Projected};
use serde::Serialize;

/// Number of slices shown before the rest is folded into `Others`.
pub const DEFAULT_TOP_N: usize = 6;

/// Label of the folded remainder slice.
pub const OTHERS_LABEL: &str = "Others";

/// One labelled, currency-projected data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewPoint {
    pub label: String,
    pub value: f64,
    pub imports: f64,
    pub exports: f64,
    pub balance: f64,
    pub quantity: f64,
}

impl ViewPoint {
    /// Project an aggregate into `currency`.
    pub fn project(label: impl Into<String>, item: &impl Projected, currency: Currency) -> Self {
        Self {
            label: label.into(),
            value: item.value(currency),
            imports: item.imports_in(currency),
            exports: item.exports_in(currency),
            balance: item.balance_in(currency),
            quantity: item.quantity(),
        }
    }

    /// Sum a set of points into a single `Others` slice.
    fn fold_others(points: &[ViewPoint]) -> Self {
        let totals = sum_points(points);

        Self {
            label: OTHERS_LABEL.to_string(),
            value: totals.value,
            imports: totals.imports,
            exports: totals.exports,
            balance: totals.balance,
            quantity: totals.quantity,
        }
    }
}

/// Headline figures for the KPI block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DashboardTotals {
    pub quantity: f64,
    pub value: f64,
    pub imports: f64,
    pub exports: f64,
    pub balance: f64,
}

/// Everything the dashboard renders for one currency and category filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub currency: Currency,
    pub selected: Option<Category>,
    pub monthly: Vec<ViewPoint>,
    pub categories: Vec<ViewPoint>,
    pub totals: DashboardTotals,
    /// Percent change of the last month's value over the previous month.
    pub trend: f64,
    /// Commodity breakdown, present only when a category is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commodities: Option<Vec<ViewPoint>>,
}

impl DashboardView {
    /// Build the view over `store`.
    pub fn build(
        store: &TradeStore,
        currency: Currency,
        selected: Option<Category>,
        top_n: usize,
    ) -> Self {
        let monthly_source = match selected {
            Some(category) => time_series(store, Some(category)),
            None => monthly_aggregates(store),
        };
        let monthly: Vec<ViewPoint> = monthly_source
            .iter()
            .map(|m| ViewPoint::project(m.month.clone(), m, currency))
            .collect();

        let mut category_source = category_aggregates(store);
        if let Some(category) = selected {
            if let Some(found) = category_source.iter().find(|c| c.category == category) {
                category_source = vec![found.clone()];
            }
        }

        let mut categories: Vec<ViewPoint> = category_source
            .iter()
            .map(|c| ViewPoint::project(c.category.as_str(), c, currency))
            .collect();
        categories.sort_by(|a, b| b.value.total_cmp(&a.value));

        let totals = sum_points(&categories);
        let trend = monthly_trend(&monthly);

        let others = categories.split_off(top_n.min(categories.len()));
        if !others.is_empty() {
            let folded = ViewPoint::fold_others(&others);
            if folded.value > 0.0 {
                categories.push(folded);
            }
        }

        let commodities = selected.map(|c| commodity_breakdown(store, currency, c, top_n));

        Self {
            currency,
            selected,
            monthly,
            categories,
            totals,
            trend,
            commodities,
        }
    }
}

/// Commodities of a category, top `top_n` plus an `Others` slice for the rest.
pub fn commodity_breakdown(
    store: &TradeStore,
    currency: Currency,
    category: Category,
    top_n: usize,
) -> Vec<ViewPoint> {
    let mut points: Vec<ViewPoint> = commodities_by_category(store, category)
        .iter()
        .map(|c| ViewPoint::project(c.commodity.clone(), c, currency))
        .collect();
    points.sort_by(|a, b| b.value.total_cmp(&a.value));

    let others = points.split_off(top_n.min(points.len()));
    if !others.is_empty() {
        points.push(ViewPoint::fold_others(&others));
    }

    points
}

/// Percent change between two values; zero when there is no baseline.
pub fn calculate_trend(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    ((current - previous) / previous) * 100.0
}

fn monthly_trend(monthly: &[ViewPoint]) -> f64 {
    match monthly {
        [.., previous, last] => calculate_trend(last.value, previous.value),
        _ => 0.0,
    }
}

/// Sum the points starting from `+0.0`, so an empty set never totals `-0.0`.
fn sum_points(points: &[ViewPoint]) -> DashboardTotals {
    let totals = points
        .iter()
        .fold(DashboardTotals::default(), |mut acc, p| {
            acc.quantity += p.quantity;
            acc.value += p.value;
            acc.imports += p.imports;
            acc.exports += p.exports;
            acc
        });

    DashboardTotals {
        balance: totals.exports - totals.imports,
        ..totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TradeRow, TradeType};
    use crate::test_support::fixture_store;

    fn commodity_row(commodity: &str, pkr: f64) -> TradeRow {
        TradeRow {
            month: "2025-01".to_string(),
            group: "Textile Group".to_string(),
            commodity: commodity.to_string(),
            unit: "MT".to_string(),
            quantity: 2.0,
            value_pkr: pkr,
            value_usd: pkr / 280.0,
            trade_type: TradeType::Export,
        }
    }

    #[test]
    fn test_overall_view() {
        let view = DashboardView::build(&fixture_store(), Currency::Pkr, None, DEFAULT_TOP_N);

        assert_eq!(view.monthly.len(), 3);
        assert_eq!(view.categories.len(), 6);
        assert_eq!(view.categories[0].label, "Food");
        assert_eq!(view.totals.value, 116000.0);
        assert_eq!(view.totals.imports, 62500.0);
        assert_eq!(view.totals.exports, 53500.0);
        assert_eq!(view.totals.balance, -9000.0);
        assert_eq!(view.trend, -25.0);
        assert!(view.commodities.is_none());
    }

    #[test]
    fn test_totals_cover_folded_categories() {
        let view = DashboardView::build(&fixture_store(), Currency::Pkr, None, 2);

        assert_eq!(view.categories.len(), 3);
        let others = &view.categories[2];
        assert_eq!(others.label, OTHERS_LABEL);
        assert_eq!(others.value, 27000.0 + 14000.0 + 3000.0 + 2000.0);
        assert_eq!(view.totals.value, 116000.0);
    }

    #[test]
    fn test_selected_category_view() {
        let view = DashboardView::build(
            &fixture_store(),
            Currency::Pkr,
            Some(Category::Food),
            DEFAULT_TOP_N,
        );

        assert_eq!(view.categories.len(), 1);
        assert_eq!(view.totals.value, 35000.0);
        assert_eq!(view.monthly[0].value, 17000.0);
        assert_eq!(view.monthly[2].value, 0.0);
        // Last month is empty for Food.
        assert_eq!(view.trend, -100.0);

        let commodities = view.commodities.unwrap();
        assert_eq!(commodities[0].label, "Rice");
        assert_eq!(commodities[1].label, "Palm Oil");
    }

    #[test]
    fn test_usd_projection() {
        let view = DashboardView::build(
            &fixture_store(),
            Currency::Usd,
            Some(Category::Food),
            DEFAULT_TOP_N,
        );

        assert_eq!(view.totals.value, 126.0);
        assert_eq!(view.totals.imports, 38.0);
        assert_eq!(view.totals.exports, 88.0);
    }

    #[test]
    fn test_commodity_breakdown_folds_tail() {
        let store = TradeStore::from_rows(
            (1..=8)
                .map(|i| commodity_row(&format!("Item {}", i), i as f64 * 100.0))
                .collect(),
        );

        let points = commodity_breakdown(&store, Currency::Pkr, Category::Textile, 6);
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].label, "Item 8");
        assert_eq!(points[6].label, OTHERS_LABEL);
        assert_eq!(points[6].value, 300.0);
        assert_eq!(points[6].quantity, 4.0);
    }

    #[test]
    fn test_zero_value_tail_has_no_others_slice() {
        let store = TradeStore::from_rows(vec![
            TradeRow {
                group: "Food Group".to_string(),
                ..commodity_row("Rice", 500.0)
            },
            commodity_row("Yarn", 0.0),
        ]);

        let view = DashboardView::build(&store, Currency::Pkr, None, 1);
        assert_eq!(view.categories.len(), 1);
        assert_eq!(view.categories[0].label, "Food");
        assert!(view.categories.iter().all(|c| c.label != OTHERS_LABEL));
    }

    #[test]
    fn test_empty_store_totals_are_positive_zero() {
        let view = DashboardView::build(
            &TradeStore::from_rows(Vec::new()),
            Currency::Pkr,
            None,
            DEFAULT_TOP_N,
        );

        assert!(view.categories.is_empty());
        let totals = view.totals;
        for figure in [
            totals.quantity,
            totals.value,
            totals.imports,
            totals.exports,
            totals.balance,
        ] {
            assert_eq!(figure, 0.0);
            assert!(figure.is_sign_positive());
        }
    }

    #[test]
    fn test_calculate_trend() {
        assert_eq!(calculate_trend(150.0, 100.0), 50.0);
        assert_eq!(calculate_trend(50.0, 100.0), -50.0);
        assert_eq!(calculate_trend(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_single_month_has_no_trend() {
        let store = TradeStore::from_rows(vec![commodity_row("Yarn", 10.0)]);
        let view = DashboardView::build(&store, Currency::Pkr, None, DEFAULT_TOP_N);
        assert_eq!(view.trend, 0.0);
    }
}
