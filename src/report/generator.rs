//! Dashboard rendering.
//!
//! This module renders a [`DashboardView`] either as a terminal dashboard
//! or as an exported Markdown/JSON report.

use crate::analysis::dashboard::{DashboardTotals, DashboardView, ViewPoint};
use crate::models::{
    CategoryAggregate, CommodityAggregate, Currency, MonthlyAggregate, Projected,
};
use crate::report::format::{format_trend, format_value, format_volume, truncate_label};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Width of the label column in terminal tables.
const LABEL_WIDTH: usize = 22;

/// Metadata about an exported dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Location of the imports CSV.
    pub imports_source: String,
    /// Location of the exports CSV.
    pub exports_source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of trade rows loaded.
    pub rows_loaded: usize,
    /// Months covered by the data.
    pub months: Vec<String>,
}

/// An exported dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub metadata: ReportMetadata,
    pub view: DashboardView,
}

/// Render the dashboard for the terminal.
pub fn render_dashboard(view: &DashboardView) -> String {
    let mut output = String::new();

    let scope = view
        .selected
        .map(|c| c.to_string())
        .unwrap_or_else(|| "All categories".to_string());
    output.push_str(&format!("📊 Trade Dashboard ({}, {})\n\n", scope, view.currency));

    output.push_str(&render_kpis(&view.totals, view.trend, view.currency));
    output.push('\n');

    output.push_str("📅 Monthly Trend\n");
    output.push_str(&render_points(&view.monthly, view.currency));
    output.push('\n');

    output.push_str("🗂️  Categories\n");
    output.push_str(&render_points(&view.categories, view.currency));

    if let Some(ref commodities) = view.commodities {
        output.push('\n');
        output.push_str("📦 Commodities\n");
        output.push_str(&render_points(commodities, view.currency));
    }

    output
}

/// Render category aggregates as a terminal table.
pub fn render_category_table(categories: &[CategoryAggregate], currency: Currency) -> String {
    let points: Vec<ViewPoint> = categories
        .iter()
        .map(|c| ViewPoint::project(c.category.as_str(), c, currency))
        .collect();
    render_points(&points, currency)
}

/// Render monthly aggregates as a terminal table.
pub fn render_month_table(months: &[MonthlyAggregate], currency: Currency) -> String {
    let points: Vec<ViewPoint> = months
        .iter()
        .map(|m| ViewPoint::project(m.month.clone(), m, currency))
        .collect();
    render_points(&points, currency)
}

/// Render commodity aggregates as a terminal table, including units.
pub fn render_commodity_table(commodities: &[CommodityAggregate], currency: Currency) -> String {
    let mut table = String::new();

    table.push_str(&format!(
        "  {:<width$} {:>6} {:>14} {:>14} {:>14} {:>14} {:>14}\n",
        "Commodity",
        "Unit",
        "Quantity",
        "Imports",
        "Exports",
        "Balance",
        "Total",
        width = LABEL_WIDTH
    ));

    for item in commodities {
        table.push_str(&format!(
            "  {:<width$} {:>6} {:>14} {:>14} {:>14} {:>14} {:>14}\n",
            truncate_label(&item.commodity, LABEL_WIDTH - 3),
            item.unit,
            format_volume(item.quantity),
            format_value(item.imports_in(currency), currency),
            format_value(item.exports_in(currency), currency),
            format_value(item.balance_in(currency), currency),
            format_value(item.value(currency), currency),
            width = LABEL_WIDTH
        ));
    }

    table
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &DashboardReport) -> String {
    let mut output = String::new();

    output.push_str("# TradeLens Dashboard\n\n");
    output.push_str(&generate_metadata_section(&report.metadata, &report.view));
    output.push_str(&generate_kpi_section(&report.view));
    output.push_str(&generate_points_section(
        "Monthly Trend",
        "Month",
        &report.view.monthly,
        report.view.currency,
    ));
    output.push_str(&generate_points_section(
        "Categories",
        "Category",
        &report.view.categories,
        report.view.currency,
    ));

    if let Some(ref commodities) = report.view.commodities {
        output.push_str(&generate_points_section(
            "Commodities",
            "Commodity",
            commodities,
            report.view.currency,
        ));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &DashboardReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn render_kpis(totals: &DashboardTotals, trend: f64, currency: Currency) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "   Exports:  {}\n",
        format_value(totals.exports, currency)
    ));
    block.push_str(&format!(
        "   Imports:  {}\n",
        format_value(totals.imports, currency)
    ));
    block.push_str(&format!(
        "   Balance:  {}\n",
        format_value(totals.balance, currency)
    ));
    block.push_str(&format!("   Volume:   {}\n", format_volume(totals.quantity)));
    block.push_str(&format!("   Trend:    {} month over month\n", format_trend(trend)));

    block
}

fn render_points(points: &[ViewPoint], currency: Currency) -> String {
    let mut table = String::new();

    table.push_str(&format!(
        "  {:<width$} {:>14} {:>14} {:>14} {:>14}\n",
        "",
        "Imports",
        "Exports",
        "Balance",
        "Total",
        width = LABEL_WIDTH
    ));

    for p in points {
        table.push_str(&format!(
            "  {:<width$} {:>14} {:>14} {:>14} {:>14}\n",
            truncate_label(&p.label, LABEL_WIDTH - 3),
            format_value(p.imports, currency),
            format_value(p.exports, currency),
            format_value(p.balance, currency),
            format_value(p.value, currency),
            width = LABEL_WIDTH
        ));
    }

    table
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, view: &DashboardView) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Imports:** {}\n", metadata.imports_source));
    section.push_str(&format!("- **Exports:** {}\n", metadata.exports_source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows Loaded:** {}\n", metadata.rows_loaded));
    if let (Some(first), Some(last)) = (metadata.months.first(), metadata.months.last()) {
        section.push_str(&format!("- **Period:** {} to {}\n", first, last));
    }
    section.push_str(&format!("- **Currency:** {}\n", view.currency));
    if let Some(category) = view.selected {
        section.push_str(&format!("- **Category:** {}\n", category));
    }
    section.push('\n');

    section
}

fn generate_kpi_section(view: &DashboardView) -> String {
    let mut section = String::new();
    let currency = view.currency;

    section.push_str("## Key Figures\n\n");
    section.push_str("| Exports | Imports | Balance | Volume | Trend |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        format_value(view.totals.exports, currency),
        format_value(view.totals.imports, currency),
        format_value(view.totals.balance, currency),
        format_volume(view.totals.quantity),
        format_trend(view.trend)
    ));

    section
}

fn generate_points_section(
    title: &str,
    label_header: &str,
    points: &[ViewPoint],
    currency: Currency,
) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    if points.is_empty() {
        section.push_str("No data available.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| {} | Imports | Exports | Balance | Total | Volume |\n",
        label_header
    ));
    section.push_str("|:---|---:|---:|---:|---:|---:|\n");

    for p in points {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            p.label,
            format_value(p.imports, currency),
            format_value(p.exports, currency),
            format_value(p.balance, currency),
            format_value(p.value, currency),
            format_volume(p.quantity)
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by TradeLens*\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        category_aggregates, commodities_by_category, data_by_category, DEFAULT_TOP_N,
    };
    use crate::models::Category;
    use crate::test_support::fixture_store;

    fn create_test_report(selected: Option<Category>) -> DashboardReport {
        let store = fixture_store();
        DashboardReport {
            metadata: ReportMetadata {
                imports_source: "fixtures/imports.csv".to_string(),
                exports_source: "fixtures/exports.csv".to_string(),
                generated_at: Utc::now(),
                rows_loaded: store.rows().len(),
                months: store.months().to_vec(),
            },
            view: DashboardView::build(&store, Currency::Pkr, selected, DEFAULT_TOP_N),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report(None));

        assert!(markdown.contains("# TradeLens Dashboard"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("- **Period:** 2025-01 to 2025-03"));
        assert!(markdown.contains("## Key Figures"));
        assert!(markdown.contains("| Rs53.50K | Rs62.50K | Rs-9.00K |"));
        assert!(markdown.contains("| Food |"));
        assert!(!markdown.contains("## Commodities"));
    }

    #[test]
    fn test_markdown_includes_commodities_for_category() {
        let markdown = generate_markdown_report(&create_test_report(Some(Category::Food)));

        assert!(markdown.contains("- **Category:** Food"));
        assert!(markdown.contains("## Commodities"));
        assert!(markdown.contains("| Rice |"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_report(None)).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"monthly\""));
        assert!(json.contains("\"currency\": \"PKR\""));
        assert!(!json.contains("\"commodities\""));
    }

    #[test]
    fn test_render_dashboard() {
        let report = create_test_report(Some(Category::Food));
        let text = render_dashboard(&report.view);

        assert!(text.contains("Trade Dashboard (Food, PKR)"));
        assert!(text.contains("Trend:    ▼ 100.0%"));
        assert!(text.contains("Commodities"));
        assert!(text.contains("Palm Oil"));
    }

    #[test]
    fn test_render_tables() {
        let store = fixture_store();

        let categories = render_category_table(&category_aggregates(&store), Currency::Usd);
        assert!(categories.contains("Petroleum"));
        assert!(categories.contains("$"));

        let commodities = render_commodity_table(
            &commodities_by_category(&store, Category::Textile),
            Currency::Pkr,
        );
        assert!(commodities.contains("Knitwear"));
        assert!(commodities.contains("DOZ"));

        let months = render_month_table(&data_by_category(&store, Category::Food), Currency::Pkr);
        assert!(months.contains("2025-02"));
        assert!(months.contains("Rs18.00K"));
    }

    #[test]
    fn test_commodity_table_shows_balance() {
        let cotton = CommodityAggregate {
            commodity: "Raw Cotton".to_string(),
            unit: "MT".to_string(),
            imports: 5_000.0,
            exports: 2_000.0,
            imports_usd: 18.0,
            exports_usd: 7.0,
            quantity: 30.0,
            import_quantity: 20.0,
            export_quantity: 10.0,
            balance: -3_000.0,
            balance_usd: -11.0,
            total: 7_000.0,
            total_usd: 25.0,
        };

        let table = render_commodity_table(&[cotton.clone()], Currency::Pkr);
        let header = table.lines().next().unwrap();
        assert!(header.contains("Balance"));
        assert!(header.find("Exports") < header.find("Balance"));
        assert!(header.find("Balance") < header.find("Total"));

        let line = table.lines().nth(1).unwrap();
        assert!(line.contains("Rs-3.00K"));
        assert!(line.contains("Rs7.00K"));

        let usd = render_commodity_table(&[cotton], Currency::Usd);
        assert!(usd.contains("$-11.00"));
    }
}
