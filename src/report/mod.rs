//! Dashboard rendering and report export.

pub mod format;
pub mod generator;

pub use format::format_value;
pub use generator::{
    generate_json_report, generate_markdown_report, render_category_table,
    render_commodity_table, render_dashboard, render_month_table, DashboardReport, ReportMetadata,
};
