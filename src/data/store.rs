//! In-memory trade data store.
//!
//! [`TradeStore`] is an immutable snapshot of parsed rows grouped for
//! querying. [`TradeDataset`] wraps it in an initialize-once handle that the
//! whole process can share.

use crate::data::loader::{
    fetch_text, normalize_trade_group, rows_from_text, validate_trade_data, DataSource,
};
use crate::error::TradeDataError;
use crate::models::{Category, TradeRow, TradeType};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, info};

/// Months and categories available after initialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub groups: Vec<Category>,
    pub months: Vec<String>,
}

/// Parsed rows, grouped by normalized category.
#[derive(Debug, Clone, Default)]
pub struct TradeStore {
    rows: Vec<TradeRow>,
    by_group: Vec<(Category, Vec<TradeRow>)>,
    months: Vec<String>,
    groups: Vec<Category>,
}

impl TradeStore {
    /// Build a store from already validated rows.
    pub fn from_rows(rows: Vec<TradeRow>) -> Self {
        let months: Vec<String> = rows
            .iter()
            .map(|r| r.month.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        // First-seen order is kept for both groups and the grouped rows.
        let mut by_group: Vec<(Category, Vec<TradeRow>)> = Vec::new();
        for row in &rows {
            let category = normalize_trade_group(&row.group);
            match by_group.iter_mut().find(|(c, _)| *c == category) {
                Some((_, group_rows)) => group_rows.push(row.clone()),
                None => by_group.push((category, vec![row.clone()])),
            }
        }

        let groups = by_group
            .iter()
            .map(|(c, _)| *c)
            .filter(Category::is_trade_category)
            .collect();

        Self {
            rows,
            by_group,
            months,
            groups,
        }
    }

    /// All rows, imports first.
    pub fn rows(&self) -> &[TradeRow] {
        &self.rows
    }

    /// Sorted unique months.
    pub fn months(&self) -> &[String] {
        &self.months
    }

    /// Trade categories present in the data.
    pub fn groups(&self) -> &[Category] {
        &self.groups
    }

    /// Rows belonging to a normalized category.
    pub fn rows_for(&self, category: Category) -> Option<&[TradeRow]> {
        self.by_group
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, rows)| rows.as_slice())
    }

    /// Every category with rows, in first-seen order.
    pub fn grouped(&self) -> impl Iterator<Item = (Category, &[TradeRow])> {
        self.by_group.iter().map(|(c, rows)| (*c, rows.as_slice()))
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            groups: self.groups().to_vec(),
            months: self.months.clone(),
        }
    }
}

/// Load both sources concurrently and build a store.
pub async fn load_store(
    imports: &DataSource,
    exports: &DataSource,
) -> Result<TradeStore, TradeDataError> {
    let (imports_text, exports_text) =
        futures::future::try_join(fetch_text(imports), fetch_text(exports)).await?;

    let mut rows = rows_from_text(&imports_text, TradeType::Import)?;
    let export_rows = rows_from_text(&exports_text, TradeType::Export)?;
    debug!(
        "Transformed {} import rows and {} export rows",
        rows.len(),
        export_rows.len()
    );
    rows.extend(export_rows);

    let rows = validate_trade_data(rows)?;
    if rows.is_empty() {
        return Err(TradeDataError::NoData);
    }
    Ok(TradeStore::from_rows(rows))
}

/// Initialize-once handle over the trade data.
#[derive(Debug, Default)]
pub struct TradeDataset {
    state: RwLock<Option<Arc<TradeStore>>>,
}

impl TradeDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide dataset.
    pub fn global() -> &'static TradeDataset {
        static GLOBAL: OnceLock<TradeDataset> = OnceLock::new();
        GLOBAL.get_or_init(TradeDataset::new)
    }

    /// Load both CSV sources, or return the cached summary if already loaded.
    pub async fn init(
        &self,
        imports: &DataSource,
        exports: &DataSource,
    ) -> Result<DatasetSummary, TradeDataError> {
        if let Some(store) = self.current() {
            debug!("Trade data already initialized, using cache");
            return Ok(store.summary());
        }

        info!("Loading trade data from {} and {}", imports, exports);
        let store = load_store(imports, exports)
            .await
            .map_err(|e| TradeDataError::Init(Box::new(e)))?;

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished first.
        let store = state.get_or_insert_with(|| Arc::new(store)).clone();

        info!(
            "Loaded {} rows across {} months",
            store.rows().len(),
            store.months().len()
        );
        Ok(store.summary())
    }

    pub fn is_initialized(&self) -> bool {
        self.current().is_some()
    }

    /// The loaded store.
    pub fn store(&self) -> Result<Arc<TradeStore>, TradeDataError> {
        self.current().ok_or(TradeDataError::NotInitialized)
    }

    /// Drop the loaded data so the next `init` reloads it.
    #[allow(dead_code)] // The CLI loads once per process; only tests reload.
    pub fn reset(&self) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn current(&self) -> Option<Arc<TradeStore>> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
