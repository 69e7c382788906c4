//! Trade data loading and storage.
//!
//! CSV sources are parsed by the loader and held in an
//! initialize-once store for querying.

pub mod loader;
pub mod store;

pub use loader::DataSource;
pub use store::{TradeDataset, TradeStore};
