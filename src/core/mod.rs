//! Holdings engine: domain model, fund classification, snapshot diffs,
//! cross-fund statistics and the query cache.

pub mod aggregator;
pub mod cache;
pub mod classifier;
pub mod comparator;
pub mod config;
pub mod error;
pub mod log;
pub mod model;
pub mod source;

// Re-export main types for cleaner imports
pub use cache::CacheStore;
pub use classifier::Classifier;
pub use error::{ModelError, QueryError, QueryResult};
pub use model::{ChangeStatus, DateRange, FilterCriteria, Fund, Holding, WeightChange};
pub use source::{CriteriaSource, MarketDataSource, SnapshotRepository};
