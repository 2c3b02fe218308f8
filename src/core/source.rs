//! Collaborator contracts: where funds and holdings come from, where they
//! are kept, and where filter criteria are loaded from.

use crate::core::model::{FilterCriteria, Fund, Holding};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Supplies raw fund and holding records for a date. Implementations own
/// retry and backoff; a returned error means the call yielded nothing.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_funds_for_date(&self, date: NaiveDate) -> Result<Vec<Fund>>;

    async fn fetch_holdings_for_date(&self, fund_ticker: &str, date: NaiveDate)
    -> Result<Vec<Holding>>;
}

pub trait CriteriaSource {
    fn load_filter_criteria(&self) -> FilterCriteria;
}

/// Point-in-time storage of funds and their daily snapshots.
pub trait SnapshotRepository: Send + Sync {
    /// Inserts or replaces a fund by ticker.
    fn save_fund(&self, fund: Fund);

    /// Inserts holdings, ignoring rows whose identity already exists.
    /// Returns how many rows were new.
    fn save_holdings(&self, holdings: &[Holding]) -> usize;

    fn fund(&self, ticker: &str) -> Option<Fund>;

    /// All funds ordered by ticker.
    fn funds(&self) -> Vec<Fund>;

    fn holdings_for_fund(&self, fund_ticker: &str, date: NaiveDate) -> Vec<Holding>;

    fn holdings_for_date(&self, date: NaiveDate) -> Vec<Holding>;

    /// Snapshot dates for a fund, newest first.
    fn available_dates(&self, fund_ticker: &str) -> Vec<NaiveDate>;

    /// Most recent date with any holdings.
    fn latest_date(&self) -> Option<NaiveDate>;

    fn has_snapshot(&self, fund_ticker: &str, date: NaiveDate) -> bool {
        !self.holdings_for_fund(fund_ticker, date).is_empty()
    }

    /// Weight of one instrument in one fund across dates, oldest first.
    fn weight_history(&self, fund_ticker: &str, instrument_ticker: &str) -> Vec<(NaiveDate, f64)>;
}
