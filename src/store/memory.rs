use crate::core::model::{Fund, Holding};
use crate::core::source::SnapshotRepository;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type SnapshotKey = (String, NaiveDate);

#[derive(Default)]
struct Inner {
    funds: BTreeMap<String, Fund>,
    snapshots: BTreeMap<SnapshotKey, Vec<Holding>>,
}

/// In-memory snapshot repository. Holdings keep their insertion order within
/// a snapshot.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Creates a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotRepository for MemoryRepository {
    fn save_fund(&self, fund: Fund) {
        debug!("Saving fund {}", fund.ticker());
        self.write().funds.insert(fund.ticker().to_string(), fund);
    }

    fn save_holdings(&self, holdings: &[Holding]) -> usize {
        let mut inner = self.write();
        let mut inserted = 0;
        for holding in holdings {
            let snapshot = inner
                .snapshots
                .entry((holding.fund_ticker().to_string(), holding.date()))
                .or_default();
            if snapshot
                .iter()
                .any(|h| h.instrument_ticker() == holding.instrument_ticker())
            {
                continue;
            }
            snapshot.push(holding.clone());
            inserted += 1;
        }
        debug!(
            "Saved {} of {} holdings ({} duplicates ignored)",
            inserted,
            holdings.len(),
            holdings.len() - inserted
        );
        inserted
    }

    fn fund(&self, ticker: &str) -> Option<Fund> {
        self.read().funds.get(ticker).cloned()
    }

    fn funds(&self) -> Vec<Fund> {
        self.read().funds.values().cloned().collect()
    }

    fn holdings_for_fund(&self, fund_ticker: &str, date: NaiveDate) -> Vec<Holding> {
        self.read()
            .snapshots
            .get(&(fund_ticker.to_string(), date))
            .cloned()
            .unwrap_or_default()
    }

    fn holdings_for_date(&self, date: NaiveDate) -> Vec<Holding> {
        self.read()
            .snapshots
            .iter()
            .filter(|((_, d), _)| *d == date)
            .flat_map(|(_, holdings)| holdings.iter().cloned())
            .collect()
    }

    fn available_dates(&self, fund_ticker: &str) -> Vec<NaiveDate> {
        // Keys sort by (ticker, date), so one fund's dates come out ascending
        let mut dates: Vec<NaiveDate> = self
            .read()
            .snapshots
            .iter()
            .filter(|((ticker, _), holdings)| ticker == fund_ticker && !holdings.is_empty())
            .map(|((_, date), _)| *date)
            .collect();
        dates.reverse();
        dates
    }

    fn latest_date(&self) -> Option<NaiveDate> {
        self.read()
            .snapshots
            .iter()
            .filter(|(_, holdings)| !holdings.is_empty())
            .map(|((_, date), _)| *date)
            .max()
    }

    fn weight_history(&self, fund_ticker: &str, instrument_ticker: &str) -> Vec<(NaiveDate, f64)> {
        self.read()
            .snapshots
            .iter()
            .filter(|((ticker, _), _)| ticker == fund_ticker)
            .filter_map(|((_, date), holdings)| {
                holdings
                    .iter()
                    .find(|h| h.instrument_ticker() == instrument_ticker)
                    .map(|h| (*date, h.weight()))
            })
            .collect()
    }
}
