//! Pulls a date's funds and holdings from a market-data source into the
//! query service, best effort per fund.

use crate::core::model::{DateRange, FilterCriteria};
use crate::core::source::MarketDataSource;
use crate::query::QueryService;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionOutcome {
    pub date: NaiveDate,
    /// Funds that passed the filter.
    pub funds_matched: usize,
    /// Funds whose holdings were fetched and stored in this run.
    pub funds_collected: usize,
    /// Funds that already had a snapshot for the date.
    pub funds_skipped: usize,
    /// Funds whose holdings fetch failed.
    pub funds_failed: usize,
    pub holdings_saved: usize,
}

/// Fetches the fund list for `date`, keeps the funds matching `criteria`
/// and fetches their holdings concurrently. A failing fund is logged and
/// skipped; only a failure of the fund list itself is an error.
/// `update_callback` is called once per fund fetch attempt.
pub async fn collect_for_date(
    source: &dyn MarketDataSource,
    service: &QueryService,
    date: NaiveDate,
    criteria: &FilterCriteria,
    update_callback: &dyn Fn(),
) -> Result<CollectionOutcome> {
    let funds = source
        .fetch_funds_for_date(date)
        .await
        .with_context(|| format!("Failed to fetch fund list for {date}"))?;
    let matched = service.classifier().filter(&funds, criteria);
    let funds_matched = matched.len();

    let (existing, pending): (Vec<_>, Vec<_>) = matched
        .iter()
        .partition(|fund| service.has_snapshot(fund.ticker(), date));
    for fund in &existing {
        update_callback();
        info!(fund = %fund.ticker(), "Snapshot for {} already stored", date);
    }

    let holdings_futures = pending.iter().map(|fund| async move {
        let result = source.fetch_holdings_for_date(fund.ticker(), date).await;
        update_callback();
        (fund.ticker(), result)
    });
    let results = join_all(holdings_futures).await;
    service.save_funds(matched.clone());

    let mut outcome = CollectionOutcome {
        date,
        funds_matched,
        funds_collected: 0,
        funds_skipped: existing.len(),
        funds_failed: 0,
        holdings_saved: 0,
    };
    for (ticker, result) in results {
        match result {
            Ok(holdings) => {
                outcome.holdings_saved += service.save_holdings(&holdings);
                outcome.funds_collected += 1;
            }
            Err(e) => {
                warn!(fund = %ticker, error = %e, "Skipping fund: holdings fetch failed");
                outcome.funds_failed += 1;
            }
        }
    }

    info!(
        "Collected {} of {} funds for {} ({} already stored, {} failed, {} holdings)",
        outcome.funds_collected,
        outcome.funds_matched,
        date,
        outcome.funds_skipped,
        outcome.funds_failed,
        outcome.holdings_saved
    );
    Ok(outcome)
}

/// Collects every business day in `range`, oldest first. A day whose fund
/// list cannot be fetched is logged and left out of the result.
pub async fn collect_range(
    source: &dyn MarketDataSource,
    service: &QueryService,
    range: &DateRange,
    criteria: &FilterCriteria,
    update_callback: &dyn Fn(),
) -> Vec<CollectionOutcome> {
    let mut outcomes = Vec::new();
    for date in range.business_days() {
        match collect_for_date(source, service, date, criteria, update_callback).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(%date, error = %e, "Skipping date: collection failed"),
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::CacheStore;
    use crate::core::classifier::Classifier;
    use crate::core::model::{Fund, Holding};
    use crate::store::MemoryRepository;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::Datelike;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        fail_fund: Option<&'static str>,
        holdings_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(fail_fund: Option<&'static str>) -> Self {
            Self {
                fail_fund,
                holdings_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for FakeSource {
        async fn fetch_funds_for_date(&self, date: NaiveDate) -> Result<Vec<Fund>> {
            if date.day0() == 0 {
                return Err(anyhow!("fund list unavailable"));
            }
            Ok(vec![
                Fund::new("152100", "TIGER Semiconductor Active")?,
                Fund::new("300100", "KODEX AI Active")?,
                Fund::new("999999", "Global Bond Fund")?,
            ])
        }

        async fn fetch_holdings_for_date(
            &self,
            fund_ticker: &str,
            date: NaiveDate,
        ) -> Result<Vec<Holding>> {
            self.holdings_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_fund == Some(fund_ticker) {
                return Err(anyhow!("timeout"));
            }
            Ok(vec![
                Holding::new(fund_ticker, "005930", date, 10.0, 100.0, "Samsung")?,
                Holding::new(fund_ticker, "000660", date, 5.0, 50.0, "SK Hynix")?,
            ])
        }
    }

    fn service() -> QueryService {
        QueryService::new(
            Arc::new(MemoryRepository::new()),
            CacheStore::default(),
            Classifier::default(),
        )
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_collect_skips_failing_fund() {
        let source = FakeSource::new(Some("300100"));
        let service = service();
        let ticks = Cell::new(0);

        let outcome = collect_for_date(
            &source,
            &service,
            date(2),
            &FilterCriteria::marker_only(),
            &|| ticks.set(ticks.get() + 1),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            CollectionOutcome {
                date: date(2),
                funds_matched: 2,
                funds_collected: 1,
                funds_skipped: 0,
                funds_failed: 1,
                holdings_saved: 2,
            }
        );
        assert_eq!(ticks.get(), 2);
        assert!(service.has_snapshot("152100", date(2)));
        assert!(!service.has_snapshot("300100", date(2)));
        // The failed fund is still known, only its holdings are missing
        assert!(service.fund("300100").is_ok());
        assert!(service.fund("999999").is_err());
    }

    #[tokio::test]
    async fn test_collect_skips_stored_snapshots() {
        let source = FakeSource::new(None);
        let service = service();
        let criteria = FilterCriteria::marker_only();

        collect_for_date(&source, &service, date(2), &criteria, &|| ())
            .await
            .unwrap();
        let again = collect_for_date(&source, &service, date(2), &criteria, &|| ())
            .await
            .unwrap();

        assert_eq!(again.funds_skipped, 2);
        assert_eq!(again.funds_collected, 0);
        assert_eq!(source.holdings_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_collect_fund_list_failure_is_an_error() {
        let source = FakeSource::new(None);
        let err = collect_for_date(
            &source,
            &service(),
            date(1),
            &FilterCriteria::marker_only(),
            &|| (),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to fetch fund list"));
    }

    #[tokio::test]
    async fn test_collect_range_covers_business_days() {
        let source = FakeSource::new(None);
        let service = service();
        // Mon 2024-01-01 .. Mon 2024-01-08; the 1st fails its fund list
        let range = DateRange::new(date(1), date(8)).unwrap();

        let outcomes = collect_range(
            &source,
            &service,
            &range,
            &FilterCriteria::marker_only(),
            &|| (),
        )
        .await;

        let dates: Vec<NaiveDate> = outcomes.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![date(2), date(3), date(4), date(5), date(8)]);
        assert_eq!(service.available_dates("152100").unwrap().len(), 5);
    }
}
