//! Cache-aside query layer over the snapshot repository.
//!
//! Reads compute a cache key, return a cached result when present and
//! otherwise run the classifier, comparator or aggregator pipeline and store
//! the result. Writes go to the repository first and then invalidate every
//! cache namespace whose results could have gone stale. Keys are namespaced
//! as `fund:list`, `fund:detail:{ticker}`, `fund:dates:{ticker}`,
//! `fund:holdings:{ticker}` and `stats:{date}`.

pub mod collect;
pub mod reports;

use crate::core::aggregator;
use crate::core::cache::{key_for, CacheStore};
use crate::core::classifier::{matching_themes, Classifier};
use crate::core::comparator;
use crate::core::config::{AppConfig, CacheTtlConfig, StatsConfig};
use crate::core::error::{QueryError, QueryResult};
use crate::core::model::{normalize_ticker, round_to, FilterCriteria, Fund, Holding};
use crate::core::source::SnapshotRepository;
use chrono::NaiveDate;
use reports::*;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Threshold for "significant" holdings in summaries, in percent.
const SIGNIFICANT_WEIGHT: f64 = 1.0;

fn ttl(secs: u64) -> Option<Duration> {
    Some(Duration::from_secs(secs))
}

macro_rules! identity {
    ($name:literal) => {
        concat!(module_path!(), "::", $name)
    };
}

pub struct QueryService {
    repository: Arc<dyn SnapshotRepository>,
    cache: CacheStore,
    classifier: Classifier,
    ttl: CacheTtlConfig,
    stats: StatsConfig,
}

impl QueryService {
    pub fn new(
        repository: Arc<dyn SnapshotRepository>,
        cache: CacheStore,
        classifier: Classifier,
    ) -> Self {
        Self {
            repository,
            cache,
            classifier,
            ttl: CacheTtlConfig::default(),
            stats: StatsConfig::default(),
        }
    }

    pub fn from_config(repository: Arc<dyn SnapshotRepository>, config: &AppConfig) -> Self {
        Self {
            repository,
            cache: config.cache.build_store(),
            classifier: config.filter.classifier(),
            ttl: config.cache.ttl,
            stats: config.stats,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Uses `date` when given, otherwise the newest date with any holdings.
    pub fn resolve_date(&self, date: Option<NaiveDate>) -> QueryResult<NaiveDate> {
        match date {
            Some(date) => Ok(date),
            None => self
                .repository
                .latest_date()
                .ok_or_else(|| QueryError::no_data("no holdings have been stored")),
        }
    }

    fn holdings_on(&self, date: NaiveDate) -> QueryResult<Vec<Holding>> {
        let holdings = self.repository.holdings_for_date(date);
        if holdings.is_empty() {
            return Err(QueryError::no_data(format!("no holdings on {date}")));
        }
        Ok(holdings)
    }

    fn snapshot(&self, ticker: &str, date: NaiveDate) -> QueryResult<Vec<Holding>> {
        let holdings = self.repository.holdings_for_fund(ticker, date);
        if holdings.is_empty() {
            return Err(QueryError::no_data(format!(
                "no holdings for fund {ticker} on {date}"
            )));
        }
        Ok(holdings)
    }

    // ----- reads -----

    pub fn list_funds(&self, criteria: &FilterCriteria) -> QueryResult<Vec<FundListing>> {
        // Debug quotes each keyword; Display joins them and can collide
        let criteria_key = format!("{criteria:?}");
        let key = key_for(identity!("list_funds"), &[&criteria_key], &[], "fund:list");
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.fund_list), || {
                let funds = self.classifier.filter(&self.repository.funds(), criteria);
                Ok(funds
                    .iter()
                    .map(|fund| FundListing {
                        ticker: fund.ticker().to_string(),
                        name: fund.name().to_string(),
                        matched_themes: matching_themes(fund, criteria.themes()),
                    })
                    .collect())
            })
    }

    pub fn fund(&self, ticker: &str) -> QueryResult<Fund> {
        let ticker = normalize_ticker(ticker)?;
        let prefix = format!("fund:detail:{ticker}");
        let key = key_for(identity!("fund"), &[], &[], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.fund_detail), || {
                self.repository
                    .fund(&ticker)
                    .ok_or_else(|| QueryError::FundNotFound(ticker.clone()))
            })
    }

    /// Snapshot dates for a fund, newest first.
    pub fn available_dates(&self, ticker: &str) -> QueryResult<Vec<NaiveDate>> {
        let ticker = normalize_ticker(ticker)?;
        let prefix = format!("fund:dates:{ticker}");
        let key = key_for(identity!("available_dates"), &[], &[], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.fund_dates), || {
                Ok(self.repository.available_dates(&ticker))
            })
    }

    fn latest_fund_date(&self, ticker: &str) -> QueryResult<NaiveDate> {
        self.available_dates(ticker)?
            .first()
            .copied()
            .ok_or_else(|| QueryError::no_data(format!("no snapshots for fund {ticker}")))
    }

    /// Diffs a fund's holdings between two dates. `current` defaults to the
    /// fund's newest snapshot; `previous` to the newest snapshot before
    /// `current`, or `current` itself when there is none.
    pub fn compare_holdings(
        &self,
        ticker: &str,
        current: Option<NaiveDate>,
        previous: Option<NaiveDate>,
    ) -> QueryResult<ComparisonReport> {
        let fund = self.fund(ticker)?;
        let ticker = fund.ticker();
        let dates = self.available_dates(ticker)?;
        let Some(latest) = dates.first().copied() else {
            return Err(QueryError::no_data(format!("no snapshots for fund {ticker}")));
        };
        let current = current.unwrap_or(latest);
        let previous = previous
            .or_else(|| dates.iter().find(|d| **d < current).copied())
            .unwrap_or(current);

        let prefix = format!("fund:holdings:{ticker}");
        let key = key_for(
            identity!("compare_holdings"),
            &[&current, &previous],
            &[],
            &prefix,
        );
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.holdings), || {
                let current_holdings = self.snapshot(ticker, current)?;
                let previous_holdings = self.snapshot(ticker, previous)?;

                let diff = comparator::compare(&previous_holdings, &current_holdings);
                let records = comparator::comparison_records(&diff);
                info!(
                    fund = %ticker,
                    "Compared {} with {}: {} instruments",
                    current,
                    previous,
                    records.len()
                );
                Ok(ComparisonReport {
                    fund_ticker: ticker.to_string(),
                    fund_name: fund.name().to_string(),
                    previous_date: previous,
                    current_date: current,
                    records,
                    summary: ComparisonSummary {
                        counts: diff.counts(),
                        total_current: current_holdings.len(),
                    },
                })
            })
    }

    /// The `n` heaviest holdings of a fund. `date` defaults to the fund's
    /// newest snapshot.
    pub fn top_holdings(
        &self,
        ticker: &str,
        date: Option<NaiveDate>,
        n: usize,
    ) -> QueryResult<TopHoldingsReport> {
        let ticker = normalize_ticker(ticker)?;
        let date = match date {
            Some(date) => date,
            None => self.latest_fund_date(&ticker)?,
        };
        let prefix = format!("fund:holdings:{ticker}");
        let key = key_for(identity!("top_holdings"), &[&date, &n], &[], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.holdings), || {
                let holdings = self.snapshot(&ticker, date)?;
                Ok(TopHoldingsReport {
                    fund_ticker: ticker.clone(),
                    date,
                    holdings: comparator::top_n(&holdings, n),
                    concentration_ratio: round_to(comparator::concentration_ratio(&holdings, n), 4),
                    total_count: holdings.len(),
                })
            })
    }

    pub fn holdings_summary(
        &self,
        ticker: &str,
        date: Option<NaiveDate>,
    ) -> QueryResult<HoldingsSummary> {
        let ticker = normalize_ticker(ticker)?;
        let date = match date {
            Some(date) => date,
            None => self.latest_fund_date(&ticker)?,
        };
        let prefix = format!("fund:holdings:{ticker}");
        let key = key_for(identity!("holdings_summary"), &[&date], &[], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.holdings), || {
                let holdings = self.snapshot(&ticker, date)?;
                let groups = comparator::group_by_weight_range(&holdings);
                Ok(HoldingsSummary {
                    fund_ticker: ticker.clone(),
                    date,
                    total_count: holdings.len(),
                    total_weight: round_to(comparator::total_weight(&holdings), 4),
                    total_amount: round_to(comparator::total_amount(&holdings), 2),
                    top_10_concentration: round_to(
                        comparator::concentration_ratio(&holdings, 10),
                        4,
                    ),
                    significant_count: comparator::significant_holdings(
                        &holdings,
                        SIGNIFICANT_WEIGHT,
                    )
                    .len(),
                    large_count: groups.large.len(),
                    medium_count: groups.medium.len(),
                    small_count: groups.small.len(),
                })
            })
    }

    /// Weight of one instrument in one fund over time, oldest first.
    pub fn weight_history(&self, ticker: &str, instrument: &str) -> QueryResult<Vec<WeightPoint>> {
        let ticker = normalize_ticker(ticker)?;
        let instrument = normalize_ticker(instrument)?;
        let prefix = format!("fund:holdings:{ticker}");
        let key = key_for(identity!("weight_history"), &[&instrument], &[], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.holdings), || {
                let history: Vec<WeightPoint> = self
                    .repository
                    .weight_history(&ticker, &instrument)
                    .into_iter()
                    .map(|(date, weight)| WeightPoint { date, weight })
                    .collect();
                if history.is_empty() {
                    return Err(QueryError::no_data(format!(
                        "no history for {instrument} in fund {ticker}"
                    )));
                }
                Ok(history)
            })
    }

    pub fn duplicate_instruments(
        &self,
        date: Option<NaiveDate>,
        min_fund_count: Option<usize>,
        limit: Option<usize>,
    ) -> QueryResult<DuplicateReport> {
        let date = self.resolve_date(date)?;
        let min_fund_count = min_fund_count.unwrap_or(self.stats.min_duplicate_count);
        let limit = limit.unwrap_or(self.stats.default_limit);
        let prefix = format!("stats:{date}");
        let key = key_for(
            identity!("duplicate_instruments"),
            &[],
            &[("min_fund_count", &min_fund_count), ("limit", &limit)],
            &prefix,
        );
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.statistics), || {
                let holdings = self.holdings_on(date)?;
                let mut records = aggregator::duplicate_instruments(&holdings, min_fund_count);
                let summary = DuplicateSummary::from_records(&records);
                if limit > 0 {
                    records.truncate(limit);
                }
                Ok(DuplicateReport {
                    date,
                    total_funds: distinct_fund_count(&holdings),
                    records,
                    summary,
                })
            })
    }

    /// Instruments by total amount. `top_n` of 0 returns every instrument.
    pub fn amount_ranking(
        &self,
        date: Option<NaiveDate>,
        top_n: Option<usize>,
    ) -> QueryResult<AmountRankingReport> {
        let date = self.resolve_date(date)?;
        let top_n = top_n.unwrap_or(self.stats.default_limit);
        let prefix = format!("stats:{date}");
        let key = key_for(identity!("amount_ranking"), &[], &[("top_n", &top_n)], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.statistics), || {
                let holdings = self.holdings_on(date)?;
                let records = with_ranks(aggregator::amount_ranking(&holdings, top_n));
                let summary = AmountSummary::from_records(&records);
                Ok(AmountRankingReport {
                    date,
                    records,
                    summary,
                })
            })
    }

    pub fn theme_statistics(
        &self,
        theme: &str,
        date: Option<NaiveDate>,
        limit: Option<usize>,
    ) -> QueryResult<ThemeReport> {
        let theme = theme.trim();
        if theme.is_empty() {
            return Err(QueryError::invalid_input("theme keyword is empty"));
        }
        let date = self.resolve_date(date)?;
        let limit = limit.unwrap_or(self.stats.default_limit);
        let prefix = format!("stats:{date}");
        let key = key_for(
            identity!("theme_statistics"),
            &[&theme],
            &[("limit", &limit)],
            &prefix,
        );
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.statistics), || {
                let holdings = self.holdings_on(date)?;
                let funds = self.repository.funds();
                let mut statistics = aggregator::theme_statistics(&holdings, &funds, theme);
                if limit > 0 {
                    statistics.duplicates.truncate(limit);
                }

                let selected: HashSet<&str> =
                    statistics.fund_tickers.iter().map(String::as_str).collect();
                let theme_holdings: Vec<Holding> = holdings
                    .iter()
                    .filter(|h| selected.contains(h.fund_ticker()))
                    .cloned()
                    .collect();
                let top_amounts = with_ranks(aggregator::amount_ranking(&theme_holdings, 10));

                Ok(ThemeReport {
                    date,
                    statistics,
                    top_amounts,
                })
            })
    }

    pub fn weight_distribution(&self, date: Option<NaiveDate>) -> QueryResult<DistributionReport> {
        let date = self.resolve_date(date)?;
        let prefix = format!("stats:{date}");
        let key = key_for(identity!("weight_distribution"), &[], &[], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.statistics), || {
                let holdings = self.holdings_on(date)?;
                Ok(DistributionReport {
                    date,
                    total_holdings: holdings.len(),
                    distribution: aggregator::weight_distribution(&holdings),
                })
            })
    }

    pub fn statistics_summary(&self, date: Option<NaiveDate>) -> QueryResult<StatisticsSummary> {
        let date = self.resolve_date(date)?;
        let prefix = format!("stats:{date}");
        let key = key_for(identity!("statistics_summary"), &[], &[], &prefix);
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.statistics), || {
                let holdings = self.holdings_on(date)?;
                let total_funds = distinct_fund_count(&holdings);
                let unique_instruments = holdings
                    .iter()
                    .map(Holding::instrument_ticker)
                    .collect::<HashSet<_>>()
                    .len();

                let most_common_instrument = aggregator::top_by_frequency(&holdings, 1)
                    .into_iter()
                    .next()
                    .map(|(ticker, fund_count)| InstrumentFrequency {
                        instrument_name: holdings
                            .iter()
                            .find(|h| h.instrument_ticker() == ticker && !h.instrument_name().is_empty())
                            .map(|h| h.instrument_name().to_string())
                            .unwrap_or_default(),
                        instrument_ticker: ticker,
                        fund_count,
                    });
                let highest_amount_instrument =
                    aggregator::amount_ranking(&holdings, 1).into_iter().next();

                Ok(StatisticsSummary {
                    date,
                    total_funds,
                    unique_instruments,
                    total_holdings: holdings.len(),
                    avg_holdings_per_fund: round_to(
                        holdings.len() as f64 / total_funds as f64,
                        2,
                    ),
                    most_common_instrument,
                    highest_amount_instrument,
                })
            })
    }

    pub fn pairwise_overlap(
        &self,
        fund_a: &str,
        fund_b: &str,
        date: Option<NaiveDate>,
    ) -> QueryResult<OverlapReport> {
        let fund_a = self.fund(fund_a)?;
        let fund_b = self.fund(fund_b)?;
        let date = self.resolve_date(date)?;
        let prefix = format!("stats:{date}");
        let key = key_for(
            identity!("pairwise_overlap"),
            &[&fund_a.ticker(), &fund_b.ticker()],
            &[],
            &prefix,
        );
        self.cache
            .get_or_insert_with(&key, ttl(self.ttl.statistics), || {
                let holdings_a = self.snapshot(fund_a.ticker(), date)?;
                let holdings_b = self.snapshot(fund_b.ticker(), date)?;
                Ok(OverlapReport {
                    date,
                    fund_a: fund_a.ticker().to_string(),
                    fund_b: fund_b.ticker().to_string(),
                    overlap: aggregator::pairwise_overlap(&holdings_a, &holdings_b),
                })
            })
    }

    pub fn has_snapshot(&self, ticker: &str, date: NaiveDate) -> bool {
        self.repository.has_snapshot(ticker, date)
    }

    // ----- writes -----

    pub fn save_fund(&self, fund: Fund) {
        self.save_funds(vec![fund]);
    }

    /// Upserts funds. Fund names feed the fund views and theme statistics,
    /// so both namespaces are dropped.
    pub fn save_funds(&self, funds: Vec<Fund>) {
        if funds.is_empty() {
            return;
        }
        let count = funds.len();
        for fund in funds {
            self.repository.save_fund(fund);
        }
        let removed = self.cache.invalidate_many(&["fund:*", "stats:*"]);
        debug!("Saved {} funds, invalidated {} cache entries", count, removed);
    }

    /// Stores holdings and invalidates the per-fund and per-date namespaces
    /// they touch. Returns how many rows were new.
    pub fn save_holdings(&self, holdings: &[Holding]) -> usize {
        if holdings.is_empty() {
            return 0;
        }
        let inserted = self.repository.save_holdings(holdings);

        let tickers: BTreeSet<&str> = holdings.iter().map(Holding::fund_ticker).collect();
        let dates: BTreeSet<NaiveDate> = holdings.iter().map(Holding::date).collect();
        let mut patterns: Vec<String> = Vec::with_capacity(tickers.len() * 2 + dates.len());
        for ticker in &tickers {
            patterns.push(format!("fund:holdings:{ticker}:*"));
            patterns.push(format!("fund:dates:{ticker}:*"));
        }
        for date in &dates {
            patterns.push(format!("stats:{date}:*"));
        }
        let removed = self.cache.invalidate_many(&patterns);
        debug!(
            "Saved {} holdings for {} funds, invalidated {} cache entries",
            inserted,
            tickers.len(),
            removed
        );
        inserted
    }
}

fn distinct_fund_count(holdings: &[Holding]) -> usize {
    holdings
        .iter()
        .map(Holding::fund_ticker)
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ChangeStatus;
    use crate::store::MemoryRepository;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn holding(fund: &str, instrument: &str, day: u32, weight: f64, amount: f64) -> Holding {
        Holding::new(fund, instrument, date(day), weight, amount, "").unwrap()
    }

    fn service() -> QueryService {
        QueryService::new(
            Arc::new(MemoryRepository::new()),
            CacheStore::default(),
            Classifier::default(),
        )
    }

    fn seeded() -> QueryService {
        let service = service();
        service.save_funds(vec![
            Fund::new("152100", "TIGER Semiconductor Active").unwrap(),
            Fund::new("300100", "KODEX AI Semiconductor Active").unwrap(),
            Fund::new("999999", "Global Bond Fund").unwrap(),
        ]);
        service.save_holdings(&[
            holding("152100", "005930", 2, 10.0, 100.0),
            holding("152100", "000660", 2, 4.0, 40.0),
            holding("152100", "005930", 3, 15.0, 150.0),
            holding("152100", "035420", 3, 3.0, 30.0),
            holding("300100", "005930", 3, 12.0, 200.0),
            holding("300100", "000660", 3, 0.5, 5.0),
        ]);
        service
    }

    #[test]
    fn test_list_funds_tags_themes() {
        let service = seeded();
        let criteria = FilterCriteria::new(["Semiconductor", "AI"], ["Global"], true);

        let funds = service.list_funds(&criteria).unwrap();

        assert_eq!(funds.len(), 2);
        assert_eq!(funds[0].ticker, "152100");
        assert_eq!(funds[0].matched_themes, ["Semiconductor"]);
        assert_eq!(funds[1].matched_themes, ["Semiconductor", "AI"]);
    }

    #[test]
    fn test_list_funds_cache_key_keeps_keywords_apart() {
        let service = service();
        service.save_funds(vec![
            Fund::new("152100", "Semi Active").unwrap(),
            Fund::new("300100", "Bio Active").unwrap(),
            Fund::new("400100", "Semi, Bio Active").unwrap(),
        ]);
        let split = FilterCriteria::new(["Semi", "Bio"], Vec::<String>::new(), false);
        let joined = FilterCriteria::new(["Semi, Bio"], Vec::<String>::new(), false);
        assert_eq!(split.to_string(), joined.to_string());

        assert_eq!(service.list_funds(&split).unwrap().len(), 3);
        let funds = service.list_funds(&joined).unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].ticker, "400100");
    }

    #[test]
    fn test_fund_lookup() {
        let service = seeded();
        assert_eq!(service.fund("152100").unwrap().name(), "TIGER Semiconductor Active");
        assert_eq!(
            service.fund("123456"),
            Err(QueryError::FundNotFound("123456".to_string()))
        );
        assert!(matches!(service.fund("ABC"), Err(QueryError::Invalid(_))));
    }

    #[test]
    fn test_compare_holdings_defaults_to_latest_two_dates() {
        let service = seeded();

        let report = service.compare_holdings("152100", None, None).unwrap();

        assert_eq!(report.current_date, date(3));
        assert_eq!(report.previous_date, date(2));
        let order: Vec<&str> = report
            .records
            .iter()
            .map(|r| r.instrument_ticker.as_str())
            .collect();
        assert_eq!(order, ["005930", "035420", "000660"]);
        assert_eq!(report.records[0].status, ChangeStatus::Increased);
        assert_eq!(report.records[0].delta, 5.0);
        assert_eq!(report.summary.counts.new_count, 1);
        assert_eq!(report.summary.counts.removed_count, 1);
        assert_eq!(report.summary.counts.increased_count, 1);
        assert_eq!(report.summary.total_current, 2);
    }

    #[test]
    fn test_compare_single_snapshot_compares_with_itself() {
        let service = seeded();
        let report = service.compare_holdings("300100", None, None).unwrap();
        assert_eq!(report.previous_date, report.current_date);
        assert_eq!(report.summary.counts.unchanged_count, 2);
    }

    #[test]
    fn test_compare_missing_snapshot_is_no_data() {
        let service = seeded();
        assert!(matches!(
            service.compare_holdings("152100", Some(date(3)), Some(date(1))),
            Err(QueryError::NoData(_))
        ));
        service.save_fund(Fund::new("777777", "Empty Active").unwrap());
        assert!(matches!(
            service.compare_holdings("777777", None, None),
            Err(QueryError::NoData(_))
        ));
    }

    #[test]
    fn test_top_holdings_and_summary() {
        let service = seeded();
        let top = service.top_holdings("152100", None, 1).unwrap();
        assert_eq!(top.date, date(3));
        assert_eq!(top.holdings.len(), 1);
        assert_eq!(top.concentration_ratio, 15.0);
        assert_eq!(top.total_count, 2);

        let summary = service.holdings_summary("152100", Some(date(2))).unwrap();
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.total_weight, 14.0);
        assert_eq!(summary.total_amount, 140.0);
        assert_eq!(summary.large_count, 1);
        assert_eq!(summary.medium_count, 1);
        assert_eq!(summary.significant_count, 2);
    }

    #[test]
    fn test_weight_history() {
        let service = seeded();
        let history = service.weight_history("152100", "5930").unwrap();
        assert_eq!(
            history,
            vec![
                WeightPoint { date: date(2), weight: 10.0 },
                WeightPoint { date: date(3), weight: 15.0 },
            ]
        );
        assert!(matches!(
            service.weight_history("152100", "111111"),
            Err(QueryError::NoData(_))
        ));
    }

    #[test]
    fn test_statistics_for_latest_date() {
        let service = seeded();

        let duplicates = service.duplicate_instruments(None, None, None).unwrap();
        assert_eq!(duplicates.date, date(3));
        assert_eq!(duplicates.total_funds, 2);
        assert_eq!(duplicates.records.len(), 1);
        assert_eq!(duplicates.records[0].instrument_ticker, "005930");
        assert_eq!(duplicates.summary.max_fund_count, 2);

        let ranking = service.amount_ranking(None, Some(2)).unwrap();
        assert_eq!(ranking.records.len(), 2);
        assert_eq!(ranking.records[0].rank, 1);
        assert_eq!(ranking.records[0].record.instrument_ticker, "005930");
        assert_eq!(ranking.summary.total_amount, 380.0);

        let distribution = service.weight_distribution(None).unwrap();
        assert_eq!(distribution.total_holdings, 4);
        assert_eq!(distribution.distribution.over_10, 2);

        let summary = service.statistics_summary(None).unwrap();
        assert_eq!(summary.total_funds, 2);
        assert_eq!(summary.unique_instruments, 3);
        assert_eq!(summary.avg_holdings_per_fund, 2.0);
        assert_eq!(
            summary.most_common_instrument.unwrap().instrument_ticker,
            "005930"
        );
        assert_eq!(
            summary.highest_amount_instrument.unwrap().total_amount,
            350.0
        );
    }

    #[test]
    fn test_theme_and_overlap() {
        let service = seeded();

        let theme = service.theme_statistics("AI", Some(date(3)), None).unwrap();
        assert_eq!(theme.statistics.fund_tickers, ["300100"]);
        assert_eq!(theme.top_amounts.len(), 2);
        assert!(theme.statistics.duplicates.is_empty());

        let overlap = service.pairwise_overlap("152100", "300100", None).unwrap();
        assert_eq!(overlap.overlap.overlap_tickers, ["005930"]);
        assert_eq!(overlap.overlap.overlap_ratio_a, 50.0);
        assert_eq!(overlap.overlap.overlap_ratio_b, 50.0);
    }

    #[test]
    fn test_blank_theme_is_invalid_input() {
        let service = seeded();
        assert!(matches!(
            service.theme_statistics("  ", Some(date(3)), None),
            Err(QueryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_repository_is_no_data() {
        let service = service();
        assert!(matches!(
            service.duplicate_instruments(None, None, None),
            Err(QueryError::NoData(_))
        ));
        assert!(matches!(
            service.weight_distribution(Some(date(2))),
            Err(QueryError::NoData(_))
        ));
        assert!(service.list_funds(&FilterCriteria::unrestricted()).unwrap().is_empty());
    }

    #[test]
    fn test_reads_are_cached_and_writes_invalidate() {
        let service = seeded();

        let before = service.weight_distribution(Some(date(3))).unwrap();
        assert_eq!(before.total_holdings, 4);
        service.compare_holdings("152100", None, None).unwrap();
        let cached = service.cache().len();
        assert!(cached > 0);

        // A second read is served from the cache
        service.weight_distribution(Some(date(3))).unwrap();
        assert_eq!(service.cache().len(), cached);

        // New rows for 300100 on day 3 drop that date's statistics
        service.save_holdings(&[holding("300100", "051910", 3, 6.0, 60.0)]);
        let after = service.weight_distribution(Some(date(3))).unwrap();
        assert_eq!(after.total_holdings, 5);

        // The 152100 comparison was for another fund and is still cached
        let key_prefix = "fund:holdings:152100:";
        assert_eq!(service.cache().invalidate_pattern(&format!("{key_prefix}*")), 1);
    }

    #[test]
    fn test_fund_writes_invalidate_fund_views() {
        let service = seeded();
        assert_eq!(service.list_funds(&FilterCriteria::marker_only()).unwrap().len(), 2);

        service.save_fund(Fund::new("400100", "Robot Active").unwrap());

        assert_eq!(service.list_funds(&FilterCriteria::marker_only()).unwrap().len(), 3);
    }

    #[test]
    fn test_disabled_cache_still_answers() {
        let service = QueryService::new(
            Arc::new(MemoryRepository::new()),
            CacheStore::disabled(),
            Classifier::default(),
        );
        service.save_holdings(&[holding("152100", "005930", 2, 10.0, 100.0)]);
        assert_eq!(
            service.weight_distribution(None).unwrap().distribution.over_10,
            1
        );
        assert!(service.cache().is_empty());
    }
}
