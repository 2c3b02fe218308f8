//! Cross-sectional statistics over one date's holdings across many funds.
//!
//! Everything here is a pure function of its inputs. Empty input gives empty
//! collections or zeroed summaries, never an error. Where the ordering keys
//! tie, instrument ticker ascending decides so output is reproducible.

use crate::core::model::{round_to, Fund, Holding};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

pub const DEFAULT_MIN_FUND_COUNT: usize = 2;

/// An instrument held by at least `min_fund_count` distinct funds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateInstrument {
    pub instrument_ticker: String,
    pub instrument_name: String,
    pub fund_count: usize,
    pub fund_tickers: Vec<String>,
    pub total_amount: f64,
    pub avg_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

/// An instrument's total value across all funds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountRank {
    pub instrument_ticker: String,
    pub instrument_name: String,
    pub total_amount: f64,
    pub holding_count: usize,
    pub avg_weight: f64,
    pub max_weight: f64,
}

/// Histogram of individual holding weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WeightDistribution {
    pub under_1: usize,
    #[serde(rename = "1_to_3")]
    pub from_1_to_3: usize,
    #[serde(rename = "3_to_5")]
    pub from_3_to_5: usize,
    #[serde(rename = "5_to_10")]
    pub from_5_to_10: usize,
    pub over_10: usize,
}

impl WeightDistribution {
    pub fn total(&self) -> usize {
        self.under_1 + self.from_1_to_3 + self.from_3_to_5 + self.from_5_to_10 + self.over_10
    }

    /// Bucket labels paired with counts, lightest bucket first.
    pub fn buckets(&self) -> [(&'static str, usize); 5] {
        [
            ("under_1", self.under_1),
            ("1_to_3", self.from_1_to_3),
            ("3_to_5", self.from_3_to_5),
            ("5_to_10", self.from_5_to_10),
            ("over_10", self.over_10),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeStatistics {
    pub theme: String,
    pub fund_count: usize,
    pub fund_tickers: Vec<String>,
    pub total_holdings_count: usize,
    pub unique_instrument_count: usize,
    pub duplicates: Vec<DuplicateInstrument>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseOverlap {
    pub overlap_count: usize,
    pub overlap_tickers: Vec<String>,
    /// Percent of fund A's instruments also held by fund B.
    pub overlap_ratio_a: f64,
    /// Percent of fund B's instruments also held by fund A.
    pub overlap_ratio_b: f64,
}

/// Holdings grouped by instrument ticker, ordered by ticker.
fn group_by_instrument(holdings: &[Holding]) -> BTreeMap<&str, Vec<&Holding>> {
    let mut groups: BTreeMap<&str, Vec<&Holding>> = BTreeMap::new();
    for holding in holdings {
        groups
            .entry(holding.instrument_ticker())
            .or_default()
            .push(holding);
    }
    groups
}

fn first_name(group: &[&Holding]) -> String {
    group
        .iter()
        .map(|h| h.instrument_name())
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn distinct_funds<'a>(group: &[&'a Holding]) -> BTreeSet<&'a str> {
    group.iter().map(|h| h.fund_ticker()).collect()
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Instruments held by at least `min_fund_count` distinct funds, most widely
/// held first, then by total amount.
pub fn duplicate_instruments(holdings: &[Holding], min_fund_count: usize) -> Vec<DuplicateInstrument> {
    let mut results: Vec<DuplicateInstrument> = group_by_instrument(holdings)
        .into_iter()
        .filter_map(|(ticker, group)| {
            let funds = distinct_funds(&group);
            if funds.len() < min_fund_count {
                return None;
            }
            let weights = || group.iter().map(|h| h.weight());
            Some(DuplicateInstrument {
                instrument_ticker: ticker.to_string(),
                instrument_name: first_name(&group),
                fund_count: funds.len(),
                fund_tickers: funds.into_iter().map(str::to_string).collect(),
                total_amount: group.iter().map(|h| h.amount()).sum(),
                avg_weight: round_to(average(weights()), 2),
                min_weight: round_to(weights().fold(f64::INFINITY, f64::min), 2),
                max_weight: round_to(weights().fold(f64::NEG_INFINITY, f64::max), 2),
            })
        })
        .collect();

    // Groups come out in ticker order, so a stable sort keeps that as the
    // final tie-break.
    results.sort_by(|a, b| {
        b.fund_count
            .cmp(&a.fund_count)
            .then_with(|| b.total_amount.total_cmp(&a.total_amount))
    });
    debug!(
        "Found {} instruments held by at least {} funds",
        results.len(),
        min_fund_count
    );
    results
}

/// Instruments by summed amount, largest first. `top_n == 0` keeps all of
/// them. Rank is the 1-based position in the returned list.
pub fn amount_ranking(holdings: &[Holding], top_n: usize) -> Vec<AmountRank> {
    let mut results: Vec<AmountRank> = group_by_instrument(holdings)
        .into_iter()
        .filter_map(|(ticker, group)| {
            let total_amount: f64 = group.iter().map(|h| h.amount()).sum();
            if total_amount <= 0.0 {
                return None;
            }
            Some(AmountRank {
                instrument_ticker: ticker.to_string(),
                instrument_name: first_name(&group),
                total_amount,
                holding_count: group.len(),
                avg_weight: round_to(average(group.iter().map(|h| h.weight())), 2),
                max_weight: round_to(
                    group.iter().map(|h| h.weight()).fold(f64::NEG_INFINITY, f64::max),
                    2,
                ),
            })
        })
        .collect();

    results.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
    if top_n > 0 {
        results.truncate(top_n);
    }
    debug!("Ranked {} instruments by amount", results.len());
    results
}

/// Buckets are `[lo, hi)` except the last, which is `[10, inf)`.
pub fn weight_distribution(holdings: &[Holding]) -> WeightDistribution {
    let mut distribution = WeightDistribution::default();
    for holding in holdings {
        let weight = holding.weight();
        if weight < 1.0 {
            distribution.under_1 += 1;
        } else if weight < 3.0 {
            distribution.from_1_to_3 += 1;
        } else if weight < 5.0 {
            distribution.from_3_to_5 += 1;
        } else if weight < 10.0 {
            distribution.from_5_to_10 += 1;
        } else {
            distribution.over_10 += 1;
        }
    }
    distribution
}

/// Statistics restricted to funds whose name contains `theme`.
pub fn theme_statistics(holdings: &[Holding], funds: &[Fund], theme: &str) -> ThemeStatistics {
    let fund_tickers: Vec<String> = funds
        .iter()
        .filter(|f| f.contains_keyword(theme))
        .map(|f| f.ticker().to_string())
        .collect();
    let selected: HashSet<&str> = fund_tickers.iter().map(String::as_str).collect();

    let theme_holdings: Vec<Holding> = holdings
        .iter()
        .filter(|h| selected.contains(h.fund_ticker()))
        .cloned()
        .collect();
    let unique_instrument_count = theme_holdings
        .iter()
        .map(Holding::instrument_ticker)
        .collect::<HashSet<_>>()
        .len();

    debug!(
        "Theme '{}': {} funds, {} holdings",
        theme,
        fund_tickers.len(),
        theme_holdings.len()
    );
    ThemeStatistics {
        theme: theme.to_string(),
        fund_count: fund_tickers.len(),
        total_holdings_count: theme_holdings.len(),
        unique_instrument_count,
        duplicates: duplicate_instruments(&theme_holdings, DEFAULT_MIN_FUND_COUNT),
        fund_tickers,
    }
}

fn ratio_percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64 * 100.0, 2)
    }
}

/// Shared instruments between two funds' holdings.
pub fn pairwise_overlap(holdings_a: &[Holding], holdings_b: &[Holding]) -> PairwiseOverlap {
    let set_a: BTreeSet<&str> = holdings_a.iter().map(Holding::instrument_ticker).collect();
    let set_b: BTreeSet<&str> = holdings_b.iter().map(Holding::instrument_ticker).collect();
    let overlap_tickers: Vec<String> = set_a
        .intersection(&set_b)
        .map(|t| t.to_string())
        .collect();

    PairwiseOverlap {
        overlap_count: overlap_tickers.len(),
        overlap_ratio_a: ratio_percent(overlap_tickers.len(), set_a.len()),
        overlap_ratio_b: ratio_percent(overlap_tickers.len(), set_b.len()),
        overlap_tickers,
    }
}

/// Instruments by number of distinct funds holding them, most held first.
pub fn top_by_frequency(holdings: &[Holding], top_n: usize) -> Vec<(String, usize)> {
    let mut frequency: Vec<(String, usize)> = group_by_instrument(holdings)
        .into_iter()
        .map(|(ticker, group)| (ticker.to_string(), distinct_funds(&group).len()))
        .collect();
    frequency.sort_by(|a, b| b.1.cmp(&a.1));
    frequency.truncate(top_n);
    frequency
}
