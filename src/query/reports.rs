//! Response records handed to the presentation layer, and the summaries
//! computed over them.

use crate::core::aggregator::{
    AmountRank, DuplicateInstrument, PairwiseOverlap, ThemeStatistics, WeightDistribution,
};
use crate::core::comparator::{ChangeCounts, ComparisonRecord};
use crate::core::model::{round_to, Holding};
use chrono::NaiveDate;
use serde::Serialize;

/// A fund that passed the filter, tagged with the themes it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundListing {
    pub ticker: String,
    pub name: String,
    pub matched_themes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    #[serde(flatten)]
    pub counts: ChangeCounts,
    pub total_current: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub fund_ticker: String,
    pub fund_name: String,
    pub previous_date: NaiveDate,
    pub current_date: NaiveDate,
    pub records: Vec<ComparisonRecord>,
    pub summary: ComparisonSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopHoldingsReport {
    pub fund_ticker: String,
    pub date: NaiveDate,
    pub holdings: Vec<Holding>,
    pub concentration_ratio: f64,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingsSummary {
    pub fund_ticker: String,
    pub date: NaiveDate,
    pub total_count: usize,
    pub total_weight: f64,
    pub total_amount: f64,
    pub top_10_concentration: f64,
    pub significant_count: usize,
    pub large_count: usize,
    pub medium_count: usize,
    pub small_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DuplicateSummary {
    pub total_duplicates: usize,
    pub max_fund_count: usize,
    pub avg_fund_count: f64,
}

impl DuplicateSummary {
    pub fn from_records(records: &[DuplicateInstrument]) -> Self {
        if records.is_empty() {
            return Self {
                total_duplicates: 0,
                max_fund_count: 0,
                avg_fund_count: 0.0,
            };
        }
        let total: usize = records.iter().map(|r| r.fund_count).sum();
        Self {
            total_duplicates: records.len(),
            max_fund_count: records.iter().map(|r| r.fund_count).max().unwrap_or(0),
            avg_fund_count: round_to(total as f64 / records.len() as f64, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateReport {
    pub date: NaiveDate,
    pub total_funds: usize,
    pub records: Vec<DuplicateInstrument>,
    pub summary: DuplicateSummary,
}

/// An amount-ranking row with its 1-based position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedInstrument {
    pub rank: usize,
    #[serde(flatten)]
    pub record: AmountRank,
}

pub fn with_ranks(records: Vec<AmountRank>) -> Vec<RankedInstrument> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| RankedInstrument { rank: i + 1, record })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmountSummary {
    pub total_instruments: usize,
    pub total_amount: f64,
    pub top_10_amount: f64,
    pub top_10_ratio: f64,
}

impl AmountSummary {
    pub fn from_records(records: &[RankedInstrument]) -> Self {
        let total_amount: f64 = records.iter().map(|r| r.record.total_amount).sum();
        let top_10_amount: f64 = records.iter().take(10).map(|r| r.record.total_amount).sum();
        let top_10_ratio = if total_amount > 0.0 {
            round_to(top_10_amount / total_amount * 100.0, 2)
        } else {
            0.0
        };
        Self {
            total_instruments: records.len(),
            total_amount,
            top_10_amount,
            top_10_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountRankingReport {
    pub date: NaiveDate,
    pub records: Vec<RankedInstrument>,
    pub summary: AmountSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeReport {
    pub date: NaiveDate,
    pub statistics: ThemeStatistics,
    pub top_amounts: Vec<RankedInstrument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionReport {
    pub date: NaiveDate,
    pub total_holdings: usize,
    pub distribution: WeightDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentFrequency {
    pub instrument_ticker: String,
    pub instrument_name: String,
    pub fund_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub date: NaiveDate,
    pub total_funds: usize,
    pub unique_instruments: usize,
    pub total_holdings: usize,
    pub avg_holdings_per_fund: f64,
    pub most_common_instrument: Option<InstrumentFrequency>,
    pub highest_amount_instrument: Option<AmountRank>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapReport {
    pub date: NaiveDate,
    pub fund_a: String,
    pub fund_b: String,
    #[serde(flatten)]
    pub overlap: PairwiseOverlap,
}
