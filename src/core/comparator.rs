//! Snapshot diffs between two dates of one fund, plus single-snapshot
//! analytics (top holdings, concentration, weight ranges).

use crate::core::error::ModelError;
use crate::core::model::{round_to, ChangeStatus, Holding, WeightChange, DEFAULT_CHANGE_THRESHOLD};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// One instrument's movement between two snapshots. `holding` is the
/// current-side row, except for removed instruments where it is the
/// previous-side row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentChange {
    pub holding: Holding,
    pub previous_weight: f64,
    pub current_weight: f64,
    pub delta: f64,
    pub status: ChangeStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotDiff {
    pub new: Vec<InstrumentChange>,
    pub removed: Vec<InstrumentChange>,
    pub increased: Vec<InstrumentChange>,
    pub decreased: Vec<InstrumentChange>,
    pub unchanged: Vec<InstrumentChange>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    pub new_count: usize,
    pub removed_count: usize,
    pub increased_count: usize,
    pub decreased_count: usize,
    pub unchanged_count: usize,
}

impl SnapshotDiff {
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            new_count: self.new.len(),
            removed_count: self.removed.len(),
            increased_count: self.increased.len(),
            decreased_count: self.decreased.len(),
            unchanged_count: self.unchanged.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All changes, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &InstrumentChange> {
        self.new
            .iter()
            .chain(&self.removed)
            .chain(&self.increased)
            .chain(&self.decreased)
            .chain(&self.unchanged)
    }

    fn push(&mut self, change: InstrumentChange) {
        let bucket = match change.status {
            ChangeStatus::New => &mut self.new,
            ChangeStatus::Removed => &mut self.removed,
            ChangeStatus::Increased => &mut self.increased,
            ChangeStatus::Decreased => &mut self.decreased,
            ChangeStatus::Unchanged => &mut self.unchanged,
        };
        bucket.push(change);
    }
}

/// Status of an instrument present on both sides. The threshold is strict:
/// a delta of exactly 0.01 is unchanged.
pub fn classify_delta(delta: f64) -> ChangeStatus {
    if delta > DEFAULT_CHANGE_THRESHOLD {
        ChangeStatus::Increased
    } else if delta < -DEFAULT_CHANGE_THRESHOLD {
        ChangeStatus::Decreased
    } else {
        ChangeStatus::Unchanged
    }
}

fn index_by_instrument(holdings: &[Holding]) -> HashMap<&str, &Holding> {
    holdings
        .iter()
        .map(|h| (h.instrument_ticker(), h))
        .collect()
}

/// Partitions the union of instruments from both snapshots into
/// new/removed/increased/decreased/unchanged. Bucket order is by instrument
/// ticker; callers sort for display.
pub fn compare(previous: &[Holding], current: &[Holding]) -> SnapshotDiff {
    debug!(
        "Comparing holdings: previous={}, current={}",
        previous.len(),
        current.len()
    );
    let prev_map = index_by_instrument(previous);
    let curr_map = index_by_instrument(current);
    let tickers: BTreeSet<&str> = prev_map.keys().chain(curr_map.keys()).copied().collect();

    let mut diff = SnapshotDiff::default();
    for ticker in tickers {
        let change = match (prev_map.get(ticker), curr_map.get(ticker)) {
            (None, Some(curr)) => InstrumentChange {
                holding: (*curr).clone(),
                previous_weight: 0.0,
                current_weight: curr.weight(),
                delta: curr.weight(),
                status: ChangeStatus::New,
            },
            (Some(prev), None) => InstrumentChange {
                holding: (*prev).clone(),
                previous_weight: prev.weight(),
                current_weight: 0.0,
                delta: -prev.weight(),
                status: ChangeStatus::Removed,
            },
            (Some(prev), Some(curr)) => {
                let delta = curr.weight() - prev.weight();
                InstrumentChange {
                    holding: (*curr).clone(),
                    previous_weight: prev.weight(),
                    current_weight: curr.weight(),
                    delta: round_to(delta, 4),
                    status: classify_delta(delta),
                }
            }
            (None, None) => continue,
        };
        diff.push(change);
    }

    let counts = diff.counts();
    info!(
        "Comparison result: new={}, removed={}, increased={}, decreased={}, unchanged={}",
        counts.new_count,
        counts.removed_count,
        counts.increased_count,
        counts.decreased_count,
        counts.unchanged_count
    );
    diff
}

/// Row of a comparison table as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRecord {
    pub instrument_ticker: String,
    pub instrument_name: String,
    pub prev_weight: f64,
    pub current_weight: f64,
    pub delta: f64,
    pub current_amount: f64,
    pub status: ChangeStatus,
}

fn by_weight_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Flattens a diff into records sorted by current weight descending, ties
/// by instrument ticker.
pub fn comparison_records(diff: &SnapshotDiff) -> Vec<ComparisonRecord> {
    let mut records: Vec<ComparisonRecord> = diff
        .iter()
        .map(|change| ComparisonRecord {
            instrument_ticker: change.holding.instrument_ticker().to_string(),
            instrument_name: change.holding.instrument_name().to_string(),
            prev_weight: change.previous_weight,
            current_weight: change.current_weight,
            delta: change.delta,
            current_amount: if change.status == ChangeStatus::Removed {
                0.0
            } else {
                change.holding.amount()
            },
            status: change.status,
        })
        .collect();
    records.sort_by(|a, b| {
        by_weight_desc(a.current_weight, b.current_weight)
            .then_with(|| a.instrument_ticker.cmp(&b.instrument_ticker))
    });
    records
}

/// Per-instrument weight changes where an absent side counts as weight 0.
pub fn weight_changes(
    previous: &[Holding],
    current: &[Holding],
) -> Result<BTreeMap<String, WeightChange>, ModelError> {
    let prev_map = index_by_instrument(previous);
    let curr_map = index_by_instrument(current);
    let tickers: BTreeSet<&str> = prev_map.keys().chain(curr_map.keys()).copied().collect();

    tickers
        .into_iter()
        .map(|ticker| {
            let prev = prev_map.get(ticker).map_or(0.0, |h| h.weight());
            let curr = curr_map.get(ticker).map_or(0.0, |h| h.weight());
            WeightChange::new(prev, curr).map(|change| (ticker.to_string(), change))
        })
        .collect()
}

/// Changes with |delta| >= threshold, largest move first.
pub fn significant_changes(
    changes: &BTreeMap<String, WeightChange>,
    threshold: f64,
) -> Vec<(String, WeightChange)> {
    let mut significant: Vec<(String, WeightChange)> = changes
        .iter()
        .filter(|(_, change)| change.is_significant(threshold))
        .map(|(ticker, change)| (ticker.clone(), *change))
        .collect();
    significant.sort_by(|a, b| by_weight_desc(a.1.delta().abs(), b.1.delta().abs()));
    significant
}

/// The `n` heaviest holdings. Equal weights keep their input order.
pub fn top_n(holdings: &[Holding], n: usize) -> Vec<Holding> {
    let mut sorted = holdings.to_vec();
    sorted.sort_by(|a, b| by_weight_desc(a.weight(), b.weight()));
    sorted.truncate(n);
    sorted
}

/// Combined weight of the `n` heaviest holdings.
pub fn concentration_ratio(holdings: &[Holding], n: usize) -> f64 {
    total_weight(&top_n(holdings, n))
}

pub fn total_weight(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::weight).sum()
}

pub fn total_amount(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::amount).sum()
}

pub fn significant_holdings(holdings: &[Holding], threshold: f64) -> Vec<Holding> {
    holdings
        .iter()
        .filter(|h| h.is_significant(threshold))
        .cloned()
        .collect()
}

/// Holdings split into large (>= 5%), medium (>= 1%) and small.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeightRangeGroups {
    pub large: Vec<Holding>,
    pub medium: Vec<Holding>,
    pub small: Vec<Holding>,
}

pub fn group_by_weight_range(holdings: &[Holding]) -> WeightRangeGroups {
    let mut groups = WeightRangeGroups::default();
    for holding in holdings {
        let bucket = if holding.weight() >= 5.0 {
            &mut groups.large
        } else if holding.weight() >= 1.0 {
            &mut groups.medium
        } else {
            &mut groups.small
        };
        bucket.push(holding.clone());
    }
    groups
}
