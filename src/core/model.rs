//! Domain values: funds, holdings and the value objects derived from them.
//!
//! Every constructor validates its input and fails with a [`ModelError`];
//! nothing is silently coerced. Values are immutable once built.

use crate::core::error::ModelError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::fmt::Display;

/// Weight deltas at or below this many percentage points are noise.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.01;

const TICKER_LEN: usize = 6;

/// Rounds `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Trims and left-pads a ticker with zeros, then checks it is six digits.
pub fn normalize_ticker(raw: &str) -> Result<String, ModelError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ModelError::InvalidTicker(raw.to_string()));
    }
    let padded = format!("{trimmed:0>TICKER_LEN$}");
    if padded.len() == TICKER_LEN && padded.bytes().all(|b| b.is_ascii_digit()) {
        Ok(padded)
    } else {
        Err(ModelError::InvalidTicker(raw.to_string()))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A fund identified by its six-digit ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fund {
    ticker: String,
    name: String,
}

impl Fund {
    pub fn new(ticker: &str, name: &str) -> Result<Self, ModelError> {
        let ticker = normalize_ticker(ticker)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::InvalidName(format!(
                "fund {ticker} has an empty name"
            )));
        }
        Ok(Self {
            ticker,
            name: name.to_string(),
        })
    }

    /// Identity of the fund. Use this, not `==`, for membership by ticker.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.ticker)
    }

    /// Case-insensitive substring match against the fund name.
    pub fn contains_keyword(&self, keyword: &str) -> bool {
        contains_ignore_case(&self.name, keyword)
    }

    pub fn contains_any_keyword<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        keywords.iter().any(|k| self.contains_keyword(k.as_ref()))
    }

    pub fn contains_all_keywords<S: AsRef<str>>(&self, keywords: &[S]) -> bool {
        keywords.iter().all(|k| self.contains_keyword(k.as_ref()))
    }
}

impl Display for Fund {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.ticker)
    }
}

/// Identity of a holding row: unique per fund, instrument and day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoldingKey {
    pub fund_ticker: String,
    pub instrument_ticker: String,
    pub date: NaiveDate,
}

/// One instrument's weight and valuation within one fund on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    fund_ticker: String,
    instrument_ticker: String,
    date: NaiveDate,
    weight: f64,
    amount: f64,
    instrument_name: String,
}

impl Holding {
    /// Builds a validated holding. Weight is kept to 4 decimal places and
    /// amount to 2.
    pub fn new(
        fund_ticker: &str,
        instrument_ticker: &str,
        date: NaiveDate,
        weight: f64,
        amount: f64,
        instrument_name: &str,
    ) -> Result<Self, ModelError> {
        let fund_ticker = normalize_ticker(fund_ticker)?;
        let instrument_ticker = normalize_ticker(instrument_ticker)?;
        if !weight.is_finite() || !(0.0..=100.0).contains(&weight) {
            return Err(ModelError::InvalidWeight(weight));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(ModelError::InvalidAmount(amount));
        }
        Ok(Self {
            fund_ticker,
            instrument_ticker,
            date,
            weight: round_to(weight, 4),
            amount: round_to(amount, 2),
            instrument_name: instrument_name.trim().to_string(),
        })
    }

    pub fn key(&self) -> HoldingKey {
        HoldingKey {
            fund_ticker: self.fund_ticker.clone(),
            instrument_ticker: self.instrument_ticker.clone(),
            date: self.date,
        }
    }

    pub fn fund_ticker(&self) -> &str {
        &self.fund_ticker
    }

    pub fn instrument_ticker(&self) -> &str {
        &self.instrument_ticker
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn instrument_name(&self) -> &str {
        &self.instrument_name
    }

    /// Name to show for the instrument, falling back to its ticker.
    pub fn display_name(&self) -> &str {
        if self.instrument_name.is_empty() {
            &self.instrument_ticker
        } else {
            &self.instrument_name
        }
    }

    pub fn is_significant(&self, threshold: f64) -> bool {
        self.weight >= threshold
    }
}

/// Criteria used to narrow a fund list. Keywords are trimmed, blank entries
/// dropped and duplicates removed while keeping first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterCriteria {
    themes: Vec<String>,
    exclusions: Vec<String>,
    require_marker_keyword: bool,
}

fn clean_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut cleaned: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.as_ref().trim();
        if !keyword.is_empty() && !cleaned.iter().any(|k| k == keyword) {
            cleaned.push(keyword.to_string());
        }
    }
    cleaned
}

impl FilterCriteria {
    pub fn new<T, E, S1, S2>(themes: T, exclusions: E, require_marker_keyword: bool) -> Self
    where
        T: IntoIterator<Item = S1>,
        E: IntoIterator<Item = S2>,
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        Self {
            themes: clean_keywords(themes),
            exclusions: clean_keywords(exclusions),
            require_marker_keyword,
        }
    }

    /// Lets every fund through.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn marker_only() -> Self {
        Self {
            require_marker_keyword: true,
            ..Self::default()
        }
    }

    pub fn themes(&self) -> &[String] {
        &self.themes
    }

    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }

    pub fn require_marker_keyword(&self) -> bool {
        self.require_marker_keyword
    }

    pub fn has_themes(&self) -> bool {
        !self.themes.is_empty()
    }

    pub fn has_exclusions(&self) -> bool {
        !self.exclusions.is_empty()
    }

    pub fn has_any_filter(&self) -> bool {
        self.has_themes() || self.has_exclusions() || self.require_marker_keyword
    }

    pub fn with_theme(&self, theme: &str) -> Self {
        Self::new(
            self.themes.iter().map(String::as_str).chain([theme]),
            &self.exclusions,
            self.require_marker_keyword,
        )
    }

    /// Keeps the exclusions and marker rule but narrows the themes to `theme`.
    pub fn only_theme(&self, theme: &str) -> Self {
        Self::new([theme], &self.exclusions, self.require_marker_keyword)
    }

    pub fn with_exclusion(&self, exclusion: &str) -> Self {
        Self::new(
            &self.themes,
            self.exclusions.iter().map(String::as_str).chain([exclusion]),
            self.require_marker_keyword,
        )
    }

    /// Union of both keyword sets; the marker is required if either requires it.
    pub fn merge(&self, other: &FilterCriteria) -> Self {
        Self::new(
            self.themes.iter().chain(&other.themes),
            self.exclusions.iter().chain(&other.exclusions),
            self.require_marker_keyword || other.require_marker_keyword,
        )
    }
}

impl Display for FilterCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.require_marker_keyword {
            parts.push("marker required".to_string());
        }
        if self.has_themes() {
            parts.push(format!("themes: {}", self.themes.join(", ")));
        }
        if self.has_exclusions() {
            parts.push(format!("exclusions: {}", self.exclusions.join(", ")));
        }
        if parts.is_empty() {
            write!(f, "no filter")
        } else {
            write!(f, "{}", parts.join(" | "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    New,
    Removed,
    Increased,
    Decreased,
    Unchanged,
}

impl Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ChangeStatus::New => "NEW",
                ChangeStatus::Removed => "REMOVED",
                ChangeStatus::Increased => "INCREASED",
                ChangeStatus::Decreased => "DECREASED",
                ChangeStatus::Unchanged => "UNCHANGED",
            }
        )
    }
}

/// Change between two weights of the same instrument, where 0 stands for
/// "absent".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightChange {
    previous_weight: f64,
    current_weight: f64,
    delta: f64,
    status: ChangeStatus,
}

impl WeightChange {
    pub fn new(previous_weight: f64, current_weight: f64) -> Result<Self, ModelError> {
        Self::with_threshold(previous_weight, current_weight, DEFAULT_CHANGE_THRESHOLD)
    }

    pub fn with_threshold(
        previous_weight: f64,
        current_weight: f64,
        threshold: f64,
    ) -> Result<Self, ModelError> {
        for weight in [previous_weight, current_weight] {
            if !weight.is_finite() || !(0.0..=100.0).contains(&weight) {
                return Err(ModelError::InvalidWeight(weight));
            }
        }
        let delta = round_to(current_weight - previous_weight, 4);
        let status = if previous_weight == 0.0 && current_weight > 0.0 {
            ChangeStatus::New
        } else if previous_weight > 0.0 && current_weight == 0.0 {
            ChangeStatus::Removed
        } else if delta.abs() < threshold {
            ChangeStatus::Unchanged
        } else if delta > 0.0 {
            ChangeStatus::Increased
        } else {
            ChangeStatus::Decreased
        };
        Ok(Self {
            previous_weight: round_to(previous_weight, 4),
            current_weight: round_to(current_weight, 4),
            delta,
            status,
        })
    }

    pub fn previous_weight(&self) -> f64 {
        self.previous_weight
    }

    pub fn current_weight(&self) -> f64 {
        self.current_weight
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn status(&self) -> ChangeStatus {
        self.status
    }

    pub fn is_significant(&self, threshold: f64) -> bool {
        self.delta.abs() >= threshold
    }

    pub fn has_changed(&self) -> bool {
        self.status != ChangeStatus::Unchanged
    }

    /// Relative change against the previous weight, in percent.
    pub fn change_percentage(&self) -> Option<f64> {
        if self.previous_weight == 0.0 {
            return None;
        }
        Some(round_to(self.delta / self.previous_weight * 100.0, 2))
    }
}

impl Display for WeightChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.delta > 0.0 { "+" } else { "" };
        write!(f, "{}: {sign}{:.2}%", self.status, self.delta)
    }
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ModelError> {
        if start > end {
            return Err(ModelError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .collect()
    }

    /// Weekdays in the range; exchange holidays are not known here.
    pub fn business_days(&self) -> Vec<NaiveDate> {
        self.dates()
            .into_iter()
            .filter(|d| is_business_day(*d))
            .collect()
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The closest weekday strictly before `date`.
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    let mut day = date - Duration::days(1);
    while !is_business_day(day) {
        day -= Duration::days(1);
    }
    day
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fund_ticker_is_zero_padded() {
        let fund = Fund::new(" 52100", "TIGER Semiconductor Active").unwrap();
        assert_eq!(fund.ticker(), "052100");
        assert_eq!(fund.display_name(), "TIGER Semiconductor Active (052100)");
    }

    #[test]
    fn test_fund_rejects_bad_ticker_and_name() {
        assert_eq!(
            Fund::new("AB12", "Name"),
            Err(ModelError::InvalidTicker("AB12".to_string()))
        );
        assert!(matches!(
            Fund::new("1234567", "Name"),
            Err(ModelError::InvalidTicker(_))
        ));
        assert!(matches!(Fund::new("", "Name"), Err(ModelError::InvalidTicker(_))));
        assert!(matches!(
            Fund::new("152100", "   "),
            Err(ModelError::InvalidName(_))
        ));
    }

    #[test]
    fn test_fund_keyword_matching_ignores_case() {
        let fund = Fund::new("152100", "TIGER Semiconductor Active").unwrap();
        assert!(fund.contains_keyword("semiconductor"));
        assert!(fund.contains_any_keyword(&["bio", "ACTIVE"]));
        assert!(!fund.contains_all_keywords(&["tiger", "bio"]));
        assert!(fund.contains_all_keywords(&["tiger", "active"]));
    }

    #[test]
    fn test_holding_validation() {
        let d = date(2024, 1, 2);
        assert!(matches!(
            Holding::new("152100", "005930", d, 100.5, 1.0, ""),
            Err(ModelError::InvalidWeight(_))
        ));
        assert!(matches!(
            Holding::new("152100", "005930", d, -0.1, 1.0, ""),
            Err(ModelError::InvalidWeight(_))
        ));
        assert!(matches!(
            Holding::new("152100", "005930", d, f64::NAN, 1.0, ""),
            Err(ModelError::InvalidWeight(_))
        ));
        assert!(matches!(
            Holding::new("152100", "005930", d, 10.0, -1.0, ""),
            Err(ModelError::InvalidAmount(_))
        ));
        assert!(matches!(
            Holding::new("152100", "KRW", d, 10.0, 1.0, ""),
            Err(ModelError::InvalidTicker(_))
        ));
    }

    #[test]
    fn test_holding_rounds_weight_and_amount() {
        let h = Holding::new("152100", "5930", date(2024, 1, 2), 12.345678, 99.999, " Samsung ")
            .unwrap();
        assert_eq!(h.instrument_ticker(), "005930");
        assert_eq!(h.weight(), 12.3457);
        assert_eq!(h.amount(), 100.0);
        assert_eq!(h.instrument_name(), "Samsung");
        assert_eq!(h.key().date, date(2024, 1, 2));
        assert!(h.is_significant(1.0));
    }

    #[test]
    fn test_holding_bounds_are_inclusive() {
        let d = date(2024, 1, 2);
        assert!(Holding::new("152100", "005930", d, 0.0, 0.0, "").is_ok());
        assert!(Holding::new("152100", "005930", d, 100.0, 0.0, "").is_ok());
    }

    #[test]
    fn test_filter_criteria_cleans_keywords() {
        let criteria = FilterCriteria::new(
            ["  Semiconductor ", "", "AI", "Semiconductor"],
            ["Global", "  "],
            true,
        );
        assert_eq!(criteria.themes(), ["Semiconductor", "AI"]);
        assert_eq!(criteria.exclusions(), ["Global"]);
        assert!(criteria.require_marker_keyword());
        assert!(criteria.has_any_filter());
        assert!(!FilterCriteria::unrestricted().has_any_filter());
        assert!(FilterCriteria::marker_only().has_any_filter());
    }

    #[test]
    fn test_filter_criteria_builders() {
        let base = FilterCriteria::new(["AI"], ["Bond"], false);
        let extended = base.with_theme("Bio").with_exclusion("Leverage");
        assert_eq!(extended.themes(), ["AI", "Bio"]);
        assert_eq!(extended.exclusions(), ["Bond", "Leverage"]);
        // The original is untouched
        assert_eq!(base.themes(), ["AI"]);

        let merged = base.merge(&FilterCriteria::new(["AI", "Robot"], Vec::<String>::new(), true));
        assert_eq!(merged.themes(), ["AI", "Robot"]);
        assert!(merged.require_marker_keyword());
        assert_eq!(
            merged.to_string(),
            "marker required | themes: AI, Robot | exclusions: Bond"
        );
        assert_eq!(FilterCriteria::unrestricted().to_string(), "no filter");

        let narrowed = merged.only_theme(" Robot ");
        assert_eq!(narrowed.themes(), ["Robot"]);
        assert_eq!(narrowed.exclusions(), ["Bond"]);
        assert!(narrowed.require_marker_keyword());
    }

    #[test]
    fn test_weight_change_status() {
        let change = WeightChange::new(10.0, 15.0).unwrap();
        assert_eq!(change.delta(), 5.0);
        assert_eq!(change.status(), ChangeStatus::Increased);
        assert_eq!(change.change_percentage(), Some(50.0));
        assert_eq!(change.to_string(), "INCREASED: +5.00%");

        assert_eq!(WeightChange::new(0.0, 3.0).unwrap().status(), ChangeStatus::New);
        assert_eq!(
            WeightChange::new(3.0, 0.0).unwrap().status(),
            ChangeStatus::Removed
        );
        assert_eq!(
            WeightChange::new(5.0, 4.0).unwrap().status(),
            ChangeStatus::Decreased
        );
        assert_eq!(
            WeightChange::new(5.0, 5.005).unwrap().status(),
            ChangeStatus::Unchanged
        );
        assert_eq!(
            WeightChange::new(0.0, 0.0).unwrap().status(),
            ChangeStatus::Unchanged
        );
        assert_eq!(WeightChange::new(0.0, 3.0).unwrap().change_percentage(), None);
    }

    #[test]
    fn test_weight_change_significance() {
        let change = WeightChange::new(2.0, 2.4).unwrap();
        assert!(change.has_changed());
        assert!(!change.is_significant(0.5));
        assert!(change.is_significant(0.4));
    }

    #[test]
    fn test_weight_change_rejects_invalid_weights() {
        assert!(matches!(
            WeightChange::new(-1.0, 2.0),
            Err(ModelError::InvalidWeight(_))
        ));
        assert!(matches!(
            WeightChange::new(1.0, 101.0),
            Err(ModelError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_date_range() {
        assert!(matches!(
            DateRange::new(date(2024, 1, 5), date(2024, 1, 1)),
            Err(ModelError::InvalidDateRange { .. })
        ));

        // Fri 2024-01-05 .. Tue 2024-01-09
        let range = DateRange::new(date(2024, 1, 5), date(2024, 1, 9)).unwrap();
        assert_eq!(range.days(), 5);
        assert!(range.contains(date(2024, 1, 7)));
        assert!(!range.contains(date(2024, 1, 10)));
        assert_eq!(
            range.business_days(),
            vec![date(2024, 1, 5), date(2024, 1, 8), date(2024, 1, 9)]
        );
        assert_eq!(DateRange::single_day(date(2024, 1, 5)).days(), 1);
    }

    #[test]
    fn test_previous_business_day_skips_weekend() {
        assert_eq!(previous_business_day(date(2024, 1, 8)), date(2024, 1, 5));
        assert_eq!(previous_business_day(date(2024, 1, 9)), date(2024, 1, 8));
    }
}
