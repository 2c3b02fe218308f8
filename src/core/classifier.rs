//! Narrows fund lists down by marker keyword, exclusions and themes.

use crate::core::model::{FilterCriteria, Fund};
use tracing::{debug, info};

pub const DEFAULT_MARKER_KEYWORD: &str = "Active";

/// Stable, order-preserving fund filter.
#[derive(Debug, Clone)]
pub struct Classifier {
    marker_keyword: String,
}

impl Classifier {
    pub fn new(marker_keyword: &str) -> Self {
        Self {
            marker_keyword: marker_keyword.trim().to_string(),
        }
    }

    pub fn marker_keyword(&self) -> &str {
        &self.marker_keyword
    }

    /// Applies marker, exclusion and theme stages in that order. A stage with
    /// nothing to check lets every fund through.
    pub fn filter(&self, funds: &[Fund], criteria: &FilterCriteria) -> Vec<Fund> {
        let mut result: Vec<&Fund> = funds.iter().collect();

        if criteria.require_marker_keyword() && !self.marker_keyword.is_empty() {
            result.retain(|f| f.contains_keyword(&self.marker_keyword));
            debug!(
                "After marker '{}' filter: {} funds",
                self.marker_keyword,
                result.len()
            );
        }

        if criteria.has_exclusions() {
            result.retain(|f| !f.contains_any_keyword(criteria.exclusions()));
            debug!("After exclusion filter: {} funds", result.len());
        }

        if criteria.has_themes() {
            result.retain(|f| f.contains_any_keyword(criteria.themes()));
            debug!("After theme filter: {} funds", result.len());
        }

        info!(
            "Filtered {} funds down to {} ({})",
            funds.len(),
            result.len(),
            criteria
        );
        result.into_iter().cloned().collect()
    }

    pub fn count_matching(&self, funds: &[Fund], criteria: &FilterCriteria) -> usize {
        self.filter(funds, criteria).len()
    }

    /// Funds whose name contains `theme`; the marker keyword is not required.
    pub fn filter_by_theme(&self, funds: &[Fund], theme: &str) -> Vec<Fund> {
        self.filter(
            funds,
            &FilterCriteria::new([theme], Vec::<String>::new(), false),
        )
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_KEYWORD)
    }
}

/// Every theme from `themes` that the fund name contains, in `themes` order.
pub fn matching_themes<S: AsRef<str>>(fund: &Fund, themes: &[S]) -> Vec<String> {
    themes
        .iter()
        .map(AsRef::as_ref)
        .filter(|theme| fund.contains_keyword(theme))
        .map(str::to_string)
        .collect()
}
