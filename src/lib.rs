pub mod cli;
pub mod core;
pub mod providers;
pub mod query;
pub mod store;

use crate::cli::ui;
use crate::core::config::AppConfig;
use crate::core::model::{previous_business_day, DateRange, FilterCriteria};
use crate::core::source::{CriteriaSource, MarketDataSource};
use crate::providers::HttpMarketDataSource;
use crate::query::collect::{collect_for_date, collect_range};
use crate::query::QueryService;
use crate::store::MemoryRepository;
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Days of history collected when no start date is given.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Funds {
        theme: Option<String>,
    },
    Holdings {
        fund: String,
        top: usize,
    },
    Compare {
        fund: String,
        previous: Option<NaiveDate>,
    },
    History {
        fund: String,
        instrument: String,
        from: Option<NaiveDate>,
    },
    Duplicates {
        min_funds: Option<usize>,
        limit: Option<usize>,
    },
    Ranking {
        top: Option<usize>,
    },
    Distribution,
    Theme {
        keyword: String,
        limit: Option<usize>,
    },
    Overlap {
        fund_a: String,
        fund_b: String,
    },
    Summary,
}

/// Collects the snapshots `command` needs up to `date` from the configured
/// source, then runs the query and prints its report.
pub async fn run_command(
    command: AppCommand,
    date: NaiveDate,
    config_path: Option<&str>,
) -> Result<()> {
    info!("etfwatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let source = HttpMarketDataSource::new(&config.source)?;
    let service = QueryService::from_config(Arc::new(MemoryRepository::new()), &config);
    let criteria = config.filter.load_filter_criteria();

    collect(&source, &service, &command, date, &criteria).await?;

    match command {
        AppCommand::Funds { theme } => {
            let criteria = cli::funds::listing_criteria(&criteria, theme.as_deref());
            cli::funds::run(&service, &criteria)
        }
        AppCommand::Holdings { fund, top } => {
            cli::funds::run_holdings(&service, &fund, Some(date), top)
        }
        AppCommand::Compare { fund, previous } => {
            cli::compare::run(&service, &fund, date, previous)
        }
        AppCommand::History {
            fund, instrument, ..
        } => cli::history::run(&service, &fund, &instrument),
        AppCommand::Duplicates { min_funds, limit } => {
            cli::stats::duplicates(&service, date, min_funds, limit)
        }
        AppCommand::Ranking { top } => cli::stats::ranking(&service, date, top),
        AppCommand::Distribution => cli::stats::distribution(&service, date),
        AppCommand::Theme { keyword, limit } => {
            cli::stats::theme(&service, &keyword, date, limit)
        }
        AppCommand::Overlap { fund_a, fund_b } => {
            cli::stats::overlap(&service, &fund_a, &fund_b, date)
        }
        AppCommand::Summary => cli::stats::summary(&service, date),
    }
}

async fn collect(
    source: &dyn MarketDataSource,
    service: &QueryService,
    command: &AppCommand,
    date: NaiveDate,
    criteria: &FilterCriteria,
) -> Result<()> {
    let pb = ui::new_spinner("Collecting holdings");
    let tick = || pb.inc(1);

    let result = match command {
        AppCommand::History { from, .. } => {
            let from = from.unwrap_or(date - chrono::Duration::days(DEFAULT_HISTORY_DAYS));
            let range = DateRange::new(from, date)?;
            let outcomes = collect_range(source, service, &range, criteria, &tick).await;
            if outcomes.is_empty() {
                warn!("No snapshot could be collected in {}", range);
            }
            Ok(())
        }
        AppCommand::Compare { previous, .. } => {
            let previous = previous.unwrap_or_else(|| previous_business_day(date));
            if let Err(e) = collect_for_date(source, service, previous, criteria, &tick).await {
                warn!(error = %e, "Previous snapshot unavailable, comparing against what is stored");
            }
            collect_for_date(source, service, date, criteria, &tick)
                .await
                .map(|_| ())
        }
        _ => collect_for_date(source, service, date, criteria, &tick)
            .await
            .map(|_| ()),
    };

    pb.finish_and_clear();
    result
}
