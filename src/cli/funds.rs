use super::{show, ui};
use crate::core::model::FilterCriteria;
use crate::query::QueryService;
use crate::query::reports::{FundListing, HoldingsSummary, TopHoldingsReport};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

/// Criteria for the fund list. Stored funds already passed the configured
/// criteria, so `theme` narrows that set to names containing it.
pub fn listing_criteria(configured: &FilterCriteria, theme: Option<&str>) -> FilterCriteria {
    match theme {
        Some(theme) => configured.only_theme(theme),
        None => configured.clone(),
    }
}

/// Lists the stored funds matching `criteria`.
pub fn run(service: &QueryService, criteria: &FilterCriteria) -> Result<()> {
    show(service.list_funds(criteria), |funds| {
        println!(
            "\n{} {}",
            ui::style_text("Tracked funds", ui::StyleType::Title),
            ui::style_text(&format!("({criteria})"), ui::StyleType::Subtle)
        );
        display_funds(&funds);
    })
}

fn display_funds(funds: &[FundListing]) {
    if funds.is_empty() {
        println!("No funds matched the filter.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Ticker"),
        ui::header_cell("Name"),
        ui::header_cell("Themes"),
    ]);
    for fund in funds {
        let themes = if fund.matched_themes.is_empty() {
            ui::na_cell()
        } else {
            Cell::new(fund.matched_themes.join(", "))
        };
        table.add_row(vec![Cell::new(&fund.ticker), Cell::new(&fund.name), themes]);
    }
    println!("{table}");
    println!(
        "{} {}",
        ui::style_text("Total:", ui::StyleType::TotalLabel),
        ui::style_text(&funds.len().to_string(), ui::StyleType::TotalValue)
    );
}

/// Shows a fund's largest holdings on `date` and a summary of the snapshot.
pub fn run_holdings(
    service: &QueryService,
    fund: &str,
    date: Option<NaiveDate>,
    top: usize,
) -> Result<()> {
    let fund = service.fund(fund)?;
    println!(
        "\n{}",
        ui::style_text(&fund.display_name(), ui::StyleType::Title)
    );
    show(service.top_holdings(fund.ticker(), date, top), |report| {
        display_top_holdings(&report)
    })?;
    show(service.holdings_summary(fund.ticker(), date), |summary| {
        display_summary(&summary)
    })
}

fn display_top_holdings(report: &TopHoldingsReport) {
    println!(
        "Top {} of {} holdings on {}",
        report.holdings.len(),
        report.total_count,
        report.date
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Instrument"),
        ui::header_cell("Name"),
        ui::header_cell("Weight"),
        ui::header_cell("Amount"),
    ]);
    for (i, holding) in report.holdings.iter().enumerate() {
        table.add_row(vec![
            ui::count_cell(i + 1),
            Cell::new(holding.instrument_ticker()),
            Cell::new(holding.display_name()),
            ui::weight_cell(holding.weight()),
            ui::amount_cell(holding.amount()),
        ]);
    }
    println!("{table}");
    println!(
        "{} {}",
        ui::style_text("Concentration:", ui::StyleType::TotalLabel),
        ui::style_text(
            &format!("{:.2}%", report.concentration_ratio),
            ui::StyleType::TotalValue
        )
    );
}

fn display_summary(summary: &HoldingsSummary) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Holdings"),
        ui::count_cell(summary.total_count),
    ]);
    table.add_row(vec![
        Cell::new("Total weight"),
        ui::weight_cell(summary.total_weight),
    ]);
    table.add_row(vec![
        Cell::new("Total amount"),
        ui::amount_cell(summary.total_amount),
    ]);
    table.add_row(vec![
        Cell::new("Top 10 concentration"),
        ui::weight_cell(summary.top_10_concentration),
    ]);
    table.add_row(vec![
        Cell::new("Significant holdings"),
        ui::count_cell(summary.significant_count),
    ]);
    table.add_row(vec![
        Cell::new("Large / medium / small"),
        Cell::new(format!(
            "{} / {} / {}",
            summary.large_count, summary.medium_count, summary.small_count
        )),
    ]);
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::CacheStore;
    use crate::core::classifier::Classifier;
    use crate::core::model::Fund;
    use crate::store::MemoryRepository;
    use std::sync::Arc;

    #[test]
    fn test_theme_narrows_configured_funds() {
        let service = QueryService::new(
            Arc::new(MemoryRepository::new()),
            CacheStore::default(),
            Classifier::default(),
        );
        service.save_funds(vec![
            Fund::new("152100", "TIGER Semiconductor Active").unwrap(),
            Fund::new("300100", "KODEX AI Active").unwrap(),
        ]);
        let configured = FilterCriteria::new(["Semiconductor", "AI"], Vec::<String>::new(), true);

        let all = service.list_funds(&listing_criteria(&configured, None)).unwrap();
        assert_eq!(all.len(), 2);

        let narrowed = service
            .list_funds(&listing_criteria(&configured, Some("AI")))
            .unwrap();
        let tickers: Vec<&str> = narrowed.iter().map(|f| f.ticker.as_str()).collect();
        assert_eq!(tickers, ["300100"]);
        assert_eq!(narrowed[0].matched_themes, ["AI"]);
    }
}
