//! Cross-fund statistics views.

use super::{show, ui};
use crate::query::QueryService;
use crate::query::reports::{
    AmountRankingReport, DistributionReport, DuplicateReport, OverlapReport, RankedInstrument,
    StatisticsSummary, ThemeReport,
};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

pub fn duplicates(
    service: &QueryService,
    date: NaiveDate,
    min_funds: Option<usize>,
    limit: Option<usize>,
) -> Result<()> {
    show(
        service.duplicate_instruments(Some(date), min_funds, limit),
        |report| display_duplicates(&report),
    )
}

fn display_duplicates(report: &DuplicateReport) {
    println!(
        "\n{} {}",
        ui::style_text("Instruments held by several funds", ui::StyleType::Title),
        ui::style_text(
            &format!("{} ({} funds)", report.date, report.total_funds),
            ui::StyleType::Subtle
        )
    );
    if report.records.is_empty() {
        println!("No instrument is shared by enough funds.");
        return;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Instrument"),
        ui::header_cell("Name"),
        ui::header_cell("Funds"),
        ui::header_cell("Total amount"),
        ui::header_cell("Avg weight"),
        ui::header_cell("Min"),
        ui::header_cell("Max"),
    ]);
    for record in &report.records {
        table.add_row(vec![
            Cell::new(&record.instrument_ticker),
            Cell::new(&record.instrument_name),
            ui::count_cell(record.fund_count),
            ui::amount_cell(record.total_amount),
            ui::weight_cell(record.avg_weight),
            ui::weight_cell(record.min_weight),
            ui::weight_cell(record.max_weight),
        ]);
    }
    println!("{table}");
    println!(
        "{} {} shared, at most {} funds, {:.2} on average",
        ui::style_text("Summary:", ui::StyleType::TotalLabel),
        report.summary.total_duplicates,
        report.summary.max_fund_count,
        report.summary.avg_fund_count
    );
}

pub fn ranking(service: &QueryService, date: NaiveDate, top: Option<usize>) -> Result<()> {
    show(service.amount_ranking(Some(date), top), |report| {
        display_ranking(&report)
    })
}

fn display_ranking(report: &AmountRankingReport) {
    println!(
        "\n{} {}",
        ui::style_text("Instruments by total amount", ui::StyleType::Title),
        ui::style_text(&report.date.to_string(), ui::StyleType::Subtle)
    );
    display_ranked(&report.records);
    println!(
        "{} {} across {} instruments, top 10 hold {:.2}%",
        ui::style_text("Total:", ui::StyleType::TotalLabel),
        ui::style_text(
            &ui::format_amount(report.summary.total_amount),
            ui::StyleType::TotalValue
        ),
        report.summary.total_instruments,
        report.summary.top_10_ratio
    );
}

fn display_ranked(records: &[RankedInstrument]) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Instrument"),
        ui::header_cell("Name"),
        ui::header_cell("Total amount"),
        ui::header_cell("Holdings"),
        ui::header_cell("Avg weight"),
        ui::header_cell("Max weight"),
    ]);
    for ranked in records {
        let record = &ranked.record;
        table.add_row(vec![
            ui::count_cell(ranked.rank),
            Cell::new(&record.instrument_ticker),
            Cell::new(&record.instrument_name),
            ui::amount_cell(record.total_amount),
            ui::count_cell(record.holding_count),
            ui::weight_cell(record.avg_weight),
            ui::weight_cell(record.max_weight),
        ]);
    }
    println!("{table}");
}

pub fn distribution(service: &QueryService, date: NaiveDate) -> Result<()> {
    show(service.weight_distribution(Some(date)), |report| {
        display_distribution(&report)
    })
}

fn display_distribution(report: &DistributionReport) {
    println!(
        "\n{} {}",
        ui::style_text("Holding weight distribution", ui::StyleType::Title),
        ui::style_text(&report.date.to_string(), ui::StyleType::Subtle)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Weight"),
        ui::header_cell("Holdings"),
        ui::header_cell("Share"),
    ]);
    for (label, count) in report.distribution.buckets() {
        let share = if report.total_holdings > 0 {
            ui::weight_cell(count as f64 / report.total_holdings as f64 * 100.0)
        } else {
            ui::na_cell()
        };
        table.add_row(vec![Cell::new(label), ui::count_cell(count), share]);
    }
    println!("{table}");
}

pub fn theme(
    service: &QueryService,
    keyword: &str,
    date: NaiveDate,
    limit: Option<usize>,
) -> Result<()> {
    show(
        service.theme_statistics(keyword, Some(date), limit),
        |report| display_theme(&report),
    )
}

fn display_theme(report: &ThemeReport) {
    let stats = &report.statistics;
    println!(
        "\n{} {}",
        ui::style_text(&format!("Theme: {}", stats.theme), ui::StyleType::Title),
        ui::style_text(&report.date.to_string(), ui::StyleType::Subtle)
    );
    println!(
        "{} funds ({}), {} holdings, {} distinct instruments",
        stats.fund_count,
        stats.fund_tickers.join(", "),
        stats.total_holdings_count,
        stats.unique_instrument_count
    );

    if !stats.duplicates.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Shared instrument"),
            ui::header_cell("Name"),
            ui::header_cell("Funds"),
            ui::header_cell("Avg weight"),
        ]);
        for record in &stats.duplicates {
            table.add_row(vec![
                Cell::new(&record.instrument_ticker),
                Cell::new(&record.instrument_name),
                ui::count_cell(record.fund_count),
                ui::weight_cell(record.avg_weight),
            ]);
        }
        println!("{table}");
    }
    if !report.top_amounts.is_empty() {
        display_ranked(&report.top_amounts);
    }
}

pub fn overlap(service: &QueryService, fund_a: &str, fund_b: &str, date: NaiveDate) -> Result<()> {
    show(service.pairwise_overlap(fund_a, fund_b, Some(date)), |report| {
        display_overlap(&report)
    })
}

fn display_overlap(report: &OverlapReport) {
    println!(
        "\n{} {}",
        ui::style_text(
            &format!("Overlap of {} and {}", report.fund_a, report.fund_b),
            ui::StyleType::Title
        ),
        ui::style_text(&report.date.to_string(), ui::StyleType::Subtle)
    );

    let overlap = &report.overlap;
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Shared instruments"),
        ui::count_cell(overlap.overlap_count),
    ]);
    table.add_row(vec![
        Cell::new(format!("Share of {}", report.fund_a)),
        ui::weight_cell(overlap.overlap_ratio_a),
    ]);
    table.add_row(vec![
        Cell::new(format!("Share of {}", report.fund_b)),
        ui::weight_cell(overlap.overlap_ratio_b),
    ]);
    println!("{table}");
    if !overlap.overlap_tickers.is_empty() {
        println!("{}", overlap.overlap_tickers.join(", "));
    }
}

pub fn summary(service: &QueryService, date: NaiveDate) -> Result<()> {
    show(service.statistics_summary(Some(date)), |summary| {
        display_summary(&summary)
    })
}

fn display_summary(summary: &StatisticsSummary) {
    println!(
        "\n{} {}",
        ui::style_text("Snapshot summary", ui::StyleType::Title),
        ui::style_text(&summary.date.to_string(), ui::StyleType::Subtle)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    table.add_row(vec![Cell::new("Funds"), ui::count_cell(summary.total_funds)]);
    table.add_row(vec![
        Cell::new("Holdings"),
        ui::count_cell(summary.total_holdings),
    ]);
    table.add_row(vec![
        Cell::new("Distinct instruments"),
        ui::count_cell(summary.unique_instruments),
    ]);
    table.add_row(vec![
        Cell::new("Holdings per fund"),
        Cell::new(format!("{:.2}", summary.avg_holdings_per_fund)),
    ]);
    table.add_row(vec![
        Cell::new("Most common instrument"),
        match &summary.most_common_instrument {
            Some(top) => Cell::new(format!(
                "{} {} ({} funds)",
                top.instrument_ticker, top.instrument_name, top.fund_count
            )),
            None => ui::na_cell(),
        },
    ]);
    table.add_row(vec![
        Cell::new("Largest total amount"),
        match &summary.highest_amount_instrument {
            Some(top) => Cell::new(format!(
                "{} {} ({})",
                top.instrument_ticker,
                top.instrument_name,
                ui::format_amount(top.total_amount)
            )),
            None => ui::na_cell(),
        },
    ]);
    println!("{table}");
}
