use super::{show, ui};
use crate::query::QueryService;
use crate::query::reports::ComparisonReport;
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

pub fn run(
    service: &QueryService,
    fund: &str,
    current: NaiveDate,
    previous: Option<NaiveDate>,
) -> Result<()> {
    show(
        service.compare_holdings(fund, Some(current), previous),
        |report| display_report(&report),
    )
}

fn display_report(report: &ComparisonReport) {
    println!(
        "\n{} {}",
        ui::style_text(
            &format!("{} ({})", report.fund_name, report.fund_ticker),
            ui::StyleType::Title
        ),
        ui::style_text(
            &format!("{} → {}", report.previous_date, report.current_date),
            ui::StyleType::Subtle
        )
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Instrument"),
        ui::header_cell("Name"),
        ui::header_cell("Previous"),
        ui::header_cell("Current"),
        ui::header_cell("Change"),
        ui::header_cell("Amount"),
        ui::header_cell("Status"),
    ]);
    for record in &report.records {
        table.add_row(vec![
            Cell::new(&record.instrument_ticker),
            Cell::new(&record.instrument_name),
            ui::weight_cell(record.prev_weight),
            ui::weight_cell(record.current_weight),
            ui::delta_cell(record.delta),
            ui::amount_cell(record.current_amount),
            ui::status_cell(record.status),
        ]);
    }
    println!("{table}");

    let counts = report.summary.counts;
    println!(
        "{} {} new, {} removed, {} increased, {} decreased, {} unchanged ({} held now)",
        ui::style_text("Summary:", ui::StyleType::TotalLabel),
        counts.new_count,
        counts.removed_count,
        counts.increased_count,
        counts.decreased_count,
        counts.unchanged_count,
        report.summary.total_current
    );
}
