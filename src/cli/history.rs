use super::{show, ui};
use crate::query::QueryService;
use crate::query::reports::WeightPoint;
use anyhow::Result;
use comfy_table::Cell;

/// Shows how an instrument's weight in a fund moved across stored dates.
pub fn run(service: &QueryService, fund: &str, instrument: &str) -> Result<()> {
    let fund = service.fund(fund)?;
    show(service.weight_history(fund.ticker(), instrument), |points| {
        println!(
            "\n{} {}",
            ui::style_text(&fund.display_name(), ui::StyleType::Title),
            ui::style_text(&format!("weight of {instrument}"), ui::StyleType::Subtle)
        );
        display_history(&points);
    })
}

fn display_history(points: &[WeightPoint]) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Weight"),
        ui::header_cell("Change"),
    ]);

    let mut previous: Option<f64> = None;
    for point in points {
        let change = match previous {
            Some(prev) => ui::delta_cell(point.weight - prev),
            None => ui::na_cell(),
        };
        table.add_row(vec![
            Cell::new(point.date),
            ui::weight_cell(point.weight),
            change,
        ]);
        previous = Some(point.weight);
    }
    println!("{table}");
}
