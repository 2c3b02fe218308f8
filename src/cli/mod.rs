pub mod compare;
pub mod funds;
pub mod history;
pub mod setup;
pub mod stats;
pub mod ui;

use crate::core::error::{QueryError, QueryResult};
use anyhow::Result;

/// Prints a query result with `display`. A query that found nothing to
/// report is a message for the user, not a failure.
pub(crate) fn show<T>(result: QueryResult<T>, display: impl FnOnce(T)) -> Result<()> {
    match result {
        Ok(value) => {
            display(value);
            Ok(())
        }
        Err(QueryError::NoData(msg)) => {
            println!(
                "{}",
                ui::style_text(&format!("No data available: {msg}"), ui::StyleType::Error)
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_treats_no_data_as_message() {
        let mut shown = false;
        assert!(show(Ok(1), |_| shown = true).is_ok());
        assert!(shown);

        assert!(show::<()>(Err(QueryError::no_data("empty")), |_| ()).is_ok());

        let err = show::<()>(Err(QueryError::FundNotFound("152100".into())), |_| ()).unwrap_err();
        assert!(err.to_string().contains("152100"));
    }
}
