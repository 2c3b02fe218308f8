use chrono::NaiveDate;
use std::fs;
use tempfile::NamedTempFile;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_json(server: &MockServer, url_path: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(body),
            )
            .mount(server)
            .await;
    }

    const FUNDS_JSON: &str = r#"[
        {"ticker": "152100", "name": "TIGER Semiconductor Active"},
        {"ticker": "300100", "name": "KODEX AI Semiconductor Active"},
        {"ticker": "400100", "name": "Global Bond Index"}
    ]"#;

    /// Serves two consecutive business days for two active funds; the
    /// bond fund never gets a holdings endpoint.
    pub async fn create_mock_server() -> MockServer {
        let server = MockServer::start().await;

        for date in ["2024-01-01", "2024-01-02"] {
            mount_json(&server, &format!("/funds/{date}"), FUNDS_JSON).await;
        }

        mount_json(
            &server,
            "/holdings/152100/2024-01-01",
            r#"[
                {"instrument_ticker": "005930", "instrument_name": "Samsung", "weight": 10.0, "amount": 1000.0},
                {"instrument_ticker": "000660", "instrument_name": "SK Hynix", "weight": 5.0, "amount": 500.0}
            ]"#,
        )
        .await;
        mount_json(
            &server,
            "/holdings/152100/2024-01-02",
            r#"[
                {"instrument_ticker": "005930", "instrument_name": "Samsung", "weight": 12.0, "amount": 1200.0},
                {"instrument_ticker": "042700", "instrument_name": "Hanmi", "weight": 3.0, "amount": 300.0}
            ]"#,
        )
        .await;
        mount_json(
            &server,
            "/holdings/300100/2024-01-02",
            r#"[
                {"instrument_ticker": "005930", "instrument_name": "Samsung", "weight": 8.0, "amount": 800.0},
                {"instrument_ticker": "035420", "instrument_name": "NAVER", "weight": 0.5, "amount": 50.0}
            ]"#,
        )
        .await;

        server
    }
}

fn write_config(base_url: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("Failed to create temp file");
    let config_content = format!(
        r#"
source:
  base_url: "{base_url}"
  retries: 0
  retry_delay_ms: 1
filter:
  marker_keyword: "Active"
"#
    );
    fs::write(config_file.path(), config_content).expect("Failed to write config file");
    config_file
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

async fn run(command: etfwatch::AppCommand, config_file: &NamedTempFile) -> anyhow::Result<()> {
    info!(?command, "Running command against mock source");
    etfwatch::run_command(command, date(2), Some(config_file.path().to_str().unwrap())).await
}

#[test_log::test(tokio::test)]
async fn test_statistics_commands_with_mock() {
    let server = test_utils::create_mock_server().await;
    let config_file = write_config(&server.uri());

    let commands = [
        etfwatch::AppCommand::Funds { theme: None },
        etfwatch::AppCommand::Funds {
            theme: Some("AI".to_string()),
        },
        etfwatch::AppCommand::Holdings {
            fund: "152100".to_string(),
            top: 5,
        },
        etfwatch::AppCommand::Duplicates {
            min_funds: None,
            limit: Some(10),
        },
        etfwatch::AppCommand::Ranking { top: Some(3) },
        etfwatch::AppCommand::Distribution,
        etfwatch::AppCommand::Theme {
            keyword: "Semiconductor".to_string(),
            limit: None,
        },
        etfwatch::AppCommand::Overlap {
            fund_a: "152100".to_string(),
            fund_b: "300100".to_string(),
        },
        etfwatch::AppCommand::Summary,
    ];

    for command in commands {
        let result = run(command.clone(), &config_file).await;
        assert!(
            result.is_ok(),
            "{command:?} failed with: {:?}",
            result.err()
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_compare_and_history_with_mock() {
    let server = test_utils::create_mock_server().await;
    let config_file = write_config(&server.uri());

    // 300100 has no snapshot on the 1st, so it compares against itself
    for fund in ["152100", "300100"] {
        let result = run(
            etfwatch::AppCommand::Compare {
                fund: fund.to_string(),
                previous: None,
            },
            &config_file,
        )
        .await;
        assert!(result.is_ok(), "Compare {fund} failed with: {:?}", result.err());
    }

    let result = run(
        etfwatch::AppCommand::History {
            fund: "152100".to_string(),
            instrument: "5930".to_string(),
            from: Some(date(1)),
        },
        &config_file,
    )
    .await;
    assert!(result.is_ok(), "History failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_unknown_fund_is_an_error() {
    let server = test_utils::create_mock_server().await;
    let config_file = write_config(&server.uri());

    let result = run(
        etfwatch::AppCommand::Holdings {
            fund: "400100".to_string(),
            top: 5,
        },
        &config_file,
    )
    .await;

    let err = result.expect_err("A filtered-out fund should not be found");
    assert!(err.to_string().contains("400100"), "unexpected error: {err}");
}

#[test_log::test(tokio::test)]
async fn test_unreachable_fund_list_is_an_error() {
    let server = wiremock::MockServer::start().await;
    let config_file = write_config(&server.uri());

    let result = run(etfwatch::AppCommand::Summary, &config_file).await;

    let err = result.expect_err("A missing fund list should fail the run");
    assert!(
        format!("{err:#}").contains("Failed to fetch fund list"),
        "unexpected error: {err:#}"
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_is_an_error() {
    let result = etfwatch::run_command(
        etfwatch::AppCommand::Summary,
        date(2),
        Some("/nonexistent/etfwatch/config.yaml"),
    )
    .await;
    assert!(result.is_err());
}
