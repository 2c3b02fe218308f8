use crate::core::config::SourceConfig;
use crate::core::model::{Fund, Holding};
use crate::core::source::MarketDataSource;
use crate::providers::util::with_retry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Market-data source backed by a JSON HTTP API:
///
/// - `GET {base}/funds/{date}` returns `[{"ticker", "name"}]`
/// - `GET {base}/holdings/{fund}/{date}` returns
///   `[{"instrument_ticker", "instrument_name", "weight", "amount"}]`
///
/// Every record is validated; one bad record fails the whole call.
pub struct HttpMarketDataSource {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
struct FundRecord {
    ticker: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct HoldingRecord {
    instrument_ticker: String,
    #[serde(default)]
    instrument_name: String,
    weight: f64,
    amount: f64,
}

impl HttpMarketDataSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("etfwatch/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, url: &str) -> Result<T> {
        debug!("Requesting {}", url);
        let client = &self.client;
        with_retry(
            || async {
                let response = client.get(url).send().await?;
                response.error_for_status()?.json::<T>().await
            },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Failed to fetch {url}"))
    }
}

#[async_trait]
impl MarketDataSource for HttpMarketDataSource {
    async fn fetch_funds_for_date(&self, date: NaiveDate) -> Result<Vec<Fund>> {
        let url = format!("{}/funds/{}", self.base_url, date.format("%Y-%m-%d"));
        let records: Vec<FundRecord> = self.get_json(&url).await?;

        let funds = records
            .iter()
            .map(|r| {
                Fund::new(&r.ticker, &r.name)
                    .with_context(|| format!("Invalid fund record from {url}: {r:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Fetched {} funds for {}", funds.len(), date);
        Ok(funds)
    }

    async fn fetch_holdings_for_date(
        &self,
        fund_ticker: &str,
        date: NaiveDate,
    ) -> Result<Vec<Holding>> {
        let url = format!(
            "{}/holdings/{}/{}",
            self.base_url,
            fund_ticker,
            date.format("%Y-%m-%d")
        );
        let records: Vec<HoldingRecord> = self.get_json(&url).await?;

        let holdings = records
            .iter()
            .map(|r| {
                Holding::new(
                    fund_ticker,
                    &r.instrument_ticker,
                    date,
                    r.weight,
                    r.amount,
                    &r.instrument_name,
                )
                .with_context(|| format!("Invalid holding record from {url}: {r:?}"))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Fetched {} holdings for fund {} on {}",
            holdings.len(),
            fund_ticker,
            date
        );
        Ok(holdings)
    }
}
