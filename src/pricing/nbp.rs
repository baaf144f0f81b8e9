use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{RatePoint, RateSource};

pub const DEFAULT_NBP_API_URL: &str = "https://api.nbp.pl/api";

/// NBP exchange rate series response (table A)
#[derive(Debug, Deserialize)]
struct NbpSeriesResponse {
    rates: Vec<NbpRate>,
}

#[derive(Debug, Deserialize)]
struct NbpRate {
    #[serde(rename = "effectiveDate")]
    effective_date: NaiveDate,
    mid: f64,
}

/// National Bank of Poland average-rate client
#[derive(Debug, Clone)]
pub struct NbpClient {
    client: Client,
    base_url: String,
}

impl NbpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent("kryptopit/0.1")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn series_url(&self, currency: &str, start: NaiveDate, end: NaiveDate) -> String {
        let code = currency.to_lowercase();
        if start == end {
            format!(
                "{}/exchangerates/rates/a/{}/{}/?format=json",
                self.base_url,
                code,
                start.format("%Y-%m-%d")
            )
        } else {
            format!(
                "{}/exchangerates/rates/a/{}/{}/{}/?format=json",
                self.base_url,
                code,
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            )
        }
    }
}

impl RateSource for NbpClient {
    async fn fetch_rates(
        &self,
        currency: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RatePoint>> {
        let url = self.series_url(currency, start, end);
        info!("Fetching NBP rates for {} ({} to {})", currency, start, end);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to NBP")?;

        // NBP answers 404 when no table was published in the range
        if response.status() == StatusCode::NOT_FOUND {
            debug!("NBP has no {} rate between {} and {}", currency, start, end);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(anyhow!("NBP returned error status: {}", response.status()));
        }

        let data: NbpSeriesResponse = response
            .json()
            .await
            .context("Failed to parse NBP response")?;

        let points = data
            .rates
            .into_iter()
            .filter_map(|r| {
                Decimal::from_f64_retain(r.mid).map(|mid| RatePoint {
                    date: r.effective_date,
                    // Published with 4 decimals; drop the binary noise
                    mid: mid.round_dp(6),
                })
            })
            .collect();
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn should_skip_online_tests() -> bool {
        std::env::var("KRYPTOPIT_SKIP_ONLINE_TESTS")
            .map(|v| v != "0")
            .unwrap_or(false)
    }

    #[test]
    fn test_series_urls() {
        let client = NbpClient::new("https://api.nbp.pl/api/", Duration::from_secs(5)).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert_eq!(
            client.series_url("USD", day, day),
            "https://api.nbp.pl/api/exchangerates/rates/a/usd/2024-03-08/?format=json"
        );
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            client.series_url("EUR", start, day),
            "https://api.nbp.pl/api/exchangerates/rates/a/eur/2024-03-01/2024-03-08/?format=json"
        );
    }

    #[test]
    fn test_parses_series_payload() {
        let payload = r#"{"table":"A","currency":"dolar amerykański","code":"USD",
            "rates":[{"no":"048/A/NBP/2024","effectiveDate":"2024-03-08","mid":3.9432}]}"#;
        let parsed: NbpSeriesResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.rates.len(), 1);
        assert_eq!(
            parsed.rates[0].effective_date,
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap()
        );
    }

    #[tokio::test]
    async fn test_fetch_known_usd_rate() {
        if should_skip_online_tests() {
            return;
        }

        let client = NbpClient::new(DEFAULT_NBP_API_URL, Duration::from_secs(10)).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let points = match client.fetch_rates("USD", day, day).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Skipping NBP fetch test: {}", e);
                return;
            }
        };
        assert_eq!(points.len(), 1);
        assert!(points[0].mid > Decimal::ZERO);
    }
}
