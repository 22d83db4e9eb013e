use super::util::with_retry;
use crate::core::currency::{Currency, RateSnapshot, RateSource};
use crate::core::error::{ExchangeError, ExchangeResult};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

const RATES_PATH: &str = "/api/currency-exchange-rates";
const RETRY_DELAY_MS: u64 = 500;

/// Rate source reading a JSON table of rates relative to one base currency.
pub struct HttpRateSource {
    base_url: String,
    retries: usize,
    client: reqwest::Client,
}

impl HttpRateSource {
    pub fn new(base_url: &str, retries: usize) -> ExchangeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("exchanger/1.0")
            .build()
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;
        Ok(HttpRateSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    date: Option<String>,
    rates: HashMap<String, Decimal>,
}

fn into_snapshot(response: RatesResponse) -> ExchangeResult<RateSnapshot> {
    let base: Currency = match response.base.as_deref() {
        Some(code) => code
            .parse()
            .map_err(|_| ExchangeError::Decode(format!("invalid base currency '{code}'")))?,
        None => Currency::eur(),
    };

    let mut rates = HashMap::with_capacity(response.rates.len());
    for (code, rate) in response.rates {
        match code.parse::<Currency>() {
            Ok(currency) if rate > Decimal::ZERO => {
                rates.insert(currency, rate);
            }
            _ => debug!(%code, %rate, "Skipping unusable rate entry"),
        }
    }

    Ok(RateSnapshot::new(base, rates).with_as_of(response.date))
}

#[async_trait]
impl RateSource for HttpRateSource {
    #[instrument(name = "HttpRatesFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_rates(&self) -> ExchangeResult<RateSnapshot> {
        let url = format!("{}{}", self.base_url, RATES_PATH);
        debug!("Requesting exchange rates from {}", url);

        let client = &self.client;
        let request_url = &url;
        let response = with_retry(
            || async move { client.get(request_url).send().await },
            self.retries,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| ExchangeError::Transport(format!("{e} (URL: {url})")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Server {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let data: RatesResponse = match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %text,
                    "Failed to parse rates response"
                );
                return Err(ExchangeError::Decode(e.to_string()));
            }
        };

        let snapshot = into_snapshot(data)?;
        debug!(
            base = %snapshot.base,
            currencies = snapshot.rates.len(),
            "Received exchange rates"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_JSON: &str = r#"{
        "base": "EUR",
        "date": "2024-05-02",
        "rates": {
            "EUR": 1,
            "USD": 1.129031,
            "JPY": 129.53,
            "BAD": -1,
            "BTC1": 0.00002
        }
    }"#;

    async fn create_mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(RATES_PATH))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(MOCK_JSON)).await;
        let source = HttpRateSource::new(&mock_server.uri(), 0).unwrap();

        let snapshot = source.fetch_rates().await.unwrap();
        assert_eq!(snapshot.base, Currency::eur());
        assert_eq!(snapshot.as_of.as_deref(), Some("2024-05-02"));
        assert_eq!(snapshot.rate(&Currency::usd()).unwrap(), dec!(1.129031));
        assert_eq!(snapshot.rate(&"JPY".parse().unwrap()).unwrap(), dec!(129.53));
        // Negative rate and malformed code are dropped.
        assert_eq!(snapshot.rates.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_base_defaults_to_eur() {
        let body = r#"{"rates": {"USD": 1.1}}"#;
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;
        let source = HttpRateSource::new(&format!("{}/", mock_server.uri()), 0).unwrap();

        let snapshot = source.fetch_rates().await.unwrap();
        assert_eq!(snapshot.base, Currency::eur());
        assert_eq!(snapshot.rate(&Currency::eur()).unwrap(), Decimal::ONE);
        assert!(snapshot.as_of.is_none());
    }

    #[tokio::test]
    async fn test_server_error_response() {
        let mock_server = create_mock_server(ResponseTemplate::new(500)).await;
        let source = HttpRateSource::new(&mock_server.uri(), 0).unwrap();

        let err = source.fetch_rates().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Server { status: 500 }));
        assert_eq!(err.to_string(), "Rate server responded with HTTP 500");
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let body = r#"{"rate": {"USD": 1.1}}"#; // "rate" instead of "rates"
        let mock_server =
            create_mock_server(ResponseTemplate::new(200).set_body_string(body)).await;
        let source = HttpRateSource::new(&mock_server.uri(), 0).unwrap();

        let err = source.fetch_rates().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Decode(_)));
        assert!(err.to_string().starts_with("Failed to decode rate response"));
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Nothing listens on the discard port.
        let source = HttpRateSource::new("http://127.0.0.1:9", 0).unwrap();

        let err = source.fetch_rates().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Transport(_)));
    }

    #[test]
    fn test_invalid_base_is_decode_error() {
        let response = RatesResponse {
            base: Some("EURO".to_string()),
            date: None,
            rates: HashMap::new(),
        };
        assert!(matches!(
            into_snapshot(response),
            Err(ExchangeError::Decode(_))
        ));
    }
}
