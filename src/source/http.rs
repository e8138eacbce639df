//! Products API client with bounded timeout and retry

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::RecordSource;
use crate::error::{PipelineError, Result, UnavailableReason};
use crate::record::{sales, Record};

/// Region selector of the sales dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Region {
    /// The whole country, sent as an empty region
    #[default]
    Brasil,
    CentroOeste,
    Nordeste,
    Norte,
    Sudeste,
    Sul,
}

impl Region {
    /// Value of the `regiao` query parameter
    pub fn query_value(self) -> &'static str {
        match self {
            Region::Brasil => "",
            Region::CentroOeste => "centro-oeste",
            Region::Nordeste => "nordeste",
            Region::Norte => "norte",
            Region::Sudeste => "sudeste",
            Region::Sul => "sul",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Brasil => "Brasil",
            Region::CentroOeste => "Centro-Oeste",
            Region::Nordeste => "Nordeste",
            Region::Norte => "Norte",
            Region::Sudeste => "Sudeste",
            Region::Sul => "Sul",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "brasil" | "all" => Ok(Region::Brasil),
            "centro-oeste" | "centro_oeste" => Ok(Region::CentroOeste),
            "nordeste" => Ok(Region::Nordeste),
            "norte" => Ok(Region::Norte),
            "sudeste" => Ok(Region::Sudeste),
            "sul" => Ok(Region::Sul),
            other => Err(format!("unknown region '{other}'")),
        }
    }
}

/// Optional server-side narrowing of the dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalesQuery {
    pub region: Region,
    pub year: Option<i32>,
}

impl SalesQuery {
    /// Query parameters as sent on the wire; empty values mean "all"
    pub fn params(&self) -> [(&'static str, String); 2] {
        [
            ("regiao", self.region.query_value().to_string()),
            (
                "ano",
                self.year.map(|y| y.to_string()).unwrap_or_default(),
            ),
        ]
    }
}

/// Loads the sales dataset from the products API
pub struct HttpSource {
    client: Client,
    endpoint: String,
    query: SalesQuery,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpSource {
    /// Create a source with a per-request timeout and no retries
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            query: SalesQuery::default(),
            max_retries: 0,
            retry_delay: Duration::from_millis(500),
        })
    }

    pub fn with_query(mut self, query: SalesQuery) -> Self {
        self.query = query;
        self
    }

    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Make a single request and decode its body
    async fn fetch_once(&self) -> Result<Vec<Record>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.query.params())
            .send()
            .await
            .map_err(describe_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::unavailable(
                UnavailableReason::Status(status.as_u16()),
                format!("unexpected status {} from {}", status, self.endpoint),
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| {
                PipelineError::unavailable(
                    UnavailableReason::Body,
                    format!("invalid response body: {}", e),
                )
            })?;

        records_from_json(body)
    }

    /// Calculate exponential backoff delay
    fn calculate_backoff(&self, retry_count: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(retry_count.saturating_sub(1)))
    }
}

fn describe_transport_error(e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::unavailable(UnavailableReason::Timeout, format!("request timed out: {}", e))
    } else if e.is_connect() {
        PipelineError::unavailable(UnavailableReason::Connect, format!("connection failed: {}", e))
    } else {
        PipelineError::unavailable(UnavailableReason::Transport, format!("request failed: {}", e))
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn load(&self) -> Result<Vec<Record>> {
        debug!(
            "Fetching sales from {} (region={:?}, year={:?})",
            self.endpoint, self.query.region, self.query.year
        );

        let mut retry_count = 0;
        loop {
            match self.fetch_once().await {
                Ok(records) => {
                    info!("Loaded {} sales records", records.len());
                    return Ok(records);
                }
                Err(e) => {
                    if retry_count >= self.max_retries || !e.is_retryable() {
                        return Err(e);
                    }

                    retry_count += 1;
                    let delay = self.calculate_backoff(retry_count);
                    warn!(
                        "Load attempt {} failed: {}; retrying in {:?}",
                        retry_count, e, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Decode a JSON array of flat objects into sales records
pub fn records_from_json(body: serde_json::Value) -> Result<Vec<Record>> {
    let serde_json::Value::Array(rows) = body else {
        return Err(PipelineError::unavailable(
            UnavailableReason::Body,
            "invalid response body: expected a JSON array",
        ));
    };

    rows.iter()
        .map(|row| {
            let object = row.as_object().ok_or_else(|| {
                PipelineError::unavailable(
                    UnavailableReason::Body,
                    "invalid response body: expected an array of objects",
                )
            })?;
            Record::from_json_object(
                object,
                &[(sales::PURCHASE_DATE, sales::PURCHASE_DATE_FORMAT)],
            )
        })
        .collect()
}
