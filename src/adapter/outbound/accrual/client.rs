//! Accrual service REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client as HttpClient, StatusCode};
use tracing::debug;
use url::Url;

use super::dto::AccrualResponse;
use crate::domain::{OrderNumber, StatusReport};
use crate::error::{AccrualError, Error, Result};
use crate::port::AccrualSource;

/// HTTP client for the external accrual service.
pub struct AccrualClient {
    http: HttpClient,
    /// Base URL, always ending in `/` so joins append rather than replace.
    base_url: Url,
}

impl AccrualClient {
    /// Create a client for the service at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self { http, base_url })
    }

    /// Endpoint for one order.
    fn order_url(&self, number: &OrderNumber) -> std::result::Result<Url, AccrualError> {
        self.base_url
            .join(&format!("api/orders/{number}"))
            .map_err(|e| AccrualError::Decode(e.to_string()))
    }
}

/// Classify an accrual service response.
///
/// - `200` decodes the body into a [`StatusReport`]
/// - `204` means the service does not know the order yet
/// - `429` means the caller is rate limited; `Retry-After` seconds are kept
///   for logging
/// - anything else is an unexpected status
///
/// # Errors
/// Every non-200 outcome and every undecodable body is an [`AccrualError`].
pub fn interpret_response(
    number: &OrderNumber,
    status: StatusCode,
    retry_after: Option<&str>,
    body: &[u8],
) -> std::result::Result<StatusReport, AccrualError> {
    match status {
        StatusCode::OK => {
            let response: AccrualResponse = serde_json::from_slice(body)
                .map_err(|e| AccrualError::Decode(e.to_string()))?;
            response.into_report(number)
        }
        StatusCode::NO_CONTENT => Err(AccrualError::NotRegistered {
            number: number.to_string(),
        }),
        StatusCode::TOO_MANY_REQUESTS => Err(AccrualError::RateLimited {
            retry_after_secs: retry_after.and_then(|v| v.trim().parse().ok()),
        }),
        other => Err(AccrualError::UnexpectedStatus {
            status: other.as_u16(),
        }),
    }
}

#[async_trait]
impl AccrualSource for AccrualClient {
    async fn fetch(&self, number: &OrderNumber) -> std::result::Result<StatusReport, AccrualError> {
        let url = self.order_url(number)?;
        debug!(order = %number, url = %url, "Polling accrual service");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        interpret_response(number, status, retry_after.as_deref(), &body)
    }
}
