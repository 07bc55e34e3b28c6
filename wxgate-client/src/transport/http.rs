//! Shared reqwest plumbing for the provider transports.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use wxgate_core::error::{Result, TransportFailure, WeatherError};
use wxgate_core::ProviderId;

/// One reqwest client bound to a provider.
///
/// Every failure leaving this type is already a [`WeatherError`].
#[derive(Clone, Debug)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    provider: ProviderId,
}

impl HttpClient {
    pub(crate) fn new(
        provider: ProviderId,
        timeout: Duration,
        user_agent: &str,
        accept: &'static str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| WeatherError::from_transport_error(provider, &e))?;

        Ok(Self { client, provider })
    }

    /// GETs `url` and decodes a JSON body.
    ///
    /// `context` names the resource for `NotFound`/`InvalidInput` details.
    pub(crate) async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<Value> {
        debug!(provider = %self.provider, url, "Upstream request");

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.map_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            if rejects_parameters(status) {
                // Both providers explain 4xx rejections in the body.
                let body = response.json::<Value>().await.ok();
                if let Some(reason) = body.as_ref().and_then(upstream_reason) {
                    return Err(WeatherError::invalid_input(
                        self.provider,
                        "request",
                        context,
                        reason,
                    ));
                }
            }
            return Err(WeatherError::from_status(
                self.provider,
                status.as_u16(),
                retry_after,
                context,
            ));
        }

        let body: Value = response.json().await.map_err(|e| self.map_reqwest(&e))?;

        if body.get("error").and_then(Value::as_bool) == Some(true) {
            let reason =
                upstream_reason(&body).unwrap_or_else(|| "rejected by provider".to_string());
            return Err(WeatherError::invalid_input(
                self.provider,
                "request",
                context,
                reason,
            ));
        }

        Ok(body)
    }

    fn map_reqwest(&self, err: &reqwest::Error) -> WeatherError {
        let failure = if err.is_timeout() {
            Some(TransportFailure::Timeout)
        } else if err.is_decode() {
            Some(TransportFailure::MalformedResponse)
        } else if err.is_connect() {
            Some(TransportFailure::classify(err).unwrap_or(TransportFailure::Connection))
        } else {
            None
        };

        match failure {
            Some(cause) => WeatherError::transport(self.provider, cause),
            None => WeatherError::from_transport_error(self.provider, err),
        }
    }
}

fn rejects_parameters(status: StatusCode) -> bool {
    status.is_client_error()
        && status != StatusCode::NOT_FOUND
        && status != StatusCode::TOO_MANY_REQUESTS
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Explanation field of an upstream error body.
///
/// Open-Meteo uses `reason`; api.weather.gov problem documents use `detail`.
pub(crate) fn upstream_reason(body: &Value) -> Option<String> {
    ["reason", "detail", "title"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Joins a base URL and an absolute path without doubling slashes.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
