// src/wiki/transport.rs
//! Rate-limited HTTP transport for the wiki API.
//!
//! The rest of the engine depends on the [`Transport`] trait, never on
//! HTTP details — tests substitute a scripted fake and count calls.

use crate::constants::{WIKI_API_URL, WIKI_OVERLOAD_BACKOFF_FACTOR, WIKI_RATE_LIMIT_SECS};
use crate::error::{ApiErrorKind, AppError, Result};
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};

/// Query parameters for one API call.
pub type QueryParams = Vec<(String, String)>;

/// Builds a parameter list from string pairs.
pub fn query(pairs: &[(&str, &str)]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Inserts or replaces a parameter.
pub fn set_param(params: &mut QueryParams, key: &str, value: String) {
    if let Some(slot) = params.iter_mut().find(|(k, _)| k == key) {
        slot.1 = value;
    } else {
        params.push((key.to_string(), value));
    }
}

/// The ability to issue one API query and get one JSON response page.
pub trait Transport {
    fn send(&mut self, params: &QueryParams) -> Result<Value>;
}

/// Loops a query through the API's opaque continuation token, returning
/// the `query` object of every response page in order.
pub fn paginate(transport: &mut dyn Transport, params: &QueryParams) -> Result<Vec<Value>> {
    let mut params = params.clone();
    let mut pages = Vec::new();
    loop {
        let body = transport.send(&params)?;
        let page = body.get("query").cloned().ok_or_else(|| {
            AppError::MalformedResponse(format!("response without query object: {}", body))
        })?;
        pages.push(page);
        match body.get("continue").and_then(Value::as_object) {
            Some(cont) => {
                for (key, value) in cont {
                    if let Some(s) = value.as_str() {
                        set_param(&mut params, key, s.to_string());
                    }
                }
            }
            None => break,
        }
    }
    Ok(pages)
}

/// Real transport: reqwest's blocking client plus a process-wide minimum
/// spacing between calls.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    api_url: String,
    last_call: Option<Instant>,
    min_interval: Duration,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_api_url(WIKI_API_URL)
    }

    pub fn with_api_url(api_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(
                "cardvault/",
                env!("CARGO_PKG_VERSION"),
                " (https://github.com/cardvault/cardvault)"
            ))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            last_call: None,
            min_interval: Duration::from_secs_f64(WIKI_RATE_LIMIT_SECS),
        })
    }

    /// Sleeps until the minimum spacing since the previous call has
    /// passed, then stamps this call.
    fn throttle(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }

    fn send_once(&mut self, params: &QueryParams) -> Result<reqwest::blocking::Response> {
        self.throttle();
        let mut all_params = query(&[("format", "json"), ("formatversion", "2"), ("utf8", "1")]);
        all_params.extend(params.iter().cloned());
        log::debug!("GET {} ({} params)", self.api_url, all_params.len());
        Ok(self.client.get(&self.api_url).query(&all_params).send()?)
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, params: &QueryParams) -> Result<Value> {
        let response = self.send_once(params)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json()?);
        }

        let kind = ApiErrorKind::from_http_status(status.as_u16());
        if kind.is_retryable() {
            // Servers must be hammered; wait an extended period and try
            // the identical request once more.
            let backoff = self.min_interval * WIKI_OVERLOAD_BACKOFF_FACTOR;
            log::warn!(
                "Wiki API overloaded (status {}), retrying in {:.1}s",
                status,
                backoff.as_secs_f64()
            );
            thread::sleep(backoff);
            let retry = self.send_once(params)?;
            let retry_status = retry.status();
            if retry_status.is_success() {
                return Ok(retry.json()?);
            }
            return Err(AppError::ApiFailure {
                kind: ApiErrorKind::from_http_status(retry_status.as_u16()),
                message: format!("retry after overload failed with {}", retry_status),
            });
        }

        Err(AppError::ApiFailure {
            kind,
            message: format!("request failed with {}", status),
        })
    }
}
