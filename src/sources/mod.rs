// src/sources/mod.rs
//! The bulk-download importers.
//!
//! Unlike the wiki engine, these sources publish one aggregate dump:
//! a single GET, cached to disk with timestamp-based expiry, then every
//! record reconciled through its source's ladder and merged.

pub mod prodeck;
pub mod yamlyugi;

use crate::error::{ApiErrorKind, AppError, Result};

/// Downloads a dump as text. One shot, no retry — a failed bulk import
/// just runs again next time.
pub(crate) fn download_text(url: &str, query: &[(&str, &str)]) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!(
            "cardvault/",
            env!("CARGO_PKG_VERSION"),
            " (https://github.com/cardvault/cardvault)"
        ))
        .build()?;
    let response = client.get(url).query(query).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::ApiFailure {
            kind: ApiErrorKind::from_http_status(status.as_u16()),
            message: format!("download of {} failed with {}", url, status),
        });
    }
    Ok(response.text()?)
}
