//! Shared HTTP plumbing for provider adapters
//!
//! Maps transport and status failures onto `ProviderError` so every
//! adapter reports outages the same way.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::ports::{ProviderError, ProviderResult};

pub(crate) const USER_AGENT: &str = concat!("trend-hunter/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ProviderError::Http(e.to_string()))
}

pub(crate) fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else if error.is_connect() {
        ProviderError::Unavailable(error.to_string())
    } else if error.is_decode() {
        ProviderError::Parse(error.to_string())
    } else {
        ProviderError::Http(error.to_string())
    }
}

/// Classify a response status. `Ok(false)` means "not found".
pub(crate) fn classify_status(status: StatusCode) -> ProviderResult<bool> {
    if status.is_success() {
        return Ok(true);
    }
    match status {
        StatusCode::NOT_FOUND => Ok(false),
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ProviderError::Unauthorized(format!("status {}", status)))
        }
        s if s.is_server_error() => Err(ProviderError::Unavailable(format!("server error {}", s))),
        s => Err(ProviderError::Http(format!("unexpected status {}", s))),
    }
}

/// Send a request and decode the JSON body; 404 yields `Ok(None)`
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> ProviderResult<Option<T>> {
    let response = request.send().await.map_err(map_transport_error)?;

    if !classify_status(response.status())? {
        return Ok(None);
    }

    let body = response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Parse(format!("Failed to parse JSON: {}", e)))?;

    Ok(Some(body))
}

/// Treat an empty or whitespace-only string as absent
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::OK), Ok(true));
        assert_eq!(classify_status(StatusCode::NOT_FOUND), Ok(false));
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), Err(ProviderError::RateLimited));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            Err(ProviderError::Unauthorized(_))
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            Err(ProviderError::Unavailable(_))
        ));
        assert!(matches!(classify_status(StatusCode::BAD_REQUEST), Err(ProviderError::Http(_))));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("x".into())), Some("x".into()));
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
