//! HTTP plumbing shared by the provider clients.

use std::time::Duration;

use examprep_core::ProviderError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub(crate) fn build_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))
}

/// Map a transport failure. The URL is stripped so nothing from the request
/// line ends up in logs or error output.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else {
        ProviderError::NetworkError(e.without_url().to_string())
    }
}

/// Turn a non-success response into a [`ProviderError`]. `extract_message`
/// pulls the human message out of the provider's error body, if it has one.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
    extract_message: fn(&str) -> Option<String>,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    match status {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            })
        }
        401 | 403 => Err(ProviderError::AuthenticationFailed { status }),
        404 => Err(ProviderError::ModelNotFound(model.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = extract_message(&body).unwrap_or(body);
            Err(ProviderError::ApiError { status, message })
        }
    }
}

/// Read a success body as `T`.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse(format!("unexpected response body: {}", e.without_url())))
}
