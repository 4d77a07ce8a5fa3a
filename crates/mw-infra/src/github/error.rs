use mw_core::ports::RemoteStoreError;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

pub(crate) fn from_transport(error: reqwest::Error) -> RemoteStoreError {
    if error.is_timeout() {
        RemoteStoreError::Timeout
    } else if let Some(status) = error.status() {
        map_status_code(status, &HeaderMap::new(), error.to_string())
    } else if error.is_decode() {
        RemoteStoreError::Protocol(error.to_string())
    } else {
        RemoteStoreError::Network(error.to_string())
    }
}

pub(crate) fn map_status_code(
    code: StatusCode,
    headers: &HeaderMap,
    message: String,
) -> RemoteStoreError {
    let rate_limit_spent = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        == Some("0");

    match code {
        StatusCode::UNAUTHORIZED => RemoteStoreError::Unauthorized,
        StatusCode::FORBIDDEN if rate_limit_spent => RemoteStoreError::RateLimited,
        StatusCode::TOO_MANY_REQUESTS => RemoteStoreError::RateLimited,
        StatusCode::FORBIDDEN => RemoteStoreError::Forbidden(message),
        StatusCode::NOT_FOUND => RemoteStoreError::NotFound(message),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteStoreError::Conflict(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => RemoteStoreError::Timeout,
        _ => RemoteStoreError::UnexpectedStatus {
            status: code.as_u16(),
            message,
        },
    }
}
