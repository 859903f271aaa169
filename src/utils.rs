use reqwest::Response;

use crate::error::Error;
use crate::Result;

/// Strip trailing slashes so paths can be appended with `format!`
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}

/// Return the body of a non-success response as an error built by `wrap`
pub async fn check_status(
    res: Response,
    service: &str,
    wrap: fn(String) -> Error,
) -> Result<Response> {
    // Store status code before consuming the response
    let status = res.status();

    if status.is_success() {
        return Ok(res);
    }

    let error_text = res.text().await.unwrap_or_default();
    tracing::warn!(%status, "{} request failed", service);
    Err(wrap(format!("{} API error: {} - {}", service, status, error_text)))
}
