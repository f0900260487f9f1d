//! Shared HTTP plumbing for the data provider clients.
//!
//! One attempt per call; failures are classified into `ToolFailure`
//! kinds so the dispatcher can decide what is worth a bounded retry.
//! Retry policy itself lives in the dispatcher, not here.

use coinsage_core::error::{ToolErrorKind, ToolFailure};
use tracing::debug;

/// Thin reqwest wrapper producing classified failures.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// GET a JSON document.
    ///
    /// Status mapping: 429 → RateLimited (with parsed `Retry-After`),
    /// 401/403 → Unauthorized, 404 → NotFound, anything else non-2xx or
    /// undecodable → Unknown. A client-side timeout maps to Timeout.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, ToolFailure> {
        debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolFailure::new(ToolErrorKind::Timeout, format!("request timed out: {url}"))
                } else {
                    ToolFailure::new(ToolErrorKind::Unknown, e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status >= 400 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .map(|v| v as u64);

            let mut body = response.text().await.unwrap_or_default();
            body = body.replace('\n', " ");
            if body.len() > 220 {
                body.truncate(220);
                body.push('…');
            }

            return Err(match status {
                429 => ToolFailure::rate_limited(
                    format!("HTTP 429 {url} {body}"),
                    // Default hint when the provider gives none.
                    retry_after.or(Some(30)),
                ),
                401 | 403 => ToolFailure::new(
                    ToolErrorKind::Unauthorized,
                    format!("HTTP {status} {url} {body}"),
                ),
                404 => ToolFailure::new(ToolErrorKind::NotFound, format!("HTTP 404 {url}")),
                _ => ToolFailure::new(
                    ToolErrorKind::Unknown,
                    format!("HTTP {status} {url} {body}"),
                ),
            });
        }

        response.json().await.map_err(|e| {
            ToolFailure::new(
                ToolErrorKind::Unknown,
                format!("invalid JSON from {url}: {e}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_classified() {
        // Reserved TEST-NET address: connection fails fast without DNS.
        let fetcher = HttpFetcher::new(1);
        let err = fetcher
            .get_json("http://192.0.2.1:9/none", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err.kind,
            ToolErrorKind::Timeout | ToolErrorKind::Unknown
        ));
    }
}
