//! Blocking manifest fetches for the streaming engines

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = "XtreamPlayer/0.3";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Read failed: {0}")]
    Read(String),
}

/// Agent with a hard overall timeout per request
pub fn agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .timeout_connect(Some(timeout.min(Duration::from_secs(10))))
        .http_status_as_error(false)
        .max_idle_connections(4)
        .max_idle_connections_per_host(2)
        .build()
        .new_agent()
}

/// GET `url` and return the body as text
pub fn fetch_text(agent: &ureq::Agent, url: &str, user_agent: &str) -> Result<String, FetchError> {
    let mut response = agent
        .get(url)
        .header("User-Agent", user_agent)
        .call()
        .map_err(|e| FetchError::Request(e.to_string()))?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(FetchError::Status(status));
    }

    response
        .body_mut()
        .read_to_string()
        .map_err(|e| FetchError::Read(e.to_string()))
}

/// Resolve a playlist or manifest reference against the document URL
pub fn resolve_url(base: &str, reference: &str) -> String {
    let reference = reference.trim();
    match url::Url::parse(base).and_then(|b| b.join(reference)) {
        Ok(joined) => joined.to_string(),
        Err(_) => reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_reference() {
        assert_eq!(
            resolve_url("https://cdn.example.com/live/master.m3u8?token=abc", "720p/index.m3u8"),
            "https://cdn.example.com/live/720p/index.m3u8"
        );
        assert_eq!(
            resolve_url("https://cdn.example.com/live/master.m3u8", "/other/low.m3u8"),
            "https://cdn.example.com/other/low.m3u8"
        );
    }

    #[test]
    fn test_resolve_absolute_reference() {
        assert_eq!(
            resolve_url("https://cdn.example.com/master.m3u8", "http://edge.example.net/hi.m3u8"),
            "http://edge.example.net/hi.m3u8"
        );
    }

    #[test]
    fn test_unparseable_base_keeps_reference() {
        assert_eq!(resolve_url("not a url", "low.m3u8"), "low.m3u8");
    }
}
