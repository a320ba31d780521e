//! Blocking HTTP downloads shared by the content cache and the fallback mirror.

use std::io::{Read, Write};
use std::time::Duration;

use crate::core::settings::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::error::FetchError;

use super::progress::{ProgressGuard, upgrade_to_bytes};

/// HTTP client with a fixed timeout and default User-Agent.
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
    user_agent: String,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            DEFAULT_USER_AGENT,
        )
    }
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            user_agent: user_agent.into(),
        }
    }

    /// Stream `url` into `out`, showing progress labelled `label`.
    ///
    /// `user_agent` overrides the client's default for this request.
    /// Returns the number of bytes written.
    pub fn download_to(
        &self,
        url: &str,
        out: &mut impl Write,
        user_agent: Option<&str>,
        label: &str,
    ) -> Result<u64, FetchError> {
        let progress = ProgressGuard::spinner(&format!("downloading {}", label));

        let response = self
            .agent
            .get(url)
            .set("User-Agent", user_agent.unwrap_or(&self.user_agent))
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, _) => FetchError::Status {
                    url: url.to_string(),
                    code,
                },
                ureq::Error::Transport(t) => FetchError::Transport {
                    url: url.to_string(),
                    message: t.to_string(),
                },
            })?;

        if let Some(len) = response
            .header("content-length")
            .and_then(|s| s.parse().ok())
        {
            upgrade_to_bytes(progress.bar(), len);
        }

        let mut reader = response.into_reader();
        let mut buffer = [0u8; 8192];
        let mut total_bytes = 0u64;

        loop {
            let n = reader.read(&mut buffer).map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: format!("read error: {}", e),
            })?;
            if n == 0 {
                break;
            }
            out.write_all(&buffer[..n])?;
            total_bytes += n as u64;
            progress.bar().set_position(total_bytes);
        }

        out.flush()?;
        Ok(total_bytes)
    }
}

/// File name of the last path segment of `url`, without query or fragment.
pub fn url_filename(url: &str) -> Option<String> {
    let url = url.split('#').next().unwrap_or(url);
    let url = url.split('?').next().unwrap_or(url);
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);

    // a bare host has no file name
    let (_, path) = after_scheme.split_once('/')?;
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
