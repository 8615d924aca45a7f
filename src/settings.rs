// Settings module: the API location, credential and timeouts. A single
// `Settings` value is built at startup and handed to the client by
// reference; nothing here is global or mutable after construction.

use crate::error::Error;
use std::fmt;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:49329";
const DEFAULT_API_KEY: &str = "change-me";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the remote API.
#[derive(Clone)]
pub struct Settings {
    /// Base URL; request paths are appended to it verbatim.
    pub api_url: String,
    /// Static credential sent as `X-API-KEY` on every request.
    pub api_key: String,
    /// Upper bound on establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Overall deadline for a whole request. `None` leaves large transfers
    /// unbounded; only the connect phase is then limited.
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Settings with the given URL and key and default timeouts.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Settings {
            api_url: api_url.into(),
            api_key: api_key.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: None,
        }
    }

    /// Read settings from `DECIPHON_API_URL`, `DECIPHON_API_KEY`,
    /// `DECIPHON_CONNECT_TIMEOUT` and `DECIPHON_TIMEOUT` (seconds), falling
    /// back to local defaults for anything unset.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let api_url = lookup("DECIPHON_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let api_key = lookup("DECIPHON_API_KEY").unwrap_or_else(|| DEFAULT_API_KEY.into());
        let mut settings = Settings::new(api_url, api_key);

        if let Some(raw) = lookup("DECIPHON_CONNECT_TIMEOUT") {
            settings.connect_timeout = parse_seconds("DECIPHON_CONNECT_TIMEOUT", &raw)?;
        }
        if let Some(raw) = lookup("DECIPHON_TIMEOUT") {
            settings.timeout = Some(parse_seconds("DECIPHON_TIMEOUT", &raw)?);
        }
        Ok(settings)
    }

    /// Full target URL for a request path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

fn parse_seconds(name: &str, raw: &str) -> Result<Duration, Error> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Config(format!("{name} must be a whole number of seconds, got {raw:?}")))
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish()
    }
}
