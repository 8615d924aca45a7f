// Error taxonomy for the API client. Only `Connectivity` is intercepted
// by the error translator; every other variant reaches the caller as is.

use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The connection to the API could not be established, or broke before the
/// exchange completed (DNS failure, refused connection, reset, timeout).
#[derive(Debug, Error)]
#[error("could not reach the API at {url}")]
pub struct ConnectivityError {
    url: String,
    #[source]
    source: BoxError,
}

impl ConnectivityError {
    pub fn new(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ConnectivityError {
            url: url.into(),
            source: source.into(),
        }
    }

    /// URL of the request that failed.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    /// The server answered with a non-success status. The body is kept
    /// because it usually explains what went wrong.
    #[error("{url} responded with {status}: {body}")]
    HttpStatus {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A JSON-typed call got a body that is not JSON.
    #[error("response body is not valid JSON")]
    Decode(#[from] serde_json::Error),

    /// The request could not be built (bad header or mime value, etc).
    #[error("invalid request")]
    Request(#[source] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileAccess {
            path: path.into(),
            source,
        }
    }
}
