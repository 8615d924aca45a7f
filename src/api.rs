// API client module: the six operations the front-end calls. Each one
// delegates to the transport and passes its result through the error
// translator, so a connection failure is reported the same way everywhere.
// Uploads and downloads live in `upload.rs` and `download.rs`.

use crate::error::Error;
use crate::progress::{BarReporter, ProgressReporter};
use crate::settings::Settings;
use crate::transport::{Request, Transport};
use crate::translate::{ConnectionErrorHandler, ErrorTranslator};
use reqwest::blocking::Response;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::sync::Arc;

pub(crate) const JSON: &str = "application/json";
pub(crate) const PLAIN: &str = "text/plain";
pub(crate) const ANY: &str = "*/*";

/// Blocking client for the Deciphon API. Holds the transport, the
/// connection-error handler and the progress reporter used for transfers.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) transport: Arc<Transport>,
    pub(crate) translator: ErrorTranslator,
    pub(crate) reporter: Arc<dyn ProgressReporter>,
}

impl ApiClient {
    /// Client that exits the process on connection failures and draws
    /// progress bars on stderr.
    pub fn new(settings: &Settings) -> Result<Self, Error> {
        Ok(ApiClient {
            transport: Arc::new(Transport::new(settings)?),
            translator: ErrorTranslator::default(),
            reporter: Arc::new(BarReporter::new()),
        })
    }

    /// Create a client configured from the `DECIPHON_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        ApiClient::new(&Settings::from_env()?)
    }

    pub fn with_connection_error_handler(
        mut self,
        handler: impl ConnectionErrorHandler + 'static,
    ) -> Self {
        self.translator = ErrorTranslator::new(Arc::new(handler));
        self
    }

    pub fn with_progress_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// GET `path` and return its JSON body pretty-printed.
    pub fn get_json(&self, path: &str) -> Result<String, Error> {
        let result = self
            .transport
            .send(Request::get(path, JSON))
            .and_then(|res| self.transport.text(res));
        pretty_json(&self.translator.intercept(result)?)
    }

    /// GET `path` and return its body as text.
    pub fn get_plain(&self, path: &str) -> Result<String, Error> {
        let result = self
            .transport
            .send(Request::get(path, PLAIN))
            .and_then(|res| self.transport.text(res));
        self.translator.intercept(result)
    }

    /// POST a JSON value and return the raw response; the caller decides
    /// what the status means.
    pub fn post(&self, path: &str, json: Value) -> Result<Response, Error> {
        let request = Request::post(path, JSON)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON))
            .json(json);
        self.translator.intercept(self.transport.send(request))
    }

    /// Read the body of a response returned by `post`. A connection that
    /// breaks mid-body is handled like any other connectivity failure.
    pub fn read_text(&self, response: Response) -> Result<String, Error> {
        self.translator.intercept(self.transport.text(response))
    }

    /// DELETE `path` and return its JSON body pretty-printed.
    pub fn delete(&self, path: &str) -> Result<String, Error> {
        let result = self
            .transport
            .send(Request::delete(path, JSON))
            .and_then(|res| self.transport.text(res));
        pretty_json(&self.translator.intercept(result)?)
    }
}

/// Re-indent a JSON document with two spaces.
pub fn pretty_json(body: &str) -> Result<String, Error> {
    let value: Value = serde_json::from_str(body)?;
    Ok(serde_json::to_string_pretty(&value)?)
}
