// Transport: builds one authenticated request, sends it, and hands back the
// response. HTTP error statuses are NOT errors at this level; only failures
// to reach the server become `ConnectivityError`.

use crate::error::{ConnectivityError, Error};
use crate::settings::Settings;
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::Value;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Request payload.
pub enum Body {
    Empty,
    Json(Value),
    Multipart(multipart::Form),
}

/// Describes a single request before it is sent. Header names are unique;
/// setting one twice keeps the last value.
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, path: &str, accept: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        Request {
            method,
            path: path.to_string(),
            headers,
            body: Body::Empty,
        }
    }

    pub fn get(path: &str, accept: &'static str) -> Self {
        Request::new(Method::GET, path, accept)
    }

    pub fn delete(path: &str, accept: &'static str) -> Self {
        Request::new(Method::DELETE, path, accept)
    }

    pub fn post(path: &str, accept: &'static str) -> Self {
        Request::new(Method::POST, path, accept)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn multipart(mut self, form: multipart::Form) -> Self {
        self.body = Body::Multipart(form);
        self
    }
}

/// Holds the HTTP client, the base URL and the credential.
pub struct Transport {
    client: Client,
    settings: Settings,
    api_key: HeaderValue,
}

impl Transport {
    pub fn new(settings: &Settings) -> Result<Self, Error> {
        let mut api_key = HeaderValue::from_str(&settings.api_key)
            .map_err(|_| Error::Config("API key is not a valid header value".into()))?;
        api_key.set_sensitive(true);

        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Transport {
            client,
            settings: settings.clone(),
            api_key,
        })
    }

    pub fn url(&self, path: &str) -> String {
        self.settings.url(path)
    }

    /// Send the request. Any status code counts as success here.
    pub fn send(&self, request: Request) -> Result<Response, Error> {
        let url = self.url(&request.path);
        let mut headers = request.headers;
        headers.insert(HeaderName::from_static(API_KEY_HEADER), self.api_key.clone());

        let builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        let builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(form) => builder.multipart(form),
        };

        tracing::debug!(method = %request.method, %url, "sending request");
        let response = builder.send().map_err(|e| classify(&url, e))?;
        tracing::debug!(status = %response.status(), %url, "response received");
        Ok(response)
    }

    /// Read the whole body as text. A failure here means the connection
    /// broke mid-body, so it is a connectivity error too.
    pub fn text(&self, response: Response) -> Result<String, Error> {
        let url = response.url().to_string();
        response
            .text()
            .map_err(|e| ConnectivityError::new(url, e).into())
    }
}

/// Split send failures into "could not talk to the server" and "could not
/// build the request".
fn classify(url: &str, err: reqwest::Error) -> Error {
    if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        ConnectivityError::new(url, err).into()
    } else {
        Error::Request(err)
    }
}
