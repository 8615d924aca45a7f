// Error translator: turns a connectivity failure into a terminal,
// user-facing outcome. Every client operation passes its result through
// `ErrorTranslator::intercept`, so the handler fires once per failed call.

use crate::error::{ConnectivityError, Error};
use std::sync::Arc;

/// Receives connectivity failures before they are returned to the caller.
///
/// The default handler never returns (it exits the process). Handlers that
/// do return let the operation finish with `Err(Error::Connectivity)`.
pub trait ConnectionErrorHandler: Send + Sync {
    fn handle(&self, err: &ConnectivityError);
}

/// Prints a diagnostic to stderr and exits with status 1.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExitOnConnectionError;

impl ConnectionErrorHandler for ExitOnConnectionError {
    fn handle(&self, err: &ConnectivityError) {
        tracing::error!(url = err.url(), error = ?err, "connection failed");
        eprintln!("{}", diagnostic(err));
        std::process::exit(1);
    }
}

/// Message shown to the user when the API cannot be reached.
pub fn diagnostic(err: &ConnectivityError) -> String {
    let mut msg = format!("Connection error: {err}.");
    if let Some(cause) = std::error::Error::source(err) {
        msg.push_str(&format!(" Cause: {cause}."));
    }
    msg.push_str(" Check that the server is running and DECIPHON_API_URL is correct.");
    msg
}

#[derive(Clone)]
pub struct ErrorTranslator {
    handler: Arc<dyn ConnectionErrorHandler>,
}

impl ErrorTranslator {
    pub fn new(handler: Arc<dyn ConnectionErrorHandler>) -> Self {
        ErrorTranslator { handler }
    }

    /// Hand connectivity failures to the handler; pass everything else
    /// through untouched.
    pub fn intercept<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(Error::Connectivity(err)) = &result {
            self.handler.handle(err);
        }
        result
    }
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        ErrorTranslator::new(Arc::new(ExitOnConnectionError))
    }
}
