//! Error taxonomy shared by the client, the retry policy and the dashboard
//!
//! - `Auth` is fatal at startup and recoverable mid-run through one re-login
//! - `Api` carries the HTTP status, the endpoint and the response body
//! - `Transport` covers timeouts, refused connections, DNS and TLS failures

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("API error: {status} {body} (endpoint: {endpoint})")]
    Api {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("failed to parse JSON response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("not authenticated - please login first")]
    NotAuthenticated,

    #[error("failed to re-authenticate: {0}")]
    Reauth(#[source] Box<MonitorError>),

    #[error("failed after re-authentication: {0}")]
    AfterReauth(#[source] Box<MonitorError>),

    #[error("failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<MonitorError>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl MonitorError {
    /// Wrap a reqwest failure, keeping the whole source chain in the message.
    pub fn transport(endpoint: &str, err: reqwest::Error) -> Self {
        MonitorError::Transport {
            endpoint: endpoint.to_string(),
            message: error_chain(&err),
        }
    }

    /// Status code when this is a bare API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            MonitorError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Client-class API errors other than 401 point at configuration problems;
    /// everything else is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self.status() {
            Some(status) => !((400..500).contains(&status) && status != 401),
            None => true,
        }
    }
}

/// Render an error and all of its sources as `outer: inner: root`.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

pub type Result<T> = std::result::Result<T, MonitorError>;
