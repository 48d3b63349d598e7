//! Record delivery: HTTP POST or direct function invocation.

pub mod http;
pub mod invoke;

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::SinkConfig;
use crate::generate::IncidentRecord;

pub use self::http::HttpSink;
pub use self::invoke::{FunctionInvoker, InvokeResponse, InvokeSink, LambdaInvoker};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("function returned an error ({kind}): {payload}")]
    FunctionError { kind: String, payload: String },
}

impl DispatchError {
    /// Map a reqwest failure onto the transport taxonomy.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            DispatchError::Timeout { timeout }
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

/// Result of delivering one record.
#[derive(Debug)]
pub enum Outcome {
    /// The sink accepted the record.
    Delivered { status: u16, response: Value },
    /// Transport failure or non-success status. The run continues.
    Failed(DispatchError),
    /// The sink has no usable client.
    Unavailable { reason: String },
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered { .. })
    }
}

/// Delivery target for generated records.
pub enum Sink {
    Http(HttpSink),
    Invoke(InvokeSink),
}

impl Sink {
    /// Build the sink described by `config`.
    ///
    /// HTTP setup errors (bad URL, client construction) are returned. An
    /// invocation client that cannot be built leaves the sink in place but
    /// unavailable, and every delivery reports [`Outcome::Unavailable`].
    pub fn from_config(config: &SinkConfig) -> Result<Self, DispatchError> {
        match config {
            SinkConfig::Http { url, timeout } => Ok(Sink::Http(HttpSink::new(url, *timeout)?)),
            SinkConfig::Invoke {
                function_name,
                endpoint,
                timeout,
            } => Ok(Sink::Invoke(InvokeSink::connect(
                function_name,
                endpoint.as_deref(),
                *timeout,
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Sink::Http(_) => "http",
            Sink::Invoke(_) => "invoke",
        }
    }

    /// URL or function name records are sent to.
    pub fn target(&self) -> &str {
        match self {
            Sink::Http(s) => s.url(),
            Sink::Invoke(s) => s.function_name(),
        }
    }

    /// Send one record and log the outcome.
    pub async fn deliver(&self, record: &IncidentRecord) -> Outcome {
        let label = record.label();
        info!(sink = self.kind(), target = %self.target(), incident = %label, "Sending incident");

        let outcome = match self {
            Sink::Http(s) => s.deliver(record).await,
            Sink::Invoke(s) => s.deliver(record).await,
        };

        match &outcome {
            Outcome::Delivered { status, response } => {
                info!(incident = %label, %status, %response, "Incident delivered");
            }
            Outcome::Failed(err) => {
                warn!(incident = %label, error = %err, "Incident delivery failed");
            }
            Outcome::Unavailable { reason } => {
                error!(incident = %label, %reason, "Sink unavailable");
            }
        }
        outcome
    }
}

/// Parse a response body as JSON, keeping it as a string if it is not.
pub(crate) fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_body_json_and_text() {
        assert_eq!(parse_body(br#"{"success":true}"#), json!({"success": true}));
        assert_eq!(parse_body(b"Internal Server Error"), json!("Internal Server Error"));
        assert_eq!(parse_body(b""), Value::Null);
    }

    #[test]
    fn test_sink_from_config_kinds() {
        let http = Sink::from_config(&SinkConfig::Http {
            url: "http://127.0.0.1:3000/alerts".into(),
            timeout: Duration::from_secs(10),
        })
        .unwrap();
        assert_eq!(http.kind(), "http");
        assert_eq!(http.target(), "http://127.0.0.1:3000/alerts");

        let invoke = Sink::from_config(&SinkConfig::Invoke {
            function_name: "alert-normalizer".into(),
            endpoint: None,
            timeout: Duration::from_secs(10),
        })
        .unwrap();
        assert_eq!(invoke.kind(), "invoke");
        assert_eq!(invoke.target(), "alert-normalizer");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = Sink::from_config(&SinkConfig::Http {
            url: "not a url".into(),
            timeout: Duration::from_secs(10),
        })
        .err()
        .unwrap();
        assert!(matches!(err, DispatchError::InvalidUrl { .. }));
    }

    #[test]
    fn test_error_messages() {
        let err = DispatchError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "endpoint returned status 500: boom");
        assert_eq!(
            DispatchError::Timeout {
                timeout: Duration::from_secs(10)
            }
            .to_string(),
            "request timed out after 10s"
        );
        assert_eq!(
            DispatchError::Timeout {
                timeout: Duration::from_millis(250)
            }
            .to_string(),
            "request timed out after 250ms"
        );
    }
}
