//! Direct function invocation.
//!
//! Calls follow the Lambda `Invoke` REST shape
//! (`POST /2015-03-31/functions/{name}/invocations`, synchronous
//! `RequestResponse` mode), which the Lambda runtime interface emulator and
//! signing proxies accept as-is. Credentials are not handled here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::{parse_body, DispatchError, Outcome};
use crate::generate::IncidentRecord;

const INVOCATION_TYPE_HEADER: &str = "X-Amz-Invocation-Type";
const FUNCTION_ERROR_HEADER: &str = "X-Amz-Function-Error";

/// Response of a synchronous invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResponse {
    pub status: u16,
    pub payload: Value,
    /// Set when the function itself raised (the transport status is still 2xx).
    pub function_error: Option<String>,
}

/// Client able to invoke a function by name and wait for its result.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<InvokeResponse, DispatchError>;
}

/// HTTP client for the `Invoke` API.
pub struct LambdaInvoker {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl LambdaInvoker {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let endpoint = Url::parse(endpoint).map_err(|e| DispatchError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    fn invocation_url(&self, function_name: &str) -> Result<Url, DispatchError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        let raw = format!("{base}/2015-03-31/functions/{function_name}/invocations");
        Url::parse(&raw).map_err(|e| DispatchError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<InvokeResponse, DispatchError> {
        let url = self.invocation_url(function_name)?;
        debug!(%url, "invoking function");

        let resp = self
            .client
            .post(url)
            .header(INVOCATION_TYPE_HEADER, "RequestResponse")
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, self.timeout))?;

        let status = resp.status().as_u16();
        let function_error = resp
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, self.timeout))?;

        Ok(InvokeResponse {
            status,
            payload: parse_body(&bytes),
            function_error,
        })
    }
}

/// Sends records to a named function through a [`FunctionInvoker`].
pub struct InvokeSink {
    function_name: String,
    client: Option<Arc<dyn FunctionInvoker>>,
    unavailable_reason: String,
}

impl InvokeSink {
    /// Sink backed by an already-built client.
    pub fn new(function_name: impl Into<String>, client: Arc<dyn FunctionInvoker>) -> Self {
        Self {
            function_name: function_name.into(),
            client: Some(client),
            unavailable_reason: String::new(),
        }
    }

    /// Sink with no client. Every delivery reports unavailable.
    pub fn unavailable(function_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            client: None,
            unavailable_reason: reason.into(),
        }
    }

    /// Build the default client for `endpoint`, or an unavailable sink if
    /// there is no endpoint or the client cannot be built.
    pub fn connect(function_name: &str, endpoint: Option<&str>, timeout: Duration) -> Self {
        let Some(endpoint) = endpoint else {
            return Self::unavailable(
                function_name,
                "invocation client not initialized: no invoke endpoint configured (use --invoke-endpoint)",
            );
        };
        match LambdaInvoker::new(endpoint, timeout) {
            Ok(client) => Self::new(function_name, Arc::new(client)),
            Err(e) => {
                warn!(%endpoint, error = %e, "could not initialize invocation client");
                Self::unavailable(function_name, format!("invocation client not initialized: {e}"))
            }
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some()
    }

    pub async fn deliver(&self, record: &IncidentRecord) -> Outcome {
        let Some(client) = &self.client else {
            return Outcome::Unavailable {
                reason: self.unavailable_reason.clone(),
            };
        };

        let payload = match record.to_json() {
            Ok(p) => p,
            Err(e) => return Outcome::Failed(e.into()),
        };

        match client.invoke(&self.function_name, payload).await {
            Ok(resp) if !(200..300).contains(&resp.status) => Outcome::Failed(DispatchError::Status {
                status: resp.status,
                body: resp.payload.to_string(),
            }),
            Ok(InvokeResponse {
                function_error: Some(kind),
                payload,
                ..
            }) => Outcome::Failed(DispatchError::FunctionError {
                kind,
                payload: payload.to_string(),
            }),
            Ok(resp) => Outcome::Delivered {
                status: resp.status,
                response: resp.payload,
            },
            Err(e) => Outcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records calls and replays a fixed response.
    struct StubInvoker {
        response: Result<InvokeResponse, String>,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl StubInvoker {
        fn replying(response: Result<InvokeResponse, String>) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FunctionInvoker for StubInvoker {
        async fn invoke(&self, function_name: &str, payload: Vec<u8>) -> Result<InvokeResponse, DispatchError> {
            let body: Value = serde_json::from_slice(&payload).unwrap();
            self.calls.lock().unwrap().push((function_name.to_string(), body));
            self.response.clone().map_err(DispatchError::Transport)
        }
    }

    fn record() -> IncidentRecord {
        IncidentRecord::from_value(json!({
            "incidentId": "abc",
            "eventType": "ServiceDown",
            "timestamp": "2026-10-19T00:00:00.000Z",
        }))
    }

    #[tokio::test]
    async fn test_2xx_is_delivered() {
        let stub = StubInvoker::replying(Ok(InvokeResponse {
            status: 200,
            payload: json!({"statusCode": 200, "body": "{\"success\":true}"}),
            function_error: None,
        }));
        let sink = InvokeSink::new("alert-normalizer", stub.clone());

        let outcome = sink.deliver(&record()).await;
        assert!(outcome.is_delivered());

        let calls = stub.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "alert-normalizer");
        assert_eq!(calls[0].1["incidentId"], "abc");
    }

    #[tokio::test]
    async fn test_accepted_202_counts_as_success() {
        let stub = StubInvoker::replying(Ok(InvokeResponse {
            status: 202,
            payload: Value::Null,
            function_error: None,
        }));
        let sink = InvokeSink::new("fn", stub);
        assert!(sink.deliver(&record()).await.is_delivered());
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        let stub = StubInvoker::replying(Ok(InvokeResponse {
            status: 429,
            payload: json!({"message": "Rate Exceeded."}),
            function_error: None,
        }));
        let sink = InvokeSink::new("fn", stub);
        match sink.deliver(&record()).await {
            Outcome::Failed(DispatchError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert!(body.contains("Rate Exceeded"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_function_error_is_failure() {
        let stub = StubInvoker::replying(Ok(InvokeResponse {
            status: 200,
            payload: json!({"errorMessage": "boom"}),
            function_error: Some("Unhandled".into()),
        }));
        let sink = InvokeSink::new("fn", stub);
        assert!(matches!(
            sink.deliver(&record()).await,
            Outcome::Failed(DispatchError::FunctionError { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_error_is_failure() {
        let stub = StubInvoker::replying(Err("connection reset".into()));
        let sink = InvokeSink::new("fn", stub);
        assert!(matches!(
            sink.deliver(&record()).await,
            Outcome::Failed(DispatchError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_unavailable() {
        let sink = InvokeSink::connect("fn", None, Duration::from_secs(10));
        assert!(!sink.is_available());
        match sink.deliver(&record()).await {
            Outcome::Unavailable { reason } => assert!(reason.contains("not initialized")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_endpoint_is_unavailable() {
        let sink = InvokeSink::connect("fn", Some("::not-a-url::"), Duration::from_secs(10));
        assert!(!sink.is_available());
    }

    #[test]
    fn test_invocation_url() {
        let invoker = LambdaInvoker::new("http://localhost:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            invoker.invocation_url("function").unwrap().as_str(),
            "http://localhost:9000/2015-03-31/functions/function/invocations"
        );
    }
}
