use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};

use super::{parse_body, DispatchError, Outcome};
use crate::generate::IncidentRecord;

/// POSTs records as JSON to an ingestion endpoint.
///
/// Only `200 OK` counts as delivered; every other status is a failure.
pub struct HttpSink {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpSink {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let parsed = Url::parse(url).map_err(|e| DispatchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            url: parsed,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub async fn deliver(&self, record: &IncidentRecord) -> Outcome {
        match self.post(record).await {
            Ok((status, response)) => Outcome::Delivered { status, response },
            Err(e) => Outcome::Failed(e),
        }
    }

    async fn post(&self, record: &IncidentRecord) -> Result<(u16, serde_json::Value), DispatchError> {
        let body = record.to_json()?;

        let resp = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, self.timeout))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, self.timeout))?;

        if status != StatusCode::OK {
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok((status.as_u16(), parse_body(&bytes)))
    }
}
