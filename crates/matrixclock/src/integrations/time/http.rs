use std::time::Duration;

use async_trait::async_trait;

use super::NetworkTime;
use super::TimeError;

/// Fetches the local time as plain text from an HTTP endpoint.
pub struct HttpTimeSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTimeSource {
    pub fn new(url: impl Into<String>) -> Result<Self, TimeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TimeError::Fetch(Box::new(e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait(?Send)]
impl NetworkTime for HttpTimeSource {
    async fn local_time(&self) -> Result<String, TimeError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| TimeError::Fetch(Box::new(e)))?;

        response
            .text()
            .await
            .map_err(|e| TimeError::Fetch(Box::new(e)))
    }
}
