// Failure log served over HTTP.
//
// Purpose
// - Fetch the build farm's "latest logs" listing for the failure tracker.
//
// Responsibilities
// - Map non-success responses to LogFetchError::Status with the response body.
// - Map everything else that goes wrong on the wire to LogFetchError::Transport.

use crate::modules::package_updates::core::ports::{FailureLogSource, LogFetchError};
use async_trait::async_trait;

pub struct HttpFailureLogSource {
    url: String,
    client: reqwest::Client,
}

impl HttpFailureLogSource {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl FailureLogSource for HttpFailureLogSource {
    async fn fetch(&self) -> Result<String, LogFetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| LogFetchError::Transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| LogFetchError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(LogFetchError::Status {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(body)
    }
}
