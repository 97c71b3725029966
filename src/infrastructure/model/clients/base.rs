//! Base HTTP client with shared logic

use crate::infrastructure::model::types::ChatBackendError;
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Base HTTP client with shared functionality
#[derive(Clone)]
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub http: Client,
}

impl HttpClientBase {
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            http: Client::new(),
        }
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Post JSON without auth (for local services like Ollama)
    pub async fn post_no_auth<Req, Res>(
        &self,
        url: &str,
        body: &Req,
    ) -> Result<Res, ChatBackendError>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.send(url, body)
            .await?
            .json()
            .await
            .map_err(|e| ChatBackendError::network(&self.id, e))
    }

    /// Post JSON and hand back the raw response for streaming consumption.
    pub async fn post_streaming<Req>(
        &self,
        url: &str,
        body: &Req,
    ) -> Result<Response, ChatBackendError>
    where
        Req: Serialize,
    {
        self.send(url, body).await
    }

    async fn send<Req: Serialize>(
        &self,
        url: &str,
        body: &Req,
    ) -> Result<Response, ChatBackendError> {
        self.http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChatBackendError::network(&self.id, e))?
            .error_for_status()
            .map_err(|e| ChatBackendError::network(&self.id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_without_double_slashes() {
        let base = HttpClientBase::new("ollama", "http://127.0.0.1:11434/");
        assert_eq!(base.build_url("/api/chat"), "http://127.0.0.1:11434/api/chat");
        assert_eq!(base.build_url("api/chat"), "http://127.0.0.1:11434/api/chat");
    }
}
