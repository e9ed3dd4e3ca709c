use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{
    api::types::{Ack, ApiError},
    config::RuntimeConfig,
    error::ClientError,
    state::auth::Credential,
};

/// HTTP access to the messaging service. Cloning is cheap; the underlying connection pool
/// is shared.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credential: Option<Credential>,
}

impl ApiClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            credential: None,
        })
    }

    pub fn new_with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: None,
        }
    }

    /// A client that sends `credential` as a bearer token on every request.
    pub fn with_credential(&self, credential: Option<Credential>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            credential,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    fn get_auth_headers(&self) -> Result<header::HeaderMap, ClientError> {
        let mut headers = header::HeaderMap::new();
        if let Some(credential) = &self.credential {
            let value = header::HeaderValue::from_str(&credential.bearer())
                .map_err(|_| ClientError::Authentication("Invalid token format".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Attach credentials and send. Only transport failures surface here; status codes are
    /// handled by the `map_*` helpers.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let headers = self.get_auth_headers()?;
        let response = request.headers(headers).send().await?;
        tracing::trace!(status = %response.status(), url = %response.url(), "response received");
        Ok(response)
    }

    pub(crate) async fn map_json_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ClientError::transport(format!("Failed to parse response: {}", e)))
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Like `map_json_response` but tolerates empty or non-JSON success bodies.
    pub(crate) async fn map_ack_response(&self, response: Response) -> Result<Ack, ClientError> {
        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Ack::default());
        }
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }

    pub(crate) async fn map_empty_response(&self, response: Response) -> Result<(), ClientError> {
        self.map_ack_response(response).await.map(|_| ())
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let payload = response.json::<ApiError>().await.ok();
    let err = ClientError::from_response(status, payload);
    tracing::debug!(status = status.as_u16(), error = %err, "service rejected request");
    err
}
