use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::debug;

use super::types::ChatRequest;
use super::GatewayError;

pub(crate) struct GatewayClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    app_name: Option<String>,
}

impl GatewayClient {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_name: None,
        }
    }

    pub fn with_app_name(mut self, name: Option<&str>) -> Self {
        self.app_name = name.map(str::to_string);
        self
    }

    fn headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        if let Some(ref name) = self.app_name {
            if let Ok(val) = HeaderValue::from_str(name) {
                headers.insert("X-Title", val);
            }
        }

        Ok(headers)
    }

    /// Send a streaming chat request. Non-success statuses are mapped to
    /// [`GatewayError`] before any body bytes are handed back.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, messages = request.messages.len(), "Gateway chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited),
            StatusCode::PAYMENT_REQUIRED => Err(GatewayError::PaymentRequired),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(GatewayError::Upstream {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
