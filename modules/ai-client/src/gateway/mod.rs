mod client;
pub(crate) mod types;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use thiserror::Error;

use crate::traits::Message;
use client::GatewayClient;

pub const DEFAULT_GATEWAY_URL: &str = "https://openrouter.ai/api/v1";

/// Raw server-sent-event bytes as produced by the gateway.
pub type ChatStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway rate limit exceeded")]
    RateLimited,

    #[error("gateway requires payment")]
    PaymentRequired,

    #[error("gateway error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("gateway transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid gateway header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

// =============================================================================
// ChatGateway
// =============================================================================

#[derive(Clone)]
pub struct ChatGateway {
    api_key: String,
    model: String,
    base_url: String,
    app_name: Option<String>,
    http: reqwest::Client,
}

impl ChatGateway {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            app_name: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> GatewayClient {
        GatewayClient::new(self.http.clone(), &self.api_key, &self.base_url)
            .with_app_name(self.app_name.as_deref())
    }

    /// Start a streaming completion for `messages` and return the response body
    /// as a byte stream.
    pub async fn stream_chat(&self, messages: &[Message]) -> Result<ChatStream, GatewayError> {
        let request = types::ChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        let response = self.client().chat_stream(&request).await?;
        Ok(response.bytes_stream().boxed())
    }
}
