use std::sync::Arc;

use ai_client::util::truncate_to_char_boundary;
use ai_client::{GatewayError, Message, MessageRole};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::Session;
use crate::error::ApiError;
use crate::AppState;

/// Longest single message forwarded upstream, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 4000;

pub const COUNSELLOR_PROMPT: &str = "You are DekhoCampus's education counsellor for students in India. \
Help with choosing colleges, courses and entrance exams, admission processes, eligibility, fees, \
scholarships, education loans and career options. Keep answers short, practical and friendly. \
When you are not sure about a date, fee or cutoff, say so and suggest checking the official \
website. Do not answer questions unrelated to education or careers.";

#[derive(Debug, Default, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Conversation sent upstream: the counsellor prompt followed by the
/// caller's user and assistant turns. Caller-supplied system messages are
/// dropped.
pub fn build_conversation(messages: Vec<Message>) -> Result<Vec<Message>, ApiError> {
    let turns: Vec<Message> = messages
        .into_iter()
        .filter(|m| m.role != MessageRole::System)
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| Message {
            role: m.role,
            content: truncate_to_char_boundary(&m.content, MAX_MESSAGE_BYTES).to_string(),
        })
        .collect();

    if turns.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }

    let mut conversation = Vec::with_capacity(turns.len() + 1);
    conversation.push(Message::system(COUNSELLOR_PROMPT));
    conversation.extend(turns);
    Ok(conversation)
}

fn gateway_failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `POST /functions/v1/chat`
///
/// Streams the model's server-sent events back unchanged.
pub async fn api_chat(
    State(state): State<Arc<AppState>>,
    _session: Session,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return ApiError::BadRequest(rejection.body_text()).into_response(),
    };

    let conversation = match build_conversation(body.messages) {
        Ok(conversation) => conversation,
        Err(e) => return e.into_response(),
    };

    match state.gateway.stream_chat(&conversation).await {
        Ok(stream) => {
            info!(turns = conversation.len() - 1, model = state.gateway.model(), "Chat stream opened");
            (
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                Body::from_stream(stream),
            )
                .into_response()
        }
        Err(GatewayError::RateLimited) => {
            warn!("AI gateway rate limited");
            gateway_failure(
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limits exceeded, please try again later.",
            )
        }
        Err(GatewayError::PaymentRequired) => {
            warn!("AI gateway credits exhausted");
            gateway_failure(
                StatusCode::PAYMENT_REQUIRED,
                "AI credits exhausted. Please add funds to continue.",
            )
        }
        Err(e) => {
            warn!(error = %e, "AI gateway error");
            gateway_failure(StatusCode::INTERNAL_SERVER_ERROR, "AI gateway error")
        }
    }
}
