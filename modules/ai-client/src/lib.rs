//! Chat-completion client for OpenAI-compatible AI gateways.
//!
//! The gateway is treated as a passthrough: callers hand over a conversation,
//! the client prepends nothing and returns the raw server-sent-event byte
//! stream so it can be relayed to a browser unchanged.

pub mod gateway;
pub mod traits;
pub mod util;

pub use gateway::{ChatGateway, ChatStream, GatewayError};
pub use traits::{Message, MessageRole};
