//! Channel trait and the message shapes every transport speaks.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChannelError;
use crate::profile::UserId;

/// An inbound event from any channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel that produced this message.
    pub channel: String,
    /// Stable external id of the sender.
    pub user_id: UserId,
    /// Display handle (e.g. Telegram username), when the transport has one.
    pub user_name: Option<String>,
    pub content: Option<String>,
    /// First media attachment, as an opaque transport handle.
    pub attachment: Option<String>,
    pub received_at: DateTime<Utc>,
    /// Channel-specific routing data (e.g. Telegram `chat_id`).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: impl Into<UserId>, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.into(),
            user_name: None,
            content: Some(content.to_string()),
            attachment: None,
            received_at: Utc::now(),
            metadata: serde_json::json!({}),
        }
    }

    /// A message carrying only an attachment.
    pub fn attachment_only(channel: &str, user_id: impl Into<UserId>, attachment: &str) -> Self {
        Self {
            content: None,
            attachment: Some(attachment.to_string()),
            ..Self::new(channel, user_id, "")
        }
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    pub fn with_attachment(mut self, attachment: &str) -> Self {
        self.attachment = Some(attachment.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// UI hint attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keyboard {
    /// Selectable option labels, grouped in rows.
    Options(Vec<Vec<String>>),
    /// Remove any keyboard currently shown.
    Remove,
}

impl Keyboard {
    /// A single row of options.
    pub fn row<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Options(vec![labels.into_iter().map(Into::into).collect()])
    }
}

/// A response sent back to the user who sent an `IncomingMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    /// Message text, or the caption when `photo` is set.
    pub content: String,
    pub keyboard: Option<Keyboard>,
    /// Opaque photo handle to send instead of a plain text message.
    pub photo: Option<String>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            keyboard: None,
            photo: None,
        }
    }

    pub fn photo(photo: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            content: caption.into(),
            keyboard: None,
            photo: Some(photo.into()),
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Stream of inbound messages from a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// Sends responses back to message senders.
///
/// The registration and browsing flows depend only on this, never on a
/// concrete transport.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;
}

/// A transport the bot can listen on and reply through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start listening and return the stream of inbound messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
