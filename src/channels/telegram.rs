//! Telegram channel: long-polls the Bot API for updates.
//!
//! Text and photo messages become `IncomingMessage`s; responses go out as
//! `sendMessage` or `sendPhoto` calls with an optional reply keyboard.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{Channel, IncomingMessage, Keyboard, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Maximum caption length for Telegram's sendPhoto API.
const TELEGRAM_MAX_CAPTION_LENGTH: usize = 1024;

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Send a text message, splitting anything over Telegram's 4096 char
    /// limit. The keyboard rides on the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == last {
                if let Some(kb) = keyboard {
                    body["reply_markup"] = reply_markup(kb);
                }
            }
            self.post("sendMessage", &body).await?;
        }
        Ok(())
    }

    /// Send a photo by Telegram `file_id` (or URL) with a caption.
    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo: &str,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let caption: String = caption.chars().take(TELEGRAM_MAX_CAPTION_LENGTH).collect();
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "photo": photo,
            "caption": caption,
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = reply_markup(kb);
        }
        self.post("sendPhoto", &body).await?;
        tracing::debug!("Telegram photo sent to {chat_id}");
        Ok(())
    }

    async fn post(&self, method: &str, body: &Value) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("{method} returned {status}: {err}"),
            });
        }
        Ok(())
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        match response.photo {
            Some(ref photo) => {
                self.send_photo(chat_id, photo, &response.content, response.keyboard.as_ref())
                    .await
            }
            None => {
                self.send_message(chat_id, &response.content, response.keyboard.as_ref())
                    .await
            }
        }
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::Http(format!("getMe: {e}")))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            tracing::warn!("Telegram getMe returned {}", resp.status());
            Err(ChannelError::HealthCheckFailed {
                name: "telegram".into(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Turn one `getUpdates` entry into an `IncomingMessage`.
///
/// Returns `None` for non-message updates, messages with neither text nor
/// photo, and senders outside the allowlist.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    let message = update.get("message")?;

    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(Value::as_str);

    // Telegram sends several sizes of the same photo; take the first.
    let photo = message
        .get("photo")
        .and_then(Value::as_array)
        .and_then(|sizes| sizes.first())
        .and_then(|p| p.get("file_id"))
        .and_then(Value::as_str);

    if text.is_none() && photo.is_none() {
        return None;
    }

    let from = message.get("from");
    let username = from.and_then(|f| f.get("username")).and_then(Value::as_str);
    let user_id = from.and_then(|f| f.get("id")).and_then(Value::as_i64);
    let user_id_str = user_id.map(|id| id.to_string());

    // Check allowlist against both username and numeric ID
    let is_allowed = {
        let mut identities = Vec::new();
        identities.extend(username);
        identities.extend(user_id_str.as_deref());
        check_user_allowed(allowed_users, identities)
    };

    if !is_allowed {
        tracing::warn!(
            "Telegram: ignoring message from unauthorized user: username={}, user_id={}",
            username.unwrap_or("unknown"),
            user_id_str.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    let Some(user_id) = user_id else {
        tracing::warn!("Telegram: ignoring message without a sender id");
        return None;
    };

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    let mut incoming = IncomingMessage::new("telegram", user_id, text.unwrap_or_default());
    incoming.content = text.map(String::from);
    incoming.attachment = photo.map(String::from);
    incoming = incoming.with_metadata(serde_json::json!({
        "chat_id": chat_id,
        "username": username,
    }));
    if let Some(name) = username {
        incoming = incoming.with_user_name(name);
    }
    Some(incoming)
}

/// Bot API `reply_markup` for a keyboard hint.
fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Options(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|label| serde_json::json!({ "text": label }))
                        .collect()
                })
                .collect();
            serde_json::json!({
                "keyboard": rows,
                "resize_keyboard": true,
                "one_time_keyboard": true,
            })
        }
        Keyboard::Remove => serde_json::json!({ "remove_keyboard": true }),
    }
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        // Never cut inside a UTF-8 sequence.
        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
