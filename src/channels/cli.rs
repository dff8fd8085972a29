//! CLI channel: stdin/stdout REPL for local testing.
//!
//! Every line is a text message from `local-user`. `/photo <handle>` sends
//! an attachment instead, which is enough to finish registration locally.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, Keyboard, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

const CLI_USER: &str = "local-user";

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn one input line into a message, or `None` for a blank line.
fn parse_line(line: &str) -> Option<IncomingMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let msg = match line.strip_prefix("/photo") {
        Some(rest) => {
            let handle = rest.trim();
            let handle = if handle.is_empty() { "cli-photo" } else { handle };
            IncomingMessage::attachment_only("cli", CLI_USER, handle)
        }
        None => IncomingMessage::new("cli", CLI_USER, line),
    };
    Some(msg.with_user_name(CLI_USER))
}

/// Render a response the way it would look in a chat window.
fn render(response: &OutgoingResponse) -> String {
    let mut out = String::new();
    if let Some(ref photo) = response.photo {
        out.push_str(&format!("[photo: {photo}]\n"));
    }
    out.push_str(&response.content);
    if let Some(Keyboard::Options(ref rows)) = response.keyboard {
        for row in rows {
            out.push_str(&format!("\n  [ {} ]", row.join(" | ")));
        }
    }
    out
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(msg) = parse_line(&line) else {
                            eprint!("> ");
                            continue;
                        };
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", render(&response));
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
