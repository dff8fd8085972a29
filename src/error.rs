//! Error types for the match bot.

use crate::registration::RegistrationStep;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("No channel registered under {name}")]
    UnknownChannel { name: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Channel health check failed: {name}")]
    HealthCheckFailed { name: String },
}

/// Registration flow errors.
///
/// `Validation` is recovered locally by re-prompting. The others mean an
/// event or a commit could not be handled; the event is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Invalid input for step {step}: {reason}")]
    Validation {
        step: RegistrationStep,
        reason: String,
    },

    #[error("No handler for registration step {step}")]
    UnknownStep { step: RegistrationStep },

    #[error("Profile is missing field {field}")]
    Incomplete { field: &'static str },
}

/// Profile selection errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No profiles available to select from")]
    EmptyStore,
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
