//! Match bot: conversational sign-up and profile browsing.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod profile;
pub mod registration;
