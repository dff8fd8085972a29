//! RegistrationCoordinator: routes inbound events through the registration
//! form and commits finished profiles to the store.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::channels::{IncomingMessage, OutgoingResponse, Responder};
use crate::error::RegistrationError;
use crate::profile::{ProfileId, ProfileStore};

use super::prompts;
use super::session::{RegistrationSession, SessionLookup, SessionTable};
use super::state::RegistrationStep;

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A session was created; the event was not consumed as form data.
    Started,
    /// The step accepted its input; `next` is now awaited.
    Advanced { next: RegistrationStep },
    /// The input was rejected; `step` is still awaited.
    Retry { step: RegistrationStep },
    /// The profile was committed under `profile_id` and the session removed.
    Completed { profile_id: ProfileId },
    /// The sender already owns a committed profile.
    AlreadyRegistered,
    /// The event could not be handled and was dropped.
    Dropped { reason: String },
}

/// Drives per-user registration sessions.
pub struct RegistrationCoordinator {
    sessions: SessionTable,
    store: Arc<dyn ProfileStore>,
    responder: Arc<dyn Responder>,
}

impl RegistrationCoordinator {
    pub fn new(store: Arc<dyn ProfileStore>, responder: Arc<dyn Responder>) -> Self {
        Self {
            sessions: SessionTable::new(),
            store,
            responder,
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    /// Whether the sender is partway through the form.
    pub async fn in_registration(&self, msg: &IncomingMessage) -> bool {
        self.sessions.contains(&msg.user_id).await
    }

    /// Handle one inbound event for its sender.
    ///
    /// Sends at most one response. A failed send is logged and never undoes
    /// the transition that produced it.
    pub async fn handle_event(&self, msg: &IncomingMessage) -> RegistrationOutcome {
        let (outcome, response) = self.transition(msg).await;

        if let Some(response) = response {
            if let Err(e) = self.responder.respond(msg, response).await {
                warn!(user_id = %msg.user_id, error = %e, "Failed to send registration message");
            }
        }

        outcome
    }

    /// Apply the event to the sender's session without any I/O on the transport.
    ///
    /// Only the sender's own session is locked while the store is awaited.
    async fn transition(
        &self,
        msg: &IncomingMessage,
    ) -> (RegistrationOutcome, Option<OutgoingResponse>) {
        let user_id = &msg.user_id;

        let mut session = match self.sessions.lookup(user_id).await {
            SessionLookup::Found(session) => session,
            SessionLookup::NotFound => {
                if self.store.find_by_owner(user_id).await.is_some() {
                    return (RegistrationOutcome::AlreadyRegistered, None);
                }
                if self.sessions.start(user_id, msg.user_name.clone()).await {
                    info!(user_id = %user_id, "Registration started");
                }
                return (
                    RegistrationOutcome::Started,
                    Some(prompts::prompt_for(RegistrationStep::FIRST)),
                );
            }
        };

        let step = session.step;
        match apply_step(&mut session, msg) {
            Ok(()) => {}
            Err(RegistrationError::Validation { step, reason }) => {
                debug!(user_id = %user_id, %step, %reason, "Registration input rejected");
                return (
                    RegistrationOutcome::Retry { step },
                    Some(prompts::retry_for(step)),
                );
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Dropping registration event");
                return (
                    RegistrationOutcome::Dropped {
                        reason: e.to_string(),
                    },
                    None,
                );
            }
        }

        let next = match session.advance() {
            Ok(next) => next,
            Err(e) => {
                error!(user_id = %user_id, %step, "Failed to advance registration: {}", e);
                return (RegistrationOutcome::Dropped { reason: e }, None);
            }
        };
        debug!(user_id = %user_id, from = %step, to = %next, "Registration step completed");

        if !next.is_terminal() {
            return (
                RegistrationOutcome::Advanced { next },
                Some(prompts::prompt_for(next)),
            );
        }

        // The session stays locked until it is gone from the table, so no
        // other event for this user sees it half committed.
        match self.store.add_profile(session.draft.clone()).await {
            Ok(profile) => {
                self.sessions.remove(user_id).await;
                info!(user_id = %user_id, profile_id = %profile.id, "Registration completed");
                (
                    RegistrationOutcome::Completed {
                        profile_id: profile.id,
                    },
                    Some(prompts::completed()),
                )
            }
            Err(e) => {
                // Back to the last step so the user can send the photo again.
                session.step = step;
                error!(user_id = %user_id, error = %e, "Failed to commit profile");
                (
                    RegistrationOutcome::Dropped {
                        reason: e.to_string(),
                    },
                    None,
                )
            }
        }
    }
}

/// Validate the event against the session's current step and store the value.
fn apply_step(
    session: &mut RegistrationSession,
    msg: &IncomingMessage,
) -> Result<(), RegistrationError> {
    match session.step {
        RegistrationStep::Name => {
            session.draft.display_name = Some(required_text(RegistrationStep::Name, msg)?);
        }
        RegistrationStep::Gender => {
            session.draft.gender = Some(prompts::parse_gender(msg.text()));
        }
        RegistrationStep::Age => {
            session.draft.age = Some(parse_age(msg.text())?);
        }
        RegistrationStep::City => {
            session.draft.city = Some(required_text(RegistrationStep::City, msg)?);
        }
        RegistrationStep::Photo => {
            let photo = msg
                .attachment
                .clone()
                .ok_or_else(|| RegistrationError::Validation {
                    step: RegistrationStep::Photo,
                    reason: "no attachment".into(),
                })?;
            session.draft.photo = Some(photo);
        }
        step @ RegistrationStep::Completed => {
            return Err(RegistrationError::UnknownStep { step });
        }
    }
    Ok(())
}

/// Non-blank text, kept verbatim.
fn required_text(step: RegistrationStep, msg: &IncomingMessage) -> Result<String, RegistrationError> {
    match msg.text() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(RegistrationError::Validation {
            step,
            reason: "empty text".into(),
        }),
    }
}

fn parse_age(text: Option<&str>) -> Result<u32, RegistrationError> {
    let invalid = |reason: String| RegistrationError::Validation {
        step: RegistrationStep::Age,
        reason,
    };
    let text = text.ok_or_else(|| invalid("no text".into()))?;
    let age: u32 = text
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    if age == 0 {
        return Err(invalid("age must be positive".into()));
    }
    Ok(age)
}
