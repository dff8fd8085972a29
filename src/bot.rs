//! MatchBot: routes inbound messages to registration or browsing and runs
//! the main loop.
//!
//! Each user gets a lane: an unbounded queue drained by one task, so a
//! user's messages are handled strictly in order while different users are
//! handled concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channels::{IncomingMessage, MessageStream, OutgoingResponse, Responder};
use crate::error::SelectionError;
use crate::profile::{Profile, ProfileId, ProfileSelector, ProfileStore, UserId};
use crate::registration::{RegistrationCoordinator, RegistrationOutcome, prompts};

/// What the bot did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The message went to the registration form.
    Registration(RegistrationOutcome),
    /// A profile was shown to the sender.
    Shown { profile_id: ProfileId },
    /// Nobody to show yet.
    NoProfiles,
    /// Unrecognized browsing input; the sender got a hint.
    Hint,
}

pub struct MatchBot {
    store: Arc<dyn ProfileStore>,
    registration: RegistrationCoordinator,
    selector: ProfileSelector,
    responder: Arc<dyn Responder>,
}

impl MatchBot {
    pub fn new(store: Arc<dyn ProfileStore>, responder: Arc<dyn Responder>) -> Self {
        Self {
            registration: RegistrationCoordinator::new(Arc::clone(&store), Arc::clone(&responder)),
            store,
            selector: ProfileSelector::new(),
            responder,
        }
    }

    pub fn registration(&self) -> &RegistrationCoordinator {
        &self.registration
    }

    pub fn selector(&self) -> &ProfileSelector {
        &self.selector
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Handle one message for its sender.
    pub async fn handle_message(&self, msg: &IncomingMessage) -> MessageOutcome {
        if !self.registration.in_registration(msg).await {
            if let Some(own) = self.store.find_by_owner(&msg.user_id).await {
                return self.browse(msg, own).await;
            }
        }
        MessageOutcome::Registration(self.registration.handle_event(msg).await)
    }

    async fn browse(&self, msg: &IncomingMessage, own: Profile) -> MessageOutcome {
        match msg.text().map(str::trim) {
            Some(prompts::LIKE_LABEL) => {
                self.like_current(&msg.user_id, own).await;
                self.show_next(msg).await
            }
            Some(prompts::START_LABEL | prompts::DISLIKE_LABEL | prompts::NEXT_COMMAND) => {
                self.show_next(msg).await
            }
            _ => {
                let hint = OutgoingResponse::text(prompts::BROWSE_HINT)
                    .with_keyboard(prompts::browse_keyboard());
                self.send(msg, hint).await;
                MessageOutcome::Hint
            }
        }
    }

    /// Queue the liker's own profile for whoever they were looking at, so
    /// the liked user sees them next.
    async fn like_current(&self, requester: &UserId, own: Profile) {
        let Some(liked) = self.selector.current(requester).await else {
            debug!(user_id = %requester, "Like with nothing on screen");
            return;
        };
        info!(from = %own.id, to = %liked.id, "Profile liked");
        self.selector.add_liked(&liked.owner, own).await;
    }

    async fn show_next(&self, msg: &IncomingMessage) -> MessageOutcome {
        match self
            .selector
            .next_profile(&msg.user_id, self.store.as_ref())
            .await
        {
            Ok(profile) => {
                let card = OutgoingResponse::photo(profile.photo.clone(), profile.caption())
                    .with_keyboard(prompts::browse_keyboard());
                self.send(msg, card).await;
                MessageOutcome::Shown {
                    profile_id: profile.id,
                }
            }
            Err(SelectionError::EmptyStore) => {
                self.send(msg, OutgoingResponse::text(prompts::NO_PROFILES))
                    .await;
                MessageOutcome::NoProfiles
            }
        }
    }

    async fn send(&self, msg: &IncomingMessage, response: OutgoingResponse) {
        if let Err(e) = self.responder.respond(msg, response).await {
            warn!(user_id = %msg.user_id, error = %e, "Failed to send message");
        }
    }

    /// Run the main loop until Ctrl+C or until `messages` ends, then let
    /// every lane finish what it already has.
    pub async fn run(self: Arc<Self>, mut messages: MessageStream) {
        let mut lanes: HashMap<UserId, mpsc::UnboundedSender<IncomingMessage>> = HashMap::new();
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        info!("Match bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = messages.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            self.deliver(&mut lanes, &mut workers, message);
        }

        // Closing the senders lets each lane drain and exit.
        drop(lanes);
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "User lane task failed");
            }
        }
        info!("Match bot stopped");
    }

    /// Queue `message` on its sender's lane, starting or restarting the lane
    /// as needed. Returns false if the message had to be dropped.
    fn deliver(
        self: &Arc<Self>,
        lanes: &mut HashMap<UserId, mpsc::UnboundedSender<IncomingMessage>>,
        workers: &mut Vec<JoinHandle<()>>,
        message: IncomingMessage,
    ) -> bool {
        let lane = lanes.entry(message.user_id.clone()).or_insert_with(|| {
            let (tx, handle) = self.spawn_lane(message.user_id.clone());
            workers.push(handle);
            tx
        });

        let Err(mpsc::error::SendError(message)) = lane.send(message) else {
            return true;
        };

        // The lane's task is gone; start a fresh one.
        warn!(user_id = %message.user_id, "User lane closed, restarting");
        let (tx, handle) = self.spawn_lane(message.user_id.clone());
        workers.push(handle);
        let delivered = match tx.send(message) {
            Ok(()) => true,
            Err(mpsc::error::SendError(message)) => {
                warn!(
                    user_id = %message.user_id,
                    message_id = %message.id,
                    "Restarted lane rejected message, dropping it"
                );
                false
            }
        };
        *lane = tx;
        delivered
    }

    fn spawn_lane(
        self: &Arc<Self>,
        user_id: UserId,
    ) -> (mpsc::UnboundedSender<IncomingMessage>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<IncomingMessage>();
        let bot = Arc::clone(self);
        let handle = tokio::spawn(async move {
            debug!(user_id = %user_id, "User lane started");
            while let Some(msg) = rx.recv().await {
                let outcome = bot.handle_message(&msg).await;
                debug!(user_id = %user_id, ?outcome, "Message handled");
            }
        });
        (tx, handle)
    }
}
