//! Registration: the conversational sign-up form.
//!
//! A new user is walked through name → gender → age → city → photo, one
//! message per step. The finished profile is committed to the
//! `ProfileStore` and the session is thrown away.

pub mod coordinator;
pub mod prompts;
pub mod session;
pub mod state;

pub use coordinator::{RegistrationCoordinator, RegistrationOutcome};
pub use session::{RegistrationSession, SessionGuard, SessionLookup, SessionTable};
pub use state::RegistrationStep;
