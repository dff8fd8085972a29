//! User-facing text for registration and browsing.
//!
//! The state machine works with `RegistrationStep` and `Gender`; only this
//! module knows what the labels look like on screen.

use crate::channels::{Keyboard, OutgoingResponse};
use crate::profile::Gender;

use super::state::RegistrationStep;

pub const MALE_LABEL: &str = "Male🙋\u{200d}♂️";
pub const FEMALE_LABEL: &str = "Female🙋\u{200d}♀️";
pub const OTHER_LABEL: &str = "Non-Binary🏳️\u{200d}⚧️";

pub const START_LABEL: &str = "Let's go!🙀";
pub const LIKE_LABEL: &str = "❤️";
pub const DISLIKE_LABEL: &str = "👎";
pub const NEXT_COMMAND: &str = "/next";

pub const WELCOME: &str = "You're not in our database yet, let's sign you up\n\nWhat's your name? :)";
pub const COMPLETED: &str = "Done! You're in the database now and can start meeting people";
pub const NO_PROFILES: &str = "Nobody has signed up yet, check back later";
pub const BROWSE_HINT: &str = "Tap a button below to keep browsing";

/// Map a gender button label to a gender.
///
/// Only the female and non-binary labels are special; everything else,
/// including no text at all, is male.
pub fn parse_gender(text: Option<&str>) -> Gender {
    match text {
        Some(FEMALE_LABEL) => Gender::Female,
        Some(OTHER_LABEL) => Gender::Other,
        _ => Gender::Male,
    }
}

/// Prompt asking for `step`'s input.
pub fn prompt_for(step: RegistrationStep) -> OutgoingResponse {
    match step {
        RegistrationStep::Name => OutgoingResponse::text(WELCOME),
        RegistrationStep::Gender => OutgoingResponse::text("Pick your gender :)")
            .with_keyboard(Keyboard::row([MALE_LABEL, FEMALE_LABEL, OTHER_LABEL])),
        RegistrationStep::Age => {
            OutgoingResponse::text("How old are you?").with_keyboard(Keyboard::Remove)
        }
        RegistrationStep::City => OutgoingResponse::text("What city do you live in?"),
        RegistrationStep::Photo => OutgoingResponse::text("Send me your photo"),
        RegistrationStep::Completed => completed(),
    }
}

/// Re-prompt after invalid input for `step`.
pub fn retry_for(step: RegistrationStep) -> OutgoingResponse {
    match step {
        RegistrationStep::Name => OutgoingResponse::text("Please type your name"),
        RegistrationStep::Age => OutgoingResponse::text("Enter your age again"),
        RegistrationStep::City => OutgoingResponse::text("Please type your city"),
        RegistrationStep::Photo => OutgoingResponse::text("I need a photo, send one please"),
        other => prompt_for(other),
    }
}

pub fn completed() -> OutgoingResponse {
    OutgoingResponse::text(COMPLETED).with_keyboard(Keyboard::row([START_LABEL]))
}

/// Buttons shown under a profile while browsing.
pub fn browse_keyboard() -> Keyboard {
    Keyboard::row([LIKE_LABEL, DISLIKE_LABEL])
}
