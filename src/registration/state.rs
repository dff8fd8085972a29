//! Registration state machine: which form field the user owes us next.

use serde::{Deserialize, Serialize};

/// The steps of the registration form.
///
/// Progresses linearly: Name → Gender → Age → City → Photo → Completed.
/// A user with no session is simply not registering; there is no
/// `NotStarted` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Name,
    Gender,
    Age,
    City,
    Photo,
    Completed,
}

impl RegistrationStep {
    /// The step every new session starts at.
    pub const FIRST: RegistrationStep = RegistrationStep::Name;

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: RegistrationStep) -> bool {
        use RegistrationStep::*;
        matches!(
            (self, target),
            (Name, Gender) | (Gender, Age) | (Age, City) | (City, Photo) | (Photo, Completed)
        )
    }

    /// Whether the form is done.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<RegistrationStep> {
        use RegistrationStep::*;
        match self {
            Name => Some(Gender),
            Gender => Some(Age),
            Age => Some(City),
            City => Some(Photo),
            Photo => Some(Completed),
            Completed => None,
        }
    }
}

impl Default for RegistrationStep {
    fn default() -> Self {
        Self::FIRST
    }
}

impl std::fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Gender => "gender",
            Self::Age => "age",
            Self::City => "city",
            Self::Photo => "photo",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}
