//! Profile data models: the in-progress draft and the active profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RegistrationError;

/// Stable external identity of a user, assigned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned profile identity. Sequential from 0, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub u64);

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Lifecycle status of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Still walking through the registration form.
    InProgress,
    /// Committed to the store and visible to selection.
    Active,
}

/// A profile under registration. Fields fill in one step at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub owner: UserId,
    /// Platform handle, picked up opportunistically when the session starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_handle: Option<String>,
    pub display_name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub city: Option<String>,
    pub photo: Option<String>,
    pub status: ProfileStatus,
}

impl ProfileDraft {
    pub fn new(owner: UserId, display_handle: Option<String>) -> Self {
        Self {
            owner,
            display_handle,
            display_name: None,
            gender: None,
            age: None,
            city: None,
            photo: None,
            status: ProfileStatus::InProgress,
        }
    }

    /// Turn a fully filled draft into an active profile with the given id.
    pub fn finalize(self, id: ProfileId) -> Result<Profile, RegistrationError> {
        let display_name = self
            .display_name
            .ok_or(RegistrationError::Incomplete { field: "name" })?;
        let gender = self
            .gender
            .ok_or(RegistrationError::Incomplete { field: "gender" })?;
        let age = self.age.ok_or(RegistrationError::Incomplete { field: "age" })?;
        let city = self
            .city
            .ok_or(RegistrationError::Incomplete { field: "city" })?;
        let photo = self
            .photo
            .ok_or(RegistrationError::Incomplete { field: "photo" })?;

        Ok(Profile {
            id,
            owner: self.owner,
            display_handle: self.display_handle,
            display_name,
            gender,
            age,
            city,
            photo,
            status: ProfileStatus::Active,
            registered_at: Utc::now(),
        })
    }
}

/// A completed profile. Immutable once committed to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub owner: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_handle: Option<String>,
    pub display_name: String,
    pub gender: Gender,
    pub age: u32,
    pub city: String,
    /// Opaque transport handle for the photo (e.g. a Telegram `file_id`).
    pub photo: String,
    pub status: ProfileStatus,
    pub registered_at: DateTime<Utc>,
}

impl Profile {
    /// One-line caption shown under the profile photo.
    pub fn caption(&self) -> String {
        format!("{}, {}, {}", self.display_name, self.age, self.city)
    }
}

// Identity is the store-assigned id; two profiles are the same profile iff
// the ids match.
impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Profile {}
