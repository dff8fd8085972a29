//! Profiles: the data model, the store, and the selection policy.

pub mod model;
pub mod selector;
pub mod store;

pub use model::{Gender, Profile, ProfileDraft, ProfileId, ProfileStatus, UserId};
pub use selector::{ProfileSelector, SelectionState, add_liked, get_next_profile};
pub use store::{InMemoryProfileStore, ProfileStore};
