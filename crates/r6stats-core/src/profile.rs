use serde::{Deserialize, Serialize};

/// One observed account.
///
/// `name` is the display name the roster is configured with; `profile_id` is
/// the opaque identifier every downstream stats call is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub profile_id: String,
}

impl Profile {
    #[must_use]
    pub fn new(name: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            profile_id: profile_id.into(),
        }
    }
}
