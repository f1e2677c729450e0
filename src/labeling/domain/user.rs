//! Users as resolved from the user directory.

use super::UserId;
use serde::{Deserialize, Serialize};

/// A user resolved from the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    name: String,
    is_staff: bool,
    is_active: bool,
}

impl User {
    /// Creates an active, non-staff user with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(UserId::new(), name)
    }

    /// Creates an active, non-staff user with a known identifier.
    #[must_use]
    pub fn with_id(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_staff: false,
            is_active: true,
        }
    }

    /// Marks the user as staff.
    #[must_use]
    pub const fn as_staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    /// Marks the user as deactivated.
    #[must_use]
    pub const fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the user is staff.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.is_staff
    }

    /// Returns whether the user account is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the `{id, name}` reference stored on projects.
    #[must_use]
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Denormalized `{id, name}` reference to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User identifier.
    pub id: UserId,
    /// Display name at the time of reference.
    pub name: String,
}
