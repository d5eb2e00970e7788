//! User-facing models consumed from the directory and credential service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Role carried by an authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Operator with access to administrative endpoints.
    Admin,
    /// Regular account.
    #[default]
    User,
}

impl UserRole {
    /// Check if this role is an admin.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directory view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// User identifier.
    pub id: UserId,
    /// Login / display name.
    pub username: String,
    /// Whether the account is active (not disabled or deleted).
    pub is_active: bool,
    /// Durable online flag maintained by the presence tracker.
    pub is_online: bool,
    /// Last time the user was seen online.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Identity established once at connection time and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// User identifier.
    pub user_id: UserId,
    /// Username from the credential.
    pub username: String,
    /// Role from the credential.
    pub role: UserRole,
}
