//! Caller identity produced by the identity gate.

use common::UserId;
use serde::{Deserialize, Serialize};

/// Role carried in a verified credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A verified caller.
///
/// Passed explicitly through the call chain; there is no ambient
/// per-request credential state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// The authenticated user.
    pub subject: UserId,

    /// Role claimed by the credential.
    pub role: Role,
}

impl Identity {
    /// Creates an identity for a verified subject.
    pub fn new(subject: UserId, role: Role) -> Self {
        Self { subject, role }
    }
}
