//! Requester context for handler calls.
//!
//! Session extraction happens upstream in the transport layer; handlers only
//! see the resolved identity and the plan flag that drives dispatch tiers.

use super::UserId;

/// The authenticated caller of a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// The unique user identifier from the auth provider.
    pub user_id: UserId,

    /// Whether the user is on a premium plan.
    pub premium: bool,
}

impl Requester {
    /// Creates a requester on the standard plan.
    pub fn standard(user_id: UserId) -> Self {
        Self {
            user_id,
            premium: false,
        }
    }

    /// Creates a requester on the premium plan.
    pub fn premium(user_id: UserId) -> Self {
        Self {
            user_id,
            premium: true,
        }
    }
}
