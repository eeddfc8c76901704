//! User and subscription entities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Minimal user record; authentication is an external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
        }
    }
}

/// Subscription plan tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

/// Billing subscription state, mirrored from the billing provider's
/// webhook contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub user_id: UserId,
    pub plan: Plan,
    pub active: bool,
}

impl Subscription {
    /// Whether the subscription grants unmetered estimation usage.
    pub fn is_unmetered(&self) -> bool {
        self.active && self.plan == Plan::Pro
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmetered() {
        let sub = Subscription {
            user_id: Uuid::new_v4(),
            plan: Plan::Pro,
            active: true,
        };
        assert!(sub.is_unmetered());

        let lapsed = Subscription {
            active: false,
            ..sub.clone()
        };
        assert!(!lapsed.is_unmetered());
    }
}
