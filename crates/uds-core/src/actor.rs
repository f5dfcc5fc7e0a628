//! # Roles and Actors
//!
//! The role vocabulary used by approval-stage gating and recipient
//! resolution, and the [`Actor`] record attached to every workflow mutation.

use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// A user role within a tenant.
///
/// Stage gating matches an actor's role against the stage's allowed-role
/// set; recipient resolution uses roles to find who to notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// An employee of a customer company; raises requisitions.
    Employee,
    /// A site administrator; first-stage approver where enabled.
    SiteAdmin,
    /// A company administrator; final approver and PO authority.
    CompanyAdmin,
    /// A vendor user; fulfills and ships.
    Vendor,
    /// The platform operator; may act at any approval stage.
    SuperAdmin,
}

impl UserRole {
    /// Return the wire string for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::SiteAdmin => "site_admin",
            Self::CompanyAdmin => "company_admin",
            Self::Vendor => "vendor",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user performing a workflow action.
///
/// Carried on every transition so rejection records and emitted events can
/// attribute the action without a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// The acting user's identifier.
    pub user_id: UserId,
    /// The acting user's display name.
    pub user_name: String,
    /// The acting user's role at the time of the action.
    pub user_role: UserRole,
    /// The acting user's email, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

impl Actor {
    /// Construct an actor without an email address.
    pub fn new(user_id: UserId, user_name: impl Into<String>, user_role: UserRole) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            user_role,
            user_email: None,
        }
    }

    /// Builder: attach an email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_strings() {
        assert_eq!(UserRole::SiteAdmin.as_str(), "site_admin");
        assert_eq!(UserRole::CompanyAdmin.to_string(), "company_admin");
        assert_eq!(
            serde_json::to_string(&UserRole::SuperAdmin).unwrap(),
            "\"super_admin\""
        );
    }

    #[test]
    fn actor_serializes_camel_case() {
        let actor = Actor::new(UserId::new("u-9"), "Dana", UserRole::Employee)
            .with_email("dana@example.com");
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["userId"], "u-9");
        assert_eq!(json["userRole"], "employee");
        assert_eq!(json["userEmail"], "dana@example.com");
    }

    #[test]
    fn actor_email_omitted_when_absent() {
        let actor = Actor::new(UserId::new("u-9"), "Dana", UserRole::Employee);
        let json = serde_json::to_value(&actor).unwrap();
        assert!(json.get("userEmail").is_none());
    }
}
