use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// A portal account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,

    /// Login email
    #[validate(email)]
    pub email: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Account role
    pub role: UserRole,

    /// Owning company
    pub company: Option<Uuid>,

    /// Products assigned directly to this account
    #[serde(default)]
    pub products: Vec<Uuid>,

    /// Account is allowed to sign in
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user
    pub fn new(email: String, first_name: String, last_name: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            first_name,
            last_name,
            role,
            company: None,
            products: Vec::new(),
            is_enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Check if the account has operator privileges
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Administrator)
    }

    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    Administrator,
    Manager,
    Member,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_role() {
        let user = User::new(
            "ops@example.com".to_string(),
            "Dana".to_string(),
            "Ilic".to_string(),
            UserRole::Administrator,
        );
        assert!(user.is_admin());
        assert_eq!(user.full_name(), "Dana Ilic");
    }

    #[test]
    fn test_role_round_trip() {
        let json = serde_json::to_string(&UserRole::Member).unwrap();
        assert_eq!(json, "\"member\"");
        let role: UserRole = serde_json::from_str("\"administrator\"").unwrap();
        assert_eq!(role, UserRole::Administrator);
    }
}
