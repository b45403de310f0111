//! User entity model.

use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityMeta;

use super::role::UserRole;
use crate::tables;
use crate::validation::{optional_text, required_text};

/// A person who reports, handles, or audits incidents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Unique login name.
    pub username: String,
    /// Name shown on dashboards.
    pub display_name: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Workflow role.
    pub role: UserRole,
    /// Whether the account may still be assigned work.
    pub is_active: bool,
}

impl_entity!(User, tables::USERS);

impl User {
    /// Create a new active user.
    pub fn new(
        username: &str,
        display_name: &str,
        email: Option<&str>,
        role: UserRole,
    ) -> AppResult<Self> {
        Ok(Self {
            meta: EntityMeta::new(),
            username: required_text("username", username)?,
            display_name: required_text("display_name", display_name)?,
            email: optional_text(email),
            role,
            is_active: true,
        })
    }

    /// Change the display name.
    pub fn rename(&mut self, display_name: &str) -> AppResult<()> {
        self.display_name = required_text("display_name", display_name)?;
        self.meta.touch();
        Ok(())
    }

    /// Change the role.
    pub fn change_role(&mut self, role: UserRole) {
        self.role = role;
        self.meta.touch();
    }

    /// Deactivate the account.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.meta.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_is_active_and_transient() {
        let user = User::new(" kato ", "Kato Ren", Some(""), UserRole::Reporter).expect("valid");
        assert_eq!(user.username, "kato");
        assert!(user.email.is_none());
        assert!(user.is_active);
        assert!(user.meta.is_transient());
    }

    #[test]
    fn test_blank_username_is_rejected() {
        assert!(User::new("", "Someone", None, UserRole::Admin).is_err());
    }
}
