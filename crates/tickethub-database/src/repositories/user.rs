//! User queries.

use tickethub_core::result::AppResult;
use tickethub_core::traits::Repository;
use tickethub_core::types::filter::Filter;
use tickethub_entity::{User, UserRole};

use crate::repository::EntityRepository;

/// Repository for users.
pub type UserRepository = EntityRepository<User>;

impl EntityRepository<User> {
    /// Find a user by username, ignoring case.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let wanted = username.trim().to_lowercase();
        self.first_or_default(&Filter::matching(move |u: &User| {
            u.username.to_lowercase() == wanted
        }))
        .await
    }

    /// Active users holding a role.
    pub async fn find_active_by_role(&self, role: UserRole) -> AppResult<Vec<User>> {
        let filter = Filter::new()
            .eq(Some(role), |u: &User| u.role)
            .and(|u: &User| u.is_active);
        self.find(&filter).await
    }
}
