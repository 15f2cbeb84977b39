pub mod seed;
pub mod sqlite;

pub use sqlite::SqliteRoleStore;

use async_trait::async_trait;

use crate::error::AuthError;
use crate::types::*;

/// Persistence for roles and user-role assignments. The source of truth for
/// access control; the resolver caches on top of it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    // Roles
    async fn create_role(&self, req: &CreateRoleRequest) -> Result<Role, AuthError>;
    async fn get_role(&self, id: &str) -> Result<Role, AuthError>;
    async fn get_role_by_name(&self, name: &str) -> Result<Role, AuthError>;
    async fn list_roles(&self) -> Result<Vec<Role>, AuthError>;
    async fn update_role(&self, id: &str, req: &UpdateRoleRequest) -> Result<Role, AuthError>;

    // Assignments
    async fn insert_assignment(&self, assignment: &NewAssignment) -> Result<String, AuthError>;
    /// Delete one of `user_id`'s assignments. `NotFound` if the user holds no
    /// assignment with that id.
    async fn delete_assignment(&self, user_id: &str, assignment_id: &str)
    -> Result<(), AuthError>;
    /// Every assignment of `user_id`, expired or not, joined with its role.
    async fn list_user_assignments(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserRoleAssignment>, AuthError>;

    // Lifecycle
    async fn migrate(&self) -> Result<(), AuthError>;
    async fn seed_defaults(&self) -> Result<(), AuthError>;
}
