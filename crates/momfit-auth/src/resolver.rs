use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use momfit_core::Clock;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::permissions::{OWNER_ROLE, any_grant_matches};
use crate::store::RoleStore;
use crate::types::*;

/// Answers "may this user do that here?" on top of a [`RoleStore`].
///
/// Keeps two read-through caches: role definitions by id and each user's
/// assignment list by user id. Writes made through the resolver invalidate
/// the affected entries; writes made by other processes are only seen after
/// the next cold read or [`RoleResolver::clear_cache`].
///
/// Construct once and share it (`Arc<RoleResolver>`) with everything that
/// needs permission checks.
pub struct RoleResolver {
    store: Arc<dyn RoleStore>,
    clock: Arc<dyn Clock>,
    roles: DashMap<String, Role>,
    user_roles: DashMap<String, Vec<UserRoleAssignment>>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn RoleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            roles: DashMap::new(),
            user_roles: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    /// Bind `role_id` to `user_id`, globally when `community_id` is `None`.
    ///
    /// The role's existence and the assigner's authority are not checked
    /// here; that policy belongs to the caller or the store.
    pub async fn assign_role(
        &self,
        user_id: &str,
        role_id: &str,
        community_id: Option<&str>,
        assigned_by: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String, AuthError> {
        let assignment = NewAssignment {
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
            community_id: community_id.map(str::to_string),
            assigned_by: assigned_by.map(str::to_string),
            assigned_at: self.clock.now(),
            expires_at,
        };
        let id = self.store.insert_assignment(&assignment).await?;
        self.user_roles.remove(user_id);

        info!(
            user_id,
            role_id,
            community_id = community_id.unwrap_or("global"),
            "assigned role"
        );
        Ok(id)
    }

    /// Remove one of the user's assignments.
    pub async fn revoke_assignment(
        &self,
        user_id: &str,
        assignment_id: &str,
    ) -> Result<(), AuthError> {
        self.store.delete_assignment(user_id, assignment_id).await?;
        self.user_roles.remove(user_id);
        info!(user_id, assignment_id, "revoked role assignment");
        Ok(())
    }

    /// All of the user's assignments joined with their roles, expired ones
    /// included. Served from cache when present.
    pub async fn get_user_roles(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserRoleAssignment>, AuthError> {
        let cached = self.user_roles.get(user_id).map(|entry| entry.value().clone());
        if let Some(assignments) = cached {
            debug!(user_id, "user roles cache hit");
            return Ok(assignments);
        }

        let assignments = self.store.list_user_assignments(user_id).await?;
        for assignment in &assignments {
            self.roles
                .insert(assignment.role.id.clone(), assignment.role.clone());
        }
        self.user_roles
            .insert(user_id.to_string(), assignments.clone());
        debug!(user_id, count = assignments.len(), "loaded user roles");
        Ok(assignments)
    }

    /// Whether `user_id` holds `permission`, optionally inside `community_id`.
    ///
    /// Global assignments are checked first, with the `Owner` role as a total
    /// bypass. Community assignments are consulted only when a community is
    /// given, and only those scoped to exactly that community. Expired
    /// assignments never count. Errors mean "could not determine", never
    /// "denied".
    pub async fn has_permission(
        &self,
        user_id: &str,
        permission: &Permission,
        community_id: Option<&str>,
    ) -> Result<bool, AuthError> {
        let assignments = self.get_user_roles(user_id).await?;
        let now = self.clock.now();

        let global: Vec<&UserRoleAssignment> = assignments
            .iter()
            .filter(|a| a.is_global() && a.is_active_at(now))
            .collect();

        if global.iter().any(|a| a.role.name == OWNER_ROLE) {
            debug!(user_id, %permission, "owner bypass");
            return Ok(true);
        }
        if global
            .iter()
            .any(|a| any_grant_matches(&a.role.permissions, permission))
        {
            return Ok(true);
        }

        let Some(community_id) = community_id else {
            return Ok(false);
        };

        let allowed = assignments
            .iter()
            .filter(|a| a.applies_to(community_id) && a.is_active_at(now))
            .any(|a| any_grant_matches(&a.role.permissions, permission));

        debug!(user_id, %permission, community_id, allowed, "community permission check");
        Ok(allowed)
    }

    /// Like [`has_permission`](Self::has_permission) but turns a denial into
    /// [`AuthError::PermissionDenied`].
    pub async fn require_permission(
        &self,
        user_id: &str,
        permission: &Permission,
        community_id: Option<&str>,
    ) -> Result<(), AuthError> {
        if !self.has_permission(user_id, permission, community_id).await? {
            warn!(
                user_id,
                %permission,
                community_id = community_id.unwrap_or("global"),
                "permission denied"
            );
            return Err(AuthError::PermissionDenied);
        }
        Ok(())
    }

    /// Grants that `has_permission` would consult for this context,
    /// de-duplicated and sorted.
    pub async fn effective_permissions(
        &self,
        user_id: &str,
        community_id: Option<&str>,
    ) -> Result<Vec<Permission>, AuthError> {
        let assignments = self.get_user_roles(user_id).await?;
        let now = self.clock.now();

        let grants: BTreeSet<Permission> = assignments
            .iter()
            .filter(|a| a.is_active_at(now))
            .filter(|a| match (&a.community_id, community_id) {
                (None, _) => true,
                (Some(scoped), Some(wanted)) => scoped == wanted,
                (Some(_), None) => false,
            })
            .flat_map(|a| a.role.permissions.iter().cloned())
            .collect();

        Ok(grants.into_iter().collect())
    }

    // --- Roles ---

    pub async fn get_role(&self, role_id: &str) -> Result<Role, AuthError> {
        let cached = self.roles.get(role_id).map(|entry| entry.value().clone());
        if let Some(role) = cached {
            return Ok(role);
        }
        let role = self.store.get_role(role_id).await?;
        self.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AuthError> {
        self.store.list_roles().await
    }

    pub async fn create_role(&self, req: &CreateRoleRequest) -> Result<Role, AuthError> {
        let role = self.store.create_role(req).await?;
        self.roles.insert(role.id.clone(), role.clone());
        info!(role = %role.name, "created role");
        Ok(role)
    }

    /// Update a role definition. Cached assignment lists embed role data, so
    /// all of them are dropped along with the role entry.
    pub async fn update_role(
        &self,
        role_id: &str,
        req: &UpdateRoleRequest,
    ) -> Result<Role, AuthError> {
        let role = self.store.update_role(role_id, req).await?;
        self.roles.remove(role_id);
        self.user_roles.clear();
        info!(role = %role.name, "updated role");
        Ok(role)
    }

    /// Drop both caches.
    pub fn clear_cache(&self) {
        self.roles.clear();
        self.user_roles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MockRoleStore, SqliteRoleStore};
    use chrono::{Duration, TimeZone};
    use momfit_core::FixedClock;

    const NOW: &str = "2026-05-01T12:00:00Z";

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at(NOW).unwrap())
    }

    async fn seeded() -> (RoleResolver, Arc<SqliteRoleStore>) {
        let store = Arc::new(SqliteRoleStore::open_in_memory().unwrap());
        store.migrate().await.unwrap();
        store.seed_defaults().await.unwrap();
        let resolver = RoleResolver::new(store.clone(), clock());
        (resolver, store)
    }

    async fn role_id(store: &SqliteRoleStore, name: &str) -> String {
        store.get_role_by_name(name).await.unwrap().id
    }

    fn role(name: &str, grants: Vec<Permission>) -> Role {
        Role {
            id: format!("role-{name}"),
            name: name.into(),
            access_level: AccessLevel::Member,
            description: String::new(),
            permissions: grants,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn assignment(role: Role, community: Option<&str>) -> UserRoleAssignment {
        UserRoleAssignment {
            id: format!("a-{}", role.name),
            user_id: "u1".into(),
            role,
            community_id: community.map(str::to_string),
            assigned_by: None,
            assigned_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn owner_bypasses_everything() {
        let (resolver, store) = seeded().await;
        let owner = role_id(&store, "Owner").await;
        resolver.assign_role("u1", &owner, None, None, None).await.unwrap();

        for perm in [
            Permission::new("global", "delete", "communities"),
            Permission::new("community", "manage", "events"),
            Permission::new("profile", "write", "anything"),
        ] {
            assert!(resolver.has_permission("u1", &perm, None).await.unwrap());
            assert!(resolver.has_permission("u1", &perm, Some("c9")).await.unwrap());
        }
    }

    #[tokio::test]
    async fn community_owner_assignment_is_not_a_bypass() {
        let (resolver, store) = seeded().await;
        let owner = role_id(&store, "Owner").await;
        resolver
            .assign_role("u1", &owner, Some("c1"), None, None)
            .await
            .unwrap();

        // Owner grant is global/manage/*, so it still matches inside c1...
        let perm = Permission::new("community", "write", "events");
        assert!(resolver.has_permission("u1", &perm, Some("c1")).await.unwrap());
        // ...but never without the community context.
        assert!(!resolver.has_permission("u1", &perm, None).await.unwrap());
    }

    #[tokio::test]
    async fn community_grants_ignored_without_community() {
        let (resolver, store) = seeded().await;
        let admin = role_id(&store, "Admin").await;
        resolver
            .assign_role("u1", &admin, Some("c1"), None, None)
            .await
            .unwrap();

        let perm = Permission::new("community", "manage", "events");
        assert!(!resolver.has_permission("u1", &perm, None).await.unwrap());
        assert!(resolver.has_permission("u1", &perm, Some("c1")).await.unwrap());
        assert!(!resolver.has_permission("u1", &perm, Some("c2")).await.unwrap());
    }

    #[tokio::test]
    async fn expired_assignments_are_inert() {
        let (resolver, store) = seeded().await;
        let admin = role_id(&store, "Admin").await;
        let now = FixedClock::at(NOW).unwrap().now();
        let perm = Permission::new("community", "manage", "events");

        resolver
            .assign_role("u1", &admin, Some("c1"), None, Some(now - Duration::hours(1)))
            .await
            .unwrap();
        assert!(!resolver.has_permission("u1", &perm, Some("c1")).await.unwrap());

        resolver
            .assign_role("u1", &admin, Some("c1"), None, Some(now + Duration::hours(1)))
            .await
            .unwrap();
        assert!(resolver.has_permission("u1", &perm, Some("c1")).await.unwrap());
    }

    #[tokio::test]
    async fn expired_owner_is_not_a_bypass() {
        let (resolver, store) = seeded().await;
        let owner = role_id(&store, "Owner").await;
        let now = FixedClock::at(NOW).unwrap().now();
        resolver
            .assign_role("u1", &owner, None, None, Some(now - Duration::days(1)))
            .await
            .unwrap();

        let perm = Permission::new("community", "read", "events");
        assert!(!resolver.has_permission("u1", &perm, Some("c1")).await.unwrap());
    }

    #[tokio::test]
    async fn global_and_community_grants_union() {
        let (resolver, store) = seeded().await;
        let guest = role_id(&store, "Guest").await;
        let member = role_id(&store, "Member").await;
        resolver.assign_role("u1", &guest, None, None, None).await.unwrap();
        resolver
            .assign_role("u1", &member, Some("c1"), None, None)
            .await
            .unwrap();

        let read_events = Permission::new("community", "read", "events");
        let write_rsvps = Permission::new("community", "write", "rsvps");
        assert!(resolver.has_permission("u1", &read_events, None).await.unwrap());
        assert!(!resolver.has_permission("u1", &write_rsvps, None).await.unwrap());
        assert!(resolver.has_permission("u1", &write_rsvps, Some("c1")).await.unwrap());

        let effective = resolver.effective_permissions("u1", Some("c1")).await.unwrap();
        assert!(effective.contains(&write_rsvps));
        assert!(effective.contains(&read_events));
        let global_only = resolver.effective_permissions("u1", None).await.unwrap();
        assert!(!global_only.contains(&write_rsvps));
    }

    #[tokio::test]
    async fn user_without_assignments_is_denied() {
        let (resolver, _store) = seeded().await;
        let perm = Permission::new("community", "read", "events");
        assert!(!resolver.has_permission("nobody", &perm, Some("c1")).await.unwrap());
        let err = resolver
            .require_permission("nobody", &perm, Some("c1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PermissionDenied));
    }

    #[tokio::test]
    async fn get_user_roles_hits_cache_on_second_call() {
        let mut store = MockRoleStore::new();
        let member = role("Member", vec![Permission::new("community", "read", "*")]);
        let rows = vec![assignment(member, Some("c1"))];
        store
            .expect_list_user_assignments()
            .times(1)
            .returning(move |_| Ok(rows.clone()));

        let resolver = RoleResolver::new(Arc::new(store), clock());
        let first = resolver.get_user_roles("u1").await.unwrap();
        let second = resolver.get_user_roles("u1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn assign_and_clear_invalidate_cache() {
        let mut store = MockRoleStore::new();
        store
            .expect_list_user_assignments()
            .times(3)
            .returning(|_| Ok(vec![]));
        store
            .expect_insert_assignment()
            .times(1)
            .returning(|_| Ok("a-new".into()));

        let resolver = RoleResolver::new(Arc::new(store), clock());
        resolver.get_user_roles("u1").await.unwrap();
        resolver.get_user_roles("u1").await.unwrap();
        resolver.assign_role("u1", "r1", None, None, None).await.unwrap();
        resolver.get_user_roles("u1").await.unwrap();
        resolver.clear_cache();
        resolver.get_user_roles("u1").await.unwrap();
    }

    #[tokio::test]
    async fn store_failure_is_an_error_not_a_denial() {
        let mut store = MockRoleStore::new();
        store
            .expect_list_user_assignments()
            .returning(|_| Err(AuthError::Database("database is locked".into())));

        let resolver = RoleResolver::new(Arc::new(store), clock());
        let perm = Permission::new("community", "read", "events");
        let err = resolver
            .has_permission("u1", &perm, Some("c1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Database(_)));
    }

    #[tokio::test]
    async fn failed_assignment_leaves_cache_intact() {
        let mut store = MockRoleStore::new();
        store
            .expect_list_user_assignments()
            .times(1)
            .returning(|_| Ok(vec![]));
        store
            .expect_insert_assignment()
            .returning(|_| Err(AuthError::Database("disk full".into())));

        let resolver = RoleResolver::new(Arc::new(store), clock());
        resolver.get_user_roles("u1").await.unwrap();
        let err = resolver
            .assign_role("u1", "r1", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Database(_)));
        resolver.get_user_roles("u1").await.unwrap();
    }

    #[tokio::test]
    async fn update_role_refreshes_joined_grants() {
        let (resolver, store) = seeded().await;
        let guest = role_id(&store, "Guest").await;
        resolver
            .assign_role("u1", &guest, Some("c1"), None, None)
            .await
            .unwrap();

        let write_events = Permission::new("community", "write", "events");
        assert!(!resolver.has_permission("u1", &write_events, Some("c1")).await.unwrap());

        resolver
            .update_role(
                &guest,
                &UpdateRoleRequest {
                    permissions: Some(vec![write_events.clone()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(resolver.has_permission("u1", &write_events, Some("c1")).await.unwrap());
        assert_eq!(
            resolver.get_role(&guest).await.unwrap().permissions,
            vec![write_events]
        );
    }

    #[tokio::test]
    async fn revoke_removes_access() {
        let (resolver, store) = seeded().await;
        let admin = role_id(&store, "Admin").await;
        let id = resolver
            .assign_role("u1", &admin, Some("c1"), Some("owner-1"), None)
            .await
            .unwrap();
        let perm = Permission::new("community", "manage", "events");
        assert!(resolver.has_permission("u1", &perm, Some("c1")).await.unwrap());

        resolver.revoke_assignment("u1", &id).await.unwrap();
        assert!(!resolver.has_permission("u1", &perm, Some("c1")).await.unwrap());
    }
}
