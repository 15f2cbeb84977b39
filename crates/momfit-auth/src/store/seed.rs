use tracing::{debug, info};

use crate::error::AuthError;
use crate::permissions::DEFAULT_ROLES;
use crate::store::RoleStore;
use crate::types::{CreateRoleRequest, Permission};

/// Create the default roles that do not exist yet. Existing roles are left
/// untouched, so running this twice is harmless.
pub async fn seed_defaults(store: &dyn RoleStore) -> Result<(), AuthError> {
    let mut created = 0;

    for (name, access_level, description, grants) in DEFAULT_ROLES {
        match store.get_role_by_name(name).await {
            Ok(_) => {
                debug!(role = %name, "default role already present");
                continue;
            }
            Err(AuthError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let req = CreateRoleRequest {
            name: name.to_string(),
            access_level: *access_level,
            description: description.to_string(),
            permissions: grants
                .iter()
                .map(|(scope, action, resource)| Permission::new(scope, action, resource))
                .collect(),
        };
        store.create_role(&req).await?;
        created += 1;
    }

    info!(created, "seeded default roles");
    Ok(())
}
