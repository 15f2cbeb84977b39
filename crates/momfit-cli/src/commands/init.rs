use anyhow::Result;
use std::path::Path;

use momfit_auth::permissions::OWNER_ROLE;
use momfit_auth::RoleStore;
use momfit_core::config::MomfitConfig;

use super::context::App;

pub async fn run(base_dir: &Path, owner: Option<&str>) -> Result<()> {
    println!("Initializing MomFit in {}", base_dir.display());

    std::fs::create_dir_all(base_dir)?;

    let config_path = MomfitConfig::default_path(base_dir);
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let config = MomfitConfig::default_config(base_dir);
        config.save(&config_path)?;
        println!("Created config: {}", config_path.display());
    }

    let app = App::open(base_dir).await?;
    app.roles.seed_defaults().await?;
    println!("Initialized database: {}", app.config.momfit.db_path);

    let roles = app.resolver.list_roles().await?;
    println!("Roles: {}", roles.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", "));

    if let Some(owner) = owner {
        let role = app.roles.get_role_by_name(OWNER_ROLE).await?;
        app.resolver
            .assign_role(owner, &role.id, None, None, None)
            .await?;
        println!("Assigned {OWNER_ROLE} to {owner}");
    }

    println!("\nMomFit initialized. Next steps:");
    println!("  1. Assign community roles: `momfit assign <user> Admin --community <id>`");
    println!("  2. Try the classifier:     `momfit detect \"yoga tomorrow at 9am?\"`");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use momfit_auth::Permission;

    #[tokio::test]
    async fn init_is_rerunnable_and_bootstraps_owner() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), Some("founder")).await.unwrap();
        run(dir.path(), None).await.unwrap();

        let app = App::open(dir.path()).await.unwrap();
        assert_eq!(app.resolver.list_roles().await.unwrap().len(), 4);
        assert_eq!(app.resolver.get_user_roles("founder").await.unwrap().len(), 1);

        let perm = Permission::new("community", "manage", "events");
        assert!(app
            .resolver
            .has_permission("founder", &perm, Some("any-community"))
            .await
            .unwrap());
    }
}
