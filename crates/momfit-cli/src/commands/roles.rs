use anyhow::Result;
use std::path::Path;

use super::context::App;

/// Without a user: list role definitions. With one: list the user's
/// assignments and the grants in effect for `community`.
pub async fn run(base_dir: &Path, user: Option<&str>, community: Option<&str>) -> Result<()> {
    let app = App::open(base_dir).await?;

    let Some(user) = user else {
        let roles = app.resolver.list_roles().await?;
        if roles.is_empty() {
            println!("No roles found. Run `momfit init`.");
            return Ok(());
        }
        println!("{:<38} {:<12} {:<8} GRANTS", "ID", "NAME", "LEVEL");
        println!("{}", "-".repeat(100));
        for role in &roles {
            let grants: Vec<String> = role.permissions.iter().map(|p| p.to_string()).collect();
            println!(
                "{:<38} {:<12} {:<8} {}",
                role.id,
                role.name,
                role.access_level,
                grants.join(", ")
            );
        }
        return Ok(());
    };

    let assignments = app.resolver.get_user_roles(user).await?;
    if assignments.is_empty() {
        println!("{user} has no role assignments.");
        return Ok(());
    }

    let now = app.clock.now();
    println!("{:<38} {:<12} {:<16} {:<22} STATE", "ASSIGNMENT", "ROLE", "COMMUNITY", "EXPIRES");
    println!("{}", "-".repeat(100));
    for a in &assignments {
        println!(
            "{:<38} {:<12} {:<16} {:<22} {}",
            a.id,
            a.role.name,
            a.community_id.as_deref().unwrap_or("(global)"),
            a.expires_at
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "never".into()),
            if a.is_active_at(now) { "active" } else { "expired" },
        );
    }

    let effective = app.resolver.effective_permissions(user, community).await?;
    println!();
    println!(
        "Effective grants ({}): {}",
        community.unwrap_or("global only"),
        effective
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}
