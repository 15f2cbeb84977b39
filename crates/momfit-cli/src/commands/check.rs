use anyhow::Result;
use std::path::Path;

use momfit_auth::Permission;

use super::context::App;

/// Print whether `user` holds `permission` (`scope:action:resource`).
pub async fn run(
    base_dir: &Path,
    user: &str,
    permission: &str,
    community: Option<&str>,
) -> Result<()> {
    let permission: Permission = permission.parse()?;
    let app = App::open(base_dir).await?;

    let allowed = app
        .resolver
        .has_permission(user, &permission, community)
        .await?;
    println!(
        "{user} {} {permission}{}",
        if allowed { "HAS" } else { "does NOT have" },
        community.map(|c| format!(" in {c}")).unwrap_or_default()
    );
    Ok(())
}
