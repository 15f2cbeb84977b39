use anyhow::Result;
use chrono::Duration;
use std::path::Path;

use momfit_auth::RoleStore;

use super::context::App;

pub struct AssignArgs<'a> {
    pub user: &'a str,
    pub role: &'a str,
    pub community: Option<&'a str>,
    pub assigned_by: Option<&'a str>,
    pub expires_in_days: Option<u32>,
    pub revoke: Option<&'a str>,
}

pub async fn run(base_dir: &Path, args: AssignArgs<'_>) -> Result<()> {
    let app = App::open(base_dir).await?;

    if let Some(assignment_id) = args.revoke {
        app.resolver
            .revoke_assignment(args.user, assignment_id)
            .await?;
        println!("Revoked assignment {assignment_id} from {}", args.user);
        return Ok(());
    }

    let role = app.roles.get_role_by_name(args.role).await?;
    let expires_at = args
        .expires_in_days
        .map(|days| app.clock.now() + Duration::days(i64::from(days)));

    let id = app
        .resolver
        .assign_role(
            args.user,
            &role.id,
            args.community,
            args.assigned_by,
            expires_at,
        )
        .await?;

    println!(
        "Assigned {} to {} ({}) as {id}",
        role.name,
        args.user,
        args.community.map(|c| format!("community {c}")).unwrap_or_else(|| "global".into())
    );
    Ok(())
}
