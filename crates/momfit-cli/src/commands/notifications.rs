use anyhow::Result;
use std::path::Path;

use super::context::App;

pub async fn list(base_dir: &Path, community: &str) -> Result<()> {
    let app = App::open(base_dir).await?;
    let pending = app.pipeline.pending(community).await?;

    if pending.is_empty() {
        println!("No pending event suggestions in {community}.");
        return Ok(());
    }

    println!("{:<38} {:<12} {:>5} {}", "ID", "FROM", "CONF", "MESSAGE");
    println!("{}", "-".repeat(100));
    for n in &pending {
        println!(
            "{:<38} {:<12} {:>5.2} {}",
            n.id, n.user_id, n.confidence, n.message
        );
    }
    Ok(())
}

pub async fn approve(base_dir: &Path, notification_id: &str, admin: &str) -> Result<()> {
    let app = App::open(base_dir).await?;
    let created = match app.pipeline.approve(notification_id, admin, None).await {
        Ok(created) => created,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };
    println!(
        "Approved. Created event {} \"{}\" at {}",
        created.event.id, created.event.title, created.event.start_time
    );
    Ok(())
}

pub async fn dismiss(base_dir: &Path, notification_id: &str, admin: &str) -> Result<()> {
    let app = App::open(base_dir).await?;
    if let Err(e) = app.pipeline.dismiss(notification_id, admin).await {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }
    println!("Dismissed {notification_id}");
    Ok(())
}
