use anyhow::Result;
use clap::Args;
use std::path::Path;

use momfit_auth::Permission;
use momfit_core::EventDetails;

use super::context::App;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Community the event belongs to
    #[arg(long)]
    pub community: String,
    /// Acting user (needs community:write:events)
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    /// YYYY-MM-DD (default: tomorrow)
    #[arg(long)]
    pub date: Option<String>,
    /// HH:MM, 24-hour, UTC (default: 09:00)
    #[arg(long)]
    pub time: Option<String>,
    /// Minutes (default: 60)
    #[arg(long)]
    pub duration: Option<u32>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub capacity: Option<u32>,
    /// Comma-separated
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long)]
    pub online: bool,
    #[arg(long)]
    pub meeting_url: Option<String>,
}

impl CreateArgs {
    fn details(&self) -> EventDetails {
        EventDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            time: self.time.clone(),
            location: self.location.clone(),
            duration_minutes: self.duration,
            capacity: self.capacity,
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
            is_online: self.online || self.meeting_url.is_some(),
            meeting_url: self.meeting_url.clone(),
        }
    }
}

pub async fn create(base_dir: &Path, args: &CreateArgs) -> Result<()> {
    let app = App::open(base_dir).await?;

    let write_events = Permission::new("community", "write", "events");
    app.resolver
        .require_permission(&args.user, &write_events, Some(&args.community))
        .await?;

    let created = match app
        .scheduler
        .create_event(&args.details(), &args.user, &args.community, false)
        .await
    {
        Ok(created) => created,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let event = &created.event;
    println!("Created event {}", event.id);
    println!("  {} ({} to {})", event.title, event.start_time, event.end_time);
    for warning in &created.warnings {
        println!("  warning: {warning}");
    }
    for suggestion in &created.suggestions {
        println!("  tip: {suggestion}");
    }
    Ok(())
}

pub async fn list(base_dir: &Path, community: &str, limit: Option<u32>) -> Result<()> {
    let app = App::open(base_dir).await?;
    let events = app.scheduler.get_upcoming_events(community, limit).await?;

    if events.is_empty() {
        println!("No upcoming events in {community}.");
        return Ok(());
    }

    println!(
        "{:<38} {:<18} {:>5} {:<24} {}",
        "ID", "START (UTC)", "MIN", "LOCATION", "TITLE"
    );
    println!("{}", "-".repeat(100));
    for e in &events {
        let location = match (&e.location, e.is_online) {
            (Some(l), _) => l.clone(),
            (None, true) => "online".to_string(),
            (None, false) => "-".to_string(),
        };
        println!(
            "{:<38} {:<18} {:>5} {:<24} {}{}",
            e.id,
            e.start_time.format("%Y-%m-%d %H:%M"),
            e.duration_minutes(),
            location,
            e.title,
            if e.ai_generated { " [ai]" } else { "" },
        );
    }
    Ok(())
}

pub async fn delete(base_dir: &Path, event_id: &str, user: &str) -> Result<()> {
    let app = App::open(base_dir).await?;
    if let Err(e) = app.scheduler.delete_event(event_id, user).await {
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }
    println!("Deleted event {event_id}");
    Ok(())
}
