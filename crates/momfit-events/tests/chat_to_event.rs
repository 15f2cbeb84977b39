/// End-to-end flow: chat message → keyword intent detection → admin
/// notification → approval → persisted event + announcement.
///
/// Everything runs against in-memory SQLite with a pinned clock
/// (2026-05-01T08:00Z, a Friday).
///
/// Run with:
///   cargo test -p momfit-events --test chat_to_event
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use momfit_auth::{RoleResolver, RoleStore, SqliteRoleStore};
use momfit_core::config::SchedulerConfig;
use momfit_core::{Clock, FixedClock, NotificationStatus};
use momfit_events::{
    ChatIntentPipeline, ChatMessage, EventError, EventScheduler, MessageSink, NotificationStore,
    SqliteEventStore,
};
use momfit_intent::IntentDetector;

struct Community {
    pipeline: ChatIntentPipeline,
    scheduler: Arc<EventScheduler>,
    store: Arc<SqliteEventStore>,
}

async fn community() -> Community {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::at("2026-05-01T08:00:00Z").unwrap());

    let roles = Arc::new(SqliteRoleStore::open_in_memory().unwrap());
    roles.migrate().await.unwrap();
    roles.seed_defaults().await.unwrap();
    let resolver = Arc::new(RoleResolver::new(roles.clone(), clock.clone()));

    let admin = roles.get_role_by_name("Admin").await.unwrap();
    let member = roles.get_role_by_name("Member").await.unwrap();
    resolver
        .assign_role("admin-1", &admin.id, Some("c1"), Some("owner-1"), None)
        .await
        .unwrap();
    resolver
        .assign_role("mom-7", &member.id, Some("c1"), Some("admin-1"), None)
        .await
        .unwrap();

    let store = Arc::new(SqliteEventStore::open_in_memory().unwrap());
    store.migrate().unwrap();

    let scheduler = Arc::new(EventScheduler::new(
        store.clone(),
        store.clone(),
        resolver.clone(),
        clock.clone(),
        SchedulerConfig::default(),
    ));
    let pipeline = ChatIntentPipeline::new(
        Arc::new(IntentDetector::keyword_only(clock.clone())),
        scheduler.clone(),
        store.clone(),
        resolver,
        clock,
    );

    Community {
        pipeline,
        scheduler,
        store,
    }
}

#[tokio::test]
async fn chat_message_becomes_announced_event() {
    let c = community().await;

    let chatter = ChatMessage::new("c1", "mom-3", "Good morning everyone, coffee is ready");
    assert!(c.pipeline.process_message(&chatter).await.unwrap().is_none());

    let suggestion = ChatMessage::new(
        "c1",
        "mom-7",
        "Let's do a stroller walk tomorrow at 10am at Riverside Park for 90 minutes, max 8 people",
    );
    let notification = c
        .pipeline
        .process_message(&suggestion)
        .await
        .unwrap()
        .expect("detailed event message should reach admins");
    assert_eq!(notification.status, NotificationStatus::Pending);
    assert!(notification.confidence >= 0.6);

    // A member can suggest but not approve.
    let err = c
        .pipeline
        .approve(&notification.id, "mom-7", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EventError::PermissionDenied));
    assert_eq!(err.user_message(), "You are not allowed to do that.");

    let created = c
        .pipeline
        .approve(&notification.id, "admin-1", None)
        .await
        .unwrap();
    let event = &created.event;
    assert!(event.ai_generated);
    assert_eq!(event.title, "Stroller walk meetup");
    assert_eq!(event.start_time, Utc.with_ymd_and_hms(2026, 5, 2, 10, 0, 0).unwrap());
    assert_eq!(event.end_time, Utc.with_ymd_and_hms(2026, 5, 2, 11, 30, 0).unwrap());
    assert_eq!(event.location.as_deref(), Some("Riverside Park"));
    assert_eq!(event.capacity, Some(8));
    assert_eq!(event.tags, vec!["stroller walk".to_string()]);

    let upcoming = c.scheduler.get_upcoming_events("c1", None).await.unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, event.id);

    let announcements = c.store.list_messages("c1", 10).await.unwrap();
    assert_eq!(announcements.len(), 1);
    assert!(announcements[0].body.contains("Stroller walk meetup"));
    assert!(announcements[0].body.contains("Saturday, May 2 2026 at 10:00 UTC"));

    let resolved = c
        .store
        .get_notification(&notification.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.status, NotificationStatus::Approved);
    assert_eq!(resolved.event_id.as_deref(), Some(event.id.as_str()));
    assert!(c.pipeline.pending("c1").await.unwrap().is_empty());

    // The creator is the approving admin; the member still cannot delete it.
    let err = c.scheduler.delete_event(&event.id, "mom-7").await.unwrap_err();
    assert!(matches!(err, EventError::PermissionDenied));
    c.scheduler.delete_event(&event.id, "admin-1").await.unwrap();
    assert!(c.scheduler.get_upcoming_events("c1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn vague_message_is_not_escalated() {
    let c = community().await;
    let vague = ChatMessage::new("c1", "mom-7", "Anyone want to go for a walk sometime?");
    assert!(c.pipeline.process_message(&vague).await.unwrap().is_none());
    assert!(c.pipeline.pending("c1").await.unwrap().is_empty());
}
