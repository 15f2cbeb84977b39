//! Chat message → admin notification → approved event.

use std::sync::Arc;

use momfit_auth::{Permission, RoleResolver};
use momfit_core::{Clock, EventDetails, NotificationStatus};
use momfit_intent::{DetectionContext, IntentDetector};
use tracing::{debug, info, warn};

use crate::error::EventError;
use crate::scheduler::EventScheduler;
use crate::store::NotificationStore;
use crate::types::{AdminNotification, ChatMessage, CreatedEvent};

pub struct ChatIntentPipeline {
    detector: Arc<IntentDetector>,
    scheduler: Arc<EventScheduler>,
    notifications: Arc<dyn NotificationStore>,
    resolver: Arc<RoleResolver>,
    clock: Arc<dyn Clock>,
}

impl ChatIntentPipeline {
    pub fn new(
        detector: Arc<IntentDetector>,
        scheduler: Arc<EventScheduler>,
        notifications: Arc<dyn NotificationStore>,
        resolver: Arc<RoleResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            detector,
            scheduler,
            notifications,
            resolver,
            clock,
        }
    }

    /// Classify a chat message and raise a pending admin notification when it
    /// is an actionable event intent.
    pub async fn process_message(
        &self,
        message: &ChatMessage,
    ) -> Result<Option<AdminNotification>, EventError> {
        let context = DetectionContext::new(&message.community_id, &message.user_id);
        let result = self.detector.detect(&message.text, &context).await;

        if !result.is_actionable_event() {
            debug!(
                community_id = %message.community_id,
                intent = %result.intent,
                confidence = result.confidence,
                "message not actionable"
            );
            return Ok(None);
        }

        let notification = AdminNotification {
            id: uuid::Uuid::now_v7().to_string(),
            community_id: message.community_id.clone(),
            user_id: message.user_id.clone(),
            message: message.text.clone(),
            intent: result.intent,
            confidence: result.confidence,
            entities: result.entities,
            status: NotificationStatus::Pending,
            resolved_by: None,
            event_id: None,
            created_at: self.clock.now(),
            resolved_at: None,
        };
        self.notifications.insert_notification(&notification).await?;

        info!(
            notification_id = %notification.id,
            community_id = %notification.community_id,
            confidence = notification.confidence,
            source = %result.source,
            "event suggestion sent to admins"
        );
        Ok(Some(notification))
    }

    /// Turn a pending notification into an event. `overrides` replaces the
    /// extracted details entirely when given.
    ///
    /// The notification is claimed (`approving`) while the event is created.
    /// A validation failure puts it back to pending so the admin can retry
    /// with corrected details.
    pub async fn approve(
        &self,
        notification_id: &str,
        admin_id: &str,
        overrides: Option<EventDetails>,
    ) -> Result<CreatedEvent, EventError> {
        let notification = self.pending_notification(notification_id).await?;
        self.authorize(admin_id, &notification).await?;

        // Only one approve or dismiss can move the row out of pending.
        self.notifications
            .transition_notification(
                notification_id,
                NotificationStatus::Pending,
                NotificationStatus::Approving,
            )
            .await?;

        let details = overrides
            .unwrap_or_else(|| notification.entities.to_event_details(&notification.message));
        let created = match self
            .scheduler
            .create_event(&details, admin_id, &notification.community_id, true)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                self.release_claim(notification_id).await;
                return Err(e);
            }
        };

        self.notifications
            .resolve_notification(
                notification_id,
                NotificationStatus::Approving,
                NotificationStatus::Approved,
                admin_id,
                Some(created.event.id.clone()),
                self.clock.now(),
            )
            .await?;

        info!(notification_id, admin_id, event_id = %created.event.id, "notification approved");
        Ok(created)
    }

    pub async fn dismiss(&self, notification_id: &str, admin_id: &str) -> Result<(), EventError> {
        let notification = self.pending_notification(notification_id).await?;
        self.authorize(admin_id, &notification).await?;

        self.notifications
            .resolve_notification(
                notification_id,
                NotificationStatus::Pending,
                NotificationStatus::Dismissed,
                admin_id,
                None,
                self.clock.now(),
            )
            .await?;
        info!(notification_id, admin_id, "notification dismissed");
        Ok(())
    }

    /// Pending notifications of a community, oldest first.
    pub async fn pending(&self, community_id: &str) -> Result<Vec<AdminNotification>, EventError> {
        self.notifications
            .list_notifications(community_id, Some(NotificationStatus::Pending))
            .await
    }

    async fn pending_notification(&self, id: &str) -> Result<AdminNotification, EventError> {
        let notification = self
            .notifications
            .get_notification(id)
            .await?
            .ok_or_else(|| EventError::NotFound("notification".into()))?;
        if notification.status != NotificationStatus::Pending {
            return Err(EventError::AlreadyResolved("notification".into()));
        }
        Ok(notification)
    }

    async fn release_claim(&self, notification_id: &str) {
        if let Err(e) = self
            .notifications
            .transition_notification(
                notification_id,
                NotificationStatus::Approving,
                NotificationStatus::Pending,
            )
            .await
        {
            warn!(notification_id, error = %e, "failed to release notification claim");
        }
    }

    async fn authorize(
        &self,
        admin_id: &str,
        notification: &AdminNotification,
    ) -> Result<(), EventError> {
        let write_events = Permission::new("community", "write", "events");
        self.resolver
            .require_permission(admin_id, &write_events, Some(&notification.community_id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EventStore, MessageSink, SqliteEventStore};
    use async_trait::async_trait;
    use momfit_auth::{RoleStore, SqliteRoleStore};
    use momfit_core::FixedClock;
    use momfit_core::config::SchedulerConfig;
    use momfit_intent::{
        DetectionSource, ExtractedEntities, Intent, IntentDetectionResult, IntentError,
        IntentProvider, KeywordIntentProvider,
    };

    /// Always reports a create_event intent with a fixed confidence.
    struct FixedConfidence(f64);

    #[async_trait]
    impl IntentProvider for FixedConfidence {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn detect(
            &self,
            _text: &str,
            _context: &DetectionContext,
        ) -> Result<IntentDetectionResult, IntentError> {
            Ok(IntentDetectionResult::new(
                Intent::CreateEvent,
                self.0,
                ExtractedEntities {
                    title: Some("Playground meetup".into()),
                    date: Some("2099-06-01".into()),
                    ..Default::default()
                },
                DetectionSource::Llm,
            ))
        }
    }

    struct Fixture {
        pipeline: ChatIntentPipeline,
        events: Arc<SqliteEventStore>,
        resolver: Arc<RoleResolver>,
    }

    /// Dismisses a pending notification right after handing it out, the way
    /// a second admin acting at the same moment would.
    struct DismissAfterRead {
        inner: Arc<SqliteEventStore>,
    }

    #[async_trait]
    impl NotificationStore for DismissAfterRead {
        async fn insert_notification(
            &self,
            notification: &AdminNotification,
        ) -> Result<(), EventError> {
            self.inner.insert_notification(notification).await
        }

        async fn get_notification(
            &self,
            id: &str,
        ) -> Result<Option<AdminNotification>, EventError> {
            let read = self.inner.get_notification(id).await?;
            if read
                .as_ref()
                .is_some_and(|n| n.status == NotificationStatus::Pending)
            {
                self.inner
                    .resolve_notification(
                        id,
                        NotificationStatus::Pending,
                        NotificationStatus::Dismissed,
                        "admin-2",
                        None,
                        chrono::Utc::now(),
                    )
                    .await?;
            }
            Ok(read)
        }

        async fn transition_notification(
            &self,
            id: &str,
            from: NotificationStatus,
            to: NotificationStatus,
        ) -> Result<(), EventError> {
            self.inner.transition_notification(id, from, to).await
        }

        async fn resolve_notification(
            &self,
            id: &str,
            from: NotificationStatus,
            status: NotificationStatus,
            resolved_by: &str,
            event_id: Option<String>,
            resolved_at: chrono::DateTime<chrono::Utc>,
        ) -> Result<(), EventError> {
            self.inner
                .resolve_notification(id, from, status, resolved_by, event_id, resolved_at)
                .await
        }

        async fn list_notifications(
            &self,
            community_id: &str,
            status: Option<NotificationStatus>,
        ) -> Result<Vec<AdminNotification>, EventError> {
            self.inner.list_notifications(community_id, status).await
        }
    }

    async fn fixture(confidence: f64) -> Fixture {
        fixture_with(confidence, |events| events as Arc<dyn NotificationStore>).await
    }

    async fn fixture_with(
        confidence: f64,
        notifications: impl FnOnce(Arc<SqliteEventStore>) -> Arc<dyn NotificationStore>,
    ) -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at("2026-05-01T08:00:00Z").unwrap());

        let roles = Arc::new(SqliteRoleStore::open_in_memory().unwrap());
        roles.migrate().await.unwrap();
        roles.seed_defaults().await.unwrap();
        let resolver = Arc::new(RoleResolver::new(roles.clone(), clock.clone()));
        let admin = roles.get_role_by_name("Admin").await.unwrap();
        resolver
            .assign_role("admin-1", &admin.id, Some("c1"), None, None)
            .await
            .unwrap();

        let events = Arc::new(SqliteEventStore::open_in_memory().unwrap());
        events.migrate().unwrap();
        let scheduler = Arc::new(EventScheduler::new(
            events.clone(),
            events.clone(),
            resolver.clone(),
            clock.clone(),
            SchedulerConfig::default(),
        ));
        let detector = Arc::new(IntentDetector::new(
            Box::new(FixedConfidence(confidence)),
            KeywordIntentProvider::new(clock.clone()),
        ));
        let pipeline = ChatIntentPipeline::new(
            detector,
            scheduler,
            notifications(events.clone()),
            resolver.clone(),
            clock,
        );
        Fixture {
            pipeline,
            events,
            resolver,
        }
    }

    fn message() -> ChatMessage {
        ChatMessage::new("c1", "mom-7", "Playground meetup on June 1st, who's in?")
    }

    #[tokio::test]
    async fn below_threshold_raises_nothing() {
        let f = fixture(0.59).await;
        let raised = f.pipeline.process_message(&message()).await.unwrap();
        assert!(raised.is_none());
        assert!(f.pipeline.pending("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn at_threshold_raises_a_notification() {
        let f = fixture(0.6).await;
        let raised = f.pipeline.process_message(&message()).await.unwrap().unwrap();
        assert_eq!(raised.status, NotificationStatus::Pending);
        assert_eq!(raised.user_id, "mom-7");

        let pending = f.pipeline.pending("c1").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, raised.id);
        assert_eq!(pending[0].entities.title.as_deref(), Some("Playground meetup"));
    }

    #[tokio::test]
    async fn approve_creates_ai_generated_event() {
        let f = fixture(0.9).await;
        let raised = f.pipeline.process_message(&message()).await.unwrap().unwrap();

        let created = f
            .pipeline
            .approve(&raised.id, "admin-1", None)
            .await
            .unwrap();
        assert!(created.event.ai_generated);
        assert_eq!(created.event.title, "Playground meetup");
        // Description falls back to the original message.
        assert_eq!(created.event.description, "Playground meetup on June 1st, who's in?");
        assert_eq!(created.event.created_by, "admin-1");

        let stored = f.events.get_notification(&raised.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Approved);
        assert_eq!(stored.event_id.as_deref(), Some(created.event.id.as_str()));
        assert!(f.pipeline.pending("c1").await.unwrap().is_empty());

        let again = f.pipeline.approve(&raised.id, "admin-1", None).await.unwrap_err();
        assert!(matches!(again, EventError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn members_cannot_approve() {
        let f = fixture(0.9).await;
        let member = f
            .resolver
            .store()
            .get_role_by_name("Member")
            .await
            .unwrap();
        f.resolver
            .assign_role("mom-7", &member.id, Some("c1"), None, None)
            .await
            .unwrap();
        let raised = f.pipeline.process_message(&message()).await.unwrap().unwrap();

        let err = f.pipeline.approve(&raised.id, "mom-7", None).await.unwrap_err();
        assert!(matches!(err, EventError::PermissionDenied));
        let err = f.pipeline.dismiss(&raised.id, "mom-7").await.unwrap_err();
        assert!(matches!(err, EventError::PermissionDenied));
        assert_eq!(f.pipeline.pending("c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_overrides_keep_notification_pending() {
        let f = fixture(0.9).await;
        let raised = f.pipeline.process_message(&message()).await.unwrap().unwrap();

        let overrides = EventDetails {
            title: "Go".into(),
            description: "Playground".into(),
            date: Some("2020-01-01".into()),
            ..Default::default()
        };
        let err = f
            .pipeline
            .approve(&raised.id, "admin-1", Some(overrides))
            .await
            .unwrap_err();
        match err {
            EventError::Validation(report) => assert_eq!(report.errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(f.pipeline.pending("c1").await.unwrap().len(), 1);
        assert!(f.events.list_upcoming("c1", chrono::Utc::now(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn approval_losing_to_a_dismissal_creates_nothing() {
        let f = fixture_with(0.9, |events| {
            Arc::new(DismissAfterRead { inner: events }) as Arc<dyn NotificationStore>
        })
        .await;
        let raised = f.pipeline.process_message(&message()).await.unwrap().unwrap();

        let err = f.pipeline.approve(&raised.id, "admin-1", None).await.unwrap_err();
        assert!(matches!(err, EventError::AlreadyResolved(_)));

        let far_past = chrono::DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert!(f.events.list_upcoming("c1", far_past, 10).await.unwrap().is_empty());
        assert!(f.events.list_messages("c1", 10).await.unwrap().is_empty());

        let stored = f.events.get_notification(&raised.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Dismissed);
        assert_eq!(stored.resolved_by.as_deref(), Some("admin-2"));
        assert_eq!(stored.event_id, None);
    }

    #[tokio::test]
    async fn dismiss_resolves_without_event() {
        let f = fixture(0.9).await;
        let raised = f.pipeline.process_message(&message()).await.unwrap().unwrap();

        f.pipeline.dismiss(&raised.id, "admin-1").await.unwrap();
        let stored = f.events.get_notification(&raised.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Dismissed);
        assert_eq!(stored.event_id, None);
        assert_eq!(stored.resolved_by.as_deref(), Some("admin-1"));

        let err = f.pipeline.dismiss("missing", "admin-1").await.unwrap_err();
        assert!(matches!(err, EventError::NotFound(_)));
    }
}
