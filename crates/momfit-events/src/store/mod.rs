pub mod sqlite;

pub use sqlite::SqliteEventStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use momfit_core::{CommunityMessage, NotificationStatus, ScheduledEvent};

use crate::error::EventError;
use crate::types::AdminNotification;

/// Persistence for scheduled events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &ScheduledEvent) -> Result<(), EventError>;
    async fn get_event(&self, id: &str) -> Result<Option<ScheduledEvent>, EventError>;
    /// Overwrite the mutable fields of an existing event.
    async fn update_event(&self, event: &ScheduledEvent) -> Result<(), EventError>;
    /// Hard delete. Returns whether a row was removed.
    async fn delete_event(&self, id: &str) -> Result<bool, EventError>;
    /// Events of `community_id` starting at or after `from`, earliest first.
    async fn list_upcoming(
        &self,
        community_id: &str,
        from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ScheduledEvent>, EventError>;
}

/// Where event announcements and other system posts go.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn post_message(&self, message: &CommunityMessage) -> Result<(), EventError>;
    /// Most recent first.
    async fn list_messages(
        &self,
        community_id: &str,
        limit: u32,
    ) -> Result<Vec<CommunityMessage>, EventError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &AdminNotification)
    -> Result<(), EventError>;
    async fn get_notification(&self, id: &str) -> Result<Option<AdminNotification>, EventError>;
    /// Compare-and-set on status. Fails with `AlreadyResolved` when the
    /// notification is no longer in `from`.
    async fn transition_notification(
        &self,
        id: &str,
        from: NotificationStatus,
        to: NotificationStatus,
    ) -> Result<(), EventError>;
    /// Move a notification from `from` to a final status, recording who
    /// resolved it.
    async fn resolve_notification(
        &self,
        id: &str,
        from: NotificationStatus,
        status: NotificationStatus,
        resolved_by: &str,
        event_id: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), EventError>;
    /// Oldest first. `None` lists every status.
    async fn list_notifications(
        &self,
        community_id: &str,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<AdminNotification>, EventError>;
}
