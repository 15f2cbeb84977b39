use chrono::{DateTime, Utc};
use momfit_core::{NotificationStatus, ScheduledEvent};
use momfit_intent::{ExtractedEntities, Intent};
use serde::{Deserialize, Serialize};

/// A chat message as it arrives from a community conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub community_id: String,
    pub user_id: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(community_id: &str, user_id: &str, text: &str) -> Self {
        Self {
            community_id: community_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
        }
    }
}

/// An event suggestion raised from chat, waiting for an admin decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminNotification {
    pub id: String,
    pub community_id: String,
    /// Author of the originating message.
    pub user_id: String,
    pub message: String,
    pub intent: Intent,
    pub confidence: f64,
    pub entities: ExtractedEntities,
    pub status: NotificationStatus,
    pub resolved_by: Option<String>,
    /// Set when approval created an event.
    pub event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedEvent {
    pub event: ScheduledEvent,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedEvent {
    pub event: ScheduledEvent,
    pub warnings: Vec<String>,
}
