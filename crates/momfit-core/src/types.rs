use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event fields as entered in a form or extracted from chat, before
/// validation. Every optional field is "not provided" when `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub title: String,
    pub description: String,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// 24-hour wall time, `HH:MM`.
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub meeting_url: Option<String>,
}

/// A persisted community event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub id: String,
    pub community_id: String,
    pub created_by: String,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub tags: Vec<String>,
    pub is_online: bool,
    pub meeting_url: Option<String>,
    pub ai_generated: bool,
    pub created_at: DateTime<Utc>,
}

impl ScheduledEvent {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

/// Partial update of an event's mutable fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub location: Option<String>,
    pub capacity: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub is_online: Option<bool>,
    pub meeting_url: Option<String>,
}

impl EventUpdate {
    pub fn touches_schedule(&self) -> bool {
        self.date.is_some() || self.time.is_some() || self.duration_minutes.is_some()
    }
}

/// A post in a community's message stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMessage {
    pub id: String,
    pub community_id: String,
    /// `None` for system posts such as event announcements.
    pub author_id: Option<String>,
    pub body: String,
    pub event_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of an admin notification raised from a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    Pending,
    /// Claimed by an admin while the event is being created.
    Approving,
    Approved,
    Dismissed,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationStatus::Pending => write!(f, "pending"),
            NotificationStatus::Approving => write!(f, "approving"),
            NotificationStatus::Approved => write!(f, "approved"),
            NotificationStatus::Dismissed => write!(f, "dismissed"),
        }
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(NotificationStatus::Pending),
            "approving" => Ok(NotificationStatus::Approving),
            "approved" => Ok(NotificationStatus::Approved),
            "dismissed" => Ok(NotificationStatus::Dismissed),
            other => Err(format!("unknown notification status: {other}")),
        }
    }
}

/// Timestamps are stored as second-precision RFC 3339 UTC text so that
/// lexical order in SQL matches chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
