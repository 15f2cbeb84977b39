use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use momfit_core::{
    CommunityMessage, NotificationStatus, ScheduledEvent, format_timestamp, parse_timestamp,
};
use momfit_intent::Intent;
use rusqlite::{Connection, OptionalExtension, Row};

use super::{EventStore, MessageSink, NotificationStore};
use crate::error::EventError;
use crate::types::AdminNotification;

/// SQLite store for events, community messages and admin notifications.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &str) -> Result<Self, EventError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self, EventError> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    pub fn migrate(&self) -> Result<(), EventError> {
        let conn = self.conn()?;
        conn.execute_batch(MIGRATE_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, EventError> {
        self.conn
            .lock()
            .map_err(|_| EventError::Internal("event store connection poisoned".into()))
    }
}

const MIGRATE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    community_id TEXT NOT NULL,
    created_by TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    location TEXT,
    capacity INTEGER,
    tags TEXT NOT NULL DEFAULT '[]',
    is_online INTEGER NOT NULL DEFAULT 0,
    meeting_url TEXT,
    ai_generated INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_community_start ON events(community_id, start_time);

CREATE TABLE IF NOT EXISTS community_messages (
    id TEXT PRIMARY KEY,
    community_id TEXT NOT NULL,
    author_id TEXT,
    body TEXT NOT NULL,
    event_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_community ON community_messages(community_id, created_at);

CREATE TABLE IF NOT EXISTS admin_notifications (
    id TEXT PRIMARY KEY,
    community_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    message TEXT NOT NULL,
    intent TEXT NOT NULL,
    confidence REAL NOT NULL,
    entities TEXT NOT NULL DEFAULT '{}',
    status TEXT NOT NULL DEFAULT 'pending',
    resolved_by TEXT,
    event_id TEXT,
    created_at TEXT NOT NULL,
    resolved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_notifications_community ON admin_notifications(community_id, status);
"#;

const EVENT_COLUMNS: &str = "id, community_id, created_by, title, description, start_time, \
     end_time, location, capacity, tags, is_online, meeting_url, ai_generated, created_at";

const NOTIFICATION_COLUMNS: &str = "id, community_id, user_id, message, intent, confidence, \
     entities, status, resolved_by, event_id, created_at, resolved_at";

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(idx, format!("bad timestamp '{raw}'")))
}

fn optional_timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("bad timestamp '{raw}'"))),
        None => Ok(None),
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledEvent> {
    let tags: String = row.get(9)?;
    Ok(ScheduledEvent {
        id: row.get(0)?,
        community_id: row.get(1)?,
        created_by: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        start_time: timestamp_column(row, 5)?,
        end_time: timestamp_column(row, 6)?,
        location: row.get(7)?,
        capacity: row.get(8)?,
        tags: serde_json::from_str(&tags).map_err(|e| conversion_error(9, e.to_string()))?,
        is_online: row.get(10)?,
        meeting_url: row.get(11)?,
        ai_generated: row.get(12)?,
        created_at: timestamp_column(row, 13)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<CommunityMessage> {
    Ok(CommunityMessage {
        id: row.get(0)?,
        community_id: row.get(1)?,
        author_id: row.get(2)?,
        body: row.get(3)?,
        event_id: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<AdminNotification> {
    let intent: String = row.get(4)?;
    let entities: String = row.get(6)?;
    let status: String = row.get(7)?;
    Ok(AdminNotification {
        id: row.get(0)?,
        community_id: row.get(1)?,
        user_id: row.get(2)?,
        message: row.get(3)?,
        intent: Intent::from_label(&intent),
        confidence: row.get(5)?,
        entities: serde_json::from_str(&entities).map_err(|e| conversion_error(6, e.to_string()))?,
        status: status
            .parse::<NotificationStatus>()
            .map_err(|e| conversion_error(7, e))?,
        resolved_by: row.get(8)?,
        event_id: row.get(9)?,
        created_at: timestamp_column(row, 10)?,
        resolved_at: optional_timestamp_column(row, 11)?,
    })
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn insert_event(&self, event: &ScheduledEvent) -> Result<(), EventError> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO events ({EVENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            rusqlite::params![
                event.id,
                event.community_id,
                event.created_by,
                event.title,
                event.description,
                format_timestamp(&event.start_time),
                format_timestamp(&event.end_time),
                event.location,
                event.capacity,
                serde_json::to_string(&event.tags)?,
                event.is_online,
                event.meeting_url,
                event.ai_generated,
                format_timestamp(&event.created_at),
            ],
        )?;
        Ok(())
    }

    async fn get_event(&self, id: &str) -> Result<Option<ScheduledEvent>, EventError> {
        let conn = self.conn()?;
        let event = conn
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                [id],
                event_from_row,
            )
            .optional()?;
        Ok(event)
    }

    async fn update_event(&self, event: &ScheduledEvent) -> Result<(), EventError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE events SET title = ?1, description = ?2, start_time = ?3, end_time = ?4,
                 location = ?5, capacity = ?6, tags = ?7, is_online = ?8, meeting_url = ?9
             WHERE id = ?10",
            rusqlite::params![
                event.title,
                event.description,
                format_timestamp(&event.start_time),
                format_timestamp(&event.end_time),
                event.location,
                event.capacity,
                serde_json::to_string(&event.tags)?,
                event.is_online,
                event.meeting_url,
                event.id,
            ],
        )?;
        if updated == 0 {
            return Err(EventError::NotFound("event".into()));
        }
        Ok(())
    }

    async fn delete_event(&self, id: &str) -> Result<bool, EventError> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    async fn list_upcoming(
        &self,
        community_id: &str,
        from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ScheduledEvent>, EventError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE community_id = ?1 AND start_time >= ?2
             ORDER BY start_time ASC, id ASC
             LIMIT ?3"
        ))?;
        let events = stmt
            .query_map(
                rusqlite::params![community_id, format_timestamp(&from), limit],
                event_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

#[async_trait]
impl MessageSink for SqliteEventStore {
    async fn post_message(&self, message: &CommunityMessage) -> Result<(), EventError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO community_messages
                 (id, community_id, author_id, body, event_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                message.id,
                message.community_id,
                message.author_id,
                message.body,
                message.event_id,
                format_timestamp(&message.created_at),
            ],
        )?;
        Ok(())
    }

    async fn list_messages(
        &self,
        community_id: &str,
        limit: u32,
    ) -> Result<Vec<CommunityMessage>, EventError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, community_id, author_id, body, event_id, created_at
             FROM community_messages
             WHERE community_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let messages = stmt
            .query_map(rusqlite::params![community_id, limit], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }
}

#[async_trait]
impl NotificationStore for SqliteEventStore {
    async fn insert_notification(
        &self,
        notification: &AdminNotification,
    ) -> Result<(), EventError> {
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO admin_notifications ({NOTIFICATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            rusqlite::params![
                notification.id,
                notification.community_id,
                notification.user_id,
                notification.message,
                notification.intent.as_str(),
                notification.confidence,
                serde_json::to_string(&notification.entities)?,
                notification.status.to_string(),
                notification.resolved_by,
                notification.event_id,
                format_timestamp(&notification.created_at),
                notification.resolved_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(())
    }

    async fn get_notification(&self, id: &str) -> Result<Option<AdminNotification>, EventError> {
        let conn = self.conn()?;
        let notification = conn
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM admin_notifications WHERE id = ?1"),
                [id],
                notification_from_row,
            )
            .optional()?;
        Ok(notification)
    }

    async fn transition_notification(
        &self,
        id: &str,
        from: NotificationStatus,
        to: NotificationStatus,
    ) -> Result<(), EventError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE admin_notifications SET status = ?1 WHERE id = ?2 AND status = ?3",
            rusqlite::params![to.to_string(), id, from.to_string()],
        )?;
        if updated == 0 {
            return Err(EventError::AlreadyResolved("notification".into()));
        }
        Ok(())
    }

    async fn resolve_notification(
        &self,
        id: &str,
        from: NotificationStatus,
        status: NotificationStatus,
        resolved_by: &str,
        event_id: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), EventError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE admin_notifications
             SET status = ?1, resolved_by = ?2, event_id = ?3, resolved_at = ?4
             WHERE id = ?5 AND status = ?6",
            rusqlite::params![
                status.to_string(),
                resolved_by,
                event_id,
                format_timestamp(&resolved_at),
                id,
                from.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(EventError::AlreadyResolved("notification".into()));
        }
        Ok(())
    }

    async fn list_notifications(
        &self,
        community_id: &str,
        status: Option<NotificationStatus>,
    ) -> Result<Vec<AdminNotification>, EventError> {
        let conn = self.conn()?;
        let status = status.map(|s| s.to_string());
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM admin_notifications
             WHERE community_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at ASC, id ASC"
        ))?;
        let notifications = stmt
            .query_map(rusqlite::params![community_id, status], notification_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }
}
