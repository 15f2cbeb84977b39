use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use momfit_auth::{Permission, RoleResolver};
use momfit_core::config::SchedulerConfig;
use momfit_core::{Clock, CommunityMessage, EventDetails, EventUpdate, ScheduledEvent};
use tracing::{debug, info, warn};

use crate::error::EventError;
use crate::store::{EventStore, MessageSink};
use crate::types::{CreatedEvent, UpdatedEvent};
use crate::validation::{parse_date, parse_time, validate_event, validate_update};

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Start time used when none is given.
fn default_start_time() -> NaiveTime {
    NaiveTime::MIN + Duration::hours(9)
}

/// Validates, persists and announces community events.
pub struct EventScheduler {
    events: Arc<dyn EventStore>,
    messages: Arc<dyn MessageSink>,
    resolver: Arc<RoleResolver>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl EventScheduler {
    pub fn new(
        events: Arc<dyn EventStore>,
        messages: Arc<dyn MessageSink>,
        resolver: Arc<RoleResolver>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            events,
            messages,
            resolver,
            clock,
            config,
        }
    }

    pub fn validate(&self, details: &EventDetails) -> crate::validation::ValidationReport {
        validate_event(details, self.clock.today())
    }

    /// Create an event in `community_id` on behalf of `user_id`.
    ///
    /// Nothing is written when validation fails. The announcement is best
    /// effort: a failed post is logged and the event is still returned.
    pub async fn create_event(
        &self,
        details: &EventDetails,
        user_id: &str,
        community_id: &str,
        ai_generated: bool,
    ) -> Result<CreatedEvent, EventError> {
        let report = self.validate(details);
        if !report.is_valid {
            debug!(community_id, errors = ?report.errors, "event rejected");
            return Err(EventError::Validation(report));
        }

        let (start_time, end_time) = resolve_schedule(
            details.date.as_deref(),
            details.time.as_deref(),
            details.duration_minutes,
            self.clock.today(),
        )?;

        let event = ScheduledEvent {
            id: uuid::Uuid::now_v7().to_string(),
            community_id: community_id.to_string(),
            created_by: user_id.to_string(),
            title: details.title.trim().to_string(),
            description: details.description.trim().to_string(),
            start_time,
            end_time,
            location: non_empty(details.location.as_deref()),
            capacity: details.capacity,
            tags: details.tags.clone().unwrap_or_default(),
            is_online: details.is_online,
            meeting_url: non_empty(details.meeting_url.as_deref()),
            ai_generated,
            created_at: self.clock.now(),
        };
        self.events.insert_event(&event).await?;

        info!(
            event_id = %event.id,
            community_id,
            user_id,
            ai_generated,
            start = %event.start_time,
            "created event"
        );

        if self.config.announce_events {
            self.announce(&event).await;
        }

        Ok(CreatedEvent {
            event,
            warnings: report.warnings,
            suggestions: report.suggestions,
        })
    }

    /// Apply `update` to an event. Allowed for the creator and for holders of
    /// `community:manage:events` in the event's community.
    pub async fn update_event(
        &self,
        event_id: &str,
        user_id: &str,
        update: &EventUpdate,
    ) -> Result<UpdatedEvent, EventError> {
        let mut event = self.get_event(event_id).await?;
        self.authorize_change(&event, user_id).await?;

        let report = validate_update(update, self.clock.today());
        if !report.is_valid {
            return Err(EventError::Validation(report));
        }

        if let Some(ref title) = update.title {
            event.title = title.trim().to_string();
        }
        if let Some(ref description) = update.description {
            event.description = description.trim().to_string();
        }
        if let Some(ref location) = update.location {
            event.location = non_empty(Some(location.as_str()));
        }
        if let Some(capacity) = update.capacity {
            event.capacity = Some(capacity);
        }
        if let Some(ref tags) = update.tags {
            event.tags = tags.clone();
        }
        if let Some(is_online) = update.is_online {
            event.is_online = is_online;
        }
        if let Some(ref url) = update.meeting_url {
            event.meeting_url = non_empty(Some(url.as_str()));
        }

        if update.touches_schedule() {
            let date = match update.date {
                Some(ref d) => d.clone(),
                None => event.start_time.format("%Y-%m-%d").to_string(),
            };
            let time = match update.time {
                Some(ref t) => t.clone(),
                None => event.start_time.format("%H:%M").to_string(),
            };
            let duration = update
                .duration_minutes
                .or_else(|| u32::try_from(event.duration_minutes()).ok());
            let (start, end) =
                resolve_schedule(Some(&date), Some(&time), duration, self.clock.today())?;
            event.start_time = start;
            event.end_time = end;
        }

        self.events.update_event(&event).await?;
        info!(event_id, user_id, "updated event");

        Ok(UpdatedEvent {
            event,
            warnings: report.warnings,
        })
    }

    /// Hard-delete an event. Same authorisation as [`update_event`](Self::update_event).
    pub async fn delete_event(&self, event_id: &str, user_id: &str) -> Result<(), EventError> {
        let event = self.get_event(event_id).await?;
        self.authorize_change(&event, user_id).await?;

        if !self.events.delete_event(event_id).await? {
            return Err(EventError::NotFound("event".into()));
        }
        info!(event_id, user_id, community_id = %event.community_id, "deleted event");
        Ok(())
    }

    pub async fn get_event(&self, event_id: &str) -> Result<ScheduledEvent, EventError> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| EventError::NotFound("event".into()))
    }

    /// Events starting now or later, earliest first. `limit` defaults to
    /// `scheduler.upcoming_limit`.
    pub async fn get_upcoming_events(
        &self,
        community_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<ScheduledEvent>, EventError> {
        let limit = limit.unwrap_or(self.config.upcoming_limit);
        self.events
            .list_upcoming(community_id, self.clock.now(), limit)
            .await
    }

    async fn authorize_change(
        &self,
        event: &ScheduledEvent,
        user_id: &str,
    ) -> Result<(), EventError> {
        if event.created_by == user_id {
            return Ok(());
        }
        let manage_events = Permission::new("community", "manage", "events");
        self.resolver
            .require_permission(user_id, &manage_events, Some(&event.community_id))
            .await?;
        Ok(())
    }

    async fn announce(&self, event: &ScheduledEvent) {
        let message = CommunityMessage {
            id: uuid::Uuid::now_v7().to_string(),
            community_id: event.community_id.clone(),
            author_id: None,
            body: announcement_text(event),
            event_id: Some(event.id.clone()),
            created_at: self.clock.now(),
        };
        if let Err(e) = self.messages.post_message(&message).await {
            warn!(event_id = %event.id, error = %e, "failed to post event announcement");
        }
    }
}

/// Compute start and end instants (UTC).
///
/// Date and time give that instant; a date alone starts at 09:00; without a
/// date the event goes on tomorrow, at the given time or 09:00. The end is
/// `duration` minutes later, 60 by default.
pub fn resolve_schedule(
    date: Option<&str>,
    time: Option<&str>,
    duration_minutes: Option<u32>,
    today: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), EventError> {
    let day = match date {
        Some(d) => parse_date(d).ok_or_else(|| EventError::Internal(format!("bad date '{d}'")))?,
        None => today
            .succ_opt()
            .ok_or_else(|| EventError::Internal("date out of range".into()))?,
    };
    let at = match time {
        Some(t) => parse_time(t).ok_or_else(|| EventError::Internal(format!("bad time '{t}'")))?,
        None => default_start_time(),
    };

    let start = day.and_time(at).and_utc();
    let minutes = duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    let end = end_after(start, minutes)?;
    Ok((start, end))
}

fn end_after(start: DateTime<Utc>, minutes: u32) -> Result<DateTime<Utc>, EventError> {
    start
        .checked_add_signed(Duration::minutes(i64::from(minutes)))
        .ok_or_else(|| EventError::Internal("event end out of range".into()))
}

fn announcement_text(event: &ScheduledEvent) -> String {
    let when = event.start_time.format("%A, %B %-d %Y at %H:%M UTC");
    let mut body = format!("New event: {} on {when}", event.title);
    if let Some(ref location) = event.location {
        body.push_str(&format!(" at {location}"));
    } else if event.is_online {
        body.push_str(" (online)");
    }
    body
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
