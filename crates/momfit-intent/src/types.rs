use momfit_core::EventDetails;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum confidence for a detected intent to trigger an automated action.
pub const ACTIONABLE_CONFIDENCE: f64 = 0.6;

/// Longest title derived from raw message text.
const MAX_FALLBACK_TITLE: usize = 60;

/// Classified purpose of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateEvent,
    SchedulePoll,
    AdminAlert,
    GeneralChat,
}

impl Intent {
    /// Map a provider label to an intent. Unknown labels are general chat.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "create_event" => Intent::CreateEvent,
            "schedule_poll" => Intent::SchedulePoll,
            "admin_alert" => Intent::AdminAlert,
            _ => Intent::GeneralChat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CreateEvent => "create_event",
            Intent::SchedulePoll => "schedule_poll",
            Intent::AdminAlert => "admin_alert",
            Intent::GeneralChat => "general_chat",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which provider produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Llm,
    Keyword,
}

impl fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionSource::Llm => write!(f, "llm"),
            DetectionSource::Keyword => write!(f, "keyword"),
        }
    }
}

/// Event fields pulled out of free text. Anything not found stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedEntities {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub duration_minutes: Option<u32>,
    pub capacity: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub is_online: Option<bool>,
    pub meeting_url: Option<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        *self == ExtractedEntities::default()
    }

    /// Turn the extracted fields into event details, filling title and
    /// description from the original message when they were not found.
    pub fn to_event_details(&self, message: &str) -> EventDetails {
        let message = message.trim();
        let title = self
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| fallback_title(message));
        let description = self
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| message.to_string());

        EventDetails {
            title,
            description,
            date: self.date.clone(),
            time: self.time.clone(),
            location: self.location.clone(),
            duration_minutes: self.duration_minutes,
            capacity: self.capacity,
            tags: self.tags.clone(),
            is_online: self.is_online.unwrap_or(self.meeting_url.is_some()),
            meeting_url: self.meeting_url.clone(),
        }
    }
}

fn fallback_title(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= MAX_FALLBACK_TITLE {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(MAX_FALLBACK_TITLE).collect();
    match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].to_string(),
        _ => cut,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDetectionResult {
    pub intent: Intent,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub entities: ExtractedEntities,
    pub source: DetectionSource,
}

impl IntentDetectionResult {
    pub fn new(
        intent: Intent,
        confidence: f64,
        entities: ExtractedEntities,
        source: DetectionSource,
    ) -> Self {
        Self {
            intent,
            confidence: clamp_confidence(confidence),
            entities,
            source,
        }
    }

    /// No signal found.
    pub fn general_chat(confidence: f64, source: DetectionSource) -> Self {
        Self::new(
            Intent::GeneralChat,
            confidence,
            ExtractedEntities::default(),
            source,
        )
    }

    /// Whether this result should surface an event suggestion to admins.
    pub fn is_actionable_event(&self) -> bool {
        self.intent == Intent::CreateEvent && self.confidence >= ACTIONABLE_CONFIDENCE
    }
}

/// Clamp into `[0, 1]`; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Who sent a message and where, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionContext {
    pub community_id: Option<String>,
    pub user_id: Option<String>,
}

impl DetectionContext {
    pub fn new(community_id: &str, user_id: &str) -> Self {
        Self {
            community_id: Some(community_id.to_string()),
            user_id: Some(user_id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(confidence: f64) -> IntentDetectionResult {
        IntentDetectionResult::new(
            Intent::CreateEvent,
            confidence,
            ExtractedEntities::default(),
            DetectionSource::Keyword,
        )
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(!event(0.59).is_actionable_event());
        assert!(event(0.6).is_actionable_event());
        assert!(event(1.0).is_actionable_event());
    }

    #[test]
    fn only_create_event_is_actionable() {
        let poll = IntentDetectionResult::new(
            Intent::SchedulePoll,
            0.99,
            ExtractedEntities::default(),
            DetectionSource::Llm,
        );
        assert!(!poll.is_actionable_event());
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(event(1.7).confidence, 1.0);
        assert_eq!(event(-0.3).confidence, 0.0);
        assert_eq!(event(f64::NAN).confidence, 0.0);
    }

    #[test]
    fn unknown_labels_are_general_chat() {
        assert_eq!(Intent::from_label("create_event"), Intent::CreateEvent);
        assert_eq!(Intent::from_label(" Schedule_Poll "), Intent::SchedulePoll);
        assert_eq!(Intent::from_label("book_flight"), Intent::GeneralChat);
        assert_eq!(Intent::from_label(""), Intent::GeneralChat);
    }

    #[test]
    fn intent_serializes_snake_case() {
        let json = serde_json::to_string(&Intent::AdminAlert).unwrap();
        assert_eq!(json, "\"admin_alert\"");
    }

    #[test]
    fn event_details_fall_back_to_message() {
        let entities = ExtractedEntities {
            date: Some("2099-06-01".into()),
            ..Default::default()
        };
        let details = entities.to_event_details("  Stroller walk by the lake, who's in?  ");
        assert_eq!(details.title, "Stroller walk by the lake, who's in?");
        assert_eq!(details.description, "Stroller walk by the lake, who's in?");
        assert_eq!(details.date.as_deref(), Some("2099-06-01"));
        assert!(!details.is_online);
    }

    #[test]
    fn long_messages_get_a_word_boundary_title() {
        let message = "Let's organise a long sunday morning walk along the river path \
                       and then grab coffee together";
        let details = ExtractedEntities::default().to_event_details(message);
        assert!(details.title.chars().count() <= MAX_FALLBACK_TITLE);
        assert!(message.starts_with(&details.title));
        assert!(!details.title.ends_with(' '));
    }

    #[test]
    fn meeting_url_implies_online() {
        let entities = ExtractedEntities {
            title: Some("Evening stretch".into()),
            meeting_url: Some("https://meet.example.com/abc".into()),
            ..Default::default()
        };
        let details = entities.to_event_details("ignored");
        assert_eq!(details.title, "Evening stretch");
        assert!(details.is_online);
    }
}
