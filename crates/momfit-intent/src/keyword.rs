//! Local, deterministic classifier used when no LLM is configured and as the
//! fallback whenever the LLM provider fails.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use momfit_core::Clock;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::IntentError;
use crate::provider::IntentProvider;
use crate::types::*;

static ALERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(report(?:ed|ing)?|spam(?:mer|ming)?|harass\w*|abus\w*|inappropriate|scam\w*|emergency|urgent)\b",
    )
    .unwrap()
});

static POLL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:poll|vote|survey)\b|\b(?:which|what) (?:day|time|date)s? (?:works?|suits?)\b|\bwhen (?:is|are) (?:everyone|people|you all) (?:free|available)\b",
    )
    .unwrap()
});

static EVENT_VERB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:let'?s|we should|shall we|anyone (?:want|wants|up for|keen|interested)|who'?s (?:in|up for|coming|joining)|join (?:me|us)|organi[sz]e|plan(?:ning)?|host(?:ing)?|set up|meet ?up|get together)\b",
    )
    .unwrap()
});

static ACTIVITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(stroller walk|walk(?:ing)?|run(?:ning)?|jog(?:ging)?|yoga|pilates|hik(?:e|ing)|swim(?:ming)?|workout|boot ?camp|play ?date|picnic|coffee|brunch|stretch(?:ing)?|dance|zumba|spin class|bike ride|cycling|hiit|barre)\b",
    )
    .unwrap()
});

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").unwrap());

static RELATIVE_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(today|tonight|tomorrow)\b").unwrap());

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b").unwrap()
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b|\b(\d{1,2}):(\d{2})\b|\b(noon|midday)\b",
    )
    .unwrap()
});

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(half an hour)\b|\b(?:an|one) (hour)\b|\b(\d+(?:\.\d+)?)\s*(hours?|hrs?|minutes?|mins?)\b",
    )
    .unwrap()
});

static CAPACITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:max(?:imum)?|up to|limit(?:ed)? to|capacity(?: of)?|room for|spots? for)\s+(\d+)\b|\b(\d+)\s+(?:people|spots|moms|mums|participants|places|slots)\b",
    )
    .unwrap()
});

static ONLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:online|virtual(?:ly)?|zoom|google meet|teams call|video call|livestream)\b",
    )
    .unwrap()
});

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s<>"')]+"#).unwrap());

static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?i:at)\s+((?i:the\s+)?[A-Za-z][\w'-]*(?:\s+[A-Z][\w'-]*)*)").unwrap()
});

/// Words that end (or disqualify) a location phrase after "at".
const LOCATION_STOP_WORDS: &[&str] = &[
    "today", "tonight", "tomorrow", "noon", "midday", "midnight", "least", "all", "once",
    "first", "last", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday",
    "sunday", "am", "pm",
];

/// Confidence is counted in tenths so threshold comparisons are exact.
const GENERAL_CHAT_TENTHS: u32 = 2;
const POLL_TENTHS: u32 = 7;
const ALERT_TENTHS: u32 = 8;
const EVENT_MAX_TENTHS: u32 = 9;

pub struct KeywordIntentProvider {
    clock: Arc<dyn Clock>,
}

impl KeywordIntentProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Classify `text`. Never fails: no signal is `general_chat`.
    pub fn classify(&self, text: &str) -> IntentDetectionResult {
        let text = text.trim();
        if text.is_empty() {
            return IntentDetectionResult::general_chat(0.0, DetectionSource::Keyword);
        }

        if ALERT_RE.is_match(text) {
            return IntentDetectionResult::new(
                Intent::AdminAlert,
                tenths(ALERT_TENTHS),
                ExtractedEntities::default(),
                DetectionSource::Keyword,
            );
        }

        let entities = self.extract_entities(text);

        if POLL_RE.is_match(text) {
            return IntentDetectionResult::new(
                Intent::SchedulePoll,
                tenths(POLL_TENTHS),
                entities,
                DetectionSource::Keyword,
            );
        }

        let has_verb = EVENT_VERB_RE.is_match(text);
        let has_activity = ACTIVITY_RE.is_match(text);
        let has_when = entities.date.is_some() || entities.time.is_some();

        let is_event = (has_activity && (has_verb || has_when)) || (has_verb && has_when);
        if !is_event {
            return IntentDetectionResult::general_chat(
                tenths(GENERAL_CHAT_TENTHS),
                DetectionSource::Keyword,
            );
        }

        let base = if has_verb && has_activity { 5 } else { 4 };
        let score = (base + detail_count(&entities)).min(EVENT_MAX_TENTHS);
        IntentDetectionResult::new(
            Intent::CreateEvent,
            tenths(score),
            entities,
            DetectionSource::Keyword,
        )
    }

    /// Best-effort extraction of event fields from free text.
    pub fn extract_entities(&self, text: &str) -> ExtractedEntities {
        let activity = ACTIVITY_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase());
        let meeting_url = extract_meeting_url(text);
        let is_online = meeting_url.is_some() || ONLINE_RE.is_match(text);

        ExtractedEntities {
            title: activity.as_deref().map(activity_title),
            description: None,
            date: extract_date(text, self.clock.today()),
            time: extract_time(text),
            location: extract_location(text),
            duration_minutes: extract_duration(text),
            capacity: extract_capacity(text),
            tags: activity.map(|a| vec![a]),
            is_online: is_online.then_some(true),
            meeting_url,
        }
    }
}

#[async_trait]
impl IntentProvider for KeywordIntentProvider {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn detect(
        &self,
        text: &str,
        _context: &DetectionContext,
    ) -> Result<IntentDetectionResult, IntentError> {
        Ok(self.classify(text))
    }
}

fn tenths(n: u32) -> f64 {
    f64::from(n) / 10.0
}

fn detail_count(entities: &ExtractedEntities) -> u32 {
    [
        entities.date.is_some(),
        entities.time.is_some(),
        entities.location.is_some() || entities.is_online == Some(true),
        entities.duration_minutes.is_some() || entities.capacity.is_some(),
    ]
    .into_iter()
    .filter(|found| *found)
    .count() as u32
}

fn activity_title(activity: &str) -> String {
    let mut chars = activity.chars();
    match chars.next() {
        Some(first) => format!("{}{} meetup", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

fn extract_date(text: &str, today: NaiveDate) -> Option<String> {
    if let Some(iso) = ISO_DATE_RE.captures(text).and_then(|c| c.get(1)) {
        if NaiveDate::parse_from_str(iso.as_str(), "%Y-%m-%d").is_ok() {
            return Some(iso.as_str().to_string());
        }
    }

    if let Some(word) = RELATIVE_DAY_RE.captures(text).and_then(|c| c.get(1)) {
        let date = match word.as_str().to_lowercase().as_str() {
            "tomorrow" => today + Duration::days(1),
            _ => today,
        };
        return Some(date.format("%Y-%m-%d").to_string());
    }

    let weekday: Weekday = WEEKDAY_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())?;
    Some(next_weekday(today, weekday).format("%Y-%m-%d").to_string())
}

/// The next `weekday` strictly after `today`.
fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let current = today.weekday().num_days_from_monday();
    let target = weekday.num_days_from_monday();
    let ahead = match (target + 7 - current) % 7 {
        0 => 7,
        n => n,
    };
    today + Duration::days(i64::from(ahead))
}

fn extract_time(text: &str) -> Option<String> {
    for caps in TIME_RE.captures_iter(text) {
        if caps.get(6).is_some() {
            return Some("12:00".to_string());
        }

        if let (Some(hour), Some(meridiem)) = (caps.get(1), caps.get(3)) {
            let hour: u32 = hour.as_str().parse().ok()?;
            let minute: u32 = match caps.get(2) {
                Some(m) => m.as_str().parse().ok()?,
                None => 0,
            };
            if !(1..=12).contains(&hour) || minute > 59 {
                continue;
            }
            let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
            let hour = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            return Some(format!("{hour:02}:{minute:02}"));
        }

        if let (Some(hour), Some(minute)) = (caps.get(4), caps.get(5)) {
            let hour: u32 = hour.as_str().parse().ok()?;
            let minute: u32 = minute.as_str().parse().ok()?;
            if hour <= 23 && minute <= 59 {
                return Some(format!("{hour:02}:{minute:02}"));
            }
        }
    }
    None
}

fn extract_duration(text: &str) -> Option<u32> {
    let caps = DURATION_RE.captures(text)?;
    if caps.get(1).is_some() {
        return Some(30);
    }
    if caps.get(2).is_some() {
        return Some(60);
    }
    let amount: f64 = caps.get(3)?.as_str().parse().ok()?;
    let unit = caps.get(4)?.as_str().to_lowercase();
    let minutes = if unit.starts_with('h') {
        amount * 60.0
    } else {
        amount
    };
    let minutes = minutes.round();
    (minutes >= 1.0 && minutes <= f64::from(u32::MAX)).then_some(minutes as u32)
}

fn extract_capacity(text: &str) -> Option<u32> {
    let caps = CAPACITY_RE.captures(text)?;
    caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()
}

fn extract_meeting_url(text: &str) -> Option<String> {
    URL_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', '!', '?', ';']).to_string())
}

fn extract_location(text: &str) -> Option<String> {
    for caps in LOCATION_RE.captures_iter(text) {
        let Some(phrase) = caps.get(1) else { continue };
        let mut words = Vec::new();
        for word in phrase.as_str().split_whitespace() {
            let bare = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if LOCATION_STOP_WORDS.contains(&bare.as_str()) {
                break;
            }
            words.push(word);
        }
        // "the" on its own is not a place.
        if words.is_empty() || (words.len() == 1 && words[0].eq_ignore_ascii_case("the")) {
            continue;
        }
        let location = words.join(" ");
        return Some(
            location
                .trim_end_matches(['.', ',', '!', '?'])
                .to_string(),
        );
    }
    None
}
