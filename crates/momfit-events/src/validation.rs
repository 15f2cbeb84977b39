use chrono::{NaiveDate, NaiveTime};
use momfit_core::{EventDetails, EventUpdate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MIN_TITLE_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const MIN_DURATION_MINUTES: u32 = 15;
pub const LONG_DURATION_MINUTES: u32 = 480;
pub const LARGE_CAPACITY: u32 = 1000;

static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Outcome of validating event fields. Every violation is listed, not just
/// the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    fn finish(mut self) -> Self {
        self.is_valid = self.errors.is_empty();
        self
    }
}

/// Validate a full set of event details against `today` (UTC).
pub fn validate_event(details: &EventDetails, today: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_title(&details.title, &mut report);
    check_description(&details.description, &mut report);
    if let Some(date) = details.date.as_deref() {
        check_date(date, today, &mut report);
    }
    if let Some(time) = details.time.as_deref() {
        check_time(time, &mut report);
    }
    if let Some(minutes) = details.duration_minutes {
        check_duration(minutes, &mut report);
    }
    if let Some(capacity) = details.capacity {
        check_capacity(capacity, &mut report);
    }

    let has_location = details
        .location
        .as_deref()
        .is_some_and(|l| !l.trim().is_empty());
    if !has_location && !details.is_online {
        report
            .suggestions
            .push("Add a location or mark the event as online".into());
    }
    if details.tags.as_ref().is_none_or(|t| t.is_empty()) {
        report
            .suggestions
            .push("Add tags so members can find the event".into());
    }
    if details.capacity.is_none() {
        report
            .suggestions
            .push("Set a capacity to help with planning".into());
    }

    report.finish()
}

/// Validate only the fields an update supplies.
pub fn validate_update(update: &EventUpdate, today: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Some(title) = update.title.as_deref() {
        check_title(title, &mut report);
    }
    if let Some(description) = update.description.as_deref() {
        check_description(description, &mut report);
    }
    if let Some(date) = update.date.as_deref() {
        check_date(date, today, &mut report);
    }
    if let Some(time) = update.time.as_deref() {
        check_time(time, &mut report);
    }
    if let Some(minutes) = update.duration_minutes {
        check_duration(minutes, &mut report);
    }
    if let Some(capacity) = update.capacity {
        check_capacity(capacity, &mut report);
    }

    report.finish()
}

/// Strict `YYYY-MM-DD` with a four-digit year.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if !DATE_RE.is_match(date) {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Strict 24-hour `HH:MM`.
pub fn parse_time(time: &str) -> Option<NaiveTime> {
    if !TIME_RE.is_match(time) {
        return None;
    }
    NaiveTime::parse_from_str(time, "%H:%M").ok()
}

fn check_title(title: &str, report: &mut ValidationReport) {
    if title.trim().chars().count() < MIN_TITLE_CHARS {
        report
            .errors
            .push(format!("Title must be at least {MIN_TITLE_CHARS} characters"));
    }
}

fn check_description(description: &str, report: &mut ValidationReport) {
    if description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        report.errors.push(format!(
            "Description must be at least {MIN_DESCRIPTION_CHARS} characters"
        ));
    }
}

fn check_date(date: &str, today: NaiveDate, report: &mut ValidationReport) {
    match parse_date(date) {
        None => report
            .errors
            .push("Date must be a valid YYYY-MM-DD date".into()),
        Some(d) if d < today => report.errors.push("Event date cannot be in the past".into()),
        Some(_) => {}
    }
}

fn check_time(time: &str, report: &mut ValidationReport) {
    if parse_time(time).is_none() {
        report
            .errors
            .push("Time must be in 24-hour HH:MM format".into());
    }
}

fn check_duration(minutes: u32, report: &mut ValidationReport) {
    if minutes < MIN_DURATION_MINUTES {
        report.errors.push(format!(
            "Duration must be at least {MIN_DURATION_MINUTES} minutes"
        ));
    } else if minutes > LONG_DURATION_MINUTES {
        report
            .warnings
            .push("Events longer than 8 hours can be hard to attend".into());
    }
}

fn check_capacity(capacity: u32, report: &mut ValidationReport) {
    if capacity < 1 {
        report.errors.push("Capacity must be at least 1".into());
    } else if capacity > LARGE_CAPACITY {
        report
            .warnings
            .push("Capacity over 1000 is unusually large".into());
    }
}
