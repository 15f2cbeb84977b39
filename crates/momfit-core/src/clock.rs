use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for every time-relative rule (past-date checks, default
/// start times, upcoming-event queries, relative dates in chat text).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Pin the clock to an RFC 3339 instant.
    pub fn at(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        let instant = DateTime::parse_from_rfc3339(rfc3339)?;
        Ok(Self(instant.with_timezone(&Utc)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_its_instant() {
        let clock = FixedClock::at("2026-03-14T22:30:00Z").unwrap();
        assert_eq!(clock.now().to_rfc3339(), "2026-03-14T22:30:00+00:00");
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }

    #[test]
    fn fixed_clock_normalises_offsets_to_utc() {
        let clock = FixedClock::at("2026-03-15T01:30:00+02:00").unwrap();
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }
}
