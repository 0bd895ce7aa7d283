//! Canonical event records produced by the ICS parser.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use tracing::warn;

use crate::timezone::known_zone;

/// One scheduled event (VEVENT) ready to be written to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// Raw TRANSP value (OPAQUE / TRANSPARENT), passed through as-is
    pub transparency: Option<String>,
}

impl EventRecord {
    /// Date-only start bound means an all-day event.
    pub fn is_full_day(&self) -> bool {
        self.start.is_date_only()
    }
}

/// A DTSTART/DTEND bound as written in the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    pub fn is_date_only(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Resolve to an absolute instant.
    ///
    /// Dates are midnight UTC. TZIDs may be IANA or Windows zone names.
    /// Floating times and times in a TZID neither knows are read as UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => d.and_time(chrono::NaiveTime::MIN).and_utc(),
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(naive) => naive.and_utc(),
            EventTime::DateTimeZoned { datetime, tzid } => match known_zone(tzid) {
                Some(tz) => tz
                    .from_local_datetime(datetime)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    // Nonexistent local time (DST gap)
                    .unwrap_or_else(|| datetime.and_utc()),
                None => {
                    warn!(tzid = %tzid, "Unknown TZID, reading time as UTC");
                    datetime.and_utc()
                }
            },
        }
    }

    /// ISO-8601 in UTC with millisecond precision, e.g. `2024-01-01T12:00:00.000Z`.
    pub fn to_iso8601(&self) -> String {
        self.to_utc().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Shift by a duration, keeping the kind of bound. `None` when the
    /// result falls outside chrono's representable range.
    pub fn offset_by(&self, duration: Duration) -> Option<EventTime> {
        let shifted = match self {
            EventTime::Date(d) => {
                // Whole days only; a sub-day DURATION on a date start becomes a timed end.
                if duration.num_seconds() % 86_400 == 0 {
                    EventTime::Date(d.checked_add_signed(duration)?)
                } else {
                    EventTime::DateTimeFloating(
                        d.and_time(chrono::NaiveTime::MIN)
                            .checked_add_signed(duration)?,
                    )
                }
            }
            EventTime::DateTimeUtc(dt) => EventTime::DateTimeUtc(dt.checked_add_signed(duration)?),
            EventTime::DateTimeFloating(naive) => {
                EventTime::DateTimeFloating(naive.checked_add_signed(duration)?)
            }
            EventTime::DateTimeZoned { datetime, tzid } => EventTime::DateTimeZoned {
                datetime: datetime.checked_add_signed(duration)?,
                tzid: tzid.clone(),
            },
        };
        Some(shifted)
    }
}
