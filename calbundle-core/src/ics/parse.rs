//! ICS parsing using the icalendar crate's parser.

use crate::event::{EventRecord, EventTime};
use crate::timezone::{VTimezones, known_zone};
use chrono::Duration;
use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};
use tracing::warn;

/// Scheduled events from one ICS file, plus how many entries were dropped.
#[derive(Debug, Default)]
pub struct ParsedEvents {
    pub events: Vec<EventRecord>,
    /// Non-VEVENT components, modified instances and VEVENTs without a
    /// summary or UID
    pub filtered: usize,
}

/// Parse ICS content into scheduled event records.
///
/// Errors when the content is not valid iCalendar or a VEVENT has no usable
/// DTSTART or DURATION; everything else that isn't a scheduled event with a
/// summary is counted in `filtered`.
pub fn parse_events(content: &str) -> Result<ParsedEvents, String> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| e.to_string())?;
    let zones = VTimezones::from_components(&calendar.components);

    let mut parsed = ParsedEvents::default();
    for component in &calendar.components {
        // RECURRENCE-ID marks a modified instance of a series, not an event of its own
        if component.name != "VEVENT" || component.find_prop("RECURRENCE-ID").is_some() {
            parsed.filtered += 1;
            continue;
        }
        match parse_vevent(component, &zones)? {
            Some(event) => parsed.events.push(event),
            None => parsed.filtered += 1,
        }
    }

    Ok(parsed)
}

/// Convert one VEVENT. `Ok(None)` means the entry is skipped by policy.
fn parse_vevent(vevent: &Component, zones: &VTimezones) -> Result<Option<EventRecord>, String> {
    let Some(summary) = vevent.find_prop("SUMMARY").map(text_value) else {
        return Ok(None);
    };
    if summary.is_empty() {
        return Ok(None);
    }

    let Some(uid) = vevent.find_prop("UID").map(|p| p.val.to_string()) else {
        warn!(summary = %summary, "Skipping VEVENT without UID");
        return Ok(None);
    };

    let start = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(|dpt| to_event_time(dpt, zones))
        .ok_or_else(|| format!("VEVENT {} has no valid DTSTART", uid))?;

    let end = match vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
    {
        Some(dpt) => to_event_time(dpt, zones),
        None => default_end(&start, vevent.find_prop("DURATION"))
            .ok_or_else(|| format!("VEVENT {} has an out-of-range DURATION", uid))?,
    };

    Ok(Some(EventRecord {
        uid,
        summary,
        description: vevent.find_prop("DESCRIPTION").map(text_value),
        location: vevent.find_prop("LOCATION").map(text_value),
        start,
        end,
        transparency: vevent.find_prop("TRANSP").map(|p| p.val.to_string()),
    }))
}

/// Plain text of a TEXT property.
///
/// Parameters such as LANGUAGE or ALTREP qualify the value but are not part
/// of it, so only the value is kept. The parser has already decoded escapes.
fn text_value(prop: &Property) -> String {
    prop.val.to_string()
}

/// End bound when DTEND is absent: DTSTART + DURATION, one day for all-day
/// events, otherwise a zero-length event. `None` if the end overflows.
fn default_end(start: &EventTime, duration: Option<&Property>) -> Option<EventTime> {
    if let Some(duration) = duration.and_then(|p| parse_duration(p.val.as_ref())) {
        return start.offset_by(duration);
    }
    match start {
        EventTime::Date(_) => start.offset_by(Duration::days(1)),
        _ => Some(start.clone()),
    }
}

/// Parse a DURATION value (P1D, PT1H30M, -PT15M, ...)
fn parse_duration(value: &str) -> Option<Duration> {
    let is_negative = value.starts_with('-');
    let duration_str = value.trim_start_matches(['-', '+']);

    let duration = iso8601::duration(duration_str).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let duration = Duration::from_std(std_duration).ok()?;

    Some(if is_negative { -duration } else { duration })
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info.
///
/// A TZID the tz database can't resolve is converted with the file's own
/// VTIMEZONE definition when it has one.
fn to_event_time(dpt: DatePerhapsTime, zones: &VTimezones) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                let from_vtimezone = known_zone(&tzid)
                    .is_none()
                    .then(|| zones.to_utc(&date_time, &tzid))
                    .flatten();
                match from_vtimezone {
                    Some(utc) => EventTime::DateTimeUtc(utc),
                    None => EventTime::DateTimeZoned {
                        datetime: date_time,
                        tzid,
                    },
                }
            }
        },
    }
}
