//! Writing resolved calendars and parsed events into the store.

use crate::calendar::Calendar;
use crate::error::IngestResult;
use crate::event::EventRecord;
use crate::store::{EventRow, Store};

/// Outcome of writing a batch of events.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventWrites {
    pub inserted: usize,
    /// Events whose `(id, calendarId)` was already stored
    pub duplicates: usize,
}

impl EventWrites {
    pub fn add(&mut self, other: EventWrites) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
    }
}

/// Write the calendar's row. Must happen before any of its events.
pub async fn write_calendar(store: &Store, calendar: &Calendar) -> IngestResult<()> {
    store.insert_calendar(calendar).await
}

/// Insert each event unless its key already exists for this calendar.
pub async fn write_events(
    store: &Store,
    calendar_id: &str,
    events: &[EventRecord],
) -> IngestResult<EventWrites> {
    let mut writes = EventWrites::default();

    for event in events {
        if store
            .insert_event(EventRow::from_record(calendar_id, event))
            .await?
        {
            writes.inserted += 1;
        } else {
            writes.duplicates += 1;
        }
    }

    Ok(writes)
}
