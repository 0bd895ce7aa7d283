//! SQLite snapshot of calendars and events.
//!
//! The snapshot is disposable: every run drops and recreates both tables.
//! `Store` is a cheap cloneable handle to a single connection owned by a
//! background thread, which serializes concurrent writers.

use std::path::Path;

use rusqlite::params;
use tokio_rusqlite::Connection;

use crate::calendar::Calendar;
use crate::error::IngestResult;
use crate::event::EventRecord;

const RESET_SCHEMA: &str = "
    DROP TABLE IF EXISTS event;
    DROP TABLE IF EXISTS calendar;

    CREATE TABLE calendar (
        id TEXT PRIMARY KEY,
        title TEXT
    );

    CREATE TABLE event (
        id TEXT,
        calendarId TEXT,
        summary TEXT,
        description TEXT,
        location TEXT,
        dtstart DATETIME,
        dtend DATETIME,
        fullday BOOLEAN,
        transp TEXT,
        FOREIGN KEY(calendarId) REFERENCES calendar(id),
        PRIMARY KEY (id, calendarId)
    );
";

/// A row of the `event` table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub id: String,
    pub calendar_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub dtstart: String,
    pub dtend: String,
    pub fullday: bool,
    pub transp: Option<String>,
}

impl EventRow {
    pub fn from_record(calendar_id: &str, event: &EventRecord) -> Self {
        EventRow {
            id: event.uid.clone(),
            calendar_id: calendar_id.to_string(),
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            dtstart: event.start.to_iso8601(),
            dtend: event.end.to_iso8601(),
            fullday: event.is_full_day(),
            transp: event.transparency.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Store {
    conn: Connection,
}

impl Store {
    pub async fn open(path: impl AsRef<Path>) -> IngestResult<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::with_connection(conn).await
    }

    pub async fn open_in_memory() -> IngestResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> IngestResult<Self> {
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        })
        .await?;
        Ok(Store { conn })
    }

    /// Drop and recreate the `calendar` and `event` tables.
    pub async fn reset_schema(&self) -> IngestResult<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(RESET_SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_calendar(&self, calendar: &Calendar) -> IngestResult<()> {
        let Calendar { id, title } = calendar.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO calendar(id, title) VALUES (?1, ?2)",
                    params![id, title],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Insert an event unless `(id, calendarId)` already exists.
    ///
    /// Returns false when the row was already there (first write wins).
    pub async fn insert_event(&self, row: EventRow) -> IngestResult<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO event(id, calendarId, summary, description, location, dtstart, dtend, fullday, transp) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        row.id,
                        row.calendar_id,
                        row.summary,
                        row.description,
                        row.location,
                        row.dtstart,
                        row.dtend,
                        row.fullday,
                        row.transp,
                    ],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    /// All calendar rows, ordered by id.
    pub async fn calendars(&self) -> IngestResult<Vec<Calendar>> {
        let calendars = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, title FROM calendar ORDER BY id")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(Calendar {
                            id: row.get(0)?,
                            title: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(calendars)
    }

    /// All event rows, ordered by calendar then id.
    pub async fn events(&self) -> IngestResult<Vec<EventRow>> {
        let events = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, calendarId, summary, description, location, dtstart, dtend, fullday, transp \
                     FROM event ORDER BY calendarId, id",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(EventRow {
                            id: row.get(0)?,
                            calendar_id: row.get(1)?,
                            summary: row.get(2)?,
                            description: row.get(3)?,
                            location: row.get(4)?,
                            dtstart: row.get(5)?,
                            dtend: row.get(6)?,
                            fullday: row.get(7)?,
                            transp: row.get(8)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(events)
    }
}
