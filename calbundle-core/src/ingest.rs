//! The ingestion run: scan, resolve, parse and write every calendar.
//!
//! Calendars are independent units of work, and so are the event files
//! within a calendar. All of them share one `Store` handle. A calendar's row
//! is always written before its event files are read.

use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::calendar::Calendar;
use crate::error::{IngestError, IngestResult};
use crate::ics;
use crate::reconcile::{self, EventWrites};
use crate::scan::find_calendar_bundles;
use crate::store::Store;

/// Totals of an ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub calendars: usize,
    pub events_inserted: usize,
    /// Events skipped because their `(id, calendarId)` was already written
    pub duplicates_skipped: usize,
    /// Entries that are not scheduled events, or lack a summary or UID
    pub entries_filtered: usize,
}

impl IngestStats {
    fn add(&mut self, other: IngestStats) {
        self.calendars += other.calendars;
        self.events_inserted += other.events_inserted;
        self.duplicates_skipped += other.duplicates_skipped;
        self.entries_filtered += other.entries_filtered;
    }

    fn add_writes(&mut self, writes: EventWrites) {
        self.events_inserted += writes.inserted;
        self.duplicates_skipped += writes.duplicates;
    }
}

/// Recreate the schema and ingest every calendar bundle under `source`.
///
/// Every calendar runs to completion or failure. If any failed, the error
/// reports how many and the first one; rows of the calendars that succeeded
/// stay in the store.
pub async fn run(source: &Path, store: &Store) -> IngestResult<IngestStats> {
    store.reset_schema().await?;

    let bundles = find_calendar_bundles(source).await?;
    info!(
        source = %source.display(),
        bundles = bundles.len(),
        "Discovered calendar bundles"
    );

    let mut tasks = JoinSet::new();
    for bundle in bundles {
        let store = store.clone();
        tasks.spawn(async move {
            let result = ingest_calendar(&store, &bundle).await;
            (bundle, result)
        });
    }

    let mut stats = IngestStats::default();
    let mut failures: Vec<(PathBuf, IngestError)> = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        let (bundle, result) = joined.map_err(|e| IngestError::Task(e.to_string()))?;
        match result {
            Ok(calendar_stats) => stats.add(calendar_stats),
            Err(e) => {
                error!(bundle = %bundle.display(), error = %e, "Failed to ingest calendar");
                failures.push((bundle, e));
            }
        }
    }

    let failed = failures.len();
    if let Some((path, first)) = failures.into_iter().next() {
        return Err(IngestError::CalendarsFailed {
            failed,
            path,
            first: Box::new(first),
        });
    }

    Ok(stats)
}

/// Resolve and write one calendar, then ingest its event files concurrently.
async fn ingest_calendar(store: &Store, bundle: &Path) -> IngestResult<IngestStats> {
    let calendar = Calendar::resolve(bundle).await?;
    reconcile::write_calendar(store, &calendar).await?;

    let files = ics::event_files(bundle).await?;
    debug!(calendar = %calendar, files = files.len(), "Reading event files");

    let mut tasks = JoinSet::new();
    for file in files {
        let store = store.clone();
        let calendar_id = calendar.id.clone();
        tasks.spawn(async move { ingest_event_file(&store, &calendar_id, &file).await });
    }

    let mut stats = IngestStats {
        calendars: 1,
        ..IngestStats::default()
    };
    // An error here drops the JoinSet, aborting this calendar's remaining files
    while let Some(joined) = tasks.join_next().await {
        let file_stats = joined.map_err(|e| IngestError::Task(e.to_string()))??;
        stats.add(file_stats);
    }

    info!(
        calendar = %calendar,
        events = stats.events_inserted,
        duplicates = stats.duplicates_skipped,
        "Ingested calendar"
    );

    Ok(stats)
}

async fn ingest_event_file(
    store: &Store,
    calendar_id: &str,
    file: &Path,
) -> IngestResult<IngestStats> {
    let parsed = ics::read_event_file(file).await?;
    let writes = reconcile::write_events(store, calendar_id, &parsed.events).await?;

    let mut stats = IngestStats {
        entries_filtered: parsed.filtered,
        ..IngestStats::default()
    };
    stats.add_writes(writes);
    Ok(stats)
}
