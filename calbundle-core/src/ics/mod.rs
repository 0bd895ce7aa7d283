//! Reading a calendar bundle's event files.
//!
//! Each bundle keeps its events as `.ics` files in a flat `Events/` directory.

mod parse;

pub use parse::{ParsedEvents, parse_events};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{EVENT_FILE_EXTENSION, EVENTS_DIR};
use crate::error::{IngestError, IngestResult};

/// List the `.ics` files in a bundle's `Events/` directory (non-recursive).
///
/// A bundle without an `Events/` directory has no events.
pub async fn event_files(bundle: &Path) -> IngestResult<Vec<PathBuf>> {
    let events_dir = bundle.join(EVENTS_DIR);

    let mut entries = match tokio::fs::read_dir(&events_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(IngestError::io(events_dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IngestError::io(&events_dir, e))?
    {
        let path = entry.path();
        if !path.extension().is_some_and(|e| e == EVENT_FILE_EXTENSION) {
            continue;
        }
        // Follows symlinks, unlike DirEntry::file_type
        let is_file = tokio::fs::metadata(&path)
            .await
            .map_err(|e| IngestError::io(&path, e))?
            .is_file();
        if is_file {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Read and parse one event file.
pub async fn read_event_file(path: &Path) -> IngestResult<ParsedEvents> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IngestError::io(path, e))?;

    let parsed = parse_events(&content).map_err(|message| IngestError::IcsParse {
        path: path.to_path_buf(),
        message,
    })?;

    debug!(
        file = %path.display(),
        events = parsed.events.len(),
        filtered = parsed.filtered,
        "Parsed event file"
    );

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_events_dir_has_no_files() {
        let dir = tempfile::tempdir().unwrap();

        let files = event_files(dir.path()).await.unwrap();

        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_only_top_level_ics_files_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("Events");
        std::fs::create_dir_all(events.join("nested")).unwrap();
        std::fs::write(events.join("a.ics"), "").unwrap();
        std::fs::write(events.join("b.ics"), "").unwrap();
        std::fs::write(events.join("notes.txt"), "").unwrap();
        std::fs::write(events.join("nested/c.ics"), "").unwrap();

        let files = event_files(dir.path()).await.unwrap();

        assert_eq!(files, vec![events.join("a.ics"), events.join("b.ics")]);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = read_event_file(&dir.path().join("missing.ics"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Io { .. }));
    }
}
