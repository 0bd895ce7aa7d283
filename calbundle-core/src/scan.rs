//! Discovery of calendar bundles in a store.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::CALENDAR_BUNDLE_SUFFIX;
use crate::error::{IngestError, IngestResult};

/// Find every `.calendar` directory below `root`, at any depth.
///
/// Bundles are leaves: the walk does not descend into them. A missing root
/// yields no bundles.
pub async fn find_calendar_bundles(root: &Path) -> IngestResult<Vec<PathBuf>> {
    let root = root.to_path_buf();

    tokio::task::spawn_blocking(move || scan(&root))
        .await
        .map_err(|e| IngestError::Task(e.to_string()))?
}

fn scan(root: &Path) -> IngestResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut bundles = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(true).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            IngestError::io(path, e.into())
        })?;

        if entry.file_type().is_dir() && is_calendar_bundle(entry.path()) {
            bundles.push(entry.into_path());
            walker.skip_current_dir();
        }
    }

    bundles.sort();
    Ok(bundles)
}

fn is_calendar_bundle(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(CALENDAR_BUNDLE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_root_has_no_bundles() {
        let dir = tempfile::tempdir().unwrap();

        let bundles = find_calendar_bundles(&dir.path().join("nope.icbu"))
            .await
            .unwrap();

        assert!(bundles.is_empty());
    }

    #[tokio::test]
    async fn test_finds_nested_bundles_without_descending_into_them() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("local.calendar/Events")).unwrap();
        std::fs::create_dir_all(root.join("acct.caldav/work.calendar")).unwrap();
        std::fs::create_dir_all(root.join("acct.exchange/deep/team.calendar")).unwrap();
        std::fs::create_dir_all(root.join("local.calendar/inner.calendar")).unwrap();
        std::fs::create_dir_all(root.join("acct.caldav/Attachments")).unwrap();
        std::fs::write(root.join("file.calendar"), "not a directory").unwrap();

        let bundles = find_calendar_bundles(root).await.unwrap();

        assert_eq!(
            bundles,
            vec![
                root.join("acct.caldav/work.calendar"),
                root.join("acct.exchange/deep/team.calendar"),
                root.join("local.calendar"),
            ]
        );
    }
}
