//! Calendar identity: id and display title of a bundle.

pub mod info;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{CALDAV_CONTAINER_SUFFIX, EXCHANGE_CONTAINER_SUFFIX, TITLE_SEPARATOR};
use crate::error::IngestResult;
use info::{BundleInfo, ContainerInfo};

/// A calendar as written to the `calendar` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub id: String,
    pub title: String,
}

/// Kind of account container a bundle can be nested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    CalDav,
    Exchange,
}

impl AccountKind {
    /// Prefixes are applied in this order, so the last kind ends up outermost.
    pub const ALL: [AccountKind; 2] = [AccountKind::CalDav, AccountKind::Exchange];

    pub fn suffix(self) -> &'static str {
        match self {
            AccountKind::CalDav => CALDAV_CONTAINER_SUFFIX,
            AccountKind::Exchange => EXCHANGE_CONTAINER_SUFFIX,
        }
    }

    /// The container of this kind enclosing `bundle`, if any.
    ///
    /// When several ancestors carry the suffix, the outermost one wins.
    pub fn container_of(self, bundle: &Path) -> Option<PathBuf> {
        bundle
            .ancestors()
            .skip(1)
            .filter(|dir| {
                dir.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(self.suffix()))
            })
            .last()
            .map(Path::to_path_buf)
    }
}

impl Calendar {
    /// Resolve the id and display title of the bundle at `bundle`.
    ///
    /// The title is prefixed with the title of each enclosing account
    /// container: `"Work > Meetings"`. CalDAV and Exchange are checked
    /// independently, so a bundle under both gets both prefixes.
    pub async fn resolve(bundle: &Path) -> IngestResult<Self> {
        let BundleInfo { title, key } = BundleInfo::load(bundle).await?;

        let mut title = title;
        for kind in AccountKind::ALL {
            if let Some(container) = kind.container_of(bundle) {
                let account = ContainerInfo::load(&container).await?;
                title = format!("{}{}{}", account.title, TITLE_SEPARATOR, title);
            }
        }

        Ok(Calendar { id: key, title })
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    fn write_plist(dir: &Path, entries: &[(&str, &str)]) {
        std::fs::create_dir_all(dir).unwrap();
        let body: String = entries
            .iter()
            .map(|(k, v)| format!("\t<key>{k}</key>\n\t<string>{v}</string>\n"))
            .collect();
        let plist = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
<plist version=\"1.0\">\n<dict>\n{body}</dict>\n</plist>\n"
        );
        std::fs::write(dir.join("Info.plist"), plist).unwrap();
    }

    #[tokio::test]
    async fn test_plain_bundle_keeps_its_title() {
        let root = tempfile::tempdir().unwrap();
        let bundle = root.path().join("A1B2.calendar");
        write_plist(&bundle, &[("Title", "Personal"), ("Key", "CAL1")]);

        let calendar = Calendar::resolve(&bundle).await.unwrap();

        assert_eq!(
            calendar,
            Calendar {
                id: "CAL1".to_string(),
                title: "Personal".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_caldav_bundle_is_prefixed_with_account_title() {
        let root = tempfile::tempdir().unwrap();
        let account = root.path().join("F00D.caldav");
        let bundle = account.join("BEEF.calendar");
        write_plist(&account, &[("Title", "Work")]);
        write_plist(&bundle, &[("Title", "Meetings"), ("Key", "CAL2")]);

        let calendar = Calendar::resolve(&bundle).await.unwrap();

        assert_eq!(calendar.id, "CAL2");
        assert_eq!(calendar.title, "Work > Meetings");
    }

    #[tokio::test]
    async fn test_exchange_bundle_is_prefixed_with_account_title() {
        let root = tempfile::tempdir().unwrap();
        let account = root.path().join("1234.exchange");
        let bundle = account.join("5678.calendar");
        write_plist(&account, &[("Title", "Office")]);
        write_plist(&bundle, &[("Title", "Calendar"), ("Key", "CAL3")]);

        let calendar = Calendar::resolve(&bundle).await.unwrap();

        assert_eq!(calendar.title, "Office > Calendar");
    }

    #[tokio::test]
    async fn test_both_container_kinds_apply_both_prefixes() {
        let root = tempfile::tempdir().unwrap();
        let exchange = root.path().join("X.exchange");
        let caldav = exchange.join("D.caldav");
        let bundle = caldav.join("C.calendar");
        write_plist(&exchange, &[("Title", "Exchange")]);
        write_plist(&caldav, &[("Title", "CalDAV")]);
        write_plist(&bundle, &[("Title", "Team"), ("Key", "CAL4")]);

        let calendar = Calendar::resolve(&bundle).await.unwrap();

        assert_eq!(calendar.title, "Exchange > CalDAV > Team");
    }

    #[tokio::test]
    async fn test_missing_bundle_metadata_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let bundle = root.path().join("empty.calendar");
        std::fs::create_dir_all(&bundle).unwrap();

        let err = Calendar::resolve(&bundle).await.unwrap_err();

        assert!(matches!(err, IngestError::Io { .. }));
    }

    #[tokio::test]
    async fn test_missing_container_metadata_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let bundle = root.path().join("bare.caldav").join("C.calendar");
        write_plist(&bundle, &[("Title", "Orphan"), ("Key", "CAL5")]);

        assert!(Calendar::resolve(&bundle).await.is_err());
    }

    #[tokio::test]
    async fn test_metadata_without_key_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let bundle = root.path().join("nokey.calendar");
        write_plist(&bundle, &[("Title", "Keyless")]);

        let err = Calendar::resolve(&bundle).await.unwrap_err();

        assert!(matches!(err, IngestError::Metadata { .. }));
    }

    #[test]
    fn test_container_lookup_uses_outermost_marker() {
        let bundle = Path::new("/store/a.caldav/b.caldav/c.calendar");

        assert_eq!(
            AccountKind::CalDav.container_of(bundle),
            Some(PathBuf::from("/store/a.caldav"))
        );
        assert_eq!(AccountKind::Exchange.container_of(bundle), None);
    }
}
