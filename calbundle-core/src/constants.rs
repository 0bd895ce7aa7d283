//! Names and suffixes of the on-disk calendar store layout.

/// Directory suffix marking a calendar bundle.
pub const CALENDAR_BUNDLE_SUFFIX: &str = ".calendar";

/// Directory suffix marking a CalDAV account container.
pub const CALDAV_CONTAINER_SUFFIX: &str = ".caldav";

/// Directory suffix marking an Exchange account container.
pub const EXCHANGE_CONTAINER_SUFFIX: &str = ".exchange";

/// Metadata file present in every bundle and account container.
pub const INFO_PLIST: &str = "Info.plist";

/// Subdirectory of a calendar bundle holding its event files.
pub const EVENTS_DIR: &str = "Events";

/// Extension of event files inside `Events/`.
pub const EVENT_FILE_EXTENSION: &str = "ics";

/// Separator between an account title and a calendar title.
pub const TITLE_SEPARATOR: &str = " > ";
