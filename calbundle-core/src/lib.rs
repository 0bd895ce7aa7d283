//! Core of the calbundle ingestion pipeline.
//!
//! This crate turns a desktop calendar store (a tree of `.calendar` bundles,
//! optionally nested in `.caldav` / `.exchange` account containers) into a
//! SQLite snapshot:
//! - `scan` finds calendar bundles
//! - `calendar` resolves each bundle's id and display title
//! - `ics` parses the bundle's event files
//! - `store` and `reconcile` write rows with first-write-wins dedup
//! - `ingest` drives all of the above concurrently

pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ics;
pub mod ingest;
pub mod reconcile;
pub mod scan;
pub mod store;
pub mod timezone;

pub use calendar::Calendar;
pub use config::IngestConfig;
pub use error::{IngestError, IngestResult};
pub use event::{EventRecord, EventTime};
pub use ingest::IngestStats;
pub use store::Store;
