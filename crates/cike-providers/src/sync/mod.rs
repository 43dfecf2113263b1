//! Sync engines.
//!
//! - [`remote`]: Mode A, replaces the future window of a hosted calendar.
//! - [`file`]: Mode B, rewrites a portable iCalendar file.

pub mod file;
pub mod remote;

pub use file::{ExportPlan, ExportReport, export_to_file, plan_export};
pub use remote::{
    CategoryMap, NewEntry, RemoteCalendar, RemoteEntry, RemoteSyncPlan, RemoteSyncReport,
    plan_remote_sync, sync_remote,
};
