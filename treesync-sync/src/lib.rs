//! # treesync-sync
//!
//! Reconciliation engine and sync orchestration.
//!
//! Call [`pipeline::run`] with a [`Remote`] session to converge the remote
//! server directory onto the local tree, or [`pipeline::plan`] to only see
//! what would change. The pure tree algorithms live in [`reconcile`].

pub mod error;
pub mod executor;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod scan;

pub use error::SyncError;
pub use executor::Action;
pub use pipeline::{SyncOptions, SyncReport};
pub use reconcile::{create_update_list, merge_entries, merge_modified, recursive_change, Plan, PlanItem};
pub use remote::{DirRemote, FtpRemote, Remote};
