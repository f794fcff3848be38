//! Timestamp maintenance engine for document frontmatter
//!
//! This crate provides:
//! - Moment-style date formatting and strict parsing
//! - Update policy evaluation (exclusions, existing-field requirement)
//! - The minimum-interval guard against sync oscillation
//! - History log computation (time buckets, ordering, trimming)
//! - Settings and the on-disk config store
//! - The host boundary plus a Markdown vault implementation
//! - The updater that composes all of the above into a single write

pub mod bucket;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod guard;
pub mod history;
pub mod host;
pub mod policy;
pub mod store;
pub mod update;
pub mod value;
pub mod vault;

// Re-exports
pub use bucket::{BucketKey, Frequency};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigStore, Settings};
pub use error::{Error, Result};
pub use format::DateFormatter;
pub use guard::MIN_UPDATE_INTERVAL_SECS;
pub use host::{DocumentHost, MemoryHost, Metadata};
pub use policy::{BlockReason, Verdict};
pub use update::{Prepared, SkipReason, UpdateOutcome, UpdatePlan, Updater};
pub use value::{FieldValue, Stamp};
pub use vault::Vault;
