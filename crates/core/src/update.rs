//! Single-document update: read, gate, compute, write
//!
//! [`Updater::prepare`] and [`Updater::commit`] are separate so a caller can
//! mark the document as "being written" in between, which is how the
//! watcher recognises the change notification caused by its own write.

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::Result;
use crate::format::DateFormatter;
use crate::guard::{is_too_soon, previous_instant, seconds_since};
use crate::history::{compute_new_value, is_log_mode};
use crate::host::{DocumentHost, Metadata};
use crate::policy::{evaluate, is_truthy, BlockReason, Verdict};
use crate::value::FieldValue;
use chrono::{DateTime, FixedOffset};
use std::fmt;
use tracing::{debug, info};

/// Why a document was left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Policy(BlockReason),
    /// Last recorded stamp is within the minimum interval
    TooSoon { seconds: i64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Policy(reason) => write!(f, "{}", reason),
            SkipReason::TooSoon { seconds } => write!(f, "last update {}s ago", seconds),
        }
    }
}

/// A computed write, not yet applied
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    /// New tracked field value
    pub value: FieldValue,
    /// Instant the value was computed for
    pub now: DateTime<FixedOffset>,
    /// Seconds since the previous stamp; `None` when there was none
    pub gap_secs: Option<i64>,
}

/// Result of the read-and-decide half
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Write(UpdatePlan),
    Skip(SkipReason),
}

/// Result of a full update
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Written(FieldValue),
    Skipped(SkipReason),
}

/// Composes policy, guard, history and the host mutation for one document
pub struct Updater<H, C = SystemClock> {
    host: H,
    clock: C,
    settings: Settings,
    formatter: DateFormatter,
}

impl<H: DocumentHost, C: Clock> Updater<H, C> {
    pub fn new(host: H, clock: C, settings: Settings) -> Self {
        let formatter = settings.formatter();
        Self {
            host,
            clock,
            settings,
            formatter,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Re-read the document and decide what, if anything, to write
    pub fn prepare(&self, id: &str) -> Result<Prepared> {
        let metadata = self.host.read_metadata(id)?;
        let now = self.clock.now();
        Ok(self.plan(id, &metadata, &now))
    }

    /// Decide against an explicit snapshot and instant
    pub fn plan(&self, id: &str, metadata: &Metadata, now: &DateTime<FixedOffset>) -> Prepared {
        let settings = &self.settings;

        if let Verdict::Block(reason) = evaluate(metadata, settings, id) {
            debug!("Skipping {}: {}", id, reason);
            return Prepared::Skip(SkipReason::Policy(reason));
        }

        let log_mode = is_log_mode(metadata, settings);
        let previous = metadata.get(&settings.frontmatter_property);
        let latest = previous_instant(
            previous,
            log_mode,
            settings.history_newest_first,
            &self.formatter,
            now,
        );

        let gap_secs = seconds_since(latest.as_ref(), now);
        if let Some(seconds) = gap_secs.filter(|_| is_too_soon(gap_secs)) {
            debug!("Skipping {}: last update {}s ago", id, seconds);
            return Prepared::Skip(SkipReason::TooSoon { seconds });
        }

        let value = compute_new_value(
            previous,
            latest.as_ref(),
            now,
            settings,
            &self.formatter,
            log_mode,
        );

        Prepared::Write(UpdatePlan {
            value,
            now: *now,
            gap_secs,
        })
    }

    /// Apply a plan through the host
    ///
    /// Also fills the created-date field once, unless the user restricted
    /// writes to existing fields.
    pub fn commit(&self, id: &str, plan: &UpdatePlan) -> Result<()> {
        let settings = &self.settings;

        let created = if settings.created_date_property.is_empty() || settings.only_update_existing {
            None
        } else {
            Some(self.formatter.format(&self.host.created_at(id)?).to_value())
        };

        let value = plan.value.to_value();
        self.host.mutate_metadata(id, &mut |metadata| {
            metadata.insert(settings.frontmatter_property.clone(), value.clone());

            if let Some(created) = &created {
                if !is_truthy(metadata.get(&settings.created_date_property)) {
                    metadata.insert(settings.created_date_property.clone(), created.clone());
                }
            }
        })?;

        info!("Updated {} {} = {}", id, settings.frontmatter_property, plan.value);
        Ok(())
    }

    /// Prepare and commit in one go
    pub fn run_once(&self, id: &str) -> Result<UpdateOutcome> {
        match self.prepare(id)? {
            Prepared::Skip(reason) => Ok(UpdateOutcome::Skipped(reason)),
            Prepared::Write(plan) => {
                self.commit(id, &plan)?;
                Ok(UpdateOutcome::Written(plan.value))
            }
        }
    }
}
