//! Application state: the profile and the log, mirrored to a store.
//!
//! Every change is written through immediately. The profile and the log
//! are saved whole under their own keys.

use crate::store::{self, KeyValueStore, LOGS_KEY, PROFILE_KEY};
use crate::summary::{self, DateWindow};
use crate::{DaySummary, Error, LogBook, LogEntry, Result, UserProfile};
use chrono::NaiveDate;

pub struct Tracker<S: KeyValueStore> {
    store: S,
    profile: Option<UserProfile>,
    log: LogBook,
}

impl<S: KeyValueStore> Tracker<S> {
    /// Load state from `store`.
    ///
    /// An unreadable profile is dropped with a warning so the user can
    /// onboard again. An unreadable log is an error: saving over it
    /// would lose every entry.
    pub fn open(store: S) -> Result<Self> {
        let profile = match store::load_value::<_, UserProfile>(&store, PROFILE_KEY) {
            Ok(profile) => profile,
            Err(e @ Error::State(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Failed to load profile: {}. Treating as not onboarded.", e);
                None
            }
        };

        let log = store::load_value::<_, LogBook>(&store, LOGS_KEY)
            .map_err(|e| Error::State(format!("log collection is unreadable: {}", e)))?
            .unwrap_or_default();

        tracing::debug!(
            "Opened tracker (profile: {}, entries: {})",
            profile.is_some(),
            log.len()
        );

        Ok(Self {
            store,
            profile,
            log,
        })
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// The profile, or [`Error::MissingProfile`] before onboarding
    pub fn require_profile(&self) -> Result<&UserProfile> {
        self.profile.as_ref().ok_or(Error::MissingProfile)
    }

    pub fn log(&self) -> &LogBook {
        &self.log
    }

    /// Replace the profile and persist it
    pub fn set_profile(&mut self, profile: UserProfile) -> Result<()> {
        store::save_value(&mut self.store, PROFILE_KEY, &profile)?;
        tracing::info!(
            "Saved profile for {} ({} kcal target)",
            profile.name(),
            profile.targets().calories
        );
        self.profile = Some(profile);
        Ok(())
    }

    /// Append an entry and persist the whole collection
    /// Nothing changes in memory when the save fails.
    pub fn record(&mut self, entry: LogEntry) -> Result<&LogEntry> {
        let mut next = self.log.clone();
        next.append(entry);
        store::save_value(&mut self.store, LOGS_KEY, &next)?;
        self.log = next;
        tracing::info!("Recorded entry ({} total)", self.log.len());
        Ok(&self.log.entries()[self.log.len() - 1])
    }

    /// Forget everything, in the store and in memory
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear()?;
        self.profile = None;
        self.log = LogBook::new();
        tracing::info!("Reset all stored data");
        Ok(())
    }

    pub fn today(&self, date: NaiveDate) -> DaySummary {
        summary::summarize_day(&self.log, date)
    }

    pub fn history(&self, end: NaiveDate, days: u32) -> Result<Vec<DaySummary>> {
        let window = DateWindow::trailing(end, days)?;
        Ok(summary::summarize(&self.log, window))
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
