//! Daily aggregation of the log.
//!
//! Entries are bucketed by the calendar date of their timestamp in the
//! offset they were recorded with; no timezone normalization happens.
//! Every date in the requested window gets a summary, zero-filled when
//! nothing was logged, and entries outside the window are ignored.

use crate::{DaySummary, Error, LogEntry, LogKind, Result};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Longest window that can be summarized (about ten years)
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// A contiguous range of calendar dates ending at `end`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    end: NaiveDate,
    days: u32,
}

impl DateWindow {
    pub fn single(date: NaiveDate) -> Self {
        Self { end: date, days: 1 }
    }

    /// The `days` dates ending at (and including) `end`.
    ///
    /// Fails when `days` exceeds [`MAX_WINDOW_DAYS`] or the window would
    /// start before the earliest representable date.
    pub fn trailing(end: NaiveDate, days: u32) -> Result<Self> {
        if days > MAX_WINDOW_DAYS {
            return Err(Error::InvalidInput(format!(
                "window of {} days is too long (at most {})",
                days, MAX_WINDOW_DAYS
            )));
        }
        if days > 0 && end.checked_sub_days(Days::new(u64::from(days - 1))).is_none() {
            return Err(Error::InvalidInput(format!(
                "window of {} days ending {} starts before the earliest supported date",
                days, end
            )));
        }
        Ok(Self { end, days })
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Dates in the window, oldest first
    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..u64::from(self.days))
            .rev()
            .filter_map(|offset| self.end.checked_sub_days(Days::new(offset)))
            .collect()
    }
}

/// Summarize `entries` into one record per date of `window`
pub fn summarize<'a, I>(entries: I, window: DateWindow) -> Vec<DaySummary>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut days: BTreeMap<NaiveDate, DaySummary> = window
        .dates()
        .into_iter()
        .map(|date| (date, DaySummary::empty(date)))
        .collect();

    for entry in entries {
        let Some(day) = days.get_mut(&entry.date()) else {
            continue;
        };
        let m = &entry.measures;
        match entry.kind {
            LogKind::Meal => {
                day.total_calories += m.calories;
                day.total_protein += m.protein;
                day.total_carbs += m.carbs;
                day.total_fats += m.fats;
            }
            LogKind::Activity => day.total_burned += m.calories,
            LogKind::Sleep => day.total_sleep += m.sleep_hours,
        }
    }

    days.into_values().collect()
}

/// Summary for a single date
pub fn summarize_day<'a, I>(entries: I, date: NaiveDate) -> DaySummary
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    summarize(entries, DateWindow::single(date))
        .pop()
        .unwrap_or_else(|| DaySummary::empty(date))
}

impl DaySummary {
    /// Calories left for the day: target plus burned minus eaten.
    /// Negative when the day is over budget.
    pub fn net_remaining(&self, target_calories: i64) -> f64 {
        (target_calories as f64 + self.total_burned) - self.total_calories
    }

    /// [`Self::net_remaining`] clamped at zero for display
    pub fn remaining_for_display(&self, target_calories: i64) -> f64 {
        self.net_remaining(target_calories).max(0.0)
    }

    /// Share of the calorie target eaten, capped at 100
    pub fn intake_percent(&self, target_calories: i64) -> u32 {
        if target_calories <= 0 {
            return 0;
        }
        let pct = (self.total_calories / target_calories as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u32
    }
}
