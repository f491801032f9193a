//! Core domain types for fitlog.
//!
//! This module defines the fundamental types used throughout the system:
//! - The user profile and its derived daily targets
//! - Log entries (meals, sleep, activity) and their measures
//! - Daily summaries derived from the log
//!
//! Field aliases accept the camelCase names written by the original
//! browser app, so unversioned exports still load.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Profile Types
// ============================================================================

/// Biological sex category used by the BMR formula
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// Self-reported activity level
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

/// Body-weight goal
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseWeight,
    Maintain,
    GainWeight,
}

/// The fields a user supplies at onboarding
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileInput {
    pub name: String,
    pub age: u32,
    #[serde(alias = "weight")]
    pub weight_kg: f64,
    #[serde(alias = "height")]
    pub height_cm: f64,
    #[serde(alias = "gender")]
    pub sex: Sex,
    #[serde(alias = "activityLevel")]
    pub activity_level: ActivityLevel,
    pub goal: Goal,
}

/// Daily energy and macro targets (kcal and grams)
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Targets {
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fats: i64,
}

/// A validated profile with its targets
///
/// Targets are a cache of the input fields. Deserialization goes through
/// [`ProfileInput`] so stored targets are always recomputed on load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "ProfileInput")]
pub struct UserProfile {
    #[serde(flatten)]
    pub(crate) input: ProfileInput,
    pub(crate) targets: Targets,
}

impl UserProfile {
    pub fn input(&self) -> &ProfileInput {
        &self.input
    }

    pub fn name(&self) -> &str {
        &self.input.name
    }

    pub fn targets(&self) -> Targets {
        self.targets
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Category of a log entry
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Meal,
    Sleep,
    Activity,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Meal => "meal",
            LogKind::Sleep => "sleep",
            LogKind::Activity => "activity",
        }
    }

    /// Parse a kind name as written by users or the advice service
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "meal" | "food" => Some(LogKind::Meal),
            "sleep" => Some(LogKind::Sleep),
            "activity" | "exercise" => Some(LogKind::Activity),
            _ => None,
        }
    }
}

/// Numeric measures attached to a log entry. Missing values are zero.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Measures {
    /// Intake for meals, expenditure for activity
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
    #[serde(default, alias = "sleepHours")]
    pub sleep_hours: f64,
    #[serde(default, alias = "durationMinutes")]
    pub duration_minutes: f64,
}

impl Measures {
    /// Keep only the measures meaningful for `kind`.
    ///
    /// Negative and non-finite values become zero.
    pub fn for_kind(self, kind: LogKind) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        match kind {
            LogKind::Meal => Measures {
                calories: clean(self.calories),
                protein: clean(self.protein),
                carbs: clean(self.carbs),
                fats: clean(self.fats),
                ..Measures::default()
            },
            LogKind::Sleep => Measures {
                sleep_hours: clean(self.sleep_hours),
                ..Measures::default()
            },
            LogKind::Activity => Measures {
                calories: clean(self.calories),
                duration_minutes: clean(self.duration_minutes),
                ..Measures::default()
            },
        }
    }
}

/// One recorded meal, sleep or activity event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: String,
    /// Recorded with the local offset in effect at the time
    #[serde(alias = "date")]
    pub timestamp: DateTime<FixedOffset>,
    #[serde(alias = "type")]
    pub kind: LogKind,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub measures: Measures,
}

impl LogEntry {
    /// Create an entry with a fresh id. Irrelevant measures are dropped.
    pub fn new(
        kind: LogKind,
        description: impl Into<String>,
        measures: Measures,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            kind,
            description: description.into(),
            measures: measures.for_kind(kind),
        }
    }

    /// Calendar date in the offset the entry was recorded with
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Structured data extracted from a chat message, not yet an entry
#[derive(Clone, Debug, PartialEq)]
pub struct LogDraft {
    pub kind: LogKind,
    pub description: Option<String>,
    pub measures: Measures,
}

impl LogDraft {
    /// Turn the draft into an entry, falling back to the user's own words
    /// when the service gave no description.
    pub fn into_entry(self, user_text: &str, now: DateTime<FixedOffset>) -> LogEntry {
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| user_text.trim().to_string());
        LogEntry::new(self.kind, description, self.measures, now)
    }
}

// ============================================================================
// Summary Types
// ============================================================================

/// Per-day roll-up of the log. Derived on demand, never stored.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total_calories: f64,
    pub total_burned: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
    pub total_sleep: f64,
}

impl DaySummary {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_calories: 0.0,
            total_burned: 0.0,
            total_protein: 0.0,
            total_carbs: 0.0,
            total_fats: 0.0,
            total_sleep: 0.0,
        }
    }
}
