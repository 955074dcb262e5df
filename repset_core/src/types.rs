//! Core domain types for the Repset workout system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Catalog exercises and their classification enums
//! - Template exercises (one placement of an exercise inside a template)
//! - Workout templates authored by coaches
//! - Workout logs, the durable record of a finished session

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Classification Enums
// ============================================================================

/// Difficulty level shared by catalog exercises and templates
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
    #[default]
    AllLevels,
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::AllLevels => "all_levels",
        };
        f.pad(s)
    }
}

impl FromStr for DifficultyLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            "all_levels" | "all" => Ok(DifficultyLevel::AllLevels),
            other => Err(Error::Validation(format!(
                "unknown difficulty level '{}'",
                other
            ))),
        }
    }
}

/// Coarse category of a template, used for filtering only
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FocusArea {
    #[default]
    Strength,
    Mobility,
    Cardio,
    Hybrid,
}

impl fmt::Display for FocusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FocusArea::Strength => "strength",
            FocusArea::Mobility => "mobility",
            FocusArea::Cardio => "cardio",
            FocusArea::Hybrid => "hybrid",
        };
        f.pad(s)
    }
}

impl FromStr for FocusArea {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strength" => Ok(FocusArea::Strength),
            "mobility" => Ok(FocusArea::Mobility),
            "cardio" => Ok(FocusArea::Cardio),
            "hybrid" => Ok(FocusArea::Hybrid),
            other => Err(Error::Validation(format!("unknown focus area '{}'", other))),
        }
    }
}

// ============================================================================
// Catalog Exercise
// ============================================================================

/// A catalog exercise (e.g., "Goblet Squat").
///
/// Read-only from the point of view of templates and sessions.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub muscle_groups: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub difficulty: DifficultyLevel,
    #[serde(default)]
    pub cues: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Exercise {
    /// Create a bare, active exercise. Id and name are required.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(Error::Validation("exercise id must not be empty".into()));
        }
        if name.trim().is_empty() {
            return Err(Error::Validation(format!(
                "exercise '{}' must have a name",
                id
            )));
        }
        Ok(Self {
            id,
            name,
            description: None,
            instructions: None,
            muscle_groups: Vec::new(),
            equipment: Vec::new(),
            difficulty: DifficultyLevel::AllLevels,
            cues: Vec::new(),
            video_url: None,
            active: true,
        })
    }
}

// ============================================================================
// Template Exercise
// ============================================================================

/// Seconds charged per set when an entry has no explicit duration
pub const DEFAULT_SET_SECONDS: u32 = 30;

/// One placement of a catalog exercise within a template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    pub id: Uuid,
    pub exercise_id: String,
    pub order_index: u32,
    /// `None` means the movement is not set-based
    pub sets: Option<u32>,
    /// Free-form: "8-12", "AMRAP", "10"
    pub reps: Option<String>,
    pub duration_seconds: Option<u32>,
    /// Rest taken after each set except the last
    pub rest_seconds: Option<u32>,
    pub notes: Option<String>,
    pub superset_group: Option<u32>,
}

impl TemplateExercise {
    /// Number of sets a session will ask for (at least one)
    pub fn effective_sets(&self) -> u32 {
        self.sets.unwrap_or(1).max(1)
    }

    /// Rest after a non-final set, zero when unset
    pub fn effective_rest(&self) -> u32 {
        self.rest_seconds.unwrap_or(0)
    }

    /// Estimated working plus resting time for this entry, in seconds
    pub fn estimated_seconds(&self) -> u64 {
        let sets = u64::from(self.effective_sets());
        let work = u64::from(self.duration_seconds.unwrap_or(DEFAULT_SET_SECONDS)) * sets;
        let rest = u64::from(self.effective_rest()) * (sets - 1);
        work + rest
    }

    /// Human readable prescription, e.g. "3 x 10, rest 60s"
    pub fn prescription_label(&self) -> String {
        let mut parts = Vec::new();
        match (self.sets, self.reps.as_deref(), self.duration_seconds) {
            (Some(sets), Some(reps), _) => parts.push(format!("{} x {}", sets, reps)),
            (Some(sets), None, Some(secs)) => parts.push(format!("{} x {}s", sets, secs)),
            (Some(sets), None, None) => parts.push(format!("{} sets", sets)),
            (None, Some(reps), _) => parts.push(reps.to_string()),
            (None, None, Some(secs)) => parts.push(format!("{}s", secs)),
            (None, None, None) => {}
        }
        if self.reps.is_some() {
            if let Some(secs) = self.duration_seconds {
                parts.push(format!("{}s", secs));
            }
        }
        if let Some(rest) = self.rest_seconds.filter(|r| *r > 0) {
            parts.push(format!("rest {}s", rest));
        }
        parts.join(", ")
    }
}

/// Set/rep/rest values supplied when adding an exercise to a template
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExercisePrescription {
    pub sets: Option<u32>,
    pub reps: Option<String>,
    pub duration_seconds: Option<u32>,
    pub rest_seconds: Option<u32>,
    pub notes: Option<String>,
}

impl Default for ExercisePrescription {
    fn default() -> Self {
        Self {
            sets: Some(3),
            reps: Some("10".into()),
            duration_seconds: None,
            rest_seconds: Some(60),
            notes: None,
        }
    }
}

/// Partial update for a template exercise.
///
/// Outer `None` leaves the field untouched; `Some(None)` clears it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateExerciseUpdate {
    pub sets: Option<Option<u32>>,
    pub reps: Option<Option<String>>,
    pub duration_seconds: Option<Option<u32>>,
    pub rest_seconds: Option<Option<u32>>,
    pub notes: Option<Option<String>>,
}

impl TemplateExerciseUpdate {
    pub fn is_empty(&self) -> bool {
        self.sets.is_none()
            && self.reps.is_none()
            && self.duration_seconds.is_none()
            && self.rest_seconds.is_none()
            && self.notes.is_none()
    }
}

// ============================================================================
// Workout Template
// ============================================================================

/// A reusable, ordered workout definition authored by a coach
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub focus_area: FocusArea,
    pub difficulty: DifficultyLevel,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub owner_id: String,
    pub estimated_duration_minutes: u32,
    pub exercises: Vec<TemplateExercise>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutTemplate {
    /// Create an empty private template owned by `owner_id`
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let name = validate_template_name(name.into())?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            focus_area: FocusArea::default(),
            difficulty: DifficultyLevel::default(),
            is_public: false,
            tags: Vec::new(),
            owner_id: owner_id.into(),
            estimated_duration_minutes: 0,
            exercises: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Exercises sorted by their order index
    pub fn ordered_exercises(&self) -> Vec<TemplateExercise> {
        let mut exercises = self.exercises.clone();
        exercises.sort_by_key(|e| e.order_index);
        exercises
    }
}

/// Trim a template name and reject it when empty
pub(crate) fn validate_template_name(name: String) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("template name must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// Workout Log
// ============================================================================

/// The durable record of one committed session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutLog {
    pub id: Uuid,
    pub user_id: String,
    pub template_id: Uuid,
    pub template_name: String,
    pub session_date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub rating: u8,
    pub notes: String,
    /// Template exercise ids, in the order they were completed
    pub completed_exercise_ids: Vec<Uuid>,
}
