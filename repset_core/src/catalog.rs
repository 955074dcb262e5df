//! Exercise catalog.
//!
//! The catalog is read-only reference data for templates and sessions.
//! A built-in set of exercises ships with the crate; coaches can add
//! their own through the `[catalog]` section of the config file.

use crate::types::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with the built-in exercises
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

/// The complete set of exercises known to the system
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub exercises: HashMap<String, Exercise>,
}

/// Search criteria for catalog lookups. Empty filter matches everything.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExerciseFilter {
    pub active_only: bool,
    pub muscle_group: Option<String>,
    pub equipment: Option<String>,
    pub search: Option<String>,
}

impl ExerciseFilter {
    /// Filter that only keeps active exercises
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    fn matches(&self, exercise: &Exercise) -> bool {
        if self.active_only && !exercise.active {
            return false;
        }
        if let Some(ref muscle) = self.muscle_group {
            if !exercise
                .muscle_groups
                .iter()
                .any(|m| m.eq_ignore_ascii_case(muscle))
            {
                return false;
            }
        }
        if let Some(ref equipment) = self.equipment {
            if !exercise
                .equipment
                .iter()
                .any(|e| e.eq_ignore_ascii_case(equipment))
            {
                return false;
            }
        }
        if let Some(ref text) = self.search {
            let needle = text.trim().to_lowercase();
            if !needle.is_empty() {
                let in_name = exercise.name.to_lowercase().contains(&needle);
                let in_description = exercise
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle));
                if !in_name && !in_description {
                    return false;
                }
            }
        }
        true
    }
}

impl Catalog {
    /// Look up an exercise by id
    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.get(id)
    }

    /// Return the exercises matching `filter`, sorted by name
    pub fn search(&self, filter: &ExerciseFilter) -> Vec<&Exercise> {
        let mut found: Vec<_> = self
            .exercises
            .values()
            .filter(|e| filter.matches(e))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Copy of this catalog with `custom` exercises merged in.
    ///
    /// A custom exercise with the id of a built-in one replaces it.
    pub fn with_custom(&self, custom: &[Exercise]) -> Catalog {
        let mut catalog = self.clone();
        for exercise in custom {
            if catalog.exercises.contains_key(&exercise.id) {
                tracing::debug!("Custom exercise '{}' overrides built-in entry", exercise.id);
            }
            catalog
                .exercises
                .insert(exercise.id.clone(), exercise.clone());
        }
        catalog
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, exercise) in &self.exercises {
            if id.is_empty() || exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if id != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.id '{}'",
                    id, exercise.id
                ));
            }
            if exercise.name.trim().is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
            if exercise.cues.iter().any(|c| c.trim().is_empty()) {
                errors.push(format!("Exercise '{}' has an empty coaching cue", id));
            }
        }

        if !self.exercises.values().any(|e| e.active) {
            errors.push("Catalog has no active exercises".to_string());
        }

        errors
    }
}

struct Seed {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    muscles: &'static [&'static str],
    equipment: &'static [&'static str],
    difficulty: DifficultyLevel,
    cues: &'static [&'static str],
    video_url: Option<&'static str>,
}

const SEEDS: &[Seed] = &[
    Seed {
        id: "goblet_squat",
        name: "Goblet Squat",
        description: "Front-loaded squat holding a kettlebell or dumbbell at the chest",
        muscles: &["quads", "glutes", "core"],
        equipment: &["kettlebell"],
        difficulty: DifficultyLevel::Beginner,
        cues: &["Elbows inside the knees", "Chest tall", "Sit between the heels"],
        video_url: Some("https://www.youtube.com/watch?v=MeIiIdhvXT4"),
    },
    Seed {
        id: "kb_swing",
        name: "Kettlebell Swing",
        description: "Explosive hip hinge driving the bell to chest height",
        muscles: &["glutes", "hamstrings", "back"],
        equipment: &["kettlebell"],
        difficulty: DifficultyLevel::Intermediate,
        cues: &["Hike the bell back", "Snap the hips", "Float, don't lift"],
        video_url: Some("https://www.youtube.com/watch?v=YSxHifyI6s8"),
    },
    Seed {
        id: "romanian_deadlift",
        name: "Romanian Deadlift",
        description: "Hip hinge with soft knees, lowering the weight along the legs",
        muscles: &["hamstrings", "glutes", "back"],
        equipment: &["barbell", "dumbbell"],
        difficulty: DifficultyLevel::Intermediate,
        cues: &["Push the hips back", "Bar stays close", "Neutral spine"],
        video_url: None,
    },
    Seed {
        id: "push_up",
        name: "Push-up",
        description: "Bodyweight horizontal press from a plank position",
        muscles: &["chest", "triceps", "shoulders", "core"],
        equipment: &[],
        difficulty: DifficultyLevel::AllLevels,
        cues: &["Rigid plank", "Elbows at 45 degrees", "Chest to the floor"],
        video_url: Some("https://www.youtube.com/watch?v=IODxDxX7oi4"),
    },
    Seed {
        id: "pull_up",
        name: "Pull-up",
        description: "Vertical pull from a dead hang until the chin clears the bar",
        muscles: &["back", "biceps"],
        equipment: &["pullup_bar"],
        difficulty: DifficultyLevel::Advanced,
        cues: &["Start from a dead hang", "Drive the elbows down"],
        video_url: None,
    },
    Seed {
        id: "db_row",
        name: "Single-Arm Dumbbell Row",
        description: "Supported row pulling the dumbbell towards the hip",
        muscles: &["back", "biceps"],
        equipment: &["dumbbell", "bench"],
        difficulty: DifficultyLevel::Beginner,
        cues: &["Flat back", "Pull to the hip", "Control the lowering"],
        video_url: None,
    },
    Seed {
        id: "plank",
        name: "Plank",
        description: "Isometric hold on forearms and toes",
        muscles: &["core"],
        equipment: &[],
        difficulty: DifficultyLevel::AllLevels,
        cues: &["Squeeze the glutes", "Ribs down", "Breathe"],
        video_url: None,
    },
    Seed {
        id: "walking_lunge",
        name: "Walking Lunge",
        description: "Alternating forward lunges travelling across the floor",
        muscles: &["quads", "glutes"],
        equipment: &["dumbbell"],
        difficulty: DifficultyLevel::Beginner,
        cues: &["Long stride", "Back knee kisses the floor"],
        video_url: None,
    },
    Seed {
        id: "hip_cars",
        name: "Hip CARs",
        description: "Controlled articular rotations of the hip joint",
        muscles: &["hips"],
        equipment: &[],
        difficulty: DifficultyLevel::AllLevels,
        cues: &["Move slowly", "Keep the pelvis still"],
        video_url: Some("https://www.youtube.com/watch?v=6bHx1XG6U1E"),
    },
    Seed {
        id: "rower_sprint",
        name: "Rower Sprint",
        description: "Short all-out effort on the rowing machine",
        muscles: &["full_body"],
        equipment: &["rower"],
        difficulty: DifficultyLevel::Intermediate,
        cues: &["Legs, body, arms", "Arms, body, legs on the return"],
        video_url: None,
    },
];

/// Internal function that actually builds the catalog
fn build_default_catalog_internal() -> Catalog {
    let exercises = SEEDS
        .iter()
        .map(|seed| {
            let exercise = Exercise {
                id: seed.id.into(),
                name: seed.name.into(),
                description: Some(seed.description.into()),
                instructions: None,
                muscle_groups: seed.muscles.iter().map(|m| m.to_string()).collect(),
                equipment: seed.equipment.iter().map(|e| e.to_string()).collect(),
                difficulty: seed.difficulty,
                cues: seed.cues.iter().map(|c| c.to_string()).collect(),
                video_url: seed.video_url.map(String::from),
                active: true,
            };
            (exercise.id.clone(), exercise)
        })
        .collect();

    Catalog { exercises }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.exercises.len(), 10);
        assert!(catalog.get("goblet_squat").is_some());
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = get_default_catalog();
        let errors = catalog.validate();
        assert!(errors.is_empty(), "Catalog errors: {:?}", errors);
    }

    #[test]
    fn test_search_by_text_matches_name_and_description() {
        let catalog = build_default_catalog();

        let by_name = catalog.search(&ExerciseFilter {
            search: Some("squat".into()),
            ..ExerciseFilter::default()
        });
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "goblet_squat");

        let by_description = catalog.search(&ExerciseFilter {
            search: Some("ROWING MACHINE".into()),
            ..ExerciseFilter::default()
        });
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].id, "rower_sprint");
    }

    #[test]
    fn test_search_by_muscle_and_equipment() {
        let catalog = build_default_catalog();
        let found = catalog.search(&ExerciseFilter {
            muscle_group: Some("glutes".into()),
            equipment: Some("kettlebell".into()),
            ..ExerciseFilter::default()
        });
        let ids: Vec<_> = found.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["goblet_squat", "kb_swing"]);
    }

    #[test]
    fn test_active_only_hides_retired_exercises() {
        let mut retired = Exercise::new("burpee", "Burpee").unwrap();
        retired.active = false;
        let catalog = build_default_catalog().with_custom(&[retired]);

        assert_eq!(catalog.search(&ExerciseFilter::default()).len(), 11);
        assert_eq!(catalog.search(&ExerciseFilter::active()).len(), 10);
    }

    #[test]
    fn test_custom_exercise_overrides_builtin() {
        let custom = Exercise::new("plank", "Side Plank").unwrap();
        let catalog = build_default_catalog().with_custom(&[custom]);
        assert_eq!(catalog.exercises.len(), 10);
        assert_eq!(catalog.get("plank").unwrap().name, "Side Plank");
    }

    #[test]
    fn test_validate_reports_mismatched_key() {
        let mut catalog = build_default_catalog();
        let exercise = Exercise::new("real_id", "Thing").unwrap();
        catalog.exercises.insert("other_id".into(), exercise);
        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("doesn't match")));
    }
}
