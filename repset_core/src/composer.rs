//! Template composer.
//!
//! Owns one template while a coach edits it and keeps its exercise list
//! valid after every mutation:
//! - order indices are always `0..N-1` in list order
//! - a superset group has at least two members or does not exist
//! - superset group ids are allocated monotonically and never reused

use crate::store::TemplateStore;
use crate::types::validate_template_name;
use crate::{
    DifficultyLevel, Error, Exercise, ExercisePrescription, FocusArea, Result, TemplateExercise,
    TemplateExerciseUpdate, WorkoutTemplate,
};
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Direction for [`TemplateComposer::move_exercise`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Suffix appended to the name of a duplicated template
pub const COPY_SUFFIX: &str = " (Copy)";

/// Estimated session length in whole minutes, rounded up
pub fn estimate_duration_minutes(exercises: &[TemplateExercise]) -> u32 {
    let seconds: u64 = exercises.iter().map(TemplateExercise::estimated_seconds).sum();
    u32::try_from((seconds + 59) / 60).unwrap_or(u32::MAX)
}

/// Deep copy of `template` under a new identity.
///
/// The copy is private, its name carries [`COPY_SUFFIX`], and every
/// exercise entry gets a fresh id while keeping its values, relative order
/// and superset numbering.
pub fn duplicate(template: &WorkoutTemplate) -> WorkoutTemplate {
    let now = Utc::now();
    let exercises = template
        .ordered_exercises()
        .into_iter()
        .enumerate()
        .map(|(index, entry)| TemplateExercise {
            id: Uuid::new_v4(),
            order_index: index as u32,
            ..entry
        })
        .collect();

    WorkoutTemplate {
        id: Uuid::new_v4(),
        name: format!("{}{}", template.name, COPY_SUFFIX),
        is_public: false,
        exercises,
        created_at: now,
        updated_at: now,
        ..template.clone()
    }
}

/// Load a template, duplicate it and store the copy
pub fn duplicate_template(
    store: &mut dyn TemplateStore,
    id: Uuid,
    owner_id: &str,
) -> Result<WorkoutTemplate> {
    let original = TemplateComposer::load(store, id, owner_id)?;
    let copy = duplicate(original.template());
    store
        .save_template(&copy)
        .map_err(|e| Error::Persistence(e.to_string()))?;
    tracing::info!("Duplicated template {} as {}", id, copy.id);
    Ok(copy)
}

/// Delete a template and its exercise list
pub fn delete_template(store: &mut dyn TemplateStore, id: Uuid, owner_id: &str) -> Result<()> {
    // Ownership check before touching anything
    TemplateComposer::load(store, id, owner_id)?;
    store
        .delete_template(id)
        .map_err(|e| Error::Persistence(e.to_string()))?;
    Ok(())
}

/// Editing session for one workout template
#[derive(Clone, Debug)]
pub struct TemplateComposer {
    template: WorkoutTemplate,
    next_group_id: u32,
}

impl TemplateComposer {
    /// Start composing a new, empty template
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            template: WorkoutTemplate::new(owner_id, name)?,
            next_group_id: 1,
        })
    }

    /// Resume editing an existing template.
    ///
    /// Entries are put in order-index order and renumbered; group ids
    /// continue after the highest one already in use.
    pub fn edit(mut template: WorkoutTemplate) -> Self {
        template.exercises.sort_by_key(|e| e.order_index);
        let next_group_id = template
            .exercises
            .iter()
            .filter_map(|e| e.superset_group)
            .max()
            .map_or(1, |max| max + 1);
        let mut composer = Self {
            template,
            next_group_id,
        };
        composer.renumber();
        composer
    }

    /// Load a template owned by `owner_id` for editing.
    ///
    /// Templates owned by someone else are reported as not found.
    pub fn load(store: &dyn TemplateStore, id: Uuid, owner_id: &str) -> Result<Self> {
        match store.load_template(id)? {
            Some(template) if template.owner_id == owner_id => Ok(Self::edit(template)),
            Some(_) => {
                tracing::debug!("Template {} is not owned by {}", id, owner_id);
                Err(Error::TemplateNotFound(id))
            }
            None => Err(Error::TemplateNotFound(id)),
        }
    }

    pub fn template(&self) -> &WorkoutTemplate {
        &self.template
    }

    pub fn into_template(self) -> WorkoutTemplate {
        self.template
    }

    pub fn exercises(&self) -> &[TemplateExercise] {
        &self.template.exercises
    }

    /// Id of the entry at a zero-based position
    pub fn entry_id_at(&self, index: usize) -> Option<Uuid> {
        self.template.exercises.get(index).map(|e| e.id)
    }

    // ------------------------------------------------------------------
    // Scalar fields
    // ------------------------------------------------------------------

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.template.name = validate_template_name(name.into())?;
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.template.description = description.filter(|d| !d.trim().is_empty());
    }

    pub fn set_focus_area(&mut self, focus_area: FocusArea) {
        self.template.focus_area = focus_area;
    }

    pub fn set_difficulty(&mut self, difficulty: DifficultyLevel) {
        self.template.difficulty = difficulty;
    }

    pub fn set_public(&mut self, is_public: bool) {
        self.template.is_public = is_public;
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        let mut cleaned: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !cleaned.contains(&tag) {
                cleaned.push(tag);
            }
        }
        self.template.tags = cleaned;
    }

    // ------------------------------------------------------------------
    // Exercise list
    // ------------------------------------------------------------------

    /// Append `exercise` to the end of the list.
    ///
    /// Falls back to `ExercisePrescription::default()` (3 x "10", 60s rest)
    /// when no prescription is given. Returns the id of the new entry.
    pub fn add_exercise(
        &mut self,
        exercise: &Exercise,
        prescription: Option<ExercisePrescription>,
    ) -> Uuid {
        let p = prescription.unwrap_or_default();
        let entry = TemplateExercise {
            id: Uuid::new_v4(),
            exercise_id: exercise.id.clone(),
            order_index: self.template.exercises.len() as u32,
            sets: p.sets.filter(|s| *s > 0),
            reps: p.reps.filter(|r| !r.trim().is_empty()),
            duration_seconds: p.duration_seconds,
            rest_seconds: p.rest_seconds,
            notes: p.notes.filter(|n| !n.trim().is_empty()),
            superset_group: None,
        };
        let id = entry.id;
        self.template.exercises.push(entry);
        tracing::debug!(
            "Added {} to template {} at position {}",
            exercise.id,
            self.template.id,
            self.template.exercises.len() - 1
        );
        id
    }

    /// Remove an entry; later entries shift down one position.
    ///
    /// A superset left with a single member is dissolved.
    pub fn remove_exercise(&mut self, id: Uuid) -> Result<TemplateExercise> {
        let index = self.position_of(id)?;
        let removed = self.template.exercises.remove(index);
        if let Some(group) = removed.superset_group {
            self.dissolve_if_undersized(group);
        }
        self.renumber();
        Ok(removed)
    }

    /// Merge the provided fields into an entry
    pub fn update_exercise(&mut self, id: Uuid, update: TemplateExerciseUpdate) -> Result<()> {
        if update.sets == Some(Some(0)) {
            return Err(Error::Validation("sets must be a positive number".into()));
        }
        let index = self.position_of(id)?;
        let entry = &mut self.template.exercises[index];

        if let Some(sets) = update.sets {
            entry.sets = sets;
        }
        if let Some(reps) = update.reps {
            entry.reps = reps.filter(|r| !r.trim().is_empty());
        }
        if let Some(duration) = update.duration_seconds {
            entry.duration_seconds = duration;
        }
        if let Some(rest) = update.rest_seconds {
            entry.rest_seconds = rest;
        }
        if let Some(notes) = update.notes {
            entry.notes = notes.filter(|n| !n.trim().is_empty());
        }
        Ok(())
    }

    /// Swap the entry at `index` with its neighbour.
    ///
    /// Returns `false` without changing anything at a boundary.
    pub fn move_exercise(&mut self, index: usize, direction: MoveDirection) -> Result<bool> {
        let len = self.template.exercises.len();
        if index >= len {
            return Err(Error::Precondition(format!(
                "position {} is out of range for {} exercises",
                index, len
            )));
        }
        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < len => index + 1,
            _ => return Ok(false),
        };
        self.template.exercises.swap(index, target);
        self.renumber();
        Ok(true)
    }

    /// Group the given entries into a new superset.
    ///
    /// Fewer than two distinct ids is a no-op returning `None`. Unknown
    /// entries or entries already in a superset are rejected without
    /// changing anything.
    pub fn create_superset(&mut self, ids: &[Uuid]) -> Result<Option<u32>> {
        let mut distinct: Vec<Uuid> = Vec::with_capacity(ids.len());
        for id in ids {
            if !distinct.contains(id) {
                distinct.push(*id);
            }
        }
        if distinct.len() < 2 {
            return Ok(None);
        }

        let mut indices = Vec::with_capacity(distinct.len());
        for id in &distinct {
            let index = self
                .template
                .exercises
                .iter()
                .position(|e| e.id == *id)
                .ok_or_else(|| Error::Validation(format!("unknown exercise entry {}", id)))?;
            if let Some(group) = self.template.exercises[index].superset_group {
                return Err(Error::Validation(format!(
                    "exercise entry {} is already in superset {}",
                    id, group
                )));
            }
            indices.push(index);
        }

        let group = self.next_group_id;
        self.next_group_id += 1;
        for index in indices {
            self.template.exercises[index].superset_group = Some(group);
        }
        tracing::debug!(
            "Created superset {} with {} exercises in template {}",
            group,
            distinct.len(),
            self.template.id
        );
        Ok(Some(group))
    }

    /// Take one entry out of its superset.
    ///
    /// If only one member would remain, the group is dissolved entirely so
    /// both removal paths keep the two-member minimum.
    pub fn remove_from_superset(&mut self, id: Uuid) -> Result<()> {
        let index = self.position_of(id)?;
        if let Some(group) = self.template.exercises[index].superset_group.take() {
            self.dissolve_if_undersized(group);
        }
        Ok(())
    }

    /// Current superset groups and their members, in list order
    pub fn superset_groups(&self) -> BTreeMap<u32, Vec<Uuid>> {
        let mut groups: BTreeMap<u32, Vec<Uuid>> = BTreeMap::new();
        for entry in &self.template.exercises {
            if let Some(group) = entry.superset_group {
                groups.entry(group).or_default().push(entry.id);
            }
        }
        groups
    }

    pub fn estimate_duration_minutes(&self) -> u32 {
        estimate_duration_minutes(&self.template.exercises)
    }

    /// Persist the template, replacing its stored exercise list.
    ///
    /// Order indices are taken from list position at save time. A store
    /// failure is reported as [`Error::Persistence`] and leaves the
    /// composer untouched so the save can be retried.
    pub fn save(&mut self, store: &mut dyn TemplateStore) -> Result<&WorkoutTemplate> {
        let mut candidate = self.template.clone();
        candidate.name = validate_template_name(candidate.name)?;
        for (index, entry) in candidate.exercises.iter_mut().enumerate() {
            entry.order_index = index as u32;
        }
        candidate.estimated_duration_minutes = estimate_duration_minutes(&candidate.exercises);
        candidate.updated_at = Utc::now();

        store.save_template(&candidate).map_err(|e| {
            tracing::warn!("Failed to save template {}: {}", candidate.id, e);
            Error::Persistence(e.to_string())
        })?;

        tracing::info!(
            "Saved template '{}' ({} exercises, ~{} min)",
            candidate.name,
            candidate.exercises.len(),
            candidate.estimated_duration_minutes
        );
        self.template = candidate;
        Ok(&self.template)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn position_of(&self, id: Uuid) -> Result<usize> {
        self.template
            .exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::Precondition(format!("no exercise entry with id {}", id)))
    }

    fn renumber(&mut self) {
        for (index, entry) in self.template.exercises.iter_mut().enumerate() {
            entry.order_index = index as u32;
        }
    }

    fn dissolve_if_undersized(&mut self, group: u32) {
        let members: Vec<usize> = self
            .template
            .exercises
            .iter()
            .enumerate()
            .filter(|(_, e)| e.superset_group == Some(group))
            .map(|(i, _)| i)
            .collect();
        if members.len() == 1 {
            self.template.exercises[members[0]].superset_group = None;
            tracing::debug!("Dissolved superset {} (single member left)", group);
        }
    }
}
