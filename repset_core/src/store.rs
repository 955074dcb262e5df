//! Template persistence with file locking.
//!
//! Each template is stored as one JSON document named after its id. A save
//! replaces the whole document, so the exercise list is always written in
//! full and deleting the document removes its exercises with it.

use crate::{Error, Result, WorkoutTemplate};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Read/write access to stored workout templates
pub trait TemplateStore {
    /// Persist scalar fields and replace the full exercise list
    fn save_template(&mut self, template: &WorkoutTemplate) -> Result<()>;

    fn load_template(&self, id: Uuid) -> Result<Option<WorkoutTemplate>>;

    /// Templates owned by `owner_id`, most recently updated first
    fn list_templates(&self, owner_id: &str) -> Result<Vec<WorkoutTemplate>>;

    /// Returns `false` when there was nothing to delete
    fn delete_template(&mut self, id: Uuid) -> Result<bool>;
}

/// Directory of JSON documents, one per template
pub struct JsonTemplateStore {
    dir: PathBuf,
}

impl JsonTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn template_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read_document(path: &Path) -> Result<WorkoutTemplate> {
        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(serde_json::from_str(&contents)?)
    }
}

impl TemplateStore for JsonTemplateStore {
    /// Atomically writes the template by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn save_template(&mut self, template: &WorkoutTemplate) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(template)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        let path = self.template_path(template.id);
        temp.persist(&path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Saved template {} with {} exercises to {:?}",
            template.id,
            template.exercises.len(),
            path
        );
        Ok(())
    }

    fn load_template(&self, id: Uuid) -> Result<Option<WorkoutTemplate>> {
        let path = self.template_path(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_document(&path).map(Some)
    }

    fn list_templates(&self, owner_id: &str) -> Result<Vec<WorkoutTemplate>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut templates = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_document(&path) {
                Ok(template) if template.owner_id == owner_id => templates.push(template),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping unreadable template {:?}: {}", path, e);
                }
            }
        }

        templates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(templates)
    }

    fn delete_template(&mut self, id: Uuid) -> Result<bool> {
        let path = self.template_path(id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        tracing::info!("Deleted template {}", id);
        Ok(true)
    }
}
