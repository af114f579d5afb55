//! Named, reusable filter models.
//!
//! Presets are resolved by id first, then by case-insensitive name. When a
//! lookup fails the error suggests the closest preset name within a small
//! edit distance.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strsim::levenshtein;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::model::FilterModel;
use crate::store::{self, JsonFile};

/// Maximum Levenshtein distance for "did you mean" suggestions.
const MAX_SUGGESTION_DISTANCE: usize = 3;

const PRESETS_FILENAME: &str = "presets.json";

/// A saved filter model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub filter_model: FilterModel,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Fields to change on an existing preset. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub filter_model: Option<FilterModel>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default)]
    presets: Vec<Preset>,
}

/// Preset collection, optionally backed by a JSON file.
///
/// Every mutation rewrites the whole file atomically when a file is attached.
#[derive(Debug, Clone, Default)]
pub struct PresetStore {
    presets: Vec<Preset>,
    file: Option<JsonFile>,
}

impl PresetStore {
    /// Creates an empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a file-backed store, loading existing presets.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let file = JsonFile::new(path);
        let contents: PresetFile = file.load_or_default()?;
        let mut presets = contents.presets;
        presets.sort_by_key(|p| p.created_at);
        Ok(Self {
            presets,
            file: Some(file),
        })
    }

    /// Returns the default preset file path (`~/.local/share/gridfilter/presets.json` on Unix).
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        Ok(store::project_dirs()?.data_dir().join(PRESETS_FILENAME))
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.file.as_ref().map(JsonFile::path)
    }

    /// Lists presets in creation order.
    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Saves a copy of `model` under `name`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the preset file cannot be written.
    pub fn save(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        tags: Vec<String>,
        model: &FilterModel,
    ) -> Result<Preset> {
        let now = Utc::now();
        let preset = Preset {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description,
            filter_model: model.clone(),
            tags,
            created_at: now,
            modified_at: now,
        };
        self.presets.push(preset.clone());
        self.persist()?;
        Ok(preset)
    }

    /// Finds a preset by id, then by case-insensitive name.
    pub fn find(&self, id_or_name: &str) -> Option<&Preset> {
        self.position(id_or_name).map(|i| &self.presets[i])
    }

    fn position(&self, id_or_name: &str) -> Option<usize> {
        if let Some(i) = self.presets.iter().position(|p| p.id == id_or_name) {
            return Some(i);
        }
        let lower = id_or_name.to_lowercase();
        self.presets
            .iter()
            .position(|p| p.name.to_lowercase() == lower)
    }

    /// Like [`find`](Self::find), but fails with a suggestion.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PresetNotFound` if nothing matches.
    pub fn resolve(&self, id_or_name: &str) -> Result<&Preset> {
        self.find(id_or_name).ok_or_else(|| self.not_found(id_or_name))
    }

    fn not_found(&self, id_or_name: &str) -> EngineError {
        let suggestion =
            find_similar_name(id_or_name, self.presets.iter().map(|p| p.name.as_str()));
        EngineError::preset_not_found(id_or_name, suggestion)
    }

    /// Applies `update` to a preset and bumps its modification time.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::PresetNotFound` if nothing matches, or
    /// `EngineError::Store` if the preset file cannot be written.
    pub fn update(&mut self, id_or_name: &str, update: PresetUpdate) -> Result<Preset> {
        let index = self
            .position(id_or_name)
            .ok_or_else(|| self.not_found(id_or_name))?;

        let preset = &mut self.presets[index];
        if let Some(name) = update.name {
            preset.name = name;
        }
        if let Some(description) = update.description {
            preset.description = Some(description);
        }
        if let Some(tags) = update.tags {
            preset.tags = tags;
        }
        if let Some(model) = update.filter_model {
            preset.filter_model = model;
        }
        preset.modified_at = Utc::now();
        let updated = preset.clone();

        self.persist()?;
        Ok(updated)
    }

    /// Removes a preset. Deleting a missing preset is a no-op returning `None`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the preset file cannot be written.
    pub fn delete(&mut self, id_or_name: &str) -> Result<Option<Preset>> {
        let Some(index) = self.position(id_or_name) else {
            return Ok(None);
        };
        let removed = self.presets.remove(index);
        self.persist()?;
        Ok(Some(removed))
    }

    fn persist(&self) -> Result<()> {
        if let Some(file) = &self.file {
            file.save(&PresetFile {
                presets: self.presets.clone(),
            })?;
        }
        Ok(())
    }
}

/// Finds the candidate closest to `query`, if within [`MAX_SUGGESTION_DISTANCE`].
///
/// Exact (case-insensitive) matches are not suggested.
pub(crate) fn find_similar_name<'a>(
    query: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> Option<String> {
    let query_lower = query.to_lowercase();

    let (best_match, best_distance) = candidates
        .filter(|name| !name.is_empty())
        .map(|name| (name, levenshtein(&query_lower, &name.to_lowercase())))
        .min_by_key(|(_, distance)| *distance)?;

    (best_distance > 0 && best_distance <= MAX_SUGGESTION_DISTANCE)
        .then(|| best_match.to_string())
}
