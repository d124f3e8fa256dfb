//! File-backed project storage.
//!
//! Two JSON files live in the data directory:
//!
//! - `adgen-store.json` holds the autosaved editor state (last write wins).
//! - `adgen-projects.json` holds the list of named projects, unique by name.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::guidelines::GuidelineRules;
use crate::state::Theme;
use crate::{CanvasFormat, Element};

/// Autosave file name.
pub const STATE_FILE: &str = "adgen-store.json";

/// Saved-projects file name.
pub const PROJECTS_FILE: &str = "adgen-projects.json";

/// Errors that can occur during persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The autosaved subset of the editor state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Live elements.
    pub elements: Vec<Element>,
    /// Canvas background.
    pub background: String,
    /// Active format.
    pub current_format: CanvasFormat,
    /// Project name.
    pub project_name: String,
    /// UI theme.
    #[serde(default)]
    pub theme: Theme,
}

/// A named project snapshot.
///
/// Everything but the name is optional so that partially written entries
/// still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProject {
    /// Project name, unique within the projects file.
    pub name: String,
    /// Elements at save time.
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Background at save time.
    #[serde(default)]
    pub background: Option<String>,
    /// Format at save time.
    #[serde(default)]
    pub current_format: Option<CanvasFormat>,
    /// Guideline rules at save time.
    #[serde(default)]
    pub guidelines: Option<GuidelineRules>,
    /// Save time in milliseconds since the epoch.
    #[serde(default)]
    pub saved_at: Option<u64>,
}

/// Project storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    data_dir: PathBuf,
}

impl ProjectStore {
    /// Open a store, creating the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Io`] if the directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    // -----------------------------------------------------------------------
    // Autosave
    // -----------------------------------------------------------------------

    /// Overwrite the autosaved state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_state(&self, state: &PersistedState) -> Result<(), PersistError> {
        write_json(&self.path(STATE_FILE), state)
    }

    /// Load the autosaved state, `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_state(&self) -> Result<Option<PersistedState>, PersistError> {
        read_json(&self.path(STATE_FILE))
    }

    // -----------------------------------------------------------------------
    // Named projects
    // -----------------------------------------------------------------------

    /// All saved projects, in save order. Empty if none were saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn list_projects(&self) -> Result<Vec<SavedProject>, PersistError> {
        Ok(read_json(&self.path(PROJECTS_FILE))?.unwrap_or_default())
    }

    /// Save a project, replacing any project with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the projects file cannot be read or written.
    pub fn save_project(&self, project: SavedProject) -> Result<(), PersistError> {
        let mut projects = self.list_projects()?;
        tracing::debug!(name = %project.name, "save project");
        match projects.iter_mut().find(|p| p.name == project.name) {
            Some(existing) => *existing = project,
            None => projects.push(project),
        }
        write_json(&self.path(PROJECTS_FILE), &projects)
    }

    /// Find a saved project by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the projects file cannot be read or parsed.
    pub fn find_project(&self, name: &str) -> Result<Option<SavedProject>, PersistError> {
        Ok(self.list_projects()?.into_iter().find(|p| p.name == name))
    }

    /// Delete a saved project. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the projects file cannot be read or written.
    pub fn delete_project(&self, name: &str) -> Result<bool, PersistError> {
        let mut projects = self.list_projects()?;
        let before = projects.len();
        projects.retain(|p| p.name != name);
        if projects.len() == before {
            return Ok(false);
        }
        write_json(&self.path(PROJECTS_FILE), &projects)?;
        Ok(true)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Get the current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
