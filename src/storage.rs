use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{error::AppError, fs_util::write_atomic, profile::{Identity, Profile}};

/// Ordered list of profiles persisted as a JSON array
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads profiles from the JSON file
    ///
    /// A missing, empty, unreadable or malformed file yields an empty list.
    pub fn load(&self) -> Vec<Profile> {
        let file_contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to read profiles file");
                return Vec::new();
            }
        };

        if file_contents.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str(&file_contents) {
            Ok(profiles) => profiles,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring malformed profiles file");
                Vec::new()
            }
        }
    }

    /// Saves the full profile list, replacing prior contents
    ///
    /// # Arguments
    /// * `profiles` - Profiles in display order
    pub fn save(&self, profiles: &[Profile]) -> Result<(), AppError> {
        let mut json: String = serde_json::to_string_pretty(profiles)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes())?;
        tracing::debug!(count = profiles.len(), "saved profiles");
        Ok(())
    }

    /// Finds a profile by alias
    pub fn find(&self, alias: &str) -> Option<Profile> {
        find_profile(&self.load(), alias).cloned()
    }

    /// Finds the profile whose name and email equal `identity`
    pub fn find_by_identity(&self, identity: &Identity) -> Option<Profile> {
        self.load().into_iter().find(|profile| profile.matches(identity))
    }
}

/// Looks up an alias in an already loaded list
pub fn find_profile<'a>(profiles: &'a [Profile], alias: &str) -> Option<&'a Profile> {
    profiles.iter().find(|profile| profile.alias == alias)
}

/// Checks if any profiles exist in storage
///
/// # Arguments
/// * `profiles` - Loaded profiles to check
pub fn check_if_profiles_exist(profiles: &[Profile]) -> Result<(), AppError> {
    if profiles.is_empty() {
        return Err(AppError::Validation("no profiles found, add one first".to_string()));
    }
    Ok(())
}
