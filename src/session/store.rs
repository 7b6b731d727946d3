//! Saved connection profiles and favorite questions in one JSON document.
//!
//! The document is rewritten wholesale on every save. There is no locking,
//! so two processes sharing the file lose each other's updates.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::ConnectionProfile;
use crate::session::FavoriteEntry;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Could not access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid saved data in {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedData {
    #[serde(default)]
    pub favorites: Vec<FavoriteEntry>,
    #[serde(default)]
    pub saved_connections: Vec<ConnectionProfile>,
}

#[derive(Serialize)]
struct SavedDataRef<'a> {
    favorites: &'a [FavoriteEntry],
    saved_connections: &'a [ConnectionProfile],
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An absent file is an empty store.
    pub fn load(&self) -> Result<SavedData, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SavedData::default()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| PersistenceError::Format {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(
        &self,
        profiles: &[ConnectionProfile],
        favorites: &[FavoriteEntry],
    ) -> Result<(), PersistenceError> {
        let io_error = |source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let document = SavedDataRef {
            favorites,
            saved_connections: profiles,
        };
        let contents =
            serde_json::to_string_pretty(&document).map_err(|source| PersistenceError::Format {
                path: self.path.clone(),
                source,
            })?;

        fs::write(&self.path, contents).map_err(io_error)
    }
}
