//! State of the single user session.
//!
//! Holds the connection manager, query history, favorites and saved profiles.
//! Favorites and profiles are written through to the credential store on every
//! mutation; a failed write keeps the in-memory change and comes back as a
//! warning.

pub mod connection;
pub mod store;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::db::{ConnectionProfile, Connectors, DatabaseKind, ResultTable};
use crate::error::AppError;
use connection::{ActiveConnection, ConnectionManager, ConnectionStatus};
use store::CredentialStore;

/// Local time as shown in history and favorites
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub question: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    #[serde(rename = "query", alias = "question")]
    pub question: String,
    #[serde(default)]
    pub timestamp: String,
}

/// The connection form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectRequest {
    #[serde(default, rename = "type")]
    pub kind: Option<DatabaseKind>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub save: bool,
}

impl ConnectRequest {
    fn into_profile(self, kind: DatabaseKind) -> Result<ConnectionProfile, AppError> {
        let name = Some(self.name.trim().to_string()).filter(|n| !n.is_empty());
        if !kind.requires_credentials() {
            return Ok(ConnectionProfile {
                name,
                ..ConnectionProfile::demo()
            });
        }

        let required = [&self.host, &self.database, &self.username, &self.password];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(AppError::invalid_input("Please fill in all required fields"));
        }

        Ok(ConnectionProfile {
            name,
            kind,
            host: self.host.trim().to_string(),
            port: self.port.unwrap_or_else(|| kind.default_port()),
            database: self.database.trim().to_string(),
            username: self.username,
            password: self.password,
        })
    }
}

pub struct Session {
    store: CredentialStore,
    connection: ConnectionManager,
    history: Vec<HistoryEntry>,
    max_history: usize,
    favorites: Vec<FavoriteEntry>,
    saved_connections: Vec<ConnectionProfile>,
    prefill: Option<String>,
    last_result: Option<ResultTable>,
    load_warning: Option<String>,
}

impl Session {
    pub fn from_config(config: &AppConfig) -> Self {
        let connection = ConnectionManager::new(
            Connectors::from_config(config),
            config.connection.max_failed_attempts,
            config.cooldown(),
        );
        Self::open(
            CredentialStore::new(config.state_file_path()),
            connection,
            config.history.max_entries,
        )
    }

    /// Loads saved data; an unreadable store starts the session empty.
    pub fn open(store: CredentialStore, connection: ConnectionManager, max_history: usize) -> Self {
        let (data, load_warning) = match store.load() {
            Ok(data) => {
                info!(
                    "Loaded {} saved connections and {} favorites from {}",
                    data.saved_connections.len(),
                    data.favorites.len(),
                    store.path().display()
                );
                (data, None)
            }
            Err(e) => {
                warn!("Could not load saved data: {}", e);
                (store::SavedData::default(), Some(e.to_string()))
            }
        };

        Self {
            store,
            connection,
            history: Vec::new(),
            max_history,
            favorites: data.favorites,
            saved_connections: data.saved_connections,
            prefill: None,
            last_result: None,
            load_warning,
        }
    }

    pub fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }

    pub fn select(&mut self, kind: DatabaseKind) {
        self.connection.select(kind);
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn active(&self) -> Option<Arc<ActiveConnection>> {
        self.connection.active()
    }

    /// Connects from the form. Returns a warning if saving the profile failed.
    pub async fn connect(&mut self, request: ConnectRequest) -> Result<Option<String>, AppError> {
        let kind = request.kind.unwrap_or_else(|| self.connection.selected());
        let save = request.save;
        let profile = request.into_profile(kind)?;

        self.connection.connect(profile.clone()).await?;

        if save && profile.name.is_some() {
            info!("Saving connection profile {:?}", profile.name);
            self.saved_connections.push(profile);
            return Ok(self.persist());
        }
        Ok(None)
    }

    /// Connects with a saved profile, which is never saved again.
    pub async fn connect_saved(&mut self, index: usize) -> Result<(), AppError> {
        let profile = self
            .saved_connections
            .get(index)
            .cloned()
            .ok_or(AppError::IndexOutOfRange {
                what: "saved connection",
                index,
            })?;

        self.connection.connect(profile).await?;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn record_history(&mut self, question: &str, sql: &str) {
        self.history.push(HistoryEntry {
            timestamp: now_timestamp(),
            question: question.to_string(),
            sql: sql.to_string(),
        });

        if self.max_history > 0 && self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
    }

    pub fn favorites(&self) -> &[FavoriteEntry] {
        &self.favorites
    }

    pub fn add_favorite(&mut self, question: &str) -> Result<Option<String>, AppError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::invalid_input("Cannot save an empty query"));
        }

        self.favorites.push(FavoriteEntry {
            question: question.to_string(),
            timestamp: now_timestamp(),
        });
        Ok(self.persist())
    }

    pub fn remove_favorite(&mut self, index: usize) -> Result<Option<String>, AppError> {
        if index >= self.favorites.len() {
            return Err(AppError::IndexOutOfRange {
                what: "favorite",
                index,
            });
        }
        self.favorites.remove(index);
        Ok(self.persist())
    }

    pub fn reuse_history(&mut self, index: usize) -> Result<String, AppError> {
        let question = self
            .history
            .get(index)
            .map(|entry| entry.question.clone())
            .ok_or(AppError::IndexOutOfRange {
                what: "history entry",
                index,
            })?;
        self.prefill = Some(question.clone());
        Ok(question)
    }

    pub fn reuse_favorite(&mut self, index: usize) -> Result<String, AppError> {
        let question = self
            .favorites
            .get(index)
            .map(|entry| entry.question.clone())
            .ok_or(AppError::IndexOutOfRange {
                what: "favorite",
                index,
            })?;
        self.prefill = Some(question.clone());
        Ok(question)
    }

    pub fn prefill(&self) -> Option<&str> {
        self.prefill.as_deref()
    }

    pub fn saved_connections(&self) -> &[ConnectionProfile] {
        &self.saved_connections
    }

    pub fn set_last_result(&mut self, table: ResultTable) {
        self.last_result = Some(table);
    }

    pub fn last_result(&self) -> Option<&ResultTable> {
        self.last_result.as_ref()
    }

    fn persist(&self) -> Option<String> {
        match self.store.save(&self.saved_connections, &self.favorites) {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to persist saved data: {}", e);
                Some(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UnsupportedConnector;
    use pretty_assertions::assert_eq;

    #[test]
    fn favorites_accept_either_key() {
        let entry: FavoriteEntry =
            serde_json::from_str(r#"{"question": "Top artists", "timestamp": "t"}"#).unwrap();
        assert_eq!(entry.question, "Top artists");

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["query"], "Top artists");
    }

    #[test]
    fn form_requires_every_credential() {
        let request = ConnectRequest {
            host: "db.internal".to_string(),
            database: "sales".to_string(),
            username: "app".to_string(),
            ..Default::default()
        };
        let err = request.into_profile(DatabaseKind::MySql).unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all required fields");
    }

    #[test]
    fn form_defaults_port_per_kind() {
        let request = ConnectRequest {
            name: " prod ".to_string(),
            host: "db.internal".to_string(),
            database: "sales".to_string(),
            username: "app".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        let profile = request.into_profile(DatabaseKind::PostgreSql).unwrap();
        assert_eq!(profile.port, 5432);
        assert_eq!(profile.name.as_deref(), Some("prod"));
    }

    #[test]
    fn demo_needs_no_credentials() {
        let profile = ConnectRequest::default().into_profile(DatabaseKind::Demo).unwrap();
        assert_eq!(profile, ConnectionProfile::demo());
    }

    fn session_at(path: &std::path::Path, max_history: usize) -> Session {
        let connectors = Connectors::uniform(Arc::new(UnsupportedConnector(DatabaseKind::Demo)));
        Session::open(
            CredentialStore::new(path),
            ConnectionManager::new(connectors, 3, std::time::Duration::from_secs(5)),
            max_history,
        )
    }

    #[test]
    fn history_evicts_oldest_past_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(&dir.path().join("saved_data.json"), 2);

        session.record_history("first", "SELECT 1");
        session.record_history("second", "SELECT 2");
        session.record_history("third", "SELECT 3");

        let questions: Vec<&str> = session.history().iter().map(|h| h.question.as_str()).collect();
        assert_eq!(questions, vec!["second", "third"]);
        assert_eq!(session.reuse_history(0).unwrap(), "second");
        assert_eq!(session.prefill(), Some("second"));
    }

    #[test]
    fn unwritable_store_keeps_change_and_warns() {
        let dir = tempfile::tempdir().unwrap();
        // A directory can be neither read nor written as the state file
        let mut session = session_at(dir.path(), 0);
        assert!(session.load_warning().is_some());

        let warning = session.add_favorite("Top 5 artists").unwrap();
        assert!(warning.is_some());
        assert_eq!(session.favorites().len(), 1);
    }

    #[test]
    fn empty_favorite_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_at(&dir.path().join("saved_data.json"), 0);
        assert!(matches!(session.add_favorite("   "), Err(AppError::InvalidInput(_))));
        assert!(session.favorites().is_empty());
    }

    #[test]
    fn timestamps_use_local_format() {
        let ts = now_timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S").is_ok());
    }
}
