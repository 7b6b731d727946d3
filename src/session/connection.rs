//! Which database is active and how it got there.
//!
//! `Disconnected`, `Connecting`, `Connected` and `Failed` are the only states.
//! Every failed connect bumps a counter that is never reset; once it reaches
//! the configured threshold each further failure arms a cooldown that the
//! next attempt waits out before dispatching. Disconnecting does not clear
//! an armed cooldown.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::db::{
    ConnectionProfile, Connectors, DatabaseKind, DbError, ProfileSummary, QueryExecutor,
};
use crate::error::AppError;

/// An established connection and everything bound to it.
pub struct ActiveConnection {
    pub profile: ConnectionProfile,
    pub executor: Arc<dyn QueryExecutor>,
    schema: OnceCell<String>,
}

impl ActiveConnection {
    pub fn new(profile: ConnectionProfile, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            profile,
            executor,
            schema: OnceCell::new(),
        }
    }

    /// Schema description, fetched once per connection.
    pub async fn schema(&self) -> Result<&str, DbError> {
        self.schema
            .get_or_try_init(|| self.executor.describe_schema())
            .await
            .map(String::as_str)
    }
}

enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(Arc<ActiveConnection>),
    Failed { error: String },
}

/// Holds the state at `Connecting` while a connector runs. If the attempt is
/// dropped before it finishes, the state falls back to `Disconnected`.
struct PendingConnect<'a> {
    state: &'a mut ConnectionState,
}

impl<'a> PendingConnect<'a> {
    fn begin(state: &'a mut ConnectionState) -> Self {
        *state = ConnectionState::Connecting;
        Self { state }
    }

    fn finish(self, next: ConnectionState) {
        *self.state = next;
    }
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        if matches!(self.state, ConnectionState::Connecting) {
            warn!("Connection attempt cancelled before it finished");
            *self.state = ConnectionState::Disconnected;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
    Failed,
    CoolingDown,
}

/// Snapshot for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionPhase,
    pub selected: DatabaseKind,
    pub connection: Option<ProfileSummary>,
    pub last_error: Option<String>,
    pub failed_attempts: u32,
    pub cooldown_remaining_secs: Option<f64>,
}

pub struct ConnectionManager {
    connectors: Connectors,
    selected: DatabaseKind,
    state: ConnectionState,
    failed_attempts: u32,
    max_failed_attempts: u32,
    cooldown: Duration,
    /// Survives `disconnect`; only a successful connect clears it.
    retry_at: Option<Instant>,
}

impl ConnectionManager {
    pub fn new(connectors: Connectors, max_failed_attempts: u32, cooldown: Duration) -> Self {
        Self {
            connectors,
            selected: DatabaseKind::default(),
            state: ConnectionState::Disconnected,
            failed_attempts: 0,
            max_failed_attempts,
            cooldown,
            retry_at: None,
        }
    }

    pub fn select(&mut self, kind: DatabaseKind) {
        self.selected = kind;
    }

    pub fn selected(&self) -> DatabaseKind {
        self.selected
    }

    /// Connects with `profile`, which also becomes the selected kind.
    pub async fn connect(
        &mut self,
        profile: ConnectionProfile,
    ) -> Result<Arc<ActiveConnection>, AppError> {
        match &self.state {
            ConnectionState::Connected(active) => {
                return Err(AppError::InvalidState(format!(
                    "Already connected to {}; disconnect first",
                    active.profile.kind
                )));
            }
            ConnectionState::Connecting => {
                return Err(AppError::InvalidState(
                    "A connection attempt is already in progress".to_string(),
                ));
            }
            ConnectionState::Disconnected | ConnectionState::Failed { .. } => {}
        }

        self.selected = profile.kind;

        if let Some(retry_at) = self.retry_at.filter(|at| *at > Instant::now()) {
            info!(
                "Too many failed attempts, waiting {:?} before connecting",
                retry_at - Instant::now()
            );
            tokio::time::sleep_until(retry_at).await;
        }

        let connector = self.connectors.for_kind(profile.kind);
        let pending = PendingConnect::begin(&mut self.state);
        info!("Connecting to {}", profile.kind);

        match connector.connect(&profile).await {
            Ok(executor) => {
                info!("Connected to {}", profile.kind);
                let active = Arc::new(ActiveConnection::new(profile, executor));
                self.retry_at = None;
                pending.finish(ConnectionState::Connected(Arc::clone(&active)));
                Ok(active)
            }
            Err(e) => {
                self.failed_attempts += 1;
                self.retry_at = (self.failed_attempts >= self.max_failed_attempts)
                    .then(|| Instant::now() + self.cooldown);
                warn!(
                    "Connection to {} failed (attempt {}): {}",
                    profile.kind, self.failed_attempts, e
                );
                pending.finish(ConnectionState::Failed {
                    error: e.to_string(),
                });
                Err(AppError::Connection(e))
            }
        }
    }

    /// Returns whether a connection was open.
    pub fn disconnect(&mut self) -> bool {
        let was_connected = matches!(self.state, ConnectionState::Connected(_));
        if was_connected {
            info!("Disconnected from database");
        }
        self.state = ConnectionState::Disconnected;
        was_connected
    }

    pub fn active(&self) -> Option<Arc<ActiveConnection>> {
        match &self.state {
            ConnectionState::Connected(active) => Some(Arc::clone(active)),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Time left before the next attempt may dispatch.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let remaining = self.retry_at?.saturating_duration_since(Instant::now());
        (!remaining.is_zero()).then_some(remaining)
    }

    pub fn status(&self) -> ConnectionStatus {
        let cooldown = self.cooldown_remaining();
        let (state, connection, last_error) = match &self.state {
            ConnectionState::Connected(active) => (
                ConnectionPhase::Connected,
                Some(active.profile.summary()),
                None,
            ),
            ConnectionState::Connecting => (ConnectionPhase::Connecting, None, None),
            ConnectionState::Disconnected if cooldown.is_some() => {
                (ConnectionPhase::CoolingDown, None, None)
            }
            ConnectionState::Disconnected => (ConnectionPhase::Disconnected, None, None),
            ConnectionState::Failed { error } => {
                let phase = match (self.retry_at, cooldown) {
                    (_, Some(_)) => ConnectionPhase::CoolingDown,
                    (Some(_), None) => ConnectionPhase::Disconnected,
                    (None, None) => ConnectionPhase::Failed,
                };
                (phase, None, Some(error.clone()))
            }
        };

        ConnectionStatus {
            state,
            selected: self.selected,
            connection,
            last_error,
            failed_attempts: self.failed_attempts,
            cooldown_remaining_secs: cooldown.map(|d| d.as_secs_f64()),
        }
    }
}
