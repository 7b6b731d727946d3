use crate::pipeline::QueryPipeline;
use crate::session::Session;
use minijinja::Environment;
use tokio::sync::Mutex;

/// Shared application state for the web server
pub struct AppState {
    /// One user per process; every request holds the lock for its duration.
    pub session: Mutex<Session>,
    pub pipeline: QueryPipeline,
    pub template_env: Environment<'static>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(session: Session, pipeline: QueryPipeline) -> Self {
        Self {
            session: Mutex::new(session),
            pipeline,
            template_env: super::templates::init_templates(),
            startup_time: chrono::Utc::now(),
        }
    }

    pub fn uptime_seconds(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.startup_time)
            .num_seconds()
    }
}
