use dcpr_retrieval::{ConfiguredPipeline, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ConfiguredPipeline>,
    pub sessions: Arc<SessionStore>,

    /// Directory the serving index is reloaded from
    pub index_path: PathBuf,
}

impl AppState {
    pub fn new(pipeline: ConfiguredPipeline, index_path: PathBuf) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sessions: Arc::new(SessionStore::new()),
            index_path,
        }
    }
}
