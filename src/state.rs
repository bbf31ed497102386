// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::ai::AiProvider;
use crate::cache::ArtifactCache;
use crate::config::Config;
use crate::storage::ObjectStore;
use crate::store::MetadataStore;

/// Shared application state. Stores and the AI provider are trait objects
/// so the running service wires Postgres + filesystem + a real provider,
/// while tests wire in-memory and stub implementations.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn MetadataStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub cache: ArtifactCache,
    pub ai: Arc<dyn AiProvider>,
    pub config: Config,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
