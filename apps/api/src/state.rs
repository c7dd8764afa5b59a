use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Chat model behind every pipeline call. `OpenAiClient` in production.
    pub llm: Arc<dyn ChatModel>,
    pub config: Config,
}
