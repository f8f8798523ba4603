use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::PlannerStore;
use crate::services::detail_generator::DetailGenerator;
use crate::services::image_lookup::ImageResolver;
use crate::services::llm::GenerationProvider;
use crate::services::pending_state::PendingStateStore;
use crate::services::search_session::SessionRegistry;
use crate::services::summary_generator::SummaryGenerator;

/// Everything the handlers share, built once at startup.
pub struct AppState {
    pub store: Arc<dyn PlannerStore>,
    pub sessions: SessionRegistry,
    pub summaries: SummaryGenerator,
    pub details: DetailGenerator,
    pub images: ImageResolver,
    pub pending: PendingStateStore,
    pub generation_configured: bool,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn PlannerStore>,
        provider: Arc<dyn GenerationProvider>,
        images: ImageResolver,
    ) -> Self {
        Self {
            store,
            sessions: SessionRegistry::new(),
            summaries: SummaryGenerator::new(Arc::clone(&provider), config.limits.clone()),
            details: DetailGenerator::new(provider, config.limits.clone()),
            images,
            pending: PendingStateStore::new(config.pending_state_ttl),
            generation_configured: config
                .openai_api_key
                .as_deref()
                .map_or(false, |key| !key.trim().is_empty()),
        }
    }
}
