use std::sync::Arc;

pub mod connection;
pub mod listing;
pub mod model;
pub mod ollama;
pub mod resolver;
pub mod service;

pub use connection::{Connection, ConnectionConfig, ProviderKind};
pub use listing::{
    ANTHROPIC_MODEL_NAMES, BoxFuture, CatalogError, CatalogResult, FixedListing, ModelListing,
    OPENAI_MODEL_NAMES,
};
pub use model::{Model, ModelCache, shared_model_cache};
pub use ollama::OllamaListing;
pub use resolver::{CatalogPass, ModelCatalog, ModelCatalogResolver};
pub use service::CatalogService;

/// Selects the listing strategy for a provider kind. `None` means the kind is
/// not recognized and the connection contributes zero models.
pub fn listing_for(kind: ProviderKind, http: &reqwest::Client) -> Option<Arc<dyn ModelListing>> {
    match kind {
        ProviderKind::OpenAi => Some(Arc::new(FixedListing::openai())),
        ProviderKind::Anthropic => Some(Arc::new(FixedListing::anthropic())),
        ProviderKind::Ollama => Some(Arc::new(OllamaListing::new(http.clone()))),
        ProviderKind::Unknown => None,
    }
}
