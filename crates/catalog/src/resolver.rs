use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::try_join_all;

use crate::connection::Connection;
use crate::listing::CatalogResult;
use crate::listing_for;
use crate::model::{Model, ModelCache, shared_model_cache};

/// One resolved catalog. `warning` carries the diagnostic text of a pass that
/// degraded to an empty list; it is never surfaced as an error to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    pub models: Vec<Model>,
    pub warning: Option<String>,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogPass {
    /// The pass was still the newest one when it finished; its catalog is
    /// current.
    Completed(ModelCatalog),
    /// A newer pass started before this one finished. The result must be
    /// discarded by the caller.
    Superseded { started: u64, newest: u64 },
}

impl CatalogPass {
    pub fn into_catalog(self) -> Option<ModelCatalog> {
        match self {
            Self::Completed(catalog) => Some(catalog),
            Self::Superseded { .. } => None,
        }
    }
}

/// Resolves the flat model list for a set of configured connections.
///
/// Per-connection work is memoized in the cache, all connections resolve
/// concurrently, and any listing failure degrades the whole pass to an empty
/// catalog rather than an error. Each pass is tagged with a monotonically
/// increasing generation so that results arriving after a newer pass has
/// started can be recognized as stale.
pub struct ModelCatalogResolver {
    http: reqwest::Client,
    cache: Arc<ModelCache>,
    generation: AtomicU64,
}

impl ModelCatalogResolver {
    /// Resolver backed by the process-wide cache.
    pub fn new() -> Self {
        Self::with_cache(shared_model_cache())
    }

    pub fn with_cache(cache: Arc<ModelCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            cache,
            generation: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub async fn resolve(&self, connections: &[Connection]) -> CatalogPass {
        let pass = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let catalog = match self.resolve_all(connections).await {
            Ok(models) => ModelCatalog {
                models,
                warning: None,
            },
            Err(error) => {
                tracing::warn!(
                    connection_count = connections.len(),
                    error = %error,
                    "catalog resolution failed; serving empty model list"
                );
                ModelCatalog {
                    models: Vec::new(),
                    warning: Some(error.to_string()),
                }
            }
        };

        let newest = self.generation.load(Ordering::SeqCst);
        if newest != pass {
            return CatalogPass::Superseded {
                started: pass,
                newest,
            };
        }

        CatalogPass::Completed(catalog)
    }

    async fn resolve_all(&self, connections: &[Connection]) -> CatalogResult<Vec<Model>> {
        let passes = connections
            .iter()
            .map(|connection| self.resolve_connection(connection));
        let resolved = try_join_all(passes).await?;
        Ok(resolved.into_iter().flatten().collect())
    }

    async fn resolve_connection(&self, connection: &Connection) -> CatalogResult<Vec<Model>> {
        if let Some(models) = self.cache.get(connection).await {
            return Ok(models);
        }

        let Some(listing) = listing_for(connection.kind, &self.http) else {
            tracing::debug!(
                connection_id = %connection.id,
                kind = connection.kind.label(),
                "no listing strategy for provider kind; connection contributes zero models"
            );
            return Ok(Vec::new());
        };

        let names = listing.list_models(connection).await?;
        let models = names
            .into_iter()
            .map(|name| Model::compose(connection, name))
            .collect::<Vec<_>>();

        self.cache.set(connection, models.clone()).await;
        Ok(models)
    }
}

impl Default for ModelCatalogResolver {
    fn default() -> Self {
        Self::new()
    }
}
