use std::sync::Arc;

use tokio::sync::watch;

use crate::connection::Connection;
use crate::model::Model;
use crate::resolver::{CatalogPass, ModelCatalogResolver};

/// Re-resolves the catalog whenever the observed connection list changes and
/// publishes each completed pass.
///
/// Passes are spawned, not awaited in the loop, so a change arriving while a
/// pass is in flight starts the next pass immediately; the resolver's
/// generation counter then discards whichever pass lost the race.
pub struct CatalogService {
    resolver: Arc<ModelCatalogResolver>,
    connections: watch::Receiver<Vec<Connection>>,
    catalog: watch::Sender<Vec<Model>>,
}

impl CatalogService {
    /// Returns the service and the receiver on which resolved catalogs are
    /// published. The receiver starts with an empty list.
    pub fn new(
        resolver: ModelCatalogResolver,
        connections: watch::Receiver<Vec<Connection>>,
    ) -> (Self, watch::Receiver<Vec<Model>>) {
        let (catalog_tx, catalog_rx) = watch::channel(Vec::new());
        let service = Self {
            resolver: Arc::new(resolver),
            connections,
            catalog: catalog_tx,
        };
        (service, catalog_rx)
    }

    /// Runs until the connection channel closes.
    pub async fn run(mut self) {
        loop {
            let snapshot = self.connections.borrow_and_update().clone();
            let resolver = self.resolver.clone();
            let catalog = self.catalog.clone();

            tokio::spawn(async move {
                match resolver.resolve(&snapshot).await {
                    CatalogPass::Completed(resolved) => {
                        if let Some(warning) = &resolved.warning {
                            tracing::warn!(warning = %warning, "publishing degraded catalog");
                        }
                        tracing::debug!(model_count = resolved.models.len(), "publishing catalog");
                        let _ = catalog.send(resolved.models);
                    }
                    CatalogPass::Superseded { started, newest } => {
                        tracing::debug!(started, newest, "dropping superseded catalog pass");
                    }
                }
            });

            if self.connections.changed().await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionConfig, ProviderKind};
    use crate::listing::OPENAI_MODEL_NAMES;
    use crate::model::ModelCache;

    #[tokio::test]
    async fn publishes_a_catalog_for_each_connection_change() {
        let connection = Connection::new("conn-oa", ProviderKind::OpenAi, ConnectionConfig::default());
        let (conn_tx, conn_rx) = watch::channel(vec![connection]);

        let resolver = ModelCatalogResolver::with_cache(Arc::new(ModelCache::new()));
        let (service, mut catalog_rx) = CatalogService::new(resolver, conn_rx);
        let service_task = tokio::spawn(service.run());

        catalog_rx.changed().await.expect("initial catalog published");
        {
            let models = catalog_rx.borrow();
            assert_eq!(models.len(), OPENAI_MODEL_NAMES.len());
            assert!(models.iter().all(|model| model.connection_id == "conn-oa"));
        }

        conn_tx.send(Vec::new()).expect("service still listening");
        catalog_rx.changed().await.expect("updated catalog published");
        assert!(catalog_rx.borrow().is_empty());

        drop(conn_tx);
        service_task.await.expect("service exits when input closes");
    }
}
