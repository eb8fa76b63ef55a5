use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tokio::sync::RwLock;

use crate::connection::Connection;

/// A resolved, selectable unit of inference capability. Derived on every
/// resolution pass, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// Composite identifier: `{connection_id}/{model_name}`. Globally unique
    /// because connection ids are.
    pub id: String,
    /// Display name: the id with its connection prefix stripped.
    pub name: String,
    /// Back-reference to the owning connection.
    pub connection_id: String,
}

impl Model {
    pub fn compose(connection: &Connection, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        Self {
            id: format!("{}/{}", connection.id, model_name),
            name: model_name,
            connection_id: connection.id.clone(),
        }
    }

    /// The id with the `{connection_id}/` prefix removed. Falls back to the
    /// full id if the prefix is somehow absent.
    pub fn display_name(&self) -> &str {
        self.id
            .strip_prefix(self.connection_id.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.id)
    }
}

/// Append-only memoization of per-connection listing results, keyed by the
/// connection fingerprint. Entries live for the process lifetime unless the
/// caller invalidates them.
pub struct ModelCache {
    entries: RwLock<HashMap<u64, Vec<Model>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, connection: &Connection) -> Option<Vec<Model>> {
        let entries = self.entries.read().await;
        entries.get(&connection.fingerprint()).cloned()
    }

    pub async fn set(&self, connection: &Connection, models: Vec<Model>) {
        let mut entries = self.entries.write().await;
        entries.insert(connection.fingerprint(), models);
    }

    /// Drops the entry for one connection value, forcing the next pass to
    /// list it again. Invalidation policy belongs to the caller.
    pub async fn invalidate(&self, connection: &Connection) {
        let mut entries = self.entries.write().await;
        entries.remove(&connection.fingerprint());
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

static MODEL_CACHE: OnceLock<Arc<ModelCache>> = OnceLock::new();

/// Process-wide cache shared by resolvers that do not bring their own.
pub fn shared_model_cache() -> Arc<ModelCache> {
    MODEL_CACHE.get_or_init(|| Arc::new(ModelCache::new())).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionConfig, ProviderKind};

    fn connection(id: &str) -> Connection {
        Connection::new(id, ProviderKind::Ollama, ConnectionConfig::with_url("http://localhost:11434"))
    }

    #[test]
    fn compose_prefixes_id_with_connection_id() {
        let conn = connection("conn-a");
        let model = Model::compose(&conn, "llama3");

        assert_eq!(model.id, "conn-a/llama3");
        assert_eq!(model.name, "llama3");
        assert_eq!(model.connection_id, "conn-a");
    }

    #[test]
    fn display_name_strips_connection_prefix() {
        let conn = connection("conn-a");
        let model = Model::compose(&conn, "llama3:8b");
        assert_eq!(model.display_name(), "llama3:8b");
        assert_eq!(
            model.display_name(),
            model.id.strip_prefix("conn-a/").expect("prefixed id")
        );
    }

    #[tokio::test]
    async fn cache_round_trip_and_invalidate() {
        let cache = ModelCache::new();
        let conn = connection("conn-a");
        let models = vec![Model::compose(&conn, "llama3")];

        assert!(cache.get(&conn).await.is_none());

        cache.set(&conn, models.clone()).await;
        assert_eq!(cache.get(&conn).await, Some(models));
        assert_eq!(cache.len().await, 1);

        cache.invalidate(&conn).await;
        assert!(cache.get(&conn).await.is_none());
    }

    #[tokio::test]
    async fn cache_misses_for_a_different_connection_value() {
        let cache = ModelCache::new();
        let conn = connection("conn-a");
        cache.set(&conn, vec![Model::compose(&conn, "llama3")]).await;

        let edited = Connection::new("conn-a", ProviderKind::Ollama, ConnectionConfig::with_url("http://10.0.0.5:11434"));
        assert!(cache.get(&edited).await.is_none());
    }
}
