use serde::Deserialize;
use snafu::{ResultExt, ensure};

use crate::connection::{Connection, ProviderKind};
use crate::listing::{
    BoxFuture, CatalogError, CatalogResult, ListingStatusSnafu, ListingTransportSnafu,
    MissingBaseUrlSnafu, ModelListing,
};

/// Response shape of `GET {base_url}/api/tags`. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Dynamic-catalog strategy: asks the connection-supplied endpoint which
/// models it currently serves.
pub struct OllamaListing {
    http: reqwest::Client,
}

impl OllamaListing {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch_tags(&self, connection: &Connection) -> CatalogResult<Vec<String>> {
        let base_url = connection.config.url.trim().trim_end_matches('/');
        ensure!(
            !base_url.is_empty(),
            MissingBaseUrlSnafu {
                stage: "ollama-base-url",
                connection_id: connection.id.clone(),
            }
        );

        let url = format!("{base_url}/api/tags");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context(ListingTransportSnafu {
                stage: "send-tags-request",
            })?;

        let status = response.status();
        let payload = response.text().await.context(ListingTransportSnafu {
            stage: "read-tags-response",
        })?;

        if !status.is_success() {
            return ListingStatusSnafu {
                stage: "tags-http-status",
                status: status.as_u16(),
                body: payload,
            }
            .fail();
        }

        let tags: TagsResponse =
            serde_json::from_str(&payload).map_err(|source| CatalogError::ListingPayload {
                stage: "parse-tags-response",
                details: source.to_string(),
            })?;

        Ok(tags.models.into_iter().map(|entry| entry.name).collect())
    }
}

impl ModelListing for OllamaListing {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn list_models<'a>(
        &'a self,
        connection: &'a Connection,
    ) -> BoxFuture<'a, CatalogResult<Vec<String>>> {
        Box::pin(self.fetch_tags(connection))
    }
}
