use std::future::Future;
use std::pin::Pin;

use snafu::Snafu;

use crate::connection::{Connection, ProviderKind};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CatalogError {
    #[snafu(display("connection '{connection_id}' has no base URL configured"))]
    MissingBaseUrl {
        stage: &'static str,
        connection_id: String,
    },
    #[snafu(display("model listing request failed on `{stage}`: {source}"))]
    ListingTransport {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("model listing endpoint returned status {status}: {body}"))]
    ListingStatus {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to parse model listing payload: {details}"))]
    ListingPayload {
        stage: &'static str,
        details: String,
    },
}

/// Strategy for listing the provider-native model names one connection can
/// serve. Implementations return bare names; the resolver composes them into
/// [`crate::Model`]s.
pub trait ModelListing: Send + Sync {
    fn kind(&self) -> ProviderKind;
    fn list_models<'a>(
        &'a self,
        connection: &'a Connection,
    ) -> BoxFuture<'a, CatalogResult<Vec<String>>>;
}

pub const OPENAI_MODEL_NAMES: &[&str] = &["gpt-4o-mini", "gpt-4o", "gpt-4.1", "o3"];

pub const ANTHROPIC_MODEL_NAMES: &[&str] = &[
    "claude-opus-4-1",
    "claude-sonnet-4-0",
    "claude-3-5-haiku-latest",
];

/// Fixed-catalog strategy: the supported model names are known ahead of time
/// and listing never touches the network.
pub struct FixedListing {
    kind: ProviderKind,
    names: &'static [&'static str],
}

impl FixedListing {
    pub fn openai() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            names: OPENAI_MODEL_NAMES,
        }
    }

    pub fn anthropic() -> Self {
        Self {
            kind: ProviderKind::Anthropic,
            names: ANTHROPIC_MODEL_NAMES,
        }
    }
}

impl ModelListing for FixedListing {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn list_models<'a>(
        &'a self,
        _connection: &'a Connection,
    ) -> BoxFuture<'a, CatalogResult<Vec<String>>> {
        let names = self.names.iter().map(|name| name.to_string()).collect();
        Box::pin(std::future::ready(Ok(names)))
    }
}
