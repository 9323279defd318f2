//! HTTP data source
//!
//! One GET per entity type with `reqwest`. The body is either a JSON array of
//! items or an object holding that array under the configured results field
//! (randomuser.me nests users under `results`). Enveloping happens after the
//! transport call, in [`extract_items`] followed by `envelope_batch`.

use super::DataSource;
use crate::core::config::{EndpointConfig, SourcesConfig};
use crate::core::error::{Result, SourceError};
use crate::core::types::{EntityType, Envelope};
use crate::pipeline::envelope::{envelope_batch, BatchPolicy};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Data source fetching each entity type from its configured URL
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    sources: SourcesConfig,
    policy: BatchPolicy,
}

impl HttpSource {
    /// Build a source with its own client honouring `sources.timeout`
    pub fn new(sources: SourcesConfig, policy: BatchPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(sources.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SourceError::from)?;

        Ok(Self {
            client,
            sources,
            policy,
        })
    }

    async fn fetch_body(&self, endpoint: &EndpointConfig) -> Result<Value> {
        let response = self
            .client
            .get(&endpoint.url)
            .send()
            .await
            .map_err(SourceError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: endpoint.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.json::<Value>().await.map_err(SourceError::from)?;
        Ok(body)
    }
}

/// Pull the item array out of a response body
pub fn extract_items(body: Value, endpoint: &EndpointConfig) -> Result<Vec<Value>> {
    let unexpected = |expected: String| SourceError::UnexpectedShape {
        url: endpoint.url.clone(),
        expected,
    };

    let items = match &endpoint.results_field {
        None => body,
        Some(field) => match body {
            Value::Object(mut fields) => fields
                .remove(field)
                .ok_or_else(|| unexpected(format!("an object with a `{}` field", field)))?,
            _ => return Err(unexpected(format!("an object with a `{}` field", field)).into()),
        },
    };

    match items {
        Value::Array(items) => Ok(items),
        _ => Err(unexpected("a JSON array of items".to_string()).into()),
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self, entity_type: EntityType) -> Result<Vec<Envelope>> {
        let endpoint = self.sources.endpoint(entity_type);
        debug!(entity = %entity_type, url = %endpoint.url, "Fetching");

        let body = self.fetch_body(endpoint).await?;
        let items = extract_items(body, endpoint)?;
        Ok(envelope_batch(items, entity_type, &endpoint.url, self.policy))
    }

    fn describe(&self) -> String {
        "http".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use serde_json::json;

    fn endpoint(results_field: Option<&str>) -> EndpointConfig {
        EndpointConfig {
            url: "https://randomuser.me/api/?results=20".to_string(),
            results_field: results_field.map(str::to_string),
        }
    }

    #[test]
    fn test_extract_top_level_array() {
        let items = extract_items(json!([{"id": 1}, {"id": 2}]), &endpoint(None)).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_extract_nested_results() {
        let body = json!({"results": [{"phone": "555"}], "info": {"seed": "abc"}});
        let items = extract_items(body, &endpoint(Some("results"))).unwrap();
        assert_eq!(items, vec![json!({"phone": "555"})]);
    }

    #[test]
    fn test_extract_rejects_wrong_shape() {
        let missing = extract_items(json!({"info": {}}), &endpoint(Some("results")));
        assert!(matches!(missing, Err(Error::Source(SourceError::UnexpectedShape { .. }))));

        let not_array = extract_items(json!({"error": "quota exceeded"}), &endpoint(None));
        assert!(matches!(not_array, Err(Error::Source(SourceError::UnexpectedShape { .. }))));
    }

    #[test]
    fn test_new_builds_client() {
        let source = HttpSource::new(SourcesConfig::default(), BatchPolicy::DropBatch).unwrap();
        assert_eq!(source.describe(), "http");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_an_error() {
        let mut sources = SourcesConfig::default();
        // Port 9 (discard) on loopback is closed in test environments
        sources.products.url = "http://127.0.0.1:9/products".to_string();
        sources.timeout = std::time::Duration::from_millis(500);

        let source = HttpSource::new(sources, BatchPolicy::DropBatch).unwrap();
        assert!(source.fetch(EntityType::Product).await.is_err());
    }
}
