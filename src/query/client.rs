//! Remote spatial-query client

use crate::core::config::ClientOptions;
use crate::data::geojson::FeatureCollection;
use crate::query::osm::{to_feature_collection, OverpassResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Longest slice of an error body kept in `MapError::Http`
const ERROR_SNIPPET_LEN: usize = 256;

/// Shared client for plugins built without custom client options
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(ClientOptions::default().user_agent)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .expect("failed to build reqwest async client")
});

/// Anything that can turn a query string into features
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, query: &str) -> Result<FeatureCollection>;
}

/// Overpass API client: POSTs Overpass QL and converts the JSON answer to GeoJSON
#[derive(Debug, Clone)]
pub struct OverpassClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl OverpassClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let defaults = ClientOptions::default();
        let http = if options.timeout_secs.is_none() && options.user_agent == defaults.user_agent {
            HTTP_CLIENT.clone()
        } else {
            let mut builder = reqwest::Client::builder()
                .user_agent(options.user_agent.clone())
                .pool_idle_timeout(Duration::from_secs(90));
            if let Some(secs) = options.timeout_secs {
                builder = builder.timeout(Duration::from_secs(secs));
            }
            builder.build()?
        };
        Ok(Self { http, options })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    async fn fetch_raw(&self, query: &str) -> Result<String> {
        log::debug!("POST {} ({} bytes of QL)", self.options.overpass_url, query.len());

        let response = self
            .http
            .post(&self.options.overpass_url)
            .form(&[("data", query)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                message: snippet(&body),
            });
        }
        Ok(body)
    }
}

fn snippet(body: &str) -> String {
    match body.char_indices().nth(ERROR_SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[async_trait]
impl QueryClient for OverpassClient {
    async fn query(&self, query: &str) -> Result<FeatureCollection> {
        let body = self.fetch_raw(query).await?;
        let response = OverpassResponse::from_str(&body)?;

        if let Some(remark) = &response.remark {
            log::warn!("Overpass remark: {}", remark);
        }

        let collection = to_feature_collection(&response, self.options.flat_properties);
        log::info!(
            "Overpass returned {} elements, {} features",
            response.elements.len(),
            collection.len()
        );
        Ok(collection)
    }
}
