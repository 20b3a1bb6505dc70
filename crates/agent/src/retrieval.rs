//! Client for the vector-similarity service that holds the product/FAQ
//! knowledge base. The index is built offline; this side only queries it.

use std::time::Duration;

use async_trait::async_trait;
use barista_core::config::RetrievalConfig;
use barista_core::{GatewayError, RetrievedPassage};
use serde::Deserialize;
use serde_json::json;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Top `limit` passages for the query vector, best first.
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, GatewayError>;
}

pub struct HttpRetriever {
    http: reqwest::Client,
    base_url: String,
    collection: String,
}

impl HttpRetriever {
    pub fn from_config(config: &RetrievalConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Unavailable { message: error.to_string() })?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    score: f32,
    payload: SearchPayload,
}

#[derive(Deserialize)]
struct SearchPayload {
    text: String,
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedPassage>, GatewayError> {
        let url = format!("{}/collections/{}/points/search", self.base_url, self.collection);
        let body = json!({ "vector": vector, "limit": limit, "with_payload": true });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|error| GatewayError::Unavailable { message: error.to_string() })?
            .error_for_status()
            .map_err(|error| GatewayError::Unavailable { message: error.to_string() })?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|error| GatewayError::Unavailable { message: error.to_string() })?;

        Ok(parsed
            .result
            .into_iter()
            .map(|hit| RetrievedPassage { text: hit.payload.text, score: hit.score })
            .collect())
    }
}
