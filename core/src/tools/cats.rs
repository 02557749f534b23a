//! Cat image search against TheCatAPI
//!
//! Trait filters (temperament, size) are resolved against the breed catalog
//! first and turned into a `breed_ids` filter for the image search.

use super::{CatSearch, CatSize, SearchCatsArgs, SearchOutcome};
use crate::config::CatApiConfig;
use crate::error::{Error, Result};
use crate::util::{api_key_header, sanitize_base_url};
use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{header::HeaderValue, Client as HttpClient};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-api-key";
const SEARCH_LIMIT: &str = "1";

#[derive(Debug, Clone, Deserialize)]
pub struct Breed {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub temperament: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub weight: Option<BreedWeight>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreedWeight {
    #[serde(default)]
    pub metric: Option<String>,
}

impl Breed {
    /// Size class of the breed: an explicit `size` field wins, otherwise the
    /// upper bound of the metric weight range ("3 - 5") decides.
    pub fn size_class(&self) -> Option<CatSize> {
        if let Some(size) = self.size.as_deref().and_then(|s| s.parse().ok()) {
            return Some(size);
        }
        let metric = self.weight.as_ref()?.metric.as_deref()?;
        let max_kg = metric
            .split('-')
            .filter_map(|part| part.trim().parse::<f64>().ok())
            .fold(None, |max: Option<f64>, kg| Some(max.map_or(kg, |m| m.max(kg))))?;
        Some(CatSize::from_weight_kg(max_kg))
    }

    fn matches(&self, temperament: Option<&str>, size: Option<CatSize>) -> bool {
        let temperament_ok = temperament.map_or(true, |wanted| {
            self.temperament
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&wanted.to_lowercase()))
        });
        let size_ok = size.map_or(true, |wanted| self.size_class() == Some(wanted));
        temperament_ok && size_ok
    }
}

/// Comma-joined ids of the breeds matching the requested traits
pub fn matching_breed_ids(breeds: &[Breed], args: &SearchCatsArgs) -> String {
    breeds
        .iter()
        .filter(|b| b.matches(args.temperament.as_deref(), args.size))
        .map(|b| b.id.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Query parameters of an image search
pub fn image_search_query(breed_ids: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", SEARCH_LIMIT.to_string())];
    if let Some(ids) = breed_ids {
        query.push(("breed_ids", ids.to_string()));
    }
    query
}

/// Stateless HTTP client for the cat image service
pub struct CatClient {
    http_client: HttpClient,
    base_url: String,
    api_key: Option<HeaderValue>,
}

impl CatClient {
    /// Build the client. A missing API key is accepted; searches then report
    /// an error outcome without touching the network.
    pub fn new(config: &CatApiConfig) -> Result<Self> {
        let base_url = sanitize_base_url(&config.base_url, "Cat API base URL")
            .map_err(|e| Error::configuration(e.to_string()))?;
        let api_key = config
            .api_key
            .as_deref()
            .map(|key| api_key_header(key, None))
            .transpose()
            .map_err(|e| Error::configuration(e.to_string()))?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("catpicker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> anyhow::Result<T> {
        let api_key = self
            .api_key
            .clone()
            .context("cat API key is not configured")?;
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {path} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("cat API returned {} for {}", status, path);
        }
        response
            .json()
            .await
            .with_context(|| format!("failed to decode {path} response"))
    }

    pub async fn list_breeds(&self) -> anyhow::Result<Vec<Breed>> {
        self.get_json("breeds", &[]).await
    }

    /// Breed filter for the search: a direct breed wins, traits are resolved
    /// through the catalog. `Ok(Some(""))` means no breed matched the traits.
    async fn breed_filter(&self, args: &SearchCatsArgs) -> anyhow::Result<Option<String>> {
        if let Some(breed) = &args.breed {
            return Ok(Some(breed.clone()));
        }
        if !args.has_traits() {
            return Ok(None);
        }
        let breeds = self.list_breeds().await?;
        let ids = matching_breed_ids(&breeds, args);
        tracing::debug!(
            catalog = breeds.len(),
            matched = %ids,
            "Resolved breed traits"
        );
        Ok(Some(ids))
    }

    async fn try_search(&self, args: &SearchCatsArgs) -> anyhow::Result<Option<Value>> {
        let breed_ids = self.breed_filter(args).await?;
        if breed_ids.as_deref() == Some("") {
            return Ok(None);
        }

        let query = image_search_query(breed_ids.as_deref());
        let mut images: Vec<Value> = self.get_json("images/search", &query).await?;
        Ok(if images.is_empty() {
            None
        } else {
            Some(images.swap_remove(0))
        })
    }
}

#[async_trait]
impl CatSearch for CatClient {
    async fn search(&self, args: &SearchCatsArgs) -> SearchOutcome {
        match self.try_search(args).await {
            Ok(Some(record)) => SearchOutcome::Found(record),
            Ok(None) => {
                tracing::info!(?args, "No cats found");
                SearchOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!(?args, "Cat search failed: {:#}", e);
                SearchOutcome::Error {
                    message: format!("{e:#}"),
                }
            }
        }
    }
}
