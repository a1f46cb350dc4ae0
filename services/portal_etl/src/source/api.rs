use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use super::traits::RowSource;
use crate::config::ApiConfig;
use crate::table::RawTable;

/// Portal REST API: `GET {base_url}/api/{dataset}` returning a JSON row array.
pub struct ApiSource {
    base_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl ApiSource {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid API base_url: {}", config.base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn dataset_url(&self, dataset: &str) -> Result<Url> {
        self.base_url
            .join(&format!("api/{}", dataset.trim_matches('/')))
            .with_context(|| format!("Invalid dataset name: {}", dataset))
    }
}

#[async_trait]
impl RowSource for ApiSource {
    fn name(&self) -> &str {
        "api"
    }

    async fn fetch(&self, dataset: &str) -> Result<RawTable> {
        let url = self.dataset_url(dataset)?;
        tracing::debug!("Fetching {} from {}", dataset, url);

        let mut request = self.client.get(url.clone()).header("Accept", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("X-API-KEY", &self.api_key);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            bail!("Portal API returned error for {}: {}", dataset, response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response as JSON", dataset))?;
        let table = RawTable::from_json(body)?;

        tracing::info!("Fetched {} rows of {} from API", table.len(), dataset);
        Ok(table)
    }
}
