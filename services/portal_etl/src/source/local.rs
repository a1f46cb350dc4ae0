use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

use super::traits::RowSource;
use crate::extract::load_raw;
use crate::table::RawTable;

/// Local CSV/spreadsheet copies of the API datasets, for offline runs.
pub struct LocalSource {
    paths: HashMap<String, PathBuf>,
}

impl LocalSource {
    pub fn new(paths: HashMap<String, PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl RowSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, dataset: &str) -> Result<RawTable> {
        let path = self
            .paths
            .get(dataset)
            .ok_or_else(|| anyhow!("No local path configured for dataset '{}'", dataset))?;
        let table = load_raw(path).with_context(|| format!("Failed to load {:?}", path))?;
        tracing::info!("Loaded {} rows of {} from {:?}", table.len(), dataset, path);
        Ok(table)
    }
}
