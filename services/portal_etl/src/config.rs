use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::extract::CleanerConfig;
use crate::merge::MergeSpec;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub api: ApiConfig,
    /// Dataset name → local CSV/spreadsheet used instead of the API.
    #[serde(default)]
    pub local: HashMap<String, String>,
    #[serde(default)]
    pub clean: CleanerConfig,
    #[serde(default)]
    pub merge: MergeSpec,
    #[serde(default)]
    pub disposition: DispositionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub use_local: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispositionConfig {
    #[serde(default = "default_disposition_field")]
    pub field: String,
    #[serde(default = "default_amount_field")]
    pub amount_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            api: ApiConfig::default(),
            local: HashMap::new(),
            clean: CleanerConfig::default(),
            merge: MergeSpec::default(),
            disposition: DispositionConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            use_local: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for DispositionConfig {
    fn default() -> Self {
        Self {
            field: default_disposition_field(),
            amount_field: default_amount_field(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML in {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Default CSV destination for a fetched dataset: `<data_dir>/<dataset>.csv`.
    pub fn dataset_csv_path(&self, dataset: &str) -> PathBuf {
        Path::new(&self.data_dir).join(format!("{}.csv", dataset.trim_matches('/')))
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_disposition_field() -> String {
    "Disposition".to_string()
}

fn default_amount_field() -> String {
    "Open_Memo_Amt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DedupPolicy;

    #[test]
    fn test_config_load() {
        let config = Config::load("../../config/portal.toml").unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.merge.primary_key, "Style");
        assert_eq!(config.clean.dedup_policy, DedupPolicy::WholeTable);
        assert!(config.local.contains_key("memo"));
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.api.use_local);
        assert_eq!(config.merge.fill_fields.len(), 8);
        assert_eq!(config.merge.probe(), Some("AE"));
        assert_eq!(config.merge.top_n, 50);
        assert_eq!(config.disposition.field, "Disposition");
        assert_eq!(config.disposition.amount_field, "Open_Memo_Amt");

        let default = Config::default();
        assert_eq!(default.data_dir, config.data_dir);
        assert_eq!(default.api.base_url, config.api.base_url);
        assert_eq!(default.merge.fill_fields, config.merge.fill_fields);
    }

    #[test]
    fn test_config_sections() {
        let toml_str = r#"
[api]
base_url = "https://portal.example"
api_key = "k"
use_local = true

[local]
memo = "fixtures/memo.csv"

[clean]
dedup_policy = "per_row"

[merge]
fill_fields = ["Buyer", "image_url"]
top_n = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.api.use_local);
        assert_eq!(config.local.get("memo").map(String::as_str), Some("fixtures/memo.csv"));
        assert!(!config.local.contains_key("stock"));
        assert_eq!(config.clean.dedup_policy, DedupPolicy::PerRow);
        assert_eq!(config.merge.probe(), Some("Buyer"));
        assert_eq!(config.merge.mapping_key, "Style");
        assert_eq!(config.merge.top_n, 5);
    }

    #[test]
    fn test_dataset_csv_path_under_data_dir() {
        let config: Config = toml::from_str("data_dir = \"out/portal\"").unwrap();
        assert_eq!(
            config.dataset_csv_path("memo"),
            Path::new("out/portal").join("memo.csv")
        );
        assert_eq!(
            Config::default().dataset_csv_path("stock"),
            Path::new("data").join("stock.csv")
        );
    }

    #[test]
    fn test_config_load_reports_path() {
        let err = Config::load("does/not/exist.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.toml"));
    }
}
