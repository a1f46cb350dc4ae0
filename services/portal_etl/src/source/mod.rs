//! Where raw rows come from when they are not a file on the command line

pub mod api;
pub mod local;
pub mod traits;

pub use api::ApiSource;
pub use local::LocalSource;
pub use traits::RowSource;

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;

/// `LocalSource` when `api.use_local` is set, otherwise the portal API.
pub fn source_from_config(config: &Config) -> Result<Box<dyn RowSource>> {
    if config.api.use_local {
        let paths = config
            .local
            .iter()
            .map(|(dataset, path)| (dataset.clone(), PathBuf::from(path)))
            .collect();
        Ok(Box::new(LocalSource::new(paths)))
    } else {
        Ok(Box::new(ApiSource::new(&config.api)?))
    }
}
