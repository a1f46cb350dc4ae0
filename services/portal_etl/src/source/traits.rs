use anyhow::Result;
use async_trait::async_trait;

use crate::table::RawTable;

/// Somewhere named datasets (`sales`, `memo`, `stock`, ...) can be pulled from.
#[async_trait]
pub trait RowSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, dataset: &str) -> Result<RawTable>;
}
