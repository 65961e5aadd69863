//! Admin lists read from local `Admins.cfg` files.

use async_trait::async_trait;
use squad_server::{AdminListError, AdminSource};
use std::path::PathBuf;
use tracing::debug;

/// Re-reads every file on each fetch. One unreadable file fails the fetch so
/// a half-loaded set never replaces the previous one.
pub struct AdminFilesSource {
    paths: Vec<PathBuf>,
}

impl AdminFilesSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl AdminSource for AdminFilesSource {
    async fn fetch(&self) -> Result<Vec<String>, AdminListError> {
        let mut lists = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let list = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AdminListError::Fetch(format!("{}: {}", path.display(), e)))?;
            debug!("🛡️ Read admin list {}", path.display());
            lists.push(list);
        }
        Ok(lists)
    }
}
