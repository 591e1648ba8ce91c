use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use va_core::{Error, PublishTarget, Publisher, Result};

pub const MEMORY_SCHEME: &str = "memory://";

/// Keeps uploads in process memory. Used for dry runs and tests.
///
/// Nothing is evicted: each distinct `repository/path` stays resident until
/// the process exits, and uploading to the same path replaces the old bytes.
/// A long-running `serve --publisher memory` grows with every new file name.
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a file by the URL `upload` returned.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let key = url.strip_prefix(MEMORY_SCHEME)?;
        self.files.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(&self, bytes: &[u8], path: &str, target: &PublishTarget) -> Result<String> {
        let repository = target.repository.trim();
        if repository.is_empty() {
            return Err(Error::Publish("Repository is empty".to_string()));
        }
        let key = format!("{}/{}", repository, path.trim_start_matches('/'));
        self.files.write().await.insert(key.clone(), bytes.to_vec());
        Ok(format!("{}{}", MEMORY_SCHEME, key))
    }
}
