use async_trait::async_trait;
use crate::types::PublishTarget;
use crate::Result;

/// A file-hosting sink that can turn an uploaded file into a public link.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Upload `bytes` under `path` (a file name, possibly with folders) and
    /// return the public download URL.
    async fn upload(&self, bytes: &[u8], path: &str, target: &PublishTarget) -> Result<String>;
}
