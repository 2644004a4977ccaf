//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::info;

/// Ensure the media root exists, creating it when missing.
pub async fn ensure_media_root(media_root: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(media_root).await.is_err() {
        info!(%media_root, "media root not found; creating it");
    }
    tokio::fs::create_dir_all(media_root)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {media_root}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ensure_media_root;

    #[tokio::test]
    async fn creates_nested_media_root() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("uploads/media");
        let root = root.to_string_lossy().into_owned();
        ensure_media_root(&root).await?;
        assert!(tokio::fs::metadata(&root).await?.is_dir());
        // second call is a no-op
        ensure_media_root(&root).await?;
        Ok(())
    }
}
