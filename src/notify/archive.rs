// src/notify/archive.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::DigestNotifier;
use crate::digest::RenderedDigest;

/// Writes each digest to `<dir>/digest-YYYY-MM-DD.html`; a rerun on the same
/// day overwrites.
pub struct HtmlArchiveNotifier {
    dir: PathBuf,
}

impl HtmlArchiveNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, digest: &RenderedDigest) -> PathBuf {
        self.dir.join(format!(
            "digest-{}.html",
            digest.generated_at.format("%Y-%m-%d")
        ))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl DigestNotifier for HtmlArchiveNotifier {
    async fn deliver(&self, digest: &RenderedDigest) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path_for(digest);
        tokio::fs::write(&path, digest.html.as_bytes())
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!(target: "notify", path = %path.display(), "digest archived");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "archive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let n = HtmlArchiveNotifier::new(dir.path().join("out"));
        let d = RenderedDigest {
            subject: "s".into(),
            html: "<html>ok</html>".into(),
            generated_at: Utc.with_ymd_and_hms(2025, 9, 10, 6, 0, 0).unwrap(),
            article_count: 0,
        };
        n.deliver(&d).await.unwrap();
        let p = dir.path().join("out/digest-2025-09-10.html");
        assert_eq!(std::fs::read_to_string(p).unwrap(), "<html>ok</html>");
    }
}
