use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info};

use crate::descriptor::{ArchiveKind, InterpreterDescriptor};
use crate::http::HttpClient;

use super::store::PreferenceStore;
use super::{VersionTriple, save_available};

/// Where the latest revision of each archive kind is published.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn latest_revision(&self, kind: ArchiveKind) -> Result<i64>;
}

/// Reads the `LATEST_VERSION*` text files under a descriptor's version URL.
pub struct HttpVersionSource {
    http_client: HttpClient,
    descriptor: InterpreterDescriptor,
}

impl HttpVersionSource {
    pub fn new(http_client: HttpClient, descriptor: InterpreterDescriptor) -> Self {
        Self {
            http_client,
            descriptor,
        }
    }
}

#[async_trait]
impl VersionSource for HttpVersionSource {
    #[tracing::instrument(skip(self))]
    async fn latest_revision(&self, kind: ArchiveKind) -> Result<i64> {
        if let Some(revision) = self.descriptor.pinned_revision {
            debug!("{} revision pinned to {}", kind.label(), revision);
            return Ok(revision);
        }
        let url = self.descriptor.version_file_url(kind);
        let body = self.http_client.get_text(&url).await?;
        parse_revision(&body).with_context(|| format!("Malformed version file at {}", url))
    }
}

/// First line of a version file looks like `r17`: drop the leading
/// character, parse the rest.
pub fn parse_revision(body: &str) -> Result<i64> {
    let line = body.lines().next().unwrap_or("").trim();
    let mut chars = line.chars();
    if chars.next().is_none() {
        bail!("Version file is empty");
    }
    let digits = chars.as_str().trim();
    digits
        .parse()
        .with_context(|| format!("Invalid revision {:?}", line))
}

pub struct VersionChecker<S: VersionSource> {
    source: S,
}

impl<S: VersionSource> VersionChecker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch all three revisions. Only when every fetch succeeds are they
    /// stored as the available triple and committed.
    #[tracing::instrument(skip(self, store))]
    pub async fn check(&self, store: &mut dyn PreferenceStore) -> Result<VersionTriple> {
        let interpreter = self.fetch(ArchiveKind::Interpreter).await?;
        let extras = self.fetch(ArchiveKind::Extras).await?;
        let scripts = self.fetch(ArchiveKind::Scripts).await?;
        let available = VersionTriple::new(interpreter, extras, scripts);

        save_available(store, available);
        store.commit()?;
        info!("Available versions: {}", available);
        Ok(available)
    }

    async fn fetch(&self, kind: ArchiveKind) -> Result<i64> {
        self.source
            .latest_revision(kind)
            .await
            .with_context(|| format!("Failed to check the latest {} version", kind.label()))
    }
}
