//! Installing and removing a whole interpreter distribution: the interpreter
//! archive, the extras archive and the sample scripts archive.

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::ArchiveExtractor;
use crate::cleanup::{self, SharedCleanupContext};
use crate::config::InstallLayout;
use crate::descriptor::{ArchiveKind, InterpreterDescriptor, host_platform_suffix};
use crate::http::HttpClient;
use crate::runtime::{Runtime, make_directories};
use crate::version::{
    PreferenceStore, VersionTriple, clear_installed, save_available, save_installed, scan_local,
};

pub struct InterpreterInstaller<R: Runtime + 'static, E: ArchiveExtractor> {
    runtime: Arc<R>,
    descriptor: InterpreterDescriptor,
    layout: InstallLayout,
    extractor: E,
}

impl<R: Runtime + 'static, E: ArchiveExtractor> InterpreterInstaller<R, E> {
    pub fn new(
        runtime: Arc<R>,
        descriptor: InterpreterDescriptor,
        layout: InstallLayout,
        extractor: E,
    ) -> Self {
        Self {
            runtime,
            descriptor,
            layout,
            extractor,
        }
    }

    /// Directory each archive kind unpacks into. Archives carry their own
    /// top-level directory, so the interpreter archive lands in the root.
    pub fn target_dir(&self, kind: ArchiveKind) -> &Path {
        match kind {
            ArchiveKind::Interpreter => &self.layout.root,
            ArchiveKind::Extras => &self.layout.extras_root,
            ArchiveKind::Scripts => &self.layout.scripts_root,
        }
    }

    /// Install from archives already present in `dir`.
    #[tracing::instrument(skip(self, store))]
    pub fn install_from_dir(&self, dir: &Path, store: &mut dyn PreferenceStore) -> Result<VersionTriple> {
        let local = scan_local(self.runtime.as_ref(), dir, &self.descriptor.archive_prefix)?;
        let cleanup_ctx = cleanup::new_shared();

        for kind in ArchiveKind::ALL {
            if let Err(e) = self.extract(kind, local.archive(kind), cleanup_ctx.clone()) {
                cleanup::lock(&cleanup_ctx).cleanup(self.runtime.as_ref());
                return Err(e);
            }
        }

        self.record(store, local.versions)?;
        Ok(local.versions)
    }

    /// Download the `available` revisions and install them. Downloads are
    /// removed afterwards; Ctrl-C removes them and any partial extraction.
    #[tracing::instrument(skip(self, store, http_client))]
    pub async fn install_from_network(
        &self,
        http_client: &HttpClient,
        available: VersionTriple,
        store: &mut dyn PreferenceStore,
    ) -> Result<VersionTriple> {
        let cleanup_ctx = cleanup::new_shared();
        let ctrl_c_ctx = Arc::clone(&cleanup_ctx);
        let ctrl_c_runtime = Arc::clone(&self.runtime);
        let ctrl_c_handler = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, cleaning up...");
                cleanup::lock(&ctrl_c_ctx).cleanup(ctrl_c_runtime.as_ref());
                std::process::exit(130);
            }
        });

        let result = self
            .download_and_extract(http_client, available, Arc::clone(&cleanup_ctx))
            .await;
        ctrl_c_handler.abort();

        // on success only the downloads are still registered
        cleanup::lock(&cleanup_ctx).cleanup(self.runtime.as_ref());
        result?;

        self.record(store, available)?;
        Ok(available)
    }

    async fn download_and_extract(
        &self,
        http_client: &HttpClient,
        available: VersionTriple,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()> {
        let runtime = self.runtime.as_ref();
        make_directories(runtime, &self.layout.downloads, 0o755)?;

        let platform = host_platform_suffix();
        let mut downloaded = Vec::new();
        for kind in ArchiveKind::ALL {
            let revision = revision_for(available, kind);
            let url = self.descriptor.archive_url(kind, revision, platform);
            let file_name = url.rsplit('/').next().unwrap_or("archive.zip").to_string();
            let dest = self.layout.downloads.join(file_name);

            cleanup::lock(&cleanup_ctx).add(dest.clone());
            info!("Downloading {} r{} from {}...", kind.label(), revision, url);
            http_client
                .download_file(&url, || {
                    runtime
                        .create_file(&dest)
                        .with_context(|| format!("Failed to create download file at {:?}", dest))
                })
                .await
                .with_context(|| format!("Failed to download {}", url))?;
            downloaded.push((kind, dest));
        }

        for (kind, archive) in &downloaded {
            self.extract(*kind, archive, cleanup_ctx.clone())?;
        }
        Ok(())
    }

    fn extract(&self, kind: ArchiveKind, archive: &Path, cleanup_ctx: SharedCleanupContext) -> Result<usize> {
        if !self.extractor.can_handle(archive) {
            bail!("Unsupported archive format: {:?}", archive);
        }
        let target = self.target_dir(kind);
        info!("Extracting {} archive {:?} to {:?}", kind.label(), archive, target);
        self.extractor
            .extract(self.runtime.as_ref(), archive, target, cleanup_ctx)
            .with_context(|| format!("Failed to extract {} archive {:?}", kind.label(), archive))
    }

    fn record(&self, store: &mut dyn PreferenceStore, versions: VersionTriple) -> Result<()> {
        make_directories(
            self.runtime.as_ref(),
            &self.descriptor.temp_dir(&self.layout.extras_root),
            0o755,
        )?;
        save_installed(store, versions);
        save_available(store, versions);
        store.commit()?;
        info!("Installed {} ({})", self.descriptor.nice_name, versions);
        Ok(())
    }

    /// Forget the installed revisions and remove the interpreter home and its
    /// extras. Sample scripts are left alone.
    #[tracing::instrument(skip(self, store))]
    pub fn uninstall(&self, store: &mut dyn PreferenceStore) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for dir in [
            self.layout.home.clone(),
            self.descriptor.extras_dir(&self.layout.extras_root),
        ] {
            if !self.runtime.exists(&dir) {
                debug!("{:?} not present", dir);
                continue;
            }
            match self.runtime.remove_dir_all(&dir) {
                Ok(()) => removed.push(dir),
                Err(e) => warn!("Failed to remove {:?}: {:#}", dir, e),
            }
        }

        clear_installed(store);
        store.commit()?;
        info!("Uninstalled {}", self.descriptor.nice_name);
        Ok(removed)
    }
}

fn revision_for(versions: VersionTriple, kind: ArchiveKind) -> i64 {
    match kind {
        ArchiveKind::Interpreter => versions.interpreter,
        ArchiveKind::Extras => versions.extras,
        ArchiveKind::Scripts => versions.scripts,
    }
}
