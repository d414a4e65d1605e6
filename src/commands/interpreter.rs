use anyhow::Result;
use log::{debug, info};
use std::path::Path;

use crate::archive::ZipExtractor;
use crate::config::Config;
use crate::http::HttpClient;
use crate::interpreter::InterpreterInstaller;
use crate::runtime::Runtime;
use crate::version::{HttpVersionSource, VersionChecker, load_available};

/// Install the interpreter distribution, either from archives in `from` or
/// from the release server.
#[tracing::instrument(skip(config))]
pub async fn install<R: Runtime + 'static>(config: &Config<R>, from: Option<&Path>) -> Result<()> {
    let installer = installer(config);
    let mut store = config.open_preferences()?;

    let versions = match from {
        Some(dir) => {
            println!("Installing {} from {}", config.descriptor.nice_name, dir.display());
            installer.install_from_dir(dir, &mut store)?
        }
        None => {
            let http_client = HttpClient::build()?;
            let available = match load_available(&store) {
                Some(available) => {
                    debug!("Using stored available versions {}", available);
                    available
                }
                None => {
                    info!("No available versions stored, checking {}", config.descriptor.version_url);
                    VersionChecker::new(HttpVersionSource::new(
                        http_client.clone(),
                        config.descriptor.clone(),
                    ))
                    .check(&mut store)
                    .await?
                }
            };
            println!("Installing {} ({})", config.descriptor.nice_name, available);
            installer
                .install_from_network(&http_client, available, &mut store)
                .await?
        }
    };

    println!("Installed {} ({})", config.descriptor.nice_name, versions);
    println!("  home: {}", config.layout.home.display());
    Ok(())
}

#[tracing::instrument(skip(config))]
pub fn uninstall<R: Runtime + 'static>(config: &Config<R>, yes: bool) -> Result<()> {
    if !yes {
        println!("Uninstall {}", config.descriptor.nice_name);
        println!("  {}", config.layout.home.display());
        println!("  {}", config.descriptor.extras_dir(&config.layout.extras_root).display());
        if !config.runtime.confirm("Proceed with uninstall?")? {
            println!("Uninstall cancelled.");
            return Ok(());
        }
    }

    let mut store = config.open_preferences()?;
    let removed = installer(config).uninstall(&mut store)?;
    if removed.is_empty() {
        println!("{} was not installed.", config.descriptor.nice_name);
    }
    for dir in removed {
        println!("Removed {}", dir.display());
    }
    Ok(())
}

fn installer<R: Runtime + 'static>(config: &Config<R>) -> InterpreterInstaller<R, ZipExtractor> {
    InterpreterInstaller::new(
        config.runtime.clone(),
        config.descriptor.clone(),
        config.layout.clone(),
        ZipExtractor,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_uninstall_cancelled() {
        let mut runtime = MockRuntime::new();
        runtime.expect_confirm().returning(|_| Ok(false));

        let config = Config::new(runtime, Some(PathBuf::from("/r")), "python", None, None).unwrap();
        uninstall(&config, false).unwrap();
    }

    #[test]
    fn test_uninstall_nothing_installed() {
        let dir = tempdir().unwrap();
        let config = Config::new(
            RealRuntime,
            Some(dir.path().to_path_buf()),
            "python",
            None,
            None,
        )
        .unwrap();
        uninstall(&config, true).unwrap();
        // preferences are committed even when nothing was removed
        assert!(config.layout.preferences.exists());
    }

    #[tokio::test]
    async fn test_install_from_missing_dir() {
        let dir = tempdir().unwrap();
        let config = Config::new(
            RealRuntime,
            Some(dir.path().to_path_buf()),
            "python",
            None,
            None,
        )
        .unwrap();
        let err = install(&config, Some(&dir.path().join("nowhere"))).await.unwrap_err();
        assert!(err.to_string().contains("Can't find"));
    }
}
