use anyhow::Result;

use crate::config::Config;
use crate::http::HttpClient;
use crate::runtime::Runtime;
use crate::version::{
    HttpVersionSource, VersionChecker, VersionTriple, load_available, load_installed, needs_update,
};

/// Ask the release server for the latest revisions and store them.
#[tracing::instrument(skip(config))]
pub async fn check<R: Runtime + 'static>(config: &Config<R>) -> Result<()> {
    let mut store = config.open_preferences()?;
    let installed = load_installed(&store);

    let source = HttpVersionSource::new(HttpClient::build()?, config.descriptor.clone());
    let available = VersionChecker::new(source).check(&mut store).await?;

    println!("Available: {}", available);
    print_update_hint(config, installed, Some(available));
    Ok(())
}

/// Print installed and last known available revisions without touching the network.
pub fn show<R: Runtime + 'static>(config: &Config<R>) -> Result<()> {
    let store = config.open_preferences()?;
    let installed = load_installed(&store);
    let available = load_available(&store);

    println!("{}", config.descriptor.nice_name);
    println!("  Installed: {}", describe(installed));
    println!("  Available: {}", describe(available));
    print_update_hint(config, installed, available);
    Ok(())
}

fn describe(versions: Option<VersionTriple>) -> String {
    versions
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(unknown)".to_string())
}

fn print_update_hint<R: Runtime>(
    config: &Config<R>,
    installed: Option<VersionTriple>,
    available: Option<VersionTriple>,
) {
    if !needs_update(installed, available) {
        return;
    }
    if installed.is_some() {
        println!("Update available for {}.", config.descriptor.nice_name);
    } else {
        println!("{} is not installed.", config.descriptor.nice_name);
    }
}
