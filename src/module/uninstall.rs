use log::{debug, info, warn};
use std::path::{Component, Path};

use crate::runtime::Runtime;
use crate::task::{Outcome, Progress, ProgressSink};

use super::layout::DestinationRoots;
use super::manifest::{read_manifest, read_top_level};

const STEPS: usize = 4;

/// Remove an installed module. Every step is best effort: failures are
/// logged and the operation still succeeds, so it can be repeated safely.
#[tracing::instrument(skip(runtime, roots, sink))]
pub fn uninstall<R: Runtime + ?Sized>(
    runtime: &R,
    roots: &DestinationRoots,
    module: &str,
    sink: &dyn ProgressSink,
) -> Outcome {
    let metadata_dir = roots.module_metadata_dir(module);
    let mut progress = Progress::new(sink);
    if let Err(e) = progress.start(STEPS) {
        return progress.finish(Outcome::Failed(format!("{:#}", e)));
    }

    let top_level = read_top_level(runtime, &metadata_dir);
    debug!("Top-level package of {}: {:?}", module, top_level);

    let paths = match read_manifest(runtime, &metadata_dir) {
        Ok(paths) => paths,
        Err(e) => {
            // without a manifest nothing outside the metadata directory is touched
            warn!("No usable manifest for {}, removing metadata only: {:#}", module, e);
            for step in 1..STEPS {
                progress.advance_to(step);
            }
            remove_tree(runtime, Some(&metadata_dir));
            progress.advance_to(4);
            info!("Uninstalled {}", module);
            return progress.finish(Outcome::Succeeded(format!("Uninstalled {}", module)));
        }
    };
    for path in paths {
        if !runtime.exists(&path) {
            continue;
        }
        if let Err(e) = runtime.remove_file(&path) {
            warn!("Failed to delete {:?}: {:#}", path, e);
        }
    }
    progress.advance_to(1);

    let top_level = is_plain_name(&top_level).then_some(top_level);
    remove_tree(runtime, top_level.as_ref().map(|t| roots.library_root.join(t)).as_deref());
    progress.advance_to(2);

    remove_tree(
        runtime,
        top_level.as_ref().map(|t| roots.interpreter_root.join(t)).as_deref(),
    );
    progress.advance_to(3);

    remove_tree(runtime, Some(&metadata_dir));
    progress.advance_to(4);

    info!("Uninstalled {}", module);
    progress.finish(Outcome::Succeeded(format!("Uninstalled {}", module)))
}

fn remove_tree<R: Runtime + ?Sized>(runtime: &R, path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if !runtime.exists(path) {
        return;
    }
    let result = if runtime.is_dir(path) {
        runtime.remove_dir_all(path)
    } else {
        runtime.remove_file(path)
    };
    match result {
        Ok(()) => debug!("Removed {:?}", path),
        Err(e) => warn!("Failed to delete {:?}: {:#}", path, e),
    }
}

/// A single normal path component. Anything else would make the recursive
/// deletes reach outside their root.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
