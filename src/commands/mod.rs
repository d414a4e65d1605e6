//! Command-line entry points. Each function resolves what it needs from a
//! [`Config`](crate::config::Config), runs the operation and prints the result.

use log::debug;

use crate::task::{OperationHandle, Outcome, ProgressEvent};

pub mod env;
pub mod interpreter;
pub mod module;
pub mod scripts;
pub mod version;

/// Stream an operation's progress to stderr and print its outcome.
pub(crate) async fn follow_operation(label: &str, handle: OperationHandle) -> Outcome {
    let mut total = 0;
    let outcome = handle
        .follow(|event| match event {
            ProgressEvent::Started { total: t } => {
                total = *t;
                debug!("{}: {} entries", label, total);
            }
            ProgressEvent::Advanced { position } => {
                eprint!("\r{}: {}/{}", label, position, total);
            }
            ProgressEvent::Finished(_) => {
                if total > 0 {
                    eprintln!();
                }
            }
        })
        .await;

    println!("{}: {}", label, outcome);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{self, Progress};

    #[tokio::test]
    async fn test_follow_operation_returns_outcome() {
        let handle = task::spawn(|sink| {
            let mut progress = Progress::new(sink);
            progress.start(1).unwrap();
            progress.advance_to(1);
            progress.finish(Outcome::Failed("broken archive".into()))
        });

        let outcome = follow_operation("broken.zip", handle).await;
        assert_eq!(outcome, Outcome::Failed("broken archive".into()));
    }
}
