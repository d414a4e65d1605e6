//! Background operations with a typed progress stream.
//!
//! An operation moves `Idle -> Running -> Succeeded | Failed` and never leaves
//! a terminal state. Workers report [`ProgressEvent`]s through a
//! [`ProgressSink`]; [`spawn`] runs one on a blocking worker thread and hands
//! the receiving end of the channel to the caller.

use anyhow::{Result, bail};
use std::fmt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

/// Terminal result of an operation. Only a message travels with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(String),
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Succeeded(msg) | Outcome::Failed(msg) => msg,
        }
    }

    /// Collapse an operation result into an outcome, keeping the full error chain.
    pub fn from_result<T>(result: Result<T>, on_success: impl FnOnce(T) -> String) -> Self {
        match result {
            Ok(value) => Outcome::Succeeded(on_success(value)),
            Err(e) => Outcome::Failed(format!("{:#}", e)),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded(msg) => write!(f, "Success: {}", msg),
            Outcome::Failed(msg) => write!(f, "Error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Work is about to start; `total` units follow.
    Started { total: usize },
    /// `position` units are done. Never decreases, never exceeds `total`.
    Advanced { position: usize },
    Finished(Outcome),
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards events over a tokio channel. A dropped receiver is not an error.
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Succeeded | OperationState::Failed)
    }
}

/// Progress bookkeeping for one operation run.
pub struct Progress<'a> {
    sink: &'a dyn ProgressSink,
    state: OperationState,
    total: usize,
    position: usize,
}

impl<'a> Progress<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            state: OperationState::Idle,
            total: 0,
            position: 0,
        }
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn start(&mut self, total: usize) -> Result<()> {
        if self.state != OperationState::Idle {
            bail!("Operation already started ({:?})", self.state);
        }
        self.state = OperationState::Running;
        self.total = total;
        self.sink.report(ProgressEvent::Started { total });
        Ok(())
    }

    /// Report `position` finished units, clamped to `[current, total]`.
    pub fn advance_to(&mut self, position: usize) {
        if self.state != OperationState::Running {
            return;
        }
        let position = position.min(self.total).max(self.position);
        self.position = position;
        self.sink.report(ProgressEvent::Advanced { position });
    }

    /// Move to the terminal state and report it. Later calls are ignored.
    pub fn finish(&mut self, outcome: Outcome) -> Outcome {
        if self.state.is_terminal() {
            return outcome;
        }
        self.state = if outcome.is_success() {
            OperationState::Succeeded
        } else {
            OperationState::Failed
        };
        self.sink.report(ProgressEvent::Finished(outcome.clone()));
        outcome
    }
}

/// A running operation: its event stream and its final outcome.
pub struct OperationHandle {
    pub events: UnboundedReceiver<ProgressEvent>,
    join: JoinHandle<Outcome>,
}

impl OperationHandle {
    /// Wait for the worker to finish. A panicked worker counts as a failure.
    pub async fn wait(self) -> Outcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(format!("Worker thread failed: {}", e)),
        }
    }

    /// Drain every event into `on_event`, then return the outcome.
    pub async fn follow(mut self, mut on_event: impl FnMut(&ProgressEvent)) -> Outcome {
        while let Some(event) = self.events.recv().await {
            on_event(&event);
        }
        self.wait().await
    }
}

/// Run `work` on a dedicated blocking worker. No cancellation, no timeout.
pub fn spawn<F>(work: F) -> OperationHandle
where
    F: FnOnce(&dyn ProgressSink) -> Outcome + Send + 'static,
{
    let (tx, rx) = unbounded_channel();
    let join = tokio::task::spawn_blocking(move || {
        let sink = ChannelSink::new(tx);
        work(&sink)
    });
    OperationHandle { events: rx, join }
}
