//! Progress reporting.
//!
//! The reconciler and archiver push [`Event`]s into a caller-supplied
//! [`ReportSink`]. The binary prints them; tests collect them with
//! [`MemorySink`].

use std::path::PathBuf;

use crate::archive::AttachmentError;
use crate::backend::MessageRef;
use crate::reconcile::MessageError;

/// Something worth telling the user.
#[derive(Debug)]
pub enum Event {
    /// A pass found messages to process.
    PassStarted {
        /// 1-based pass number.
        pass: u32,
        /// Messages found by the search.
        found: usize,
    },
    /// A message was archived and deleted from the server.
    MessageArchived {
        /// The message.
        message: MessageRef,
        /// Path of the `.eml` file.
        path: PathBuf,
    },
    /// An attachment was written.
    AttachmentSaved {
        /// Path of the attachment file.
        path: PathBuf,
    },
    /// An attachment could not be saved. The message is still archived.
    AttachmentFailed(AttachmentError),
    /// A message could not be archived or deleted and stays on the server.
    MessageFailed {
        /// The message.
        message: MessageRef,
        /// Attempts made.
        attempts: u32,
        /// The last error.
        error: MessageError,
    },
    /// A pass finished.
    PassFinished(PassSummary),
    /// The run finished.
    Completed(RunSummary),
}

/// Receives progress events.
pub trait ReportSink: Send {
    /// Handles one event.
    fn report(&mut self, event: Event);
}

/// Counts for one search-and-process pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// 1-based pass number.
    pub pass: u32,
    /// Messages found by the search.
    pub found: usize,
    /// Messages archived and deleted.
    pub archived: usize,
    /// Messages left on the server after exhausting attempts.
    pub failed: usize,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A search found nothing left to archive.
    Complete,
    /// A pass archived nothing while messages remained.
    Stalled,
    /// A stop was requested between passes.
    Interrupted,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// How the run ended.
    pub outcome: Outcome,
    /// Passes that processed at least one message.
    pub passes: u32,
    /// Messages archived and deleted.
    pub archived: usize,
    /// Failed message attempts across all passes. A message that failed in
    /// two passes counts twice.
    pub failed: usize,
    /// Messages still on the server when the run ended, as last searched.
    pub remaining: usize,
}

impl RunSummary {
    /// Returns true if nothing is left on the server.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.outcome, Outcome::Complete)
    }
}

/// Logs events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&mut self, event: Event) {
        match event {
            Event::PassStarted { pass, found } => {
                tracing::info!(pass, found, "Processing messages");
            }
            Event::MessageArchived { message, path } => {
                tracing::info!(uid = message.0, path = %path.display(), "Saved email");
            }
            Event::AttachmentSaved { path } => {
                tracing::info!(path = %path.display(), "Saved attachment");
            }
            Event::AttachmentFailed(error) => {
                tracing::warn!(%error, "Failed to save attachment");
            }
            Event::MessageFailed {
                message,
                attempts,
                error,
            } => {
                tracing::error!(uid = message.0, attempts, %error, "Failed to process email");
            }
            Event::PassFinished(summary) => {
                tracing::info!(
                    pass = summary.pass,
                    archived = summary.archived,
                    failed = summary.failed,
                    "Pass finished"
                );
            }
            Event::Completed(summary) => {
                tracing::info!(
                    outcome = ?summary.outcome,
                    archived = summary.archived,
                    remaining = summary.remaining,
                    "Run finished"
                );
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Events in the order they were reported.
    pub events: Vec<Event>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the refs of archived messages in order.
    #[must_use]
    pub fn archived(&self) -> Vec<MessageRef> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::MessageArchived { message, .. } => Some(*message),
                _ => None,
            })
            .collect()
    }

    /// Returns the refs of failed messages in order.
    #[must_use]
    pub fn failed(&self) -> Vec<MessageRef> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::MessageFailed { message, .. } => Some(*message),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of attachment failures.
    #[must_use]
    pub fn attachment_failures(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::AttachmentFailed(_)))
            .count()
    }

    /// Returns the pass summaries in order.
    #[must_use]
    pub fn passes(&self) -> Vec<PassSummary> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::PassFinished(summary) => Some(*summary),
                _ => None,
            })
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn report(&mut self, event: Event) {
        self.events.push(event);
    }
}
