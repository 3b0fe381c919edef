//! The search, archive, delete loop.
//!
//! One pass connects, searches the year window and processes every match in
//! order: fetch, parse, archive, delete. A transport error retries the
//! message on a fresh session, up to the policy's limit; any other failure
//! leaves the message on the server for the next pass. Passes repeat until a
//! search comes back empty, a pass archives nothing, or a stop is requested.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::archive::{ArchiveError, ArchivedMessage, Archiver};
use crate::backend::{BackendError, Connector, MailSession, MessageRef};
use crate::error::{Error, Result};
use crate::record::MessageRecord;
use crate::report::{Event, Outcome, PassSummary, ReportSink, RunSummary};
use crate::session::{RetryPolicy, SessionManager};
use crate::year::{Year, YearWindow};

/// Shared flag requesting a stop before the next pass.
pub type StopFlag = Arc<AtomicBool>;

/// Why a single message could not be processed.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Fetch or delete failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The message could not be written to disk.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl MessageError {
    /// Returns true if a fresh session may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_transient())
    }
}

enum MessageOutcome {
    Archived(ArchivedMessage),
    Failed { attempts: u32, error: MessageError },
}

/// Drives the archive-then-delete loop for one mailbox.
#[derive(Debug)]
pub struct Reconciler<C> {
    sessions: SessionManager<C>,
    archiver: Archiver,
    stop: StopFlag,
}

impl<C: Connector> Reconciler<C> {
    /// Creates a reconciler.
    pub fn new(connector: C, archiver: Archiver, policy: RetryPolicy) -> Self {
        Self {
            sessions: SessionManager::new(connector, policy),
            archiver,
            stop: StopFlag::default(),
        }
    }

    /// Returns a handle that stops the run before its next pass when set.
    pub fn stop_flag(&self) -> StopFlag {
        Arc::clone(&self.stop)
    }

    /// Validates `input` as a year, then runs.
    ///
    /// Invalid input is rejected before any connection is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Year`] for invalid input, otherwise as [`Self::run`].
    pub async fn run_input(&self, input: &str, sink: &mut impl ReportSink) -> Result<RunSummary> {
        let year = Year::parse(input)?;
        self.run(year, sink).await
    }

    /// Archives and deletes every message of `year`.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting fails after every attempt or a search
    /// cannot be completed. Failures of single messages are reported to
    /// `sink` instead.
    pub async fn run(&self, year: Year, sink: &mut impl ReportSink) -> Result<RunSummary> {
        let policy = *self.sessions.policy();
        let window = year.window();
        let mut summary = RunSummary {
            outcome: Outcome::Complete,
            passes: 0,
            archived: 0,
            failed: 0,
            remaining: 0,
        };
        tracing::info!(%year, "Archiving");

        loop {
            let mut session = self.sessions.connect().await?;
            let refs = self.search(&mut session, window).await?;

            if refs.is_empty() {
                logout(session).await;
                break;
            }
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!(remaining = refs.len(), "Stop requested");
                logout(session).await;
                summary.outcome = Outcome::Interrupted;
                summary.remaining = refs.len();
                break;
            }

            summary.passes += 1;
            let mut pass = PassSummary {
                pass: summary.passes,
                found: refs.len(),
                ..PassSummary::default()
            };
            sink.report(Event::PassStarted {
                pass: pass.pass,
                found: pass.found,
            });

            for &message in &refs {
                match self.process(&mut session, message, sink).await? {
                    MessageOutcome::Archived(archived) => {
                        pass.archived += 1;
                        sink.report(Event::MessageArchived {
                            message,
                            path: archived.path,
                        });
                    }
                    MessageOutcome::Failed { attempts, error } => {
                        pass.failed += 1;
                        sink.report(Event::MessageFailed {
                            message,
                            attempts,
                            error,
                        });
                    }
                }
            }

            logout(session).await;
            summary.archived += pass.archived;
            summary.failed += pass.failed;
            sink.report(Event::PassFinished(pass));

            if pass.archived == 0 {
                tracing::warn!(remaining = pass.found, "No progress in this pass, stopping");
                summary.outcome = Outcome::Stalled;
                summary.remaining = pass.found;
                break;
            }

            tokio::time::sleep(policy.rescan_delay).await;
        }

        sink.report(Event::Completed(summary));
        Ok(summary)
    }

    /// Searches the window, reconnecting after transport errors.
    ///
    /// A server that refuses the search has no results to offer; that counts
    /// as an empty search.
    async fn search(
        &self,
        session: &mut C::Session,
        window: YearWindow,
    ) -> Result<Vec<MessageRef>> {
        let policy = self.sessions.policy();
        let mut attempt = 1;
        loop {
            match session.search(window).await {
                Ok(mut refs) => {
                    refs.sort_unstable();
                    refs.dedup();
                    tracing::debug!(found = refs.len(), "Search finished");
                    return Ok(refs);
                }
                Err(e) if e.is_transient() && attempt < policy.message_attempts() => {
                    tracing::warn!(attempt, error = %e, "Search failed, reconnecting");
                    tokio::time::sleep(policy.retry_delay).await;
                    *session = self.sessions.connect().await?;
                    attempt += 1;
                }
                Err(BackendError::Server(reason)) => {
                    tracing::warn!(%reason, "Server refused the search, treating as no results");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(Error::Search(e)),
            }
        }
    }

    /// Processes one message, replacing `session` after transport errors.
    ///
    /// Only a failed reconnect is returned as an error.
    async fn process(
        &self,
        session: &mut C::Session,
        message: MessageRef,
        sink: &mut impl ReportSink,
    ) -> Result<MessageOutcome> {
        let policy = self.sessions.policy();
        let mut attempt = 1;
        let mut persisted = None;
        loop {
            let result = self.attempt(session, message, sink, &mut persisted).await;
            // A delete whose reply was lost still removed the message.
            if matches!(result, Err(MessageError::Backend(BackendError::NotFound(_))))
                && let Some(archived) = persisted.take()
            {
                tracing::info!(uid = message.0, "Already removed by an earlier attempt");
                return Ok(MessageOutcome::Archived(archived));
            }
            match result {
                Ok(archived) => return Ok(MessageOutcome::Archived(archived)),
                Err(error) if error.is_transient() && attempt < policy.message_attempts() => {
                    tracing::warn!(uid = message.0, attempt, %error, "Retrying on a new session");
                    tokio::time::sleep(policy.retry_delay).await;
                    *session = self.sessions.connect().await?;
                    attempt += 1;
                }
                Err(error) => {
                    return Ok(MessageOutcome::Failed {
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }

    /// Fetch, archive, delete. Deletion only follows a durable write, which
    /// is recorded in `persisted` first.
    async fn attempt(
        &self,
        session: &mut C::Session,
        message: MessageRef,
        sink: &mut impl ReportSink,
        persisted: &mut Option<ArchivedMessage>,
    ) -> std::result::Result<ArchivedMessage, MessageError> {
        let raw = session.fetch(message).await?;
        let record = MessageRecord::parse(raw);
        let archived = self.archiver.archive(&record, sink).await?;
        *persisted = Some(archived.clone());
        session.delete(message).await?;
        tracing::debug!(uid = message.0, path = %archived.path.display(), "Archived and deleted");
        Ok(archived)
    }
}

/// Logs out, ignoring failures: the session is finished either way.
async fn logout<S: MailSession>(session: S) {
    if let Err(e) = session.logout().await {
        tracing::debug!(error = %e, "Logout failed");
    }
}
