//! `mailsweep` - archive one year of a mailbox, then delete it from the server.
//!
//! Reads the configuration, asks for a year, and runs the archive loop until
//! the server reports nothing left for that year.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::future::Future;
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::Context;
use mailsweep_core::{
    Archiver, ImapConnector, LogSink, Outcome, Reconciler, RunSummary, StopFlag, Year, config,
};
use tokio::io::AsyncBufReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PROMPT: &str = "Enter the year to filter emails by (e.g. 2024): ";

/// Exit status for input that is not a four-digit year.
const EXIT_INVALID_YEAR: u8 = 2;

/// Exit status when messages remain on the server.
const EXIT_INCOMPLETE: u8 = 3;

/// Exit status after a second interrupt (128 + SIGINT).
const EXIT_FORCED: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailsweep=info,mailsweep_core=info,mailsweep_imap=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<u8> {
    let path = config::default_path();
    let config = config::load(&path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    let input = prompt_year().await.context("Failed to read the year")?;
    let year = match Year::parse(&input) {
        Ok(year) => year,
        Err(e) => {
            eprintln!("{e}");
            return Ok(EXIT_INVALID_YEAR);
        }
    };

    info!(
        %year,
        host = %config.server.host,
        root = %config.archive_root.display(),
        "Starting mailsweep"
    );

    let reconciler = Reconciler::new(
        ImapConnector::new(&config),
        Archiver::new(&config.archive_root),
        config.retry_policy(),
    );

    let stop = reconciler.stop_flag();
    tokio::spawn(async move {
        if let Some(code) = watch_interrupts(tokio::signal::ctrl_c, stop).await {
            std::process::exit(code);
        }
    });

    let summary = reconciler
        .run(year, &mut LogSink)
        .await
        .with_context(|| format!("Archiving {year} failed"))?;

    println!("{}", describe(&summary));
    Ok(exit_status(&summary))
}

/// Requests a stop on the first interrupt. Resolves with the exit status on
/// the second, or `None` once interrupts can no longer be received.
async fn watch_interrupts<F, Fut>(mut interrupted: F, stop: StopFlag) -> Option<i32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    interrupted().await.ok()?;
    info!("Interrupt received, stopping after the current pass. Press Ctrl-C again to quit now");
    stop.store(true, Ordering::SeqCst);

    interrupted().await.ok()?;
    tracing::warn!("Second interrupt, exiting immediately");
    Some(EXIT_FORCED)
}

/// Prints the prompt and reads one line from stdin. End of input reads as
/// an empty line.
async fn prompt_year() -> std::io::Result<String> {
    let mut stdout = std::io::stdout();
    stdout.write_all(PROMPT.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line)
}

fn describe(summary: &RunSummary) -> String {
    match summary.outcome {
        Outcome::Complete => format!(
            "Done: archived {} message(s), {} remaining.",
            summary.archived, summary.remaining
        ),
        Outcome::Stalled => format!(
            "Stopped: archived {} message(s); {} could not be archived and remain on the server.",
            summary.archived, summary.remaining
        ),
        Outcome::Interrupted => format!(
            "Interrupted: archived {} message(s); {} remain on the server.",
            summary.archived, summary.remaining
        ),
    }
}

const fn exit_status(summary: &RunSummary) -> u8 {
    if summary.is_complete() { 0 } else { EXIT_INCOMPLETE }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(outcome: Outcome, remaining: usize) -> RunSummary {
        RunSummary {
            outcome,
            passes: 1,
            archived: 4,
            failed: remaining,
            remaining,
        }
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&summary(Outcome::Complete, 0)), 0);
        assert_eq!(exit_status(&summary(Outcome::Stalled, 2)), EXIT_INCOMPLETE);
        assert_eq!(exit_status(&summary(Outcome::Interrupted, 1)), EXIT_INCOMPLETE);
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let stop = StopFlag::default();
        let code = watch_interrupts(|| std::future::ready(Ok(())), stop.clone()).await;
        assert_eq!(code, Some(EXIT_FORCED));
        assert!(stop.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_single_interrupt_only_requests_stop() {
        let stop = StopFlag::default();
        let mut calls = 0;
        let code = watch_interrupts(
            || {
                calls += 1;
                std::future::ready(if calls == 1 {
                    Ok(())
                } else {
                    Err(std::io::Error::other("signal stream closed"))
                })
            },
            stop.clone(),
        )
        .await;
        assert_eq!(code, None);
        assert_eq!(calls, 2);
        assert!(stop.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_no_interrupt_leaves_run_alone() {
        let stop = StopFlag::default();
        let code = watch_interrupts(
            || std::future::ready(Err(std::io::Error::other("no signal handler"))),
            stop.clone(),
        )
        .await;
        assert_eq!(code, None);
        assert!(!stop.load(Ordering::SeqCst));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&summary(Outcome::Complete, 0)),
            "Done: archived 4 message(s), 0 remaining."
        );
        assert!(describe(&summary(Outcome::Stalled, 2)).contains("2 could not be archived"));
    }
}
