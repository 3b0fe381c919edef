//! An authenticated IMAP session with one mailbox selected.
//!
//! The session wraps an `async_imap` session and bounds every command by the
//! configured I/O timeout. It never reconnects on its own: once an operation
//! fails with a transport error the caller drops it and connects again.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_imap::Client;
use async_imap::types::Fetch;
use chrono::NaiveDate;
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::{Config, ImapStream, connect_tls};
use crate::{Error, Result};

/// Formats the `UID SEARCH` criteria for the half-open window
/// `[since, before)`.
///
/// IMAP `SINCE` and `BEFORE` compare the internal date, ignoring time and
/// zone, and `BEFORE` is exclusive.
#[must_use]
pub fn search_query(since: NaiveDate, before: NaiveDate) -> String {
    format!(
        "SINCE {} BEFORE {}",
        since.format("%d-%b-%Y"),
        before.format("%d-%b-%Y")
    )
}

/// A logged-in IMAP session with the configured mailbox selected.
///
/// Generic over the transport so it can run on any byte stream; production
/// code uses the TLS [`ImapStream`].
pub struct ImapSession<S = ImapStream>
where
    S: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send,
{
    inner: async_imap::Session<S>,
    io_timeout: Duration,
}

impl<S> fmt::Debug for ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSession")
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

/// Runs `operation`, mapping expiry of `limit` to [`Error::Timeout`].
async fn bounded<T>(limit: Duration, operation: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| Error::Timeout(limit))?
}

impl ImapSession<ImapStream> {
    /// Connects over TLS, logs in and selects the configured mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS connection, `LOGIN` or `SELECT` fails or
    /// times out.
    pub async fn connect(config: &Config, username: &str, password: &str) -> Result<Self> {
        tracing::debug!(host = %config.host, port = config.port, "Connecting to IMAP server");
        let stream = connect_tls(config).await?;
        Self::establish(stream, config, username, password).await
    }
}

impl<S> ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + fmt::Debug + Send,
{
    /// Logs in over an already connected stream and selects the configured
    /// mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if `LOGIN` or `SELECT` fails or times out.
    pub async fn establish(
        stream: S,
        config: &Config,
        username: &str,
        password: &str,
    ) -> Result<Self> {
        let client = Client::new(stream);

        let mut inner = bounded(config.io_timeout, async {
            client
                .login(username, password)
                .await
                .map_err(|(e, _client)| match Error::from(e) {
                    Error::No(msg) | Error::Bad(msg) => Error::Auth(msg),
                    other => other,
                })
        })
        .await?;
        tracing::debug!("Logged in");

        let mailbox = bounded(config.io_timeout, async {
            inner.select(&config.mailbox).await.map_err(Error::from)
        })
        .await?;
        tracing::debug!(mailbox = %config.mailbox, exists = mailbox.exists, "Mailbox selected");

        Ok(Self {
            inner,
            io_timeout: config.io_timeout,
        })
    }

    /// Returns the UIDs of all messages whose internal date lies in
    /// `[since, before)`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or times out.
    pub async fn uid_search(&mut self, since: NaiveDate, before: NaiveDate) -> Result<Vec<u32>> {
        let query = search_query(since, before);
        tracing::debug!(%query, "UID SEARCH");

        let uids = bounded(self.io_timeout, async {
            self.inner.uid_search(&query).await.map_err(Error::from)
        })
        .await?;

        let mut uids: Vec<u32> = uids.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    /// Fetches the complete raw message without setting `\Seen`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBody`] if the server answers without a body,
    /// or another error if the command fails or times out.
    pub async fn fetch(&mut self, uid: u32) -> Result<Vec<u8>> {
        tracing::debug!(uid, "UID FETCH");

        let fetches: Vec<Fetch> = bounded(self.io_timeout, async {
            let stream = self.inner.uid_fetch(uid.to_string(), "BODY.PEEK[]").await?;
            stream.try_collect().await.map_err(Error::from)
        })
        .await?;

        fetches
            .iter()
            .filter(|fetch| fetch.uid.is_none_or(|u| u == uid))
            .find_map(Fetch::body)
            .map(<[u8]>::to_vec)
            .ok_or(Error::MissingBody(uid))
    }

    /// Flags the message `\Deleted` and expunges the mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if either command fails or times out.
    pub async fn delete(&mut self, uid: u32) -> Result<()> {
        tracing::debug!(uid, "UID STORE +FLAGS (\\Deleted)");

        bounded(self.io_timeout, async {
            let updates = self
                .inner
                .uid_store(uid.to_string(), "+FLAGS (\\Deleted)")
                .await?;
            let _: Vec<Fetch> = updates.try_collect().await?;

            let expunged = self.inner.expunge().await?;
            let _: Vec<u32> = expunged.try_collect().await?;
            Ok(())
        })
        .await
    }

    /// Logs out and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or times out.
    pub async fn logout(mut self) -> Result<()> {
        bounded(self.io_timeout, async {
            self.inner.logout().await.map_err(Error::from)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_year_window() {
        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let before = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(search_query(since, before), "SINCE 01-Jan-2024 BEFORE 01-Jan-2025");
    }

    #[test]
    fn test_search_query_pads_day() {
        let since = NaiveDate::from_ymd_opt(1999, 12, 5).unwrap();
        let before = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(search_query(since, before), "SINCE 05-Dec-1999 BEFORE 31-Dec-1999");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let limit = Duration::from_secs(30);
        let result: Result<()> = bounded(limit, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(d)) if d == limit));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_passes_through() {
        let result = bounded(Duration::from_secs(30), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
