//! Integration tests for the IMAP session.
//!
//! A scripted server runs on the other end of an in-memory duplex pipe. It
//! echoes each command's tag, so the tests do not depend on how the client
//! numbers its commands, and records every command line it receives.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use mailsweep_imap::{Config, Error, ImapSession};

const MESSAGE: &str = "Subject: hi\r\nDate: Tue, 2 Jan 2024 10:00:00 +0000\r\n\r\nhello\r\n";

/// How the scripted server answers the interesting commands.
#[derive(Clone, Copy)]
enum Script {
    Normal,
    RejectLogin,
    FetchWithoutBody,
    FetchNo,
}

type Log = Arc<Mutex<Vec<String>>>;

fn reply(script: Script, tag: &str, command: &str) -> String {
    match (command, script) {
        ("LOGIN", Script::RejectLogin) => format!("{tag} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n"),
        ("LOGIN", _) => format!("{tag} OK LOGIN completed\r\n"),
        ("SELECT", _) => format!(
            "* 2 EXISTS\r\n* 0 RECENT\r\n* OK [UIDVALIDITY 42] UIDs valid\r\n{tag} OK [READ-WRITE] SELECT completed\r\n"
        ),
        ("UID SEARCH", _) => format!("* SEARCH 9 7\r\n{tag} OK SEARCH completed\r\n"),
        ("UID FETCH", Script::FetchWithoutBody) => format!("{tag} OK FETCH completed\r\n"),
        ("UID FETCH", Script::FetchNo) => format!("{tag} NO Message has been deleted\r\n"),
        ("UID FETCH", _) => format!(
            "* 1 FETCH (UID 7 BODY[] {{{}}}\r\n{MESSAGE})\r\n{tag} OK FETCH completed\r\n",
            MESSAGE.len()
        ),
        ("UID STORE", _) => format!("* 1 FETCH (UID 7 FLAGS (\\Deleted))\r\n{tag} OK STORE completed\r\n"),
        ("EXPUNGE", _) => format!("* 1 EXPUNGE\r\n{tag} OK EXPUNGE completed\r\n"),
        ("LOGOUT", _) => format!("* BYE Logging out\r\n{tag} OK LOGOUT completed\r\n"),
        _ => format!("{tag} BAD Unknown command\r\n"),
    }
}

async fn serve(stream: DuplexStream, script: Script, log: Log) -> std::io::Result<()> {
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();
    write.write_all(b"* OK IMAP4rev1 Service Ready\r\n").await?;

    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let tag = words.next().unwrap_or("*").to_string();
        let mut command = words.next().unwrap_or_default().to_ascii_uppercase();
        if command == "UID" {
            command = format!("UID {}", words.next().unwrap_or_default().to_ascii_uppercase());
        }
        log.lock().unwrap().push(line.clone());

        write.write_all(reply(script, &tag, &command).as_bytes()).await?;
        if command == "LOGOUT" {
            break;
        }
    }
    Ok(())
}

async fn open(script: Script) -> (mailsweep_imap::Result<ImapSession<DuplexStream>>, Log) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let log: Log = Arc::default();
    tokio::spawn(serve(server, script, Arc::clone(&log)));

    let config = Config::new("imap.example.com");
    let session = ImapSession::establish(client, &config, "user@example.com", "secret").await;
    (session, log)
}

fn sent(log: &Log, needle: &str) -> bool {
    log.lock().unwrap().iter().any(|line| line.contains(needle))
}

#[tokio::test]
async fn test_login_selects_mailbox() {
    let (session, log) = open(Script::Normal).await;
    assert!(session.is_ok());
    assert!(sent(&log, "LOGIN"));
    assert!(sent(&log, "SELECT"));
    assert!(sent(&log, "INBOX"));
}

#[tokio::test]
async fn test_rejected_login_is_auth_error() {
    let (session, _log) = open(Script::RejectLogin).await;
    let err = session.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "{err:?}");
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_uid_search_sends_year_window() {
    let (session, log) = open(Script::Normal).await;
    let mut session = session.unwrap();

    let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let before = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let uids = session.uid_search(since, before).await.unwrap();

    assert_eq!(uids, vec![7, 9]);
    assert!(sent(&log, "UID SEARCH SINCE 01-Jan-2024 BEFORE 01-Jan-2025"));
}

#[tokio::test]
async fn test_fetch_returns_raw_message_without_setting_seen() {
    let (session, log) = open(Script::Normal).await;
    let mut session = session.unwrap();

    let raw = session.fetch(7).await.unwrap();
    assert_eq!(raw, MESSAGE.as_bytes());
    assert!(sent(&log, "UID FETCH 7 BODY.PEEK[]"));
}

#[tokio::test]
async fn test_fetch_without_body() {
    let (session, _log) = open(Script::FetchWithoutBody).await;
    let mut session = session.unwrap();

    let err = session.fetch(7).await.unwrap_err();
    assert!(matches!(err, Error::MissingBody(7)), "{err:?}");
}

#[tokio::test]
async fn test_fetch_no_is_not_transport() {
    let (session, _log) = open(Script::FetchNo).await;
    let mut session = session.unwrap();

    let err = session.fetch(7).await.unwrap_err();
    assert!(matches!(err, Error::No(_)), "{err:?}");
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_delete_flags_then_expunges() {
    let (session, log) = open(Script::Normal).await;
    let mut session = session.unwrap();

    session.delete(7).await.unwrap();
    session.logout().await.unwrap();

    let log = log.lock().unwrap();
    let store = log.iter().position(|l| l.contains("UID STORE 7 +FLAGS (\\Deleted)"));
    let expunge = log.iter().position(|l| l.ends_with("EXPUNGE"));
    assert!(store.is_some());
    assert!(store < expunge);
    assert!(log.last().unwrap().ends_with("LOGOUT"));
}
