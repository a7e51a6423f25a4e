// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # tapbridge
//!
//! Entry point for the `tapbridge` binary: the tap-to-pay demo bridge.
//! Parses CLI arguments, initializes logging, wires a tag reader and a
//! ledger client into one [`Session`], runs it, and reports the outcome.
//!
//! The real NFC radio driver is an external collaborator; this binary
//! ships a simulated tap instead — a driver task that waits for the
//! session to arm its reader, then takes the tag's records from a staged
//! file (`--tag-source`) or a line typed on stdin.

mod cli;
mod console;
mod logging;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use tapbridge_protocol::config::SessionConfig;
use tapbridge_protocol::ledger::RemoteLedger;
use tapbridge_protocol::reader::{ChannelReader, TagFeed};
use tapbridge_protocol::session::{Session, SessionOutcome};
use tapbridge_protocol::tag::TagEvent;

use cli::TapbridgeCli;
use console::NoReadahead;
use logging::LogFormat;

// ---------------------------------------------------------------------------
// Banner
// ---------------------------------------------------------------------------

const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

const BANNER: &str = r#"
 _              _          _     _
| |_ __ _ _ __ | |__  _ __(_) __| | __ _  ___
| __/ _` | '_ \| '_ \| '__| |/ _` |/ _` |/ _ \
| |_ (_| | |_) | |_) | |  | | (_| | (_| |  __/
 \__\__,_| .__/|_.__/|_|  |_|\__,_|\__, |\___|
         |_|                       |___/
"#;

fn show_banner() {
    println!("{MAGENTA}{BANNER}{RESET}");
    println!("Welcome to the tag-to-ledger transfer demo");
    println!();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = TapbridgeCli::parse();
    logging::init_logging(
        "tapbridge=info,tapbridge_protocol=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    show_banner();

    let tag_timeout = args.tag_timeout_secs.map(Duration::from_secs);
    if tag_timeout.is_none() {
        // Known operational gap, kept from the reference deployment.
        tracing::warn!("no tag-wait timeout configured; the session will wait indefinitely");
    }

    let config = SessionConfig {
        explorer_url: args.explorer_url.clone(),
        destination: args.destination.clone(),
        coin_type: args.coin_type,
        reveal_phrase: args.reveal_phrase,
        tag_timeout,
    };

    let ledger = RemoteLedger::new(&args.node_url)
        .with_context(|| format!("invalid node URL: {}", args.node_url))?;
    tracing::info!(endpoint = %ledger.endpoint(), "ledger client ready");

    let (mut reader, feed) = ChannelReader::connect(tag_timeout);
    let driver = tokio::spawn(simulated_tap(feed, args.tag_source.clone()));

    // The console must not hold the stdin lock across the armed wait and
    // must not buffer past its own lines — the tap driver reads the same
    // stream once the session arms.
    let mut session = Session::new(config, NoReadahead::new(io::stdin()), io::stdout());
    let outcome = session
        .run(&ledger, &mut reader)
        .await
        .context("session failed")?;

    driver.abort();

    match outcome {
        SessionOutcome::Submitted { block_id, .. } => {
            tracing::info!(block_id = %block_id, "session complete");
        }
        SessionOutcome::NoCredential => {
            tracing::warn!("session ended without a credential");
        }
        SessionOutcome::SubmitFailed { reason } => {
            tracing::error!(%reason, "session ended with a failed submission");
        }
        SessionOutcome::WaitAbandoned { reason } => {
            tracing::warn!(%reason, "session ended without a tag");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Simulated Tap Driver
// ---------------------------------------------------------------------------

/// Stands in for the NFC radio driver.
///
/// Waits until the session arms its reader (so it never competes with the
/// amount prompts for stdin), then produces the tag's records and fires
/// the one event. Ctrl+C while waiting drops the feed, which the session
/// observes as an aborted wait and unwinds through its normal teardown.
async fn simulated_tap(mut feed: TagFeed, source: Option<PathBuf>) {
    if !feed.armed().await {
        // Reader closed without ever arming; nothing to do.
        return;
    }

    let records = tokio::select! {
        records = read_tag_records(source) => match records {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "simulated tap could not read the tag source");
                return; // dropping the feed aborts the wait
            }
        },
        _ = signal::ctrl_c() => {
            tracing::info!("interrupt received, abandoning the tag wait");
            return;
        }
    };

    if feed.fire(TagEvent::new(records)).is_err() {
        tracing::warn!("tag presented after the wait already ended");
    }
}

/// Produces the simulated tag's decoded text records.
///
/// With a staged file: poll until the file exists (the "tap"), then take
/// its non-empty lines as the records — a file with none emulates a tag
/// without text records. Without one: read a single line from stdin.
async fn read_tag_records(source: Option<PathBuf>) -> io::Result<Vec<String>> {
    match source {
        Some(path) => loop {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    return Ok(contents
                        .lines()
                        .filter(|line| !line.trim().is_empty())
                        .map(str::to_string)
                        .collect());
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                Err(err) => return Err(err),
            }
        },
        None => {
            println!("{CYAN}(simulated tap: type the tag's text record and press enter){RESET}");
            line_record(BufReader::new(tokio::io::stdin())).await
        }
    }
}

/// Decodes one typed line into the simulated tag's single text record.
async fn line_record<R>(mut input: R) -> io::Result<Vec<String>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stdin closed before a tag was presented",
        ));
    }
    Ok(vec![line.trim_end_matches(['\r', '\n']).to_string()])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
