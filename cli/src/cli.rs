//! # CLI Interface
//!
//! Defines the command-line argument structure for `tapbridge` using
//! `clap` derive. One invocation is one session; there are no subcommands
//! to speak of, just the deployment knobs with environment fallbacks.

use clap::Parser;
use std::path::PathBuf;

use tapbridge_protocol::config;

/// tapbridge — tap-to-pay demo bridge.
///
/// Waits for an NFC credential tag, reads the secret-recovery phrase from
/// its first text record, and submits an operator-confirmed transfer to
/// the deployment's fixed destination address.
#[derive(Parser, Debug)]
#[command(name = "tapbridge", about = "Tag-triggered ledger transfer demo", version)]
pub struct TapbridgeCli {
    /// Ledger node endpoint the submission is POSTed to.
    ///
    /// Plain HTTP only — point this at a local demo node.
    #[arg(long, env = "TAPBRIDGE_NODE_URL", default_value = config::DEFAULT_NODE_URL)]
    pub node_url: String,

    /// Explorer base URL used to compose the success link.
    #[arg(long, env = "TAPBRIDGE_EXPLORER_URL", default_value = config::DEFAULT_EXPLORER_URL)]
    pub explorer_url: String,

    /// Destination address every session pays.
    #[arg(long, env = "TAPBRIDGE_DESTINATION", default_value = config::DEFAULT_DESTINATION)]
    pub destination: String,

    /// Coin type forwarded to the ledger service.
    #[arg(long, env = "TAPBRIDGE_COIN_TYPE", default_value_t = config::COIN_TYPE)]
    pub coin_type: u32,

    /// Upper bound on the tag wait, in seconds. Omit to wait forever
    /// (the reference behavior).
    #[arg(long, env = "TAPBRIDGE_TAG_TIMEOUT_SECS")]
    pub tag_timeout_secs: Option<u64>,

    /// Path to a staged tag file for the simulated tap. Each line is one
    /// decoded text record; the first line is the phrase. When omitted,
    /// the simulated tap reads one line from stdin after the amount is
    /// confirmed.
    #[arg(long, env = "TAPBRIDGE_TAG_SOURCE")]
    pub tag_source: Option<PathBuf>,

    /// Echo the phrase read from the tag in cleartext. Debugging only;
    /// phrases are redacted everywhere by default.
    #[arg(long)]
    pub reveal_phrase: bool,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "TAPBRIDGE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}
