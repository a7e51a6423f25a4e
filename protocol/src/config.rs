//! # Session Configuration & Constants
//!
//! Every magic number in tapbridge lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! The values mirror the demo deployment this tool was built for: a test
//! ledger, a single fixed destination account, and coin type 4218. The
//! [`SessionConfig`] struct is how they reach the session — constructed
//! once by the binary (CLI flags with environment fallbacks) and injected,
//! never read from globals.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Ledger Parameters
// ---------------------------------------------------------------------------

/// Coin type passed to the ledger service's build-and-submit operation.
/// Selects the account-derivation scheme for the demo ledger.
pub const COIN_TYPE: u32 = 4218;

/// Base units per major unit. Amounts are entered and submitted in base
/// units; the confirmation prompt shows the major-unit equivalent so the
/// operator isn't eyeballing six extra zeroes.
pub const UNIT_SCALE: u64 = 1_000_000;

/// Default ledger node endpoint. Plain HTTP — `RemoteLedger` speaks raw
/// HTTP/1.1, so point this at a local demo node, not a TLS gateway.
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:14265";

/// Default transaction-explorer base URL. Block links are composed as
/// `<base>/block/<id>`.
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.testnet.example.org";

/// The fixed destination account for the demo. Every session pays this
/// address; the tag only selects *who pays*, never who gets paid.
pub const DEFAULT_DESTINATION: &str =
    "tst1qrpvft692as3cptmhrr93dl8p5d4y720mzusctsydnuqnw29l3yl6v5sk49";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Everything a [`crate::session::Session`] needs to know, assembled by the
/// binary and handed in at construction.
///
/// There is intentionally no upper bound on the transfer amount and no
/// default timeout on the tag wait. Both are known operational gaps in the
/// demo deployment — flagged to stakeholders, not silently papered over.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Explorer base URL used to compose the success link.
    pub explorer_url: String,

    /// Destination address for the transfer. Fixed per deployment.
    pub destination: String,

    /// Coin type forwarded to the ledger service.
    pub coin_type: u32,

    /// When `true`, the phrase read from the tag is echoed in cleartext.
    /// Off by default; secret-recovery phrases are redacted everywhere
    /// they are printed or logged.
    pub reveal_phrase: bool,

    /// Upper bound on the armed tag wait. `None` waits forever, which is
    /// the reference behavior.
    pub tag_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            destination: DEFAULT_DESTINATION.to_string(),
            coin_type: COIN_TYPE,
            reveal_phrase: false,
            tag_timeout: None,
        }
    }
}
