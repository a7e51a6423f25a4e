//! # Ledger Service Boundary
//!
//! The session never constructs, signs, or broadcasts a transaction itself.
//! It hands a secret phrase, an output descriptor, and a coin type to a
//! [`LedgerService`] and gets back one of two success shapes — a sequence
//! whose first element is the block id, or a keyed record carrying a
//! `block_id` field. Both are modeled as one tagged union,
//! [`SubmitResponse`], with a single normalization function, instead of
//! runtime shape-sniffing scattered through callers.
//!
//! [`RemoteLedger`] is the production implementation: a raw HTTP/1.1 JSON
//! POST over a tokio `TcpStream`. One request per session does not justify
//! pulling in a full HTTP client crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::tag::Credential;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while talking to the ledger service.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The node accepted the connection but rejected the submission
    /// (malformed phrase, insufficient funds, etc.).
    #[error("node rejected the submission: {0}")]
    Rejected(String),

    /// The node could not be reached or the connection died mid-request.
    #[error("transport failure talking to the node: {0}")]
    Transport(String),

    /// The node answered with something that is neither of the two known
    /// success shapes.
    #[error("unrecognized node response: {0}")]
    Malformed(String),

    /// The node URL could not be parsed into host/port/path.
    #[error("invalid node URL: {0}")]
    BadEndpoint(String),
}

/// A success response that still cannot yield a block id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The sequence shape arrived with zero elements.
    #[error("node returned an empty sequence with no block id")]
    EmptySequence,
}

// ---------------------------------------------------------------------------
// Request & Response Shapes
// ---------------------------------------------------------------------------

/// What the transfer pays, and to whom. Built from the operator-confirmed
/// request at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDescriptor {
    /// Destination address, as configured for the deployment.
    pub address: String,
    /// Amount in base units.
    pub amount: u64,
}

/// The two success shapes the ledger service is known to return.
///
/// Older demo nodes answer with a bare JSON array (`["0xABC..."]`); newer
/// ones answer with an object (`{"block_id": "0xABC..."}`). The untagged
/// deserialization accepts either; anything else fails to decode and
/// surfaces as [`LedgerError::Malformed`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SubmitResponse {
    /// Sequence shape — element 0 is the block id.
    Sequence(Vec<String>),
    /// Keyed-record shape — the `block_id` field is the block id.
    Record {
        /// Hex block id assigned by the node.
        block_id: String,
    },
}

impl SubmitResponse {
    /// Normalizes either response shape into the one thing the session
    /// cares about: the block id.
    pub fn block_id(self) -> Result<String, NormalizeError> {
        match self {
            SubmitResponse::Sequence(ids) => {
                ids.into_iter().next().ok_or(NormalizeError::EmptySequence)
            }
            SubmitResponse::Record { block_id } => Ok(block_id),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerService
// ---------------------------------------------------------------------------

/// The narrow interface the session depends on.
///
/// `build_and_submit` covers the whole opaque pipeline on the node side:
/// derive the signing key from the phrase, build the transfer, sign it,
/// broadcast it, and answer with one of the two success shapes.
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Build, sign, and post one transfer. At most one call per session.
    async fn build_and_submit(
        &self,
        secret: &Credential,
        output: &OutputDescriptor,
        coin_type: u32,
    ) -> Result<SubmitResponse, LedgerError>;
}

// ---------------------------------------------------------------------------
// RemoteLedger
// ---------------------------------------------------------------------------

/// JSON body POSTed to the node's submit endpoint.
#[derive(Serialize)]
struct SubmitBody<'a> {
    secret: &'a str,
    output: &'a OutputDescriptor,
    coin_type: u32,
}

/// HTTP-backed [`LedgerService`] talking to a demo node.
///
/// Speaks plain HTTP/1.1 with `Connection: close` semantics — connect,
/// write one request, read to EOF. No TLS, no keep-alive, no redirects;
/// point it at a local node.
pub struct RemoteLedger {
    endpoint: Endpoint,
}

impl RemoteLedger {
    /// Parses the node URL. No connection is made until submission.
    pub fn new(node_url: &str) -> Result<Self, LedgerError> {
        let endpoint = node_url
            .parse::<Endpoint>()
            .map_err(LedgerError::BadEndpoint)?;
        Ok(Self { endpoint })
    }

    /// Where submissions go, for logging.
    pub fn endpoint(&self) -> String {
        format!("{}:{}{}", self.endpoint.host, self.endpoint.port, self.endpoint.path)
    }
}

#[async_trait]
impl LedgerService for RemoteLedger {
    async fn build_and_submit(
        &self,
        secret: &Credential,
        output: &OutputDescriptor,
        coin_type: u32,
    ) -> Result<SubmitResponse, LedgerError> {
        let body = serde_json::to_string(&SubmitBody {
            secret: secret.phrase(),
            output,
            coin_type,
        })
        .map_err(|e| LedgerError::Malformed(e.to_string()))?;

        let request = format!(
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.endpoint.path,
            self.endpoint.host,
            body.len(),
            body,
        );

        let addr = format!("{}:{}", self.endpoint.host, self.endpoint.port);
        let mut stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| LedgerError::Transport(format!("connect {addr}: {e}")))?;

        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        stream
            .shutdown()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let mut raw = Vec::new();
        stream
            .read_to_end(&mut raw)
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        let response = String::from_utf8_lossy(&raw);

        // Everything after the first blank line is the body.
        let (head, payload) = response
            .split_once("\r\n\r\n")
            .ok_or_else(|| LedgerError::Malformed("truncated HTTP response".into()))?;

        if !status_is_success(head) {
            return Err(LedgerError::Rejected(payload.trim().to_string()));
        }

        serde_json::from_str(payload.trim())
            .map_err(|e| LedgerError::Malformed(format!("{e}: {}", payload.trim())))
    }
}

/// `true` if the status line of `head` carries a 2xx code.
fn status_is_success(head: &str) -> bool {
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .is_some_and(|code| (200..300).contains(&code))
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Minimal URL decomposition — just enough to extract host/port/path for a
/// raw HTTP request. Not worth a URL crate for one call site.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Strip the scheme. https is accepted syntactically but will not
        // actually speak TLS; the default port still becomes 80 so the
        // mistake shows up immediately instead of half-working.
        let rest = s
            .strip_prefix("http://")
            .or_else(|| s.strip_prefix("https://"))
            .unwrap_or(s);

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => {
                let port = p.parse::<u16>().map_err(|e| format!("bad port '{p}': {e}"))?;
                (h.to_string(), port)
            }
            None => (authority.to_string(), 80),
        };

        if host.is_empty() {
            return Err(format!("missing host in '{s}'"));
        }

        Ok(Endpoint {
            host,
            port,
            path: path.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
