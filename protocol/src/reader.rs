//! # Tag Reader Boundary
//!
//! The radio, the polling loop, and NDEF decoding all live in an external
//! driver. What the session needs from it is exactly one thing: a single
//! [`TagEvent`](crate::tag::TagEvent) per armed wait. The original design
//! delivered that through a registered callback; here it is an explicit
//! awaited call — arm once, fire at most once, and the orchestrator stays
//! a plain sequential state machine that tests can drive with a fake.
//!
//! [`ChannelReader`] is the production adapter: a oneshot channel whose
//! sending half ([`TagFeed`]) goes to whatever driver task talks to the
//! hardware. The feed learns when the session actually arms its wait, so
//! a driver that shares an input device with the console (the simulated
//! tap in the demo binary) cannot race the amount prompts.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::tag::TagEvent;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Ways an armed wait (or the reader itself) can fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReaderError {
    /// The wait was abandoned before any tag arrived — driver gone,
    /// operator interrupt, reader unplugged.
    #[error("tag wait aborted before a tag was presented")]
    Aborted,

    /// No tag arrived within the configured wait bound.
    #[error("no tag presented within {0:?}")]
    TimedOut(Duration),

    /// The connection was already released, or the single armed wait was
    /// already consumed.
    #[error("reader connection already closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// TagReader
// ---------------------------------------------------------------------------

/// The narrow reader interface the session depends on.
///
/// Contract: `wait_for_tag` may be called at most once per connection and
/// resolves with the single tag presentation of the session; `close`
/// releases the hardware and must be called exactly once, on every
/// outcome, including aborts.
#[async_trait]
pub trait TagReader: Send {
    /// Arm the reader and wait for the one tag presentation.
    async fn wait_for_tag(&mut self) -> Result<TagEvent, ReaderError>;

    /// Release the hardware connection.
    fn close(&mut self) -> Result<(), ReaderError>;
}

// ---------------------------------------------------------------------------
// ChannelReader
// ---------------------------------------------------------------------------

/// Oneshot-backed [`TagReader`] fed by an external driver task.
///
/// Created together with its [`TagFeed`]; the feed moves into the driver,
/// the reader moves into the session. Dropping the feed without firing
/// aborts the wait, which is exactly how operator interrupts unwind.
pub struct ChannelReader {
    slot: Option<oneshot::Receiver<TagEvent>>,
    armed_tx: Option<oneshot::Sender<()>>,
    timeout: Option<Duration>,
    closed: bool,
}

/// Driver-side handle for one tag presentation.
pub struct TagFeed {
    armed_rx: oneshot::Receiver<()>,
    slot: oneshot::Sender<TagEvent>,
}

impl ChannelReader {
    /// Builds a connected reader/feed pair. `timeout` bounds the armed
    /// wait; `None` waits forever (the reference behavior).
    pub fn connect(timeout: Option<Duration>) -> (Self, TagFeed) {
        let (event_tx, event_rx) = oneshot::channel();
        let (armed_tx, armed_rx) = oneshot::channel();
        (
            Self {
                slot: Some(event_rx),
                armed_tx: Some(armed_tx),
                timeout,
                closed: false,
            },
            TagFeed {
                armed_rx,
                slot: event_tx,
            },
        )
    }
}

#[async_trait]
impl TagReader for ChannelReader {
    async fn wait_for_tag(&mut self) -> Result<TagEvent, ReaderError> {
        if self.closed {
            return Err(ReaderError::Closed);
        }
        // Single-shot: a second call finds the slot already consumed.
        let slot = self.slot.take().ok_or(ReaderError::Closed)?;

        // Tell the driver the wait is armed. A driver that already went
        // away is fine; the slot below reports the abort.
        if let Some(armed) = self.armed_tx.take() {
            let _ = armed.send(());
        }

        tracing::debug!(timeout = ?self.timeout, "tag wait armed");

        let wait = async { slot.await.map_err(|_| ReaderError::Aborted) };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| ReaderError::TimedOut(limit))?,
            None => wait.await,
        }
    }

    fn close(&mut self) -> Result<(), ReaderError> {
        if self.closed {
            return Err(ReaderError::Closed);
        }
        self.closed = true;
        self.slot = None;
        self.armed_tx = None;
        tracing::debug!("reader connection released");
        Ok(())
    }
}

impl TagFeed {
    /// Resolves once the session arms its wait. Returns `false` if the
    /// reader was closed (or dropped) without ever arming — the driver
    /// should stand down without touching its input device.
    pub async fn armed(&mut self) -> bool {
        (&mut self.armed_rx).await.is_ok()
    }

    /// Delivers the single tag presentation. Returns the event back if
    /// nobody is waiting anymore (wait timed out or reader closed).
    pub fn fire(self, event: TagEvent) -> Result<(), TagEvent> {
        self.slot.send(event)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
