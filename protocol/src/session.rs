//! # Session Orchestrator
//!
//! One session is one pass through an explicit state machine:
//!
//! ```text
//! CollectingAmount -> ArmedWaitingForTag -> Processing -> Done
//! ```
//!
//! Collect and confirm the amount, arm the reader and wait for the one tag
//! presentation, extract the credential, submit the transfer, report.
//! Every stage failure is caught where it occurs and becomes an
//! operator-visible message plus a [`SessionOutcome`] — nothing except a
//! dead console propagates out of [`Session::run`]. Whatever happens, the
//! reader connection is released exactly once before `run` returns.
//!
//! The ledger service and reader are constructed by the caller and passed
//! in, never held as globals, so tests substitute fakes for both.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::config::SessionConfig;
use crate::ledger::LedgerService;
use crate::reader::TagReader;
use crate::tag::extract_credential;
use crate::transfer::{confirm_amount, explorer_url, submit_transfer, ConsoleError};

// ---------------------------------------------------------------------------
// States & Outcomes
// ---------------------------------------------------------------------------

/// Where the session currently is. Strictly forward-moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Running the amount confirmation loop.
    CollectingAmount,
    /// Reader armed, waiting for the single tag presentation.
    ArmedWaitingForTag,
    /// Tag arrived; extracting the credential and submitting.
    Processing,
    /// Finished; the reader connection has been released.
    Done,
}

/// How the session ended. Every variant has already been reported to the
/// operator by the time `run` returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The transfer was submitted and the node answered with a block id.
    Submitted {
        /// Normalized block id.
        block_id: String,
        /// Human-facing explorer link for the block.
        explorer_link: String,
    },
    /// A tag arrived but carried no text records; no submission attempted.
    NoCredential,
    /// Submission was attempted and failed.
    SubmitFailed {
        /// Underlying cause, as reported.
        reason: String,
    },
    /// The armed wait ended without a tag — interrupt, timeout, or a
    /// driver that went away.
    WaitAbandoned {
        /// Underlying cause, as reported.
        reason: String,
    },
}

/// The one failure `run` cannot convert into an outcome: the console died.
/// The reader has still been released when this is returned.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Console i/o failed mid-session.
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Console(ConsoleError::Io(err))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The orchestrator. Owns the console and the configuration; borrows the
/// collaborators for the duration of one `run`.
pub struct Session<R, W> {
    config: SessionConfig,
    input: R,
    output: W,
    state: SessionState,
}

impl<R, W> Session<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Builds a session over the given console handles.
    pub fn new(config: SessionConfig, input: R, output: W) -> Self {
        Self {
            config,
            input,
            output,
            state: SessionState::CollectingAmount,
        }
    }

    /// Current state, for inspection. After `run` returns this is always
    /// [`SessionState::Done`].
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the whole session and releases the reader.
    ///
    /// The release is unconditional: success, stage failure, abandoned
    /// wait, or console death all pass through the same teardown, and
    /// `close` is invoked exactly once.
    pub async fn run(
        &mut self,
        ledger: &dyn LedgerService,
        reader: &mut dyn TagReader,
    ) -> Result<SessionOutcome, SessionError> {
        let outcome = self.drive(ledger, reader).await;

        self.state = SessionState::Done;
        if let Err(err) = reader.close() {
            // Teardown failures are logged, never escalated — the session
            // already has an outcome to report.
            tracing::warn!(error = %err, "reader close reported an error");
        } else {
            tracing::debug!("session done, reader released");
        }

        outcome
    }

    async fn drive(
        &mut self,
        ledger: &dyn LedgerService,
        reader: &mut dyn TagReader,
    ) -> Result<SessionOutcome, SessionError> {
        self.state = SessionState::CollectingAmount;
        let request = confirm_amount(&mut self.input, &mut self.output, &self.config.destination)?;
        tracing::info!(amount = request.amount(), "transfer amount confirmed");

        self.state = SessionState::ArmedWaitingForTag;
        writeln!(self.output, "Waiting for a tag to be presented...")?;
        let event = match reader.wait_for_tag().await {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "tag wait ended without a tag");
                writeln!(self.output, "error: {err}")?;
                return Ok(SessionOutcome::WaitAbandoned {
                    reason: err.to_string(),
                });
            }
        };

        self.state = SessionState::Processing;
        writeln!(
            self.output,
            "Tag detected ({} record{}).",
            event.record_count(),
            if event.record_count() == 1 { "" } else { "s" },
        )?;

        let credential = match extract_credential(&event) {
            Ok(credential) => credential,
            Err(err) => {
                tracing::warn!("tag carried no text records");
                writeln!(self.output, "error: {err}")?;
                writeln!(self.output, "error: could not read a phrase from the tag")?;
                return Ok(SessionOutcome::NoCredential);
            }
        };

        if self.config.reveal_phrase {
            // Opt-in debug behavior; the default path never prints the
            // cleartext phrase anywhere.
            writeln!(self.output, "Phrase read: {}", credential.phrase())?;
        } else {
            writeln!(self.output, "Phrase read: {credential}")?;
        }

        writeln!(self.output, "Submitting the transfer...")?;
        match submit_transfer(ledger, &credential, &request, self.config.coin_type).await {
            Ok(block_id) => {
                let explorer_link = explorer_url(&self.config.explorer_url, &block_id);
                writeln!(self.output, "Block sent: {explorer_link}")?;
                Ok(SessionOutcome::Submitted {
                    block_id,
                    explorer_link,
                })
            }
            Err(err) => {
                tracing::error!(error = %err, "transfer submission failed");
                writeln!(self.output, "error performing the transaction: {err}")?;
                Ok(SessionOutcome::SubmitFailed {
                    reason: err.to_string(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerError, OutputDescriptor, SubmitResponse};
    use crate::reader::ReaderError;
    use crate::tag::{Credential, TagEvent};
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    struct FakeLedger {
        result: fn() -> Result<SubmitResponse, LedgerError>,
        calls: AtomicUsize,
    }

    impl FakeLedger {
        fn answering(result: fn() -> Result<SubmitResponse, LedgerError>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LedgerService for FakeLedger {
        async fn build_and_submit(
            &self,
            _secret: &Credential,
            _output: &OutputDescriptor,
            _coin_type: u32,
        ) -> Result<SubmitResponse, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    struct FakeReader {
        event: Option<Result<TagEvent, ReaderError>>,
        closes: Arc<AtomicUsize>,
    }

    impl FakeReader {
        fn presenting(event: Result<TagEvent, ReaderError>) -> (Self, Arc<AtomicUsize>) {
            let closes = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    event: Some(event),
                    closes: Arc::clone(&closes),
                },
                closes,
            )
        }
    }

    #[async_trait]
    impl TagReader for FakeReader {
        async fn wait_for_tag(&mut self) -> Result<TagEvent, ReaderError> {
            self.event.take().unwrap_or(Err(ReaderError::Closed))
        }

        fn close(&mut self) -> Result<(), ReaderError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn phrase_tag() -> Result<TagEvent, ReaderError> {
        Ok(TagEvent::new(vec!["alpha beta gamma delta".into()]))
    }

    async fn run_session(
        script: &str,
        ledger: &FakeLedger,
        reader: &mut FakeReader,
    ) -> (Result<SessionOutcome, SessionError>, String, SessionState) {
        let input = Cursor::new(script.to_string());
        let mut session = Session::new(SessionConfig::default(), input, Vec::new());
        let outcome = session.run(ledger, reader).await;
        let state = session.state();
        let transcript = String::from_utf8(std::mem::take(&mut session.output)).unwrap();
        (outcome, transcript, state)
    }

    // -----------------------------------------------------------------------
    // Flows
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn happy_path_submits_and_reports_link() {
        let ledger =
            FakeLedger::answering(|| Ok(SubmitResponse::Sequence(vec!["0xABC123".into()])));
        let (mut reader, closes) = FakeReader::presenting(phrase_tag());

        let (outcome, transcript, state) = run_session("5000\ny\n", &ledger, &mut reader).await;

        match outcome.unwrap() {
            SessionOutcome::Submitted {
                block_id,
                explorer_link,
            } => {
                assert_eq!(block_id, "0xABC123");
                assert!(explorer_link.ends_with("/block/0xABC123"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(transcript.contains("Block sent:"));
        assert_eq!(state, SessionState::Done);
        assert_eq!(ledger.calls(), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_tag_skips_submission() {
        let ledger =
            FakeLedger::answering(|| Ok(SubmitResponse::Sequence(vec!["0xNEVER".into()])));
        let (mut reader, closes) = FakeReader::presenting(Ok(TagEvent::new(vec![])));

        let (outcome, transcript, _) = run_session("100\ny\n", &ledger, &mut reader).await;

        assert_eq!(outcome.unwrap(), SessionOutcome::NoCredential);
        assert!(transcript.contains("no decoded text records"));
        // The submitter must never have been reached.
        assert_eq!(ledger.calls(), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submission_failure_reported_and_reader_still_closed() {
        let ledger =
            FakeLedger::answering(|| Err(LedgerError::Rejected("insufficient funds".into())));
        let (mut reader, closes) = FakeReader::presenting(phrase_tag());

        let (outcome, transcript, state) = run_session("100\ny\n", &ledger, &mut reader).await;

        match outcome.unwrap() {
            SessionOutcome::SubmitFailed { reason } => {
                assert!(reason.contains("insufficient funds"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(transcript.contains("error performing the transaction"));
        assert!(transcript.contains("insufficient funds"));
        assert_eq!(state, SessionState::Done);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn aborted_wait_reaches_teardown() {
        let ledger = FakeLedger::answering(|| Ok(SubmitResponse::Sequence(vec![])));
        let (mut reader, closes) = FakeReader::presenting(Err(ReaderError::Aborted));

        let (outcome, transcript, _) = run_session("100\ny\n", &ledger, &mut reader).await;

        match outcome.unwrap() {
            SessionOutcome::WaitAbandoned { reason } => {
                assert!(reason.contains("aborted"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(transcript.contains("aborted"));
        assert_eq!(ledger.calls(), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timed_out_wait_reaches_teardown() {
        let limit = std::time::Duration::from_secs(30);
        let ledger = FakeLedger::answering(|| Ok(SubmitResponse::Sequence(vec![])));
        let (mut reader, closes) = FakeReader::presenting(Err(ReaderError::TimedOut(limit)));

        let (outcome, _, _) = run_session("100\ny\n", &ledger, &mut reader).await;

        assert!(matches!(
            outcome.unwrap(),
            SessionOutcome::WaitAbandoned { .. }
        ));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dead_console_still_closes_reader() {
        let ledger = FakeLedger::answering(|| Ok(SubmitResponse::Sequence(vec![])));
        let (mut reader, closes) = FakeReader::presenting(phrase_tag());

        // Empty script: the amount loop hits EOF immediately.
        let (outcome, _, state) = run_session("", &ledger, &mut reader).await;

        assert!(matches!(
            outcome,
            Err(SessionError::Console(ConsoleError::InputClosed))
        ));
        assert_eq!(state, SessionState::Done);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn phrase_redacted_by_default() {
        let ledger =
            FakeLedger::answering(|| Ok(SubmitResponse::Sequence(vec!["0xABC".into()])));
        let (mut reader, _) = FakeReader::presenting(phrase_tag());

        let (_, transcript, _) = run_session("100\ny\n", &ledger, &mut reader).await;

        assert!(!transcript.contains("alpha beta gamma delta"), "phrase leaked");
        assert!(transcript.contains("4 words, redacted"));
    }

    #[tokio::test]
    async fn phrase_revealed_only_when_asked() {
        let ledger =
            FakeLedger::answering(|| Ok(SubmitResponse::Sequence(vec!["0xABC".into()])));
        let (mut reader, _) = FakeReader::presenting(phrase_tag());

        let config = SessionConfig {
            reveal_phrase: true,
            ..SessionConfig::default()
        };
        let input = Cursor::new("100\ny\n".to_string());
        let mut session = Session::new(config, input, Vec::new());
        session.run(&ledger, &mut reader).await.unwrap();
        let transcript = String::from_utf8(std::mem::take(&mut session.output)).unwrap();

        assert!(transcript.contains("Phrase read: alpha beta gamma delta"));
    }
}
