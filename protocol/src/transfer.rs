//! # Transfer Requests, Confirmation & Submission
//!
//! The operator side of the session: collect an amount, show it back with
//! its major-unit equivalent and the fixed destination, get an explicit
//! yes before any hardware is armed. The loop is generic over `BufRead` /
//! `Write` so tests drive it with cursors instead of a terminal.
//!
//! Submission is the other half: build the output descriptor, call the
//! ledger service once, normalize the response, compose the explorer link.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::config::UNIT_SCALE;
use crate::ledger::{LedgerError, LedgerService, NormalizeError, OutputDescriptor};
use crate::tag::Credential;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the confirmation loop itself. Bad *input* never lands here —
/// unparseable amounts and stray confirmation answers are reported and
/// re-prompted inside the loop. Only a console that stops working escapes.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Reading or writing the console failed.
    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The input stream ended before the operator confirmed an amount.
    #[error("input closed before the amount was confirmed")]
    InputClosed,
}

/// Failures of one transaction attempt. Caught and reported by the session;
/// never allowed to propagate past it.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The ledger service failed to build, sign, or post the transfer.
    #[error("{0}")]
    Ledger(#[from] LedgerError),

    /// The service answered successfully but the response yielded no id.
    #[error("{0}")]
    Response(#[from] NormalizeError),
}

// ---------------------------------------------------------------------------
// TransferRequest
// ---------------------------------------------------------------------------

/// One operator-confirmed transfer: how much, and to the fixed destination.
/// Created once per session and immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    amount: u64,
    destination: String,
}

impl TransferRequest {
    /// Binds a confirmed amount to the deployment's destination address.
    pub fn new(amount: u64, destination: impl Into<String>) -> Self {
        Self {
            amount,
            destination: destination.into(),
        }
    }

    /// Amount in base units.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Destination address.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Amount in major units, for display only. Base units remain the
    /// source of truth everywhere else.
    pub fn major_units(&self) -> f64 {
        self.amount as f64 / UNIT_SCALE as f64
    }
}

// ---------------------------------------------------------------------------
// Amount Confirmation Loop
// ---------------------------------------------------------------------------

/// Collects and confirms the transfer amount.
///
/// Repeats until the operator supplies a whole number and answers `y` to
/// the confirmation. `n` restarts from the amount prompt (the previous
/// amount is discarded); any other answer re-prompts the confirmation
/// only. Matching is case-insensitive and whitespace-trimmed.
///
/// There is deliberately no upper bound on the amount — a known gap in the
/// demo deployment, kept visible rather than silently capped.
pub fn confirm_amount<R, W>(
    input: &mut R,
    output: &mut W,
    destination: &str,
) -> Result<TransferRequest, ConsoleError>
where
    R: BufRead,
    W: Write,
{
    loop {
        write!(output, "Enter the amount to transfer (base units): ")?;
        output.flush()?;
        let line = read_line(input)?.ok_or(ConsoleError::InputClosed)?;

        let amount: u64 = match line.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                writeln!(output, "error: '{}' is not a valid whole number", line.trim())?;
                continue;
            }
        };

        let request = TransferRequest::new(amount, destination);
        writeln!(
            output,
            "Amount entered: {} base units ({} major units)",
            request.amount(),
            request.major_units(),
        )?;
        writeln!(output, "Destination address: {destination}")?;

        // Confirmation sub-loop: only a recognized answer leaves it.
        loop {
            write!(output, "Is this correct? (y/n): ")?;
            output.flush()?;
            let answer = read_line(input)?.ok_or(ConsoleError::InputClosed)?;

            match answer.trim().to_lowercase().as_str() {
                "y" => return Ok(request),
                "n" => {
                    writeln!(output, "Re-enter the amount.")?;
                    break;
                }
                other => {
                    writeln!(output, "error: '{other}' is not an answer; enter y or n")?;
                }
            }
        }
    }
}

/// One line of console input, or `None` at end of stream.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>, std::io::Error> {
    let mut line = String::new();
    match input.read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line)),
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Runs the single transaction attempt of a session: descriptor from the
/// request, one `build_and_submit` call, response normalized to a block id.
///
/// Every failure along the way comes back as a [`SubmitError`] for the
/// session to report — nothing here panics or propagates further.
pub async fn submit_transfer(
    ledger: &dyn LedgerService,
    credential: &Credential,
    request: &TransferRequest,
    coin_type: u32,
) -> Result<String, SubmitError> {
    let output = OutputDescriptor {
        address: request.destination().to_string(),
        amount: request.amount(),
    };

    tracing::debug!(
        amount = output.amount,
        destination = %output.address,
        coin_type,
        "submitting transfer"
    );

    let response = ledger.build_and_submit(credential, &output, coin_type).await?;
    let block_id = response.block_id()?;

    tracing::info!(block_id = %block_id, "transfer submitted");
    Ok(block_id)
}

/// Composes the human-facing explorer link for a submitted block.
pub fn explorer_url(base: &str, block_id: &str) -> String {
    format!("{}/block/{}", base.trim_end_matches('/'), block_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SubmitResponse;
    use async_trait::async_trait;
    use std::io::Cursor;

    const DEST: &str = "tst1qexampledestination";

    fn run_loop(script: &str) -> (Result<TransferRequest, ConsoleError>, String) {
        let mut input = Cursor::new(script.to_string());
        let mut output = Vec::new();
        let result = confirm_amount(&mut input, &mut output, DEST);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn valid_amount_confirmed_in_one_round_trip() {
        let (result, transcript) = run_loop("5000\ny\n");
        let request = result.unwrap();
        assert_eq!(request.amount(), 5000);
        assert_eq!(request.destination(), DEST);
        assert!(transcript.contains("5000 base units (0.005 major units)"));
        assert!(transcript.contains(DEST));
    }

    #[test]
    fn zero_is_accepted() {
        let (result, _) = run_loop("0\ny\n");
        assert_eq!(result.unwrap().amount(), 0);
    }

    #[test]
    fn non_integer_input_reprompts_amount() {
        let (result, transcript) = run_loop("twelve\n3.5\n-100\n1000000\ny\n");
        assert_eq!(result.unwrap().amount(), 1_000_000);
        assert!(transcript.contains("'twelve' is not a valid whole number"));
        assert!(transcript.contains("'3.5' is not a valid whole number"));
        assert!(transcript.contains("'-100' is not a valid whole number"));
        // Four amount prompts: three rejections plus the accepted entry.
        assert_eq!(transcript.matches("Enter the amount").count(), 4);
    }

    #[test]
    fn declining_restarts_from_amount_prompt() {
        let (result, transcript) = run_loop("100\nn\n200\ny\n");
        // The declined amount is discarded entirely.
        assert_eq!(result.unwrap().amount(), 200);
        assert!(transcript.contains("Re-enter the amount."));
        assert_eq!(transcript.matches("Enter the amount").count(), 2);
    }

    #[test]
    fn unrecognized_answer_reprompts_confirmation_only() {
        let (result, transcript) = run_loop("100\nmaybe\nok\ny\n");
        assert_eq!(result.unwrap().amount(), 100);
        assert!(transcript.contains("'maybe' is not an answer"));
        // The amount prompt appeared exactly once — only the confirmation
        // question repeated.
        assert_eq!(transcript.matches("Enter the amount").count(), 1);
        assert_eq!(transcript.matches("Is this correct?").count(), 3);
    }

    #[test]
    fn confirmation_is_case_insensitive() {
        let (result, _) = run_loop("7\nY\n");
        assert_eq!(result.unwrap().amount(), 7);

        let (result, _) = run_loop("7\nN\n8\ny\n");
        assert_eq!(result.unwrap().amount(), 8);
    }

    #[test]
    fn eof_before_amount_is_input_closed() {
        let (result, _) = run_loop("");
        assert!(matches!(result, Err(ConsoleError::InputClosed)));
    }

    #[test]
    fn eof_before_confirmation_is_input_closed() {
        let (result, _) = run_loop("100\n");
        assert!(matches!(result, Err(ConsoleError::InputClosed)));
    }

    #[test]
    fn major_units_scaling() {
        assert_eq!(TransferRequest::new(2_500_000, DEST).major_units(), 2.5);
        assert_eq!(TransferRequest::new(0, DEST).major_units(), 0.0);
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Ledger stub answering with a canned result and recording the call.
    struct StubLedger {
        result: fn() -> Result<SubmitResponse, LedgerError>,
        seen: std::sync::Mutex<Vec<(String, OutputDescriptor, u32)>>,
    }

    impl StubLedger {
        fn new(result: fn() -> Result<SubmitResponse, LedgerError>) -> Self {
            Self {
                result,
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerService for StubLedger {
        async fn build_and_submit(
            &self,
            secret: &Credential,
            output: &OutputDescriptor,
            coin_type: u32,
        ) -> Result<SubmitResponse, LedgerError> {
            self.seen.lock().unwrap().push((
                secret.phrase().to_string(),
                output.clone(),
                coin_type,
            ));
            (self.result)()
        }
    }

    #[tokio::test]
    async fn sequence_response_normalized() {
        let ledger = StubLedger::new(|| Ok(SubmitResponse::Sequence(vec!["0xABC123".into()])));
        let credential = Credential::new("alpha beta gamma");
        let request = TransferRequest::new(1000, DEST);

        let id = submit_transfer(&ledger, &credential, &request, 4218)
            .await
            .unwrap();
        assert_eq!(id, "0xABC123");

        let seen = ledger.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "alpha beta gamma");
        assert_eq!(seen[0].1.address, DEST);
        assert_eq!(seen[0].1.amount, 1000);
        assert_eq!(seen[0].2, 4218);
    }

    #[tokio::test]
    async fn record_response_normalized() {
        let ledger = StubLedger::new(|| {
            Ok(SubmitResponse::Record {
                block_id: "0xDEF456".into(),
            })
        });
        let credential = Credential::new("alpha beta gamma");
        let request = TransferRequest::new(1000, DEST);

        let id = submit_transfer(&ledger, &credential, &request, 4218)
            .await
            .unwrap();
        assert_eq!(id, "0xDEF456");
    }

    #[tokio::test]
    async fn ledger_error_surfaces_with_cause() {
        let ledger = StubLedger::new(|| Err(LedgerError::Rejected("insufficient funds".into())));
        let credential = Credential::new("alpha beta gamma");
        let request = TransferRequest::new(1000, DEST);

        let err = submit_transfer(&ledger, &credential, &request, 4218)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn empty_sequence_surfaces_as_response_error() {
        let ledger = StubLedger::new(|| Ok(SubmitResponse::Sequence(vec![])));
        let credential = Credential::new("alpha beta gamma");
        let request = TransferRequest::new(1000, DEST);

        let err = submit_transfer(&ledger, &credential, &request, 4218)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Response(NormalizeError::EmptySequence)
        ));
    }

    #[test]
    fn explorer_url_composition() {
        assert_eq!(
            explorer_url("https://explorer.example.org", "0xABC"),
            "https://explorer.example.org/block/0xABC"
        );
        // Trailing slash on the base must not double up.
        assert_eq!(
            explorer_url("https://explorer.example.org/", "0xABC"),
            "https://explorer.example.org/block/0xABC"
        );
    }
}
