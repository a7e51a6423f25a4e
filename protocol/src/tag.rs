//! # Tag Events & Credential Extraction
//!
//! A physical tag presentation arrives as a [`TagEvent`] carrying the
//! decoded text records the driver pulled off the tag. The first record is
//! the secret-recovery phrase for the paying account; everything after it
//! is ignored.
//!
//! ## Redaction
//!
//! A [`Credential`] is a signing secret in word form. Its `Debug` and
//! `Display` impls print only the word count, so a stray `{:?}` in a log
//! line can never leak the phrase. The cleartext is reachable only through
//! the explicit [`Credential::phrase`] accessor, which exists for exactly
//! one caller: the ledger service boundary.
//!
//! No format validation happens here — word count, checksum, wordlist
//! membership are all the ledger service's problem. A tag carrying garbage
//! produces a `Credential` carrying the same garbage, and the node rejects
//! it downstream.

use std::fmt;

use thiserror::Error;

/// The tag was presented but carried no decoded text records.
///
/// Fatal for this presentation (no retry is attempted), non-fatal for the
/// process — the session reports it and proceeds to teardown.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no decoded text records on the tag")]
pub struct NoCredential;

// ---------------------------------------------------------------------------
// TagEvent
// ---------------------------------------------------------------------------

/// One physical tag presentation, as delivered by the reader driver.
///
/// Produced at most once per armed session and consumed immediately; the
/// session never retains it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEvent {
    records: Vec<String>,
}

impl TagEvent {
    /// Wraps the decoded text records of a presented tag, in tag order.
    pub fn new(records: Vec<String>) -> Self {
        Self { records }
    }

    /// `true` if the tag carried at least one decoded text record.
    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    /// Number of decoded records. Used only for operator reporting.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// The decoded records, in tag order.
    pub fn records(&self) -> &[String] {
        &self.records
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A secret-recovery phrase read from a tag.
///
/// Lives in memory for the duration of one submission and is never
/// persisted. Redacted in `Debug`/`Display`; see the module docs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    phrase: String,
}

impl Credential {
    /// Wraps a phrase verbatim — no trimming, no normalization. The
    /// extractor must hand the ledger exactly the bytes the tag carried.
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
        }
    }

    /// The cleartext phrase. For the ledger service boundary (and the
    /// explicit reveal flag) only — do not feed this to a logger.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Number of whitespace-separated words in the phrase. Safe to print.
    pub fn word_count(&self) -> usize {
        self.phrase.split_whitespace().count()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({} words, redacted)", self.word_count())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} words, redacted>", self.word_count())
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Pulls the credential out of a tag event: the first text record, taken
/// verbatim.
///
/// Returns [`NoCredential`] when the tag carried no records at all.
pub fn extract_credential(event: &TagEvent) -> Result<Credential, NoCredential> {
    event
        .records
        .first()
        .map(|record| Credential::new(record.clone()))
        .ok_or(NoCredential)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
