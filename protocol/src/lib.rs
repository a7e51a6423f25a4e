// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # tapbridge — Core Session Library
//!
//! Everything needed to turn one tap of an NFC credential tag into one
//! signed ledger transfer. The flow is deliberately small: confirm an
//! amount with the operator, arm the tag reader, pull a secret-recovery
//! phrase off the tag, hand it to the ledger service, report the result,
//! release the hardware. One tag, one transaction, one session.
//!
//! ## Architecture
//!
//! - **config** — Constants and the injected [`config::SessionConfig`].
//!   Every magic number lives there, nowhere else.
//! - **tag** — Tag events and the [`tag::Credential`] phrase, redacted by
//!   default because secret phrases do not belong in terminal scrollback.
//! - **ledger** — The ledger service boundary: one trait, two response
//!   shapes, one normalization function, and a thin HTTP client.
//! - **transfer** — Operator-confirmed transfer requests and submission.
//! - **reader** — The tag reader boundary: arm once, fire at most once,
//!   close exactly once.
//! - **session** — The orchestrator state machine wiring it all together.
//!
//! The two hardware/network collaborators (the NFC radio driver and the
//! ledger node internals) live *behind* the `reader` and `ledger` traits.
//! This crate never touches NDEF framing or transaction signing itself.

pub mod config;
pub mod ledger;
pub mod reader;
pub mod session;
pub mod tag;
pub mod transfer;
