//! Feldman Verifiable Secret Sharing (VSS) with dealer qualification for the BLS12-381 curve.
//!
//! A single dealer shares a random secret among `n` participants such that any `threshold + 1` of
//! them can reconstruct it. Unlike plain Feldman VSS, participants that received an invalid (or
//! no) share can publicly complain, and the dealer must publicly answer each complaint by
//! revealing the complainer's share. At the end of the protocol every honest participant reaches
//! the same verdict: either the dealer is qualified (and all participants hold consistent shares of
//! the same group key) or it is disqualified (and all key material is discarded).
//!
//! The construction follows "Secure Distributed Key Generation for Discrete-Log Based
//! Cryptosystems" (GJKR99) restricted to a single dealer: the "qualified" part of the protocol
//! is the complaint/answer exchange.
//!
//! # Overview
//!
//! Each participant (including the dealer) runs an [Instance]. The instance never performs I/O.
//! Every call that processes input returns a list of [Action]s (messages to broadcast or send
//! privately, misbehavior to flag, the dealer's disqualification) that the caller must carry out,
//! either directly or through a [Processor].
//!
//! The caller is expected to provide:
//!
//! * A broadcast channel on which all honest participants receive the same messages.
//! * A private (encrypted and authenticated) channel between the dealer and each participant.
//! * The authenticated origin of every message.
//! * Two timeouts, signaled with [Instance::next_timeout].
//!
//! # Protocol
//!
//! ## [Dealer] Step 0: Deal
//!
//! Generate a random polynomial `f` of degree `threshold` and commit to it (the verification
//! vector `vA = [a_0 * G, ..., a_t * G]`). Broadcast `vA` and send `f(i + 1)` to each participant
//! `i` over the private channel.
//!
//! ## [Participant] Step 1: Verify Share
//!
//! Upon receiving both `vA` and a share `x`, check `x * G == vA(i + 1)`. If the share is
//! malformed or invalid, broadcast a complaint against the dealer. If `vA` is malformed (or
//! not received before the first timeout), disqualify the dealer. If the share is not received
//! before the first timeout, complain.
//!
//! ## [Dealer] Step 2: Answer Complaints
//!
//! Answer each complaint by broadcasting the complainer's share. Anyone can check the answer
//! against `vA`. An invalid answer disqualifies the dealer. A valid answer to one's own complaint
//! replaces the share.
//!
//! ## [Participant] Step 3: Count Complaints
//!
//! After the second timeout, disqualify the dealer if more than `threshold` distinct participants
//! complained (even if all complaints were answered). Complaints are no longer accepted.
//!
//! ## [Participant] Step 4: End
//!
//! Disqualify the dealer if any complaint remains unanswered. Otherwise output the share, the group
//! public key `vA[0]` and all public key shares `vA(j + 1)`. Keys equal to the identity are rejected.
//!
//! # Messages
//!
//! See [wire] for the exact encoding of each message.
//!
//! # Misbehavior
//!
//! Invalid input from peers never produces an error. Misbehavior by a non-dealer is flagged and
//! otherwise ignored. Misbehavior by the dealer that can be proven to others disqualifies it
//! (the verdict is sticky and all later messages are dropped).
//!
//! # Example
//!
//! For a complete example of how to drive instances over a (simulated) network, checkout
//! `vssq-dealing` in `demos/dealing`.

pub mod action;
pub use action::{dispatch, Action, Processor};
mod instance;
pub use instance::{Instance, Output, Phase};
pub mod ledger;
pub mod wire;

use thiserror::Error;

/// Minimum number of participants.
pub const MIN_SIZE: u32 = 2;

/// Maximum number of participants (indices must fit in a single byte on the wire).
pub const MAX_SIZE: u32 = 254;

/// Minimum threshold.
pub const MINIMUM_THRESHOLD: u32 = 1;

/// Errors returned to the caller for misuse (never for misbehavior of peers).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("dkg failed: {0}")]
    Failure(String),
}

/// Configuration of an [Instance].
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Number of participants (including the dealer).
    pub size: u32,

    /// Degree of the dealer's polynomial (`threshold + 1` shares are required to recover the secret).
    pub threshold: u32,

    /// Index of this participant.
    pub me: u32,

    /// Index of the dealer.
    pub dealer: u32,
}
