//! Share a secret among a group with Feldman VSS and agree on whether the dealer is qualified.
//!
//! # Status
//!
//! `vssq-cryptography` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

pub mod bls12381;
