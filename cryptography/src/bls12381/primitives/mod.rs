//! Operations over the BLS12-381 scalar field and G2.
//!
//! # Acknowledgements
//!
//! _The following crates were used as a reference when implementing this crate. If code is very similar
//! to the reference, it is accompanied by a comment and link._
//!
//! * <https://github.com/celo-org/celo-threshold-bls-rs>: Operations over the BLS12-381 scalar field and polynomial commitments.
//! * <https://github.com/filecoin-project/blstrs> + <https://github.com/MystenLabs/fastcrypto>: Implementing operations over
//!   the BLS12-381 scalar field with <https://github.com/supranational/blst>.
//!
//! # Example
//!
//! ```rust
//! use vssq_cryptography::bls12381::primitives::{
//!     group::{verify_discrete_log, Share},
//!     poly::{self, Public},
//! };
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Sample a secret polynomial of degree 2 (3 shares required)
//! let mut rng = StdRng::seed_from_u64(0);
//! let secret = poly::new_from(2, &mut rng);
//!
//! // Commit to it and derive the share of participant 3
//! let commitment = Public::commit(&secret);
//! let share = Share { index: 3, private: secret.evaluate(3).value };
//!
//! // Anyone holding the commitment can check the share
//! assert!(verify_discrete_log(&share.private, &commitment.evaluate(3).value));
//! ```

pub mod group;
pub mod poly;
