//! Polynomial operations over the BLS12-381 scalar field.
//!
//! # Warning
//!
//! The security of the polynomial operations is critical for the overall
//! security of the threshold schemes. Ensure that the scalar field operations
//! are performed over the correct field and that all elements are valid.

use crate::bls12381::primitives::group::{self, Element, Scalar};
use rand::RngCore;
use zeroize::Zeroize;

/// Private polynomials are used to generate secret shares.
pub type Private = Poly<group::Private>;

/// Public polynomials represent commitments to secrets on a private polynomial.
pub type Public = Poly<group::Public>;

/// A polynomial evaluation at a specific index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eval<C: Element> {
    pub index: u32,
    pub value: C,
}

/// A polynomial that is using a scalar for the variable x and a generic
/// element for the coefficients.
///
/// The coefficients must be able to multiply the type of the variable,
/// which is always a scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
// Reference: https://github.com/celo-org/celo-threshold-bls-rs/blob/a714310be76620e10e8797d6637df64011926430/crates/threshold-bls/src/poly.rs#L24-L28
pub struct Poly<C>(Vec<C>);

/// Returns a new scalar polynomial of the given degree where each coefficient is
/// sampled at random from the provided RNG.
///
/// In the context of secret sharing, `degree + 1` evaluations are required to
/// recover the constant term.
pub fn new_from<R: RngCore>(degree: u32, rng: &mut R) -> Poly<Scalar> {
    // Reference: https://github.com/celo-org/celo-threshold-bls-rs/blob/a714310be76620e10e8797d6637df64011926430/crates/threshold-bls/src/poly.rs#L46-L52
    let coeffs = (0..=degree).map(|_| Scalar::rand(rng)).collect::<Vec<_>>();
    Poly::<Scalar>(coeffs)
}

impl<C> Poly<C> {
    /// Creates a new polynomial from the given coefficients.
    pub fn from(c: Vec<C>) -> Self {
        Self(c)
    }

    /// Returns the constant term of the polynomial.
    pub fn constant(&self) -> &C {
        &self.0[0]
    }

    /// Returns the degree of the polynomial
    pub fn degree(&self) -> u32 {
        (self.0.len() - 1) as u32 // check size in deserialize, safe to cast
    }

    /// Returns the number of required shares to reconstruct the polynomial.
    pub fn required(&self) -> u32 {
        self.0.len() as u32 // check size in deserialize, safe to cast
    }
}

impl<C: Element> Poly<C> {
    /// Commits the scalar polynomial to the group and returns a polynomial over
    /// the group.
    ///
    /// This is done by multiplying each coefficient of the polynomial with the
    /// group's generator.
    pub fn commit(commits: &Poly<Scalar>) -> Self {
        // Reference: https://github.com/celo-org/celo-threshold-bls-rs/blob/a714310be76620e10e8797d6637df64011926430/crates/threshold-bls/src/poly.rs#L322-L340
        let commits = commits
            .0
            .iter()
            .map(|c| {
                let mut commitment = C::one();
                commitment.mul(c);
                commitment
            })
            .collect::<Vec<C>>();

        Poly::<C>::from(commits)
    }


    /// Evaluates the polynomial at `index + 1`.
    ///
    /// Participant `i` owns the evaluation at `i + 1`: the polynomial is never
    /// evaluated at `0`, which would reveal the secret.
    pub fn evaluate(&self, index: u32) -> Eval<C> {
        // Reference: https://github.com/celo-org/celo-threshold-bls-rs/blob/a714310be76620e10e8797d6637df64011926430/crates/threshold-bls/src/poly.rs#L111-L129
        let mut xi = Scalar::zero();
        xi.set_int(index + 1);

        // Use Horner's method to evaluate the polynomial
        let value = self.0.iter().rev().fold(C::zero(), |mut sum, coeff| {
            sum.mul(&xi);
            sum.add(coeff);
            sum
        });
        Eval { index, value }
    }

    /// Evaluates the polynomial at every index in `[0, n)`.
    pub fn evaluate_all(&self, n: u32) -> Vec<C> {
        (0..n).map(|index| self.evaluate(index).value).collect()
    }

    /// Canonically serializes the polynomial (coefficients in order).
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(C::size() * self.0.len());
        for c in &self.0 {
            bytes.extend_from_slice(&c.serialize());
        }
        bytes
    }

    /// Deserializes a canonically encoded polynomial with exactly `required`
    /// coefficients.
    pub fn deserialize(bytes: &[u8], required: u32) -> Option<Self> {
        if required == 0 {
            return None;
        }
        let expected = C::size().checked_mul(required as usize)?;
        if bytes.len() != expected {
            return None;
        }
        let coeffs = bytes
            .chunks_exact(C::size())
            .map(C::deserialize)
            .collect::<Option<Vec<C>>>()?;
        Some(Self(coeffs))
    }
}

impl<C: Element + Zeroize> Zeroize for Poly<C> {
    fn zeroize(&mut self) {
        self.0.iter_mut().for_each(|c| c.zeroize());
    }
}

#[cfg(test)]
mod tests {
    // Reference: https://github.com/celo-org/celo-threshold-bls-rs/blob/b0ef82ff79769d085a5a7d3f4fe690b1c8fe6dc9/crates/threshold-bls/src/poly.rs#L355-L604
    use super::*;
    use crate::bls12381::primitives::group::{Share, G2};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_commit_matches_evaluations() {
        let mut rng = StdRng::seed_from_u64(0);
        let secret = new_from(3, &mut rng);
        let commitment = Public::commit(&secret);
        assert_eq!(commitment.degree(), 3);
        assert_eq!(commitment.required(), 4);

        // Every share is the discrete log of the matching commitment evaluation
        for index in 0..10 {
            let share = Share {
                index,
                private: secret.evaluate(index).value,
            };
            assert_eq!(share.public(), commitment.evaluate(index).value);
        }
    }

    #[test]
    fn test_evaluate_all() {
        let mut rng = StdRng::seed_from_u64(1);
        let secret = new_from(2, &mut rng);
        let commitment = Public::commit(&secret);
        let evals = commitment.evaluate_all(5);
        assert_eq!(evals.len(), 5);
        for (index, eval) in evals.iter().enumerate() {
            assert_eq!(*eval, commitment.evaluate(index as u32).value);
        }
    }

    #[test]
    fn test_evaluate_skips_zero() {
        // f(x) = 1 + x, so participant 0 owns f(1) = 2 (not the secret f(0) = 1)
        let poly = Poly::from(vec![Scalar::one(), Scalar::one()]);
        let mut two = Scalar::zero();
        two.set_int(2);
        assert_eq!(poly.evaluate(0).value, two);
    }

    #[test]
    fn test_public() {
        let mut rng = StdRng::seed_from_u64(2);
        let secret = new_from(1, &mut rng);
        let commitment = Public::commit(&secret);
        let mut expected = G2::one();
        expected.mul(secret.constant());
        assert_eq!(*commitment.constant(), expected);
    }

    #[test]
    fn test_serialization() {
        let mut rng = StdRng::seed_from_u64(3);
        let commitment = Public::commit(&new_from(4, &mut rng));
        let bytes = commitment.serialize();
        assert_eq!(bytes.len(), 5 * group::G2_ELEMENT_BYTE_LENGTH);
        assert_eq!(Public::deserialize(&bytes, 5).unwrap(), commitment);

        // Wrong number of coefficients
        assert!(Public::deserialize(&bytes, 4).is_none());
        assert!(Public::deserialize(&bytes, 0).is_none());

        // Corrupted coefficient
        let mut corrupted = bytes.clone();
        corrupted[group::G2_ELEMENT_BYTE_LENGTH..2 * group::G2_ELEMENT_BYTE_LENGTH]
            .copy_from_slice(&[0xaa; group::G2_ELEMENT_BYTE_LENGTH]);
        assert!(Public::deserialize(&corrupted, 5).is_none());
    }

    #[test]
    fn test_zeroize() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut secret = new_from(2, &mut rng);
        secret.zeroize();
        assert!(secret.0.iter().all(|c| c.is_zero()));
    }
}
