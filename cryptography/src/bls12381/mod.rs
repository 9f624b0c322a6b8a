//! Verifiable Secret Sharing with dealer qualification over the BLS12-381 curve.
//!
//! Public keys (and commitments) live in G2 and private keys (and shares) in the scalar field.
//!
//! # Features
//!
//! This crate has the following features:
//!
//! - `portable`: Enables `portable` feature on `blst` (<https://github.com/supranational/blst?tab=readme-ov-file#platform-and-language-compatibility>).
//!
//! # Benchmarks
//!
//! ```bash
//! cargo bench
//! ```

pub mod dkg;
pub mod primitives;

#[cfg(test)]
mod tests {
    use super::*;
    use dkg::{wire, Action, Config, Instance};
    use primitives::group::{Element, Scalar, G2};
    use rand::{rngs::StdRng, SeedableRng};

    /// Interpolates the polynomial through `(index + 1, value)` at zero.
    fn recover(shares: &[(u32, Scalar)]) -> Scalar {
        let mut result = Scalar::zero();
        for (i, (xi, yi)) in shares.iter().enumerate() {
            let mut xi_scalar = Scalar::zero();
            xi_scalar.set_int(xi + 1);
            let mut num = Scalar::one();
            let mut den = Scalar::one();
            for (j, (xj, _)) in shares.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mut xj_scalar = Scalar::zero();
                xj_scalar.set_int(xj + 1);
                num.mul(&xj_scalar);
                let mut diff = xj_scalar;
                diff.sub(&xi_scalar);
                den.mul(&diff);
            }
            let mut term = *yi;
            term.mul(&num);
            term.mul(&den.inverse().unwrap());
            result.add(&term);
        }
        result
    }

    #[test]
    fn test_shares_recover_group_key() {
        let (n, t) = (5, 2);
        let mut rng = StdRng::seed_from_u64(0);
        let mut dealer = Instance::new(Config {
            size: n,
            threshold: t,
            me: 0,
            dealer: 0,
        })
        .unwrap();
        let actions = dealer.start(&mut rng).unwrap();

        // Collect the shares the dealer sent out
        let shares = actions
            .into_iter()
            .filter_map(|action| match action {
                Action::Send { to, msg } => Some((to, wire::decode_share(&msg).unwrap())),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(shares.len(), (n - 1) as usize);
        dealer.next_timeout().unwrap();
        dealer.next_timeout().unwrap();
        let output = dealer.end().1.unwrap();

        // Any `t + 1` shares recover the secret behind the group key
        for window in shares.windows((t + 1) as usize) {
            let mut public = G2::one();
            public.mul(&recover(window));
            assert_eq!(public, output.public);
        }

        // `t` shares do not
        let mut public = G2::one();
        public.mul(&recover(&shares[..t as usize]));
        assert_ne!(public, output.public);
    }
}
