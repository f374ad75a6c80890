use common::{
    error::ErrorKind::InvalidDegree, polynomial::Polynomial, secret_sharing::Share,
};
use curve25519_dalek::Scalar;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zeroize::Zeroize;

use crate::error::{ErrorKind::InvalidParameterSet, Result};

pub const SEED_LEN: usize = 32;

/// Level a commitment with threshold `k` is recovered from.
pub fn reveal_level(k: usize, floor: usize) -> usize {
    k.max(floor) - 1
}

/// The secret polynomials of one objective.
///
/// Level `L` (from `floor - 1` up to `eligible - 1`) is an independent
/// polynomial of degree `L` drawn from ChaCha20 stream `L` of the seed. A
/// committer with threshold `k` is sealed under the top coefficient of level
/// `reveal_level(k, floor)`, so opening it takes `L + 1` shares of that level.
pub struct SecretSpace {
    seed: [u8; SEED_LEN],
    eligible: usize,
    floor: usize,
}

impl SecretSpace {
    pub fn generate(seed: &[u8; SEED_LEN], eligible: usize, minimum: usize) -> Result<Self> {
        if eligible == 0 || minimum == 0 || minimum > eligible {
            return Err(InvalidParameterSet(eligible, minimum).into());
        }

        Ok(Self {
            seed: *seed,
            eligible,
            floor: minimum,
        })
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible
    }

    pub fn floor(&self) -> usize {
        self.floor
    }

    /// Lowest level that carries real shares.
    pub fn lowest_level(&self) -> usize {
        self.floor - 1
    }

    pub fn check_threshold(&self, k: usize) -> Result<()> {
        if k < 1 || k > self.eligible {
            return Err(common::error::Error::from_kind(InvalidDegree(k, self.eligible)).into());
        }
        Ok(())
    }

    fn level(&self, level: usize) -> Result<Polynomial> {
        if level < self.lowest_level() || level >= self.eligible {
            return Err(
                common::error::Error::from_kind(InvalidDegree(level + 1, self.eligible)).into(),
            );
        }

        let mut rng = ChaCha20Rng::from_seed(self.seed);
        rng.set_stream(level as u64);
        Ok(Polynomial::sample(level, &mut rng))
    }

    /// Level polynomial whose top coefficient seals a threshold `k` committer.
    pub fn polynomial_for(&self, k: usize) -> Result<Polynomial> {
        self.check_threshold(k)?;
        self.level(reveal_level(k, self.floor))
    }

    pub fn key_for(&self, k: usize) -> Result<Scalar> {
        let mut polynomial = self.polynomial_for(k)?;
        let key = *polynomial.coef_at_unchecked(polynomial.degree());
        polynomial.zeroize();
        Ok(key)
    }

    pub fn evaluate(polynomial: &Polynomial, x: &Scalar) -> Scalar {
        polynomial.evaluate(x)
    }

    pub fn share_at(&self, level: usize, x: Scalar) -> Result<Share> {
        let mut polynomial = self.level(level)?;
        let share = Share::new(x, polynomial.evaluate(&x));
        polynomial.zeroize();
        Ok(share)
    }
}

impl Drop for SecretSpace {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}
