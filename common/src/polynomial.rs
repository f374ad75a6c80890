use curve25519_dalek::Scalar;

use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use zeroize::Zeroize;

use crate::{random::random_scalars, utils::scalar_to_decimal};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    pub coefficients: Vec<Scalar>,
}

impl Polynomial {
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coef_ref(&self) -> &Vec<Scalar> {
        &self.coefficients
    }

    pub fn coef_at(&self, index: usize) -> Option<Scalar> {
        self.coefficients.get(index).copied()
    }

    pub fn coef_at_unchecked(&self, index: usize) -> &Scalar {
        &self.coefficients[index]
    }

    pub fn from_coefficients(coefs: Vec<Scalar>) -> Self {
        Self {
            coefficients: coefs,
        }
    }

    pub fn sample<R>(degree: usize, rng: &mut R) -> Self
    where
        R: CryptoRng + RngCore,
    {
        Polynomial::from_coefficients(random_scalars(rng, degree + 1))
    }

    pub fn evaluate(&self, x: &Scalar) -> Scalar {
        let mut x_powers: Vec<Scalar> = Vec::with_capacity(self.coefficients.len());
        x_powers.push(Scalar::ONE);

        for i in 1..self.coefficients.len() {
            x_powers.push(x * x_powers[i - 1]);
        }

        self.coefficients
            .par_iter()
            .zip(x_powers)
            .map(|(coef, x_pow)| coef * x_pow)
            .sum()
    }
}

impl Zeroize for Polynomial {
    fn zeroize(&mut self) {
        self.coefficients.zeroize();
    }
}

impl std::fmt::Display for Polynomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.coefficients
                .par_iter()
                .map(scalar_to_decimal)
                .collect::<Vec<String>>()
                .join(",")
        )
    }
}
