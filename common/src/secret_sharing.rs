use std::collections::HashSet;

use curve25519_dalek::Scalar;
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    error::{
        Error,
        ErrorKind::{DuplicateAbscissa, InsufficientShares},
    },
    polynomial::Polynomial,
    utils::{divide_by_linear, scalar_from_decimal, scalar_to_decimal, vanishing_polynomial},
};

/// A point (x, f(x)) handed to a committer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Share {
    pub x: Scalar,
    pub y: Scalar,
}

impl Share {
    pub const PLACEHOLDER: Share = Share {
        x: Scalar::ZERO,
        y: Scalar::ZERO,
    };

    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self { x, y }
    }

    pub fn is_placeholder(&self) -> bool {
        self.x == Scalar::ZERO && self.y == Scalar::ZERO
    }
}

// wire form is ["<x>", "<y>"] in base 10
impl Serialize for Share {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [scalar_to_decimal(&self.x), scalar_to_decimal(&self.y)].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Share {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [x, y] = <[String; 2]>::deserialize(deserializer)?;
        Ok(Share {
            x: scalar_from_decimal(&x).map_err(de::Error::custom)?,
            y: scalar_from_decimal(&y).map_err(de::Error::custom)?,
        })
    }
}

pub fn select_qualified_set(shares: &[Share], needed: usize) -> Result<&[Share], Error> {
    if shares.len() >= needed {
        Ok(&shares[..needed])
    } else {
        Err(InsufficientShares(shares.len(), needed).into())
    }
}

/// Recovers every coefficient of the unique polynomial of degree
/// `shares.len() - 1` passing through `shares`.
///
/// f(X) = sum_j y_j * M(X) / ((X - x_j) * prod_{i != j} (x_j - x_i)), with
/// M(X) = prod_i (X - x_i).
pub fn interpolate(shares: &[Share]) -> Result<Polynomial, Error> {
    if shares.is_empty() {
        return Err(InsufficientShares(0, 1).into());
    }

    let mut seen = HashSet::with_capacity(shares.len());
    for (index, share) in shares.iter().enumerate() {
        if !seen.insert(share.x.to_bytes()) {
            return Err(DuplicateAbscissa(index).into());
        }
    }

    let xs: Vec<Scalar> = shares.iter().map(|share| share.x).collect();
    let vanishing = vanishing_polynomial(&xs);
    let k = shares.len();

    let coefficients = shares
        .par_iter()
        .enumerate()
        .map(|(j, share)| {
            let denominator: Scalar = xs
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != j)
                .map(|(_, x_i)| share.x - x_i)
                .product();

            let scale = share.y * denominator.invert();

            divide_by_linear(&vanishing, &share.x)
                .into_iter()
                .map(|coef| coef * scale)
                .collect::<Vec<Scalar>>()
        })
        .reduce(
            || vec![Scalar::ZERO; k],
            |mut acc, term| {
                acc.iter_mut().zip(term).for_each(|(a, t)| *a += t);
                acc
            },
        );

    Ok(Polynomial::from_coefficients(coefficients))
}

/// Index of the first share that does not lie on `polynomial`.
pub fn find_inconsistent_share(polynomial: &Polynomial, shares: &[Share]) -> Option<usize> {
    shares
        .par_iter()
        .position_first(|share| polynomial.evaluate(&share.x) != share.y)
}
