use curve25519_dalek::Scalar;
use num_bigint::BigUint;
use rayon::prelude::*;

use crate::error::{Error, ErrorKind::NonCanonicalScalar};

pub fn scalar_to_decimal(scalar: &Scalar) -> String {
    BigUint::from_bytes_le(scalar.as_bytes()).to_str_radix(10)
}

/// Parses a canonical (fully reduced) field element written in base 10.
pub fn scalar_from_decimal(decimal: &str) -> Result<Scalar, Error> {
    let value = BigUint::parse_bytes(decimal.trim().as_bytes(), 10)
        .ok_or_else(|| Error::from_kind(NonCanonicalScalar(decimal.to_owned())))?;

    let le = value.to_bytes_le();
    if le.len() > 32 {
        return Err(NonCanonicalScalar(decimal.to_owned()).into());
    }

    let mut bytes = [0u8; 32];
    bytes[..le.len()].copy_from_slice(&le);

    Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes))
        .ok_or_else(|| NonCanonicalScalar(decimal.to_owned()).into())
}

pub fn batch_scalars_to_decimal(scalars: &[Scalar]) -> Vec<String> {
    scalars.par_iter().map(scalar_to_decimal).collect()
}

// expands prod_i (X - x_i) into coefficients, lowest degree first
pub fn vanishing_polynomial(xs: &[Scalar]) -> Vec<Scalar> {
    let mut coefs = Vec::with_capacity(xs.len() + 1);
    coefs.push(Scalar::ONE);

    for x in xs {
        coefs.push(Scalar::ZERO);
        for deg in (1..coefs.len()).rev() {
            coefs[deg] = coefs[deg - 1] - x * coefs[deg];
        }
        coefs[0] = -(x * coefs[0]);
    }

    coefs
}

// M(X) / (X - root), exact when root is a zero of M
pub fn divide_by_linear(coefs: &[Scalar], root: &Scalar) -> Vec<Scalar> {
    let k = coefs.len() - 1;
    let mut quotient = vec![Scalar::ZERO; k];

    quotient[k - 1] = coefs[k];
    for t in (1..k).rev() {
        quotient[t - 1] = coefs[t] + root * quotient[t];
    }

    quotient
}

#[cfg(test)]
mod test {
    use curve25519_dalek::Scalar;

    use super::{divide_by_linear, scalar_from_decimal, scalar_to_decimal, vanishing_polynomial};
    use crate::{error::ErrorKind, polynomial::Polynomial, random::random_scalar};

    // l - 1
    const ORDER_MINUS_ONE: &str =
        "7237005577332262213973186563042994240857116359379907606001950938285454250988";

    #[test]
    fn decimal_round_trip() {
        let mut rng = rand::rng();
        let s = random_scalar(&mut rng);
        assert_eq!(scalar_from_decimal(&scalar_to_decimal(&s)).unwrap(), s);

        assert_eq!(scalar_to_decimal(&Scalar::from(42u8)), "42");
        assert_eq!(scalar_to_decimal(&Scalar::ZERO), "0");
        assert_eq!(scalar_from_decimal(ORDER_MINUS_ONE).unwrap(), -Scalar::ONE);
    }

    #[test]
    fn rejects_non_canonical() {
        // l itself
        let order = "7237005577332262213973186563042994240857116359379907606001950938285454250989";
        for bad in [order, "-3", "12a", ""] {
            match scalar_from_decimal(bad).unwrap_err().kind() {
                ErrorKind::NonCanonicalScalar(_) => {}
                other => panic!("unexpected error {other}"),
            }
        }
    }

    #[test]
    fn vanishing_has_roots() {
        let xs: Vec<Scalar> = [3u8, 5, 11].iter().map(|x| Scalar::from(*x)).collect();
        let m = Polynomial::from_coefficients(vanishing_polynomial(&xs));
        assert_eq!(m.degree(), 3);
        for x in &xs {
            assert_eq!(m.evaluate(x), Scalar::ZERO);
        }

        // (X - 3)(X - 5)(X - 11) / (X - 5) = X^2 - 14X + 33
        let q = divide_by_linear(m.coef_ref(), &xs[1]);
        assert_eq!(
            q,
            vec![Scalar::from(33u8), -Scalar::from(14u8), Scalar::ONE]
        );
    }
}
