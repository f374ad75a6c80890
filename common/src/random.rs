use curve25519_dalek::Scalar;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

pub fn random_scalar<R>(rng: &mut R) -> Scalar
where
    R: CryptoRng + RngCore,
{
    let mut bytes = [0u8; 64];
    rng.fill_bytes(&mut bytes);
    let scalar = Scalar::from_bytes_mod_order_wide(&bytes);
    bytes.zeroize();
    scalar
}

pub fn random_scalars<R>(rng: &mut R, n: usize) -> Vec<Scalar>
where
    R: CryptoRng + RngCore,
{
    (0..n).map(|_| random_scalar(rng)).collect()
}

// x = 0 would hand out the constant term directly
pub fn random_nonzero_scalar<R>(rng: &mut R) -> Scalar
where
    R: CryptoRng + RngCore,
{
    loop {
        let scalar = random_scalar(rng);
        if scalar != Scalar::ZERO {
            return scalar;
        }
    }
}

#[cfg(test)]
mod test {
    use curve25519_dalek::Scalar;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::{random_nonzero_scalar, random_scalars};

    #[test]
    fn scalars_are_distinct() {
        let mut rng = rand::rng();
        let scalars = random_scalars(&mut rng, 64);
        for (i, a) in scalars.iter().enumerate() {
            for b in &scalars[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let a = random_scalars(&mut StdRng::from_seed([7u8; 32]), 8);
        let b = random_scalars(&mut StdRng::from_seed([7u8; 32]), 8);
        assert_eq!(a, b);
    }

    #[test]
    fn nonzero() {
        let mut rng = rand::rng();
        for _ in 0..32 {
            assert_ne!(random_nonzero_scalar(&mut rng), Scalar::ZERO);
        }
    }
}
