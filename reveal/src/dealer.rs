use std::collections::HashSet;

use common::{
    random::{random_nonzero_scalar, random_scalar},
    secret_sharing::Share,
};
use curve25519_dalek::Scalar;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    cipher,
    error::{ErrorKind::InvalidChoice, Result},
    secret_space::SecretSpace,
};

pub const DECLINE: i64 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Threshold(usize),
    Decline,
}

impl Choice {
    /// `-1` declines, any positive number is a threshold.
    pub fn from_number(number: i64) -> Result<Self> {
        match number {
            DECLINE => Ok(Choice::Decline),
            k if k >= 1 => usize::try_from(k)
                .map(Choice::Threshold)
                .map_err(|_| InvalidChoice(number).into()),
            _ => Err(InvalidChoice(number).into()),
        }
    }

    pub fn threshold(&self) -> Option<usize> {
        match self {
            Choice::Threshold(k) => Some(*k),
            Choice::Decline => None,
        }
    }
}

/// What a committer leaves behind: one point per level and their sealed name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCommitment {
    #[serde(with = "hex")]
    pub ciphertext: Vec<u8>,
    pub points: Vec<Share>,
    pub threshold: Option<usize>,
}

impl SealedCommitment {
    pub fn is_decline(&self) -> bool {
        self.threshold.is_none()
    }
}

/// Hands out share vectors for one secret space, never reusing an x coordinate.
pub struct Dealer {
    space: SecretSpace,
    used_xs: HashSet<[u8; 32]>,
}

impl Dealer {
    pub fn new(space: SecretSpace) -> Self {
        Self {
            space,
            used_xs: HashSet::new(),
        }
    }

    pub fn with_used<'a, I>(space: SecretSpace, issued: I) -> Self
    where
        I: IntoIterator<Item = &'a SealedCommitment>,
    {
        let used_xs = issued
            .into_iter()
            .flat_map(|commitment| commitment.points.iter())
            .filter(|share| !share.is_placeholder())
            .map(|share| share.x.to_bytes())
            .collect();

        Self { space, used_xs }
    }

    pub fn space(&self) -> &SecretSpace {
        &self.space
    }

    fn fresh_x<R>(&mut self, rng: &mut R) -> Scalar
    where
        R: CryptoRng + RngCore,
    {
        loop {
            let x = random_nonzero_scalar(rng);
            if self.used_xs.insert(x.to_bytes()) {
                return x;
            }
        }
    }

    pub fn deal<R>(&mut self, rng: &mut R, name: &str, choice: Choice) -> Result<SealedCommitment>
    where
        R: CryptoRng + RngCore,
    {
        let eligible = self.space.eligible_count();
        let lowest = self.space.lowest_level();

        let key = match choice {
            Choice::Threshold(k) => Some(self.space.key_for(k)?),
            Choice::Decline => None,
        };

        // levels below the floor are never interpolated
        let points = (0..eligible)
            .map(|level| {
                if level < lowest {
                    return Ok(Share::PLACEHOLDER);
                }
                let x = self.fresh_x(rng);
                match key {
                    Some(_) => self.space.share_at(level, x),
                    None => Ok(Share::new(x, random_scalar(rng))),
                }
            })
            .collect::<Result<Vec<Share>>>()?;

        let ciphertext = match key {
            Some(key) => cipher::seal(rng, &key, name),
            None => cipher::decoy(rng, name.len()),
        };

        Ok(SealedCommitment {
            ciphertext,
            points,
            threshold: choice.threshold(),
        })
    }
}
