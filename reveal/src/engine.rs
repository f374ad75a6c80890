use std::collections::{BTreeMap, HashMap};

use common::{
    polynomial::Polynomial,
    secret_sharing::{Share, find_inconsistent_share, interpolate, select_qualified_set},
};
use curve25519_dalek::Scalar;

use crate::{
    cipher,
    dealer::SealedCommitment,
    error::{
        Error,
        ErrorKind::{InterpolationMismatch, InvalidParameterSet, MalformedCommitment},
        Result,
    },
    secret_space::reveal_level,
};

/// A commitment whose sealed name was opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revelation {
    pub index: usize,
    pub name: String,
    pub threshold: usize,
    pub level: usize,
    pub coefficients: Vec<Scalar>,
}

/// Outcome of one pass over an objective's commitments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevealWave {
    /// Non-decline commitments at the time of the pass.
    pub active: usize,
    pub revelations: Vec<Revelation>,
}

impl RevealWave {
    pub fn is_empty(&self) -> bool {
        self.revelations.is_empty()
    }
}

pub struct RevealEngine {
    eligible: usize,
    floor: usize,
}

impl RevealEngine {
    pub fn new(eligible: usize, minimum: usize) -> Result<Self> {
        if eligible == 0 || minimum == 0 || minimum > eligible {
            return Err(InvalidParameterSet(eligible, minimum).into());
        }
        Ok(Self {
            eligible,
            floor: minimum,
        })
    }

    fn validate(&self, index: usize, commitment: &SealedCommitment) -> Result<()> {
        if commitment.points.len() != self.eligible {
            return Err(MalformedCommitment(
                index,
                format!(
                    "{} points for {} levels",
                    commitment.points.len(),
                    self.eligible
                ),
            )
            .into());
        }
        if let Some(k) = commitment.threshold {
            if k < 1 || k > self.eligible {
                return Err(MalformedCommitment(index, format!("threshold {k}")).into());
            }
        }
        Ok(())
    }

    fn level_shares(
        &self,
        commitments: &[SealedCommitment],
        active: &[usize],
        level: usize,
    ) -> Result<Vec<Share>> {
        active
            .iter()
            .map(|&index| {
                let share = commitments[index].points[level];
                if share.is_placeholder() {
                    Err(MalformedCommitment(index, format!("placeholder at level {level}")).into())
                } else {
                    Ok(share)
                }
            })
            .collect()
    }

    fn active(commitments: &[SealedCommitment]) -> Vec<usize> {
        commitments
            .iter()
            .enumerate()
            .filter(|(_, commitment)| !commitment.is_decline())
            .map(|(index, _)| index)
            .collect()
    }

    /// Recovers the level polynomial from the first `level + 1` non-decline
    /// shares and checks every other share of that level against it.
    pub fn recover(&self, commitments: &[SealedCommitment], level: usize) -> Result<Polynomial> {
        let active = Self::active(commitments);
        self.recover_from(commitments, &active, level)
    }

    fn recover_from(
        &self,
        commitments: &[SealedCommitment],
        active: &[usize],
        level: usize,
    ) -> Result<Polynomial> {
        for &index in active {
            self.validate(index, &commitments[index])?;
        }
        let shares = self.level_shares(commitments, active, level)?;
        let qualified_set = select_qualified_set(&shares, level + 1)?;

        let polynomial = interpolate(qualified_set).map_err(|e| {
            Error::from_kind(InterpolationMismatch(level, active[0], e.to_string()))
        })?;

        if let Some(position) = find_inconsistent_share(&polynomial, &shares) {
            return Err(InterpolationMismatch(
                level,
                active[position],
                "share does not lie on the recovered polynomial".to_owned(),
            )
            .into());
        }

        Ok(polynomial)
    }

    /// Opens every commitment that became revealable.
    ///
    /// `revealed[i]` marks commitments opened by earlier passes; they are
    /// skipped. Nothing is returned unless the whole pass succeeds.
    pub fn sweep(&self, commitments: &[SealedCommitment], revealed: &[bool]) -> Result<RevealWave> {
        let active = Self::active(commitments);
        let n = active.len();

        if n < self.floor {
            return Ok(RevealWave {
                active: n,
                revelations: Vec::new(),
            });
        }

        let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &index in &active {
            let commitment = &commitments[index];
            self.validate(index, commitment)?;

            let already = revealed.get(index).copied().unwrap_or(false);
            if let Some(k) = commitment.threshold.filter(|k| *k <= n && !already) {
                classes.entry(k).or_default().push(index);
            }
        }

        let mut recovered: HashMap<usize, Polynomial> = HashMap::new();
        let mut revelations = Vec::new();

        for (k, members) in classes {
            let level = reveal_level(k, self.floor);
            if !recovered.contains_key(&level) {
                let polynomial = self.recover_from(commitments, &active, level)?;
                recovered.insert(level, polynomial);
            }
            let polynomial = &recovered[&level];
            let key = *polynomial.coef_at_unchecked(level);

            for index in members {
                let name = cipher::open(&key, &commitments[index].ciphertext).ok_or_else(|| {
                    Error::from_kind(InterpolationMismatch(
                        level,
                        index,
                        "ciphertext does not open under the recovered key".to_owned(),
                    ))
                })?;

                revelations.push(Revelation {
                    index,
                    name,
                    threshold: k,
                    level,
                    coefficients: polynomial.coefficients.clone(),
                });
            }
        }

        Ok(RevealWave {
            active: n,
            revelations,
        })
    }
}
