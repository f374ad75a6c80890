use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use common::secret_sharing::Share;
use rand::RngCore;
use reveal::{
    dealer::{Choice, Dealer, SealedCommitment},
    engine::RevealEngine,
    secret_space::SecretSpace,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::{
        ErrorKind::{AlreadyCommitted, DeadlinePassed, NotFound, NotInvited, ObjectiveClosed},
        Result,
    },
    identity::{NameHasher, normalize},
    lifecycle,
    objective::{
        CommitmentRecord, ObjectiveDraft, ObjectiveRecord, ObjectiveState, RevealRecord, SortBy,
    },
};

const OBJECTIVES_TREE: &str = "objectives";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub ciphertext: String,
    pub revealed: usize,
    pub closed: bool,
}

/// One JSON record per objective in a sled tree. Writers for the same
/// objective are serialized, readers never wait.
pub struct CommitmentStore {
    db: sled::Db,
    objectives: sled::Tree,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CommitmentStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let objectives = db.open_tree(OBJECTIVES_TREE)?;
        Ok(Self {
            db,
            objectives,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn lock_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.to_owned()).or_default().clone()
    }

    // closed and unknown objectives take no further writes
    fn release(&self, id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(id);
    }

    fn load(&self, id: &str) -> Result<ObjectiveRecord> {
        match self.objectives.get(id.as_bytes())? {
            Some(bytes) => ObjectiveRecord::from_slice(&bytes),
            None => Err(NotFound(id.to_owned()).into()),
        }
    }

    fn save(&self, record: &ObjectiveRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.objectives.insert(record.id.as_bytes(), bytes)?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<ObjectiveRecord>> {
        self.objectives
            .iter()
            .values()
            .map(|bytes| ObjectiveRecord::from_slice(&bytes?))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn create(&self, draft: ObjectiveDraft, now: DateTime<Utc>) -> Result<String> {
        let mut rng = rand::rng();
        let mut id_bytes = [0u8; 12];
        let mut seed = [0u8; 32];

        let id = loop {
            rng.fill_bytes(&mut id_bytes);
            let id = hex::encode(id_bytes);
            if !self.objectives.contains_key(id.as_bytes())? {
                break id;
            }
        };
        rng.fill_bytes(&mut seed);

        // parameters are checked before anything is written
        SecretSpace::generate(&seed, draft.invited_names.len(), draft.minimum_number)?;

        let record = ObjectiveRecord::new(id.clone(), draft, seed, now);
        self.save(&record)?;

        info!(
            objective = %id,
            eligible = record.eligible_count,
            minimum = record.minimum_number,
            strategy = %record.resolution_strategy,
            "objective created"
        );
        Ok(id)
    }

    /// Stores one commitment and runs the reveal engine over the objective,
    /// atomically with respect to other writers of the same objective.
    pub fn add(
        &self,
        id: &str,
        name: &str,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        let name = normalize(name);
        let lock = self.lock_for(id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let outcome = self.add_locked(id, name, choice, now);
        let finished = match &outcome {
            Ok(stored) => stored.closed,
            Err(e) => matches!(e.kind(), NotFound(_) | ObjectiveClosed | DeadlinePassed),
        };
        if finished {
            self.release(id);
        }
        outcome
    }

    fn add_locked(
        &self,
        id: &str,
        name: &str,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        let mut record = self.load(id)?;
        if lifecycle::expire(&mut record, now) {
            self.save(&record)?;
        }
        lifecycle::admit(&record, now)?;

        let digest = NameHasher::for_objective(&record.seed).digest(name);
        if !record.invited.contains(&digest) {
            debug!(objective = %id, "name not on the invite list");
            return Err(NotInvited.into());
        }
        if record.committed.contains(&digest) {
            return Err(AlreadyCommitted.into());
        }

        let space =
            SecretSpace::generate(&record.seed, record.eligible_count, record.minimum_number)?;
        let mut dealer = Dealer::with_used(space, record.commitments.iter().map(|c| &c.sealed));
        let sealed = dealer.deal(&mut rand::rng(), name, choice)?;
        let ciphertext = hex::encode(&sealed.ciphertext);

        record.commitments.push(CommitmentRecord::new(sealed, now));
        record.committed.insert(digest);
        record.modified_at = now;

        let revealed = Self::reveal(&mut record, now)?;
        let closed = lifecycle::after_wave(&mut record, revealed, now);
        self.save(&record)?;

        info!(
            objective = %id,
            commitments = record.commitments.len(),
            decline = choice == Choice::Decline,
            revealed,
            closed,
            "commitment stored"
        );

        Ok(CommitOutcome {
            ciphertext,
            revealed,
            closed,
        })
    }

    // a failed wave halts reveals for the objective but keeps the commitment
    fn reveal(record: &mut ObjectiveRecord, now: DateTime<Utc>) -> Result<usize> {
        if let Some(reason) = &record.reveal_halted {
            warn!(objective = %record.id, reason = %reason, "reveals halted, skipping engine");
            return Ok(0);
        }

        let engine = RevealEngine::new(record.eligible_count, record.minimum_number)?;
        let sealed: Vec<SealedCommitment> =
            record.commitments.iter().map(|c| c.sealed.clone()).collect();
        let revealed: Vec<bool> = record
            .commitments
            .iter()
            .map(|c| c.revelation.is_some())
            .collect();

        match engine.sweep(&sealed, &revealed) {
            Ok(wave) => {
                let count = wave.revelations.len();
                for revelation in wave.revelations {
                    debug!(
                        objective = %record.id,
                        index = revelation.index,
                        threshold = revelation.threshold,
                        level = revelation.level,
                        "commitment revealed"
                    );
                    let index = revelation.index;
                    record.commitments[index].revelation =
                        Some(RevealRecord::from_revelation(revelation, now));
                }
                if count > 0 {
                    record.published_at = Some(now);
                }
                Ok(count)
            }
            Err(e) => {
                error!(objective = %record.id, error = %e, "reveal engine failed, halting reveals");
                record.reveal_halted = Some(e.to_string());
                Ok(0)
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<ObjectiveRecord> {
        self.load(id)
    }

    pub fn list_points(&self, id: &str) -> Result<Vec<Share>> {
        Ok(self.load(id)?.points())
    }

    pub fn list(&self, sort_by: SortBy, limit: Option<usize>) -> Result<Vec<ObjectiveRecord>> {
        let mut records = self.records()?;
        match sort_by {
            SortBy::Newest => records.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortBy::Oldest => records.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortBy::Deadline => records.sort_by(|a, b| a.resolution_date.cmp(&b.resolution_date)),
            SortBy::Commitments => {
                records.sort_by(|a, b| b.commitments.len().cmp(&a.commitments.len()))
            }
            SortBy::Title => records.sort_by(|a, b| a.title.cmp(&b.title)),
        }
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    pub fn recently_published(&self, limit: usize) -> Result<Vec<ObjectiveRecord>> {
        let mut records: Vec<ObjectiveRecord> = self
            .records()?
            .into_iter()
            .filter(|record| record.published_at.is_some())
            .collect();
        records.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        records.truncate(limit);
        Ok(records)
    }

    /// Closes every open objective whose resolution date has passed.
    pub fn close_expired(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let candidates: Vec<String> = self
            .records()?
            .into_iter()
            .filter(|record| {
                record.state == ObjectiveState::Open
                    && lifecycle::deadline_passed(record.resolution_date, now)
            })
            .map(|record| record.id)
            .collect();

        let mut closed = Vec::with_capacity(candidates.len());
        for id in candidates {
            let lock = self.lock_for(&id);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

            let mut record = self.load(&id)?;
            if lifecycle::expire(&mut record, now) {
                self.save(&record)?;
                self.release(&id);
                closed.push(id);
            }
        }
        Ok(closed)
    }
}
