use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt,
    str::FromStr,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use common::{secret_sharing::Share, utils::batch_scalars_to_decimal};
use reveal::{dealer::SealedCommitment, engine::Revelation};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{
    config::Limits,
    error::{ErrorKind::Validation, Result},
    identity::{NameHasher, normalize},
    lifecycle::deadline_passed,
};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Close as soon as a reveal wave opens anything.
    #[default]
    Asap,
    /// Stay open until the resolution date.
    Deadline,
}

impl FromStr for ResolutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASAP" => Ok(ResolutionStrategy::Asap),
            "DEADLINE" => Ok(ResolutionStrategy::Deadline),
            _ => Err(format!("Unknown resolution strategy '{s}'. Expected ASAP or DEADLINE.")),
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::Asap => write!(f, "ASAP"),
            ResolutionStrategy::Deadline => write!(f, "DEADLINE"),
        }
    }
}

impl Serialize for ResolutionStrategy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResolutionStrategy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveState {
    Open,
    Closed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    Deadline,
    Commitments,
    Title,
}

/// `POST /objective` body. Older clients send `minimum_percentage` instead
/// of `minimum_number`.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateObjective {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub invited_names: Vec<String>,
    pub resolution_date: String,
    #[serde(default)]
    pub resolution_strategy: Option<String>,
    #[serde(default)]
    pub minimum_number: Option<i64>,
    #[serde(default)]
    pub minimum_percentage: Option<f64>,
}

/// A validated objective, ready to be stored.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectiveDraft {
    pub title: String,
    pub description: String,
    pub invited_names: Vec<String>,
    pub resolution_date: DateTime<Utc>,
    pub resolution_strategy: ResolutionStrategy,
    pub minimum_number: usize,
}

fn invalid(message: impl Into<String>) -> crate::error::Error {
    Validation(message.into()).into()
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS[.f]]` taken as UTC, or a
/// bare date meaning the last second of that day.
pub fn parse_resolution_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
}

/// Legacy percentage (0..=100) to a head count, never below one.
pub fn minimum_from_percentage(percentage: f64, eligible: usize) -> usize {
    let needed = (percentage / 100.0 * eligible as f64).ceil() as usize;
    needed.clamp(1, eligible)
}

impl CreateObjective {
    pub fn into_draft(self, limits: &Limits, now: DateTime<Utc>) -> Result<ObjectiveDraft> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(invalid("Title must not be empty."));
        }
        if title.chars().count() > limits.max_title_length {
            return Err(invalid(format!(
                "Title is longer than {} characters.",
                limits.max_title_length
            )));
        }
        if self.description.chars().count() > limits.max_description_length {
            return Err(invalid(format!(
                "Description is longer than {} characters.",
                limits.max_description_length
            )));
        }

        let mut seen = HashSet::new();
        let mut invited_names = Vec::with_capacity(self.invited_names.len());
        for name in &self.invited_names {
            let name = normalize(name);
            if name.is_empty() || name.chars().count() > limits.max_name_length {
                return Err(invalid(format!(
                    "Invited names must be between 1 and {} characters.",
                    limits.max_name_length
                )));
            }
            if seen.insert(name) {
                invited_names.push(name.to_owned());
            }
        }
        if invited_names.is_empty() {
            return Err(invalid("Must provide at least one name"));
        }
        let eligible = invited_names.len();

        let resolution_date = parse_resolution_date(&self.resolution_date).ok_or_else(|| {
            invalid(format!(
                "Unable to parse resolution date '{}'. Use ISO 8601.",
                self.resolution_date
            ))
        })?;
        if deadline_passed(resolution_date, now) {
            return Err(invalid("The resolution date must be in the future."));
        }

        let resolution_strategy = match self.resolution_strategy.as_deref() {
            Some(raw) => raw.parse().map_err(invalid)?,
            None => ResolutionStrategy::default(),
        };

        let minimum_number = match (self.minimum_number, self.minimum_percentage) {
            (Some(number), _) => usize::try_from(number)
                .ok()
                .filter(|m| (1..=eligible).contains(m))
                .ok_or_else(|| {
                    invalid(format!(
                        "minimum_number must be between 1 and {eligible}, got {number}."
                    ))
                })?,
            (None, Some(percentage)) => {
                if !(0.0..=100.0).contains(&percentage) {
                    return Err(invalid(format!(
                        "minimum_percentage must be between 0 and 100, got {percentage}."
                    )));
                }
                minimum_from_percentage(percentage, eligible)
            }
            (None, None) => 1,
        };

        Ok(ObjectiveDraft {
            title,
            description: self.description,
            invited_names,
            resolution_date,
            resolution_strategy,
            minimum_number,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealRecord {
    pub name: String,
    pub level: usize,
    pub coefficients: Vec<String>,
    pub revealed_at: DateTime<Utc>,
}

impl RevealRecord {
    pub fn from_revelation(revelation: Revelation, now: DateTime<Utc>) -> Self {
        Self {
            name: revelation.name,
            level: revelation.level,
            coefficients: batch_scalars_to_decimal(&revelation.coefficients),
            revealed_at: now,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    #[serde(flatten)]
    pub sealed: SealedCommitment,
    pub committed_at: DateTime<Utc>,
    pub revelation: Option<RevealRecord>,
}

impl CommitmentRecord {
    pub fn new(sealed: SealedCommitment, now: DateTime<Utc>) -> Self {
        Self {
            sealed,
            committed_at: now,
            revelation: None,
        }
    }

    pub fn view(&self) -> CommitmentView {
        let revelation = self.revelation.as_ref();
        CommitmentView {
            ciphertext: hex::encode(&self.sealed.ciphertext),
            points: self.sealed.points.clone(),
            committed_at: self.committed_at,
            is_decline: self.sealed.is_decline(),
            threshold: self.sealed.threshold,
            decrypted: revelation.is_some(),
            decrypted_name: revelation.map(|r| r.name.clone()),
            coefficients: revelation.map(|r| r.coefficients.clone()),
            decryption_level: revelation.map(|r| r.level),
        }
    }
}

/// Everything persisted for one objective.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectiveRecord {
    pub version: u32,
    pub id: String,
    pub title: String,
    pub description: String,
    pub resolution_date: DateTime<Utc>,
    pub resolution_strategy: ResolutionStrategy,
    pub minimum_number: usize,
    pub eligible_count: usize,
    pub state: ObjectiveState,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(with = "hex")]
    pub seed: [u8; 32],
    pub invited: BTreeSet<String>,
    pub committed: BTreeSet<String>,
    pub commitments: Vec<CommitmentRecord>,
    #[serde(default)]
    pub reveal_halted: Option<String>,
}

impl ObjectiveRecord {
    pub fn new(id: String, draft: ObjectiveDraft, seed: [u8; 32], now: DateTime<Utc>) -> Self {
        let hasher = NameHasher::for_objective(&seed);
        let invited: BTreeSet<String> = draft
            .invited_names
            .iter()
            .map(|name| hasher.digest(name))
            .collect();

        Self {
            version: SCHEMA_VERSION,
            id,
            title: draft.title,
            description: draft.description,
            resolution_date: draft.resolution_date,
            resolution_strategy: draft.resolution_strategy,
            minimum_number: draft.minimum_number,
            eligible_count: invited.len(),
            state: ObjectiveState::Open,
            created_at: now,
            modified_at: now,
            published_at: None,
            seed,
            invited,
            committed: BTreeSet::new(),
            commitments: Vec::new(),
            reveal_halted: None,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let record: ObjectiveRecord = serde_json::from_slice(bytes)?;
        if record.version != SCHEMA_VERSION {
            return Err(format!(
                "objective {} has schema version {}, expected {}",
                record.id, record.version, SCHEMA_VERSION
            )
            .into());
        }
        Ok(record)
    }

    pub fn close(&mut self, now: DateTime<Utc>) {
        self.state = ObjectiveState::Closed;
        self.modified_at = now;
    }

    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.state == ObjectiveState::Closed || deadline_passed(self.resolution_date, now)
    }

    pub fn active_count(&self) -> usize {
        self.commitments
            .iter()
            .filter(|c| !c.sealed.is_decline())
            .count()
    }

    pub fn decline_count(&self) -> usize {
        self.commitments.len() - self.active_count()
    }

    pub fn revealed_names(&self) -> Vec<String> {
        self.commitments
            .iter()
            .filter_map(|c| c.revelation.as_ref().map(|r| r.name.clone()))
            .collect()
    }

    pub fn threshold_distribution(&self) -> BTreeMap<usize, usize> {
        let mut distribution = BTreeMap::new();
        for k in self.commitments.iter().filter_map(|c| c.sealed.threshold) {
            *distribution.entry(k).or_insert(0) += 1;
        }
        distribution
    }

    pub fn points(&self) -> Vec<Share> {
        self.commitments
            .iter()
            .flat_map(|c| c.sealed.points.iter().copied())
            .collect()
    }

    pub fn summary(&self, now: DateTime<Utc>) -> ObjectiveSummary {
        let committers = self.revealed_names();
        ObjectiveSummary {
            objective_id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            resolution_date: self.resolution_date,
            resolution_strategy: self.resolution_strategy,
            minimum_number: self.minimum_number,
            eligible_count: self.eligible_count,
            committed_people: self.commitments.len(),
            decline_count: self.decline_count(),
            revealed_count: committers.len(),
            committers,
            threshold_distribution: self.threshold_distribution(),
            closed: self.is_closed_at(now),
            published: self.published_at.is_some(),
            created_at: self.created_at,
            modified_at: self.modified_at,
            published_at: self.published_at,
        }
    }

    pub fn view(&self, now: DateTime<Utc>) -> ObjectiveView {
        ObjectiveView {
            summary: self.summary(now),
            commitments: self.commitments.iter().map(CommitmentRecord::view).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CommitmentView {
    pub ciphertext: String,
    pub points: Vec<Share>,
    pub committed_at: DateTime<Utc>,
    pub is_decline: bool,
    pub threshold: Option<usize>,
    pub decrypted: bool,
    pub decrypted_name: Option<String>,
    pub coefficients: Option<Vec<String>>,
    pub decryption_level: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObjectiveSummary {
    pub objective_id: String,
    pub title: String,
    pub description: String,
    pub resolution_date: DateTime<Utc>,
    pub resolution_strategy: ResolutionStrategy,
    pub minimum_number: usize,
    pub eligible_count: usize,
    pub committed_people: usize,
    pub decline_count: usize,
    pub revealed_count: usize,
    /// Revealed names in commit order.
    pub committers: Vec<String>,
    pub threshold_distribution: BTreeMap<usize, usize>,
    pub closed: bool,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObjectiveView {
    #[serde(flatten)]
    pub summary: ObjectiveSummary,
    pub commitments: Vec<CommitmentView>,
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};

    use super::{
        CreateObjective, ObjectiveRecord, ResolutionStrategy, minimum_from_percentage,
        parse_resolution_date,
    };
    use crate::{
        config::Limits,
        error::{Error, ErrorKind},
    };

    fn request(names: &[&str]) -> CreateObjective {
        CreateObjective {
            title: "Strike".to_owned(),
            description: "Walk out together".to_owned(),
            invited_names: names.iter().map(|n| n.to_string()).collect(),
            resolution_date: "2030-01-01T12:00:00Z".to_owned(),
            resolution_strategy: None,
            minimum_number: None,
            minimum_percentage: None,
        }
    }

    fn validation_message(err: Error) -> String {
        match err.kind() {
            ErrorKind::Validation(message) => message.clone(),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn dates() {
        let noon = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_resolution_date("2030-01-01T12:00:00Z"), Some(noon));
        assert_eq!(parse_resolution_date("2030-01-01T13:00:00+01:00"), Some(noon));
        assert_eq!(parse_resolution_date("2030-01-01T12:00:00.000"), Some(noon));
        assert_eq!(parse_resolution_date("2030-01-01T12:00"), Some(noon));
        assert_eq!(
            parse_resolution_date("2030-01-01"),
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 23, 59, 59).unwrap())
        );
        assert_eq!(parse_resolution_date("next tuesday"), None);
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("asap".parse(), Ok(ResolutionStrategy::Asap));
        assert_eq!(" Deadline ".parse(), Ok(ResolutionStrategy::Deadline));
        assert!("whenever".parse::<ResolutionStrategy>().is_err());
        assert_eq!(
            serde_json::to_string(&ResolutionStrategy::Deadline).unwrap(),
            r#""DEADLINE""#
        );
    }

    #[test]
    fn percentage_migration() {
        assert_eq!(minimum_from_percentage(0.0, 10), 1);
        assert_eq!(minimum_from_percentage(25.0, 10), 3);
        assert_eq!(minimum_from_percentage(50.0, 10), 5);
        assert_eq!(minimum_from_percentage(100.0, 7), 7);
    }

    #[test]
    fn draft_validation() {
        let limits = Limits::default();
        let now = Utc.with_ymd_and_hms(2029, 6, 1, 0, 0, 0).unwrap();

        let draft = request(&["Ada", " Bob ", "Ada"]).into_draft(&limits, now).unwrap();
        assert_eq!(draft.invited_names, vec!["Ada", "Bob"]);
        assert_eq!(draft.minimum_number, 1);
        assert_eq!(draft.resolution_strategy, ResolutionStrategy::Asap);

        let mut legacy = request(&["a", "b", "c", "d"]);
        legacy.minimum_percentage = Some(50.0);
        legacy.resolution_strategy = Some("deadline".to_owned());
        let draft = legacy.into_draft(&limits, now).unwrap();
        assert_eq!(draft.minimum_number, 2);
        assert_eq!(draft.resolution_strategy, ResolutionStrategy::Deadline);

        let mut too_many = request(&["a", "b"]);
        too_many.minimum_number = Some(3);
        assert!(validation_message(too_many.into_draft(&limits, now).unwrap_err())
            .contains("minimum_number"));

        let nobody = request(&[]).into_draft(&limits, now).unwrap_err();
        assert_eq!(validation_message(nobody), "Must provide at least one name");

        let long_name = "x".repeat(limits.max_name_length + 1);
        assert!(request(&[&long_name]).into_draft(&limits, now).is_err());

        let past = request(&["a"]).into_draft(&limits, now + Duration::days(365 * 2));
        assert!(validation_message(past.unwrap_err()).contains("future"));
    }

    #[test]
    fn record_round_trip() {
        let now = Utc.with_ymd_and_hms(2029, 6, 1, 0, 0, 0).unwrap();
        let draft = request(&["Ada", "Bob"])
            .into_draft(&Limits::default(), now)
            .unwrap();
        let record = ObjectiveRecord::new("abc".to_owned(), draft, [7u8; 32], now);

        assert_eq!(record.eligible_count, 2);
        assert!(!record.invited.iter().any(|digest| digest.contains("Ada")));

        let bytes = serde_json::to_vec(&record).unwrap();
        let restored = ObjectiveRecord::from_slice(&bytes).unwrap();
        assert_eq!(restored.seed, record.seed);
        assert_eq!(restored.invited, record.invited);

        let mut future = record.clone();
        future.version += 1;
        let bytes = serde_json::to_vec(&future).unwrap();
        assert!(ObjectiveRecord::from_slice(&bytes).is_err());
    }
}
