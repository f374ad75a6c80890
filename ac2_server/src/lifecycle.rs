//! Open -> Closed transitions. Closed is terminal.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    error::{
        ErrorKind::{DeadlinePassed, ObjectiveClosed},
        Result,
    },
    objective::{ObjectiveRecord, ObjectiveState, ResolutionStrategy},
};

/// Compared at whole seconds, so a commitment one second after the
/// resolution date is late but one in the same second is not.
pub fn deadline_passed(resolution_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.timestamp() > resolution_date.timestamp()
}

pub fn admit(record: &ObjectiveRecord, now: DateTime<Utc>) -> Result<()> {
    if deadline_passed(record.resolution_date, now) {
        return Err(DeadlinePassed.into());
    }
    if record.state == ObjectiveState::Closed {
        return Err(ObjectiveClosed.into());
    }
    Ok(())
}

/// Returns true if the objective closed.
pub fn after_wave(record: &mut ObjectiveRecord, revealed: usize, now: DateTime<Utc>) -> bool {
    if record.state == ObjectiveState::Open
        && record.resolution_strategy == ResolutionStrategy::Asap
        && revealed > 0
    {
        record.close(now);
        info!(objective = %record.id, revealed, "ASAP objective resolved");
        return true;
    }
    false
}

/// Returns true if the objective closed.
pub fn expire(record: &mut ObjectiveRecord, now: DateTime<Utc>) -> bool {
    if record.state == ObjectiveState::Open && deadline_passed(record.resolution_date, now) {
        record.close(now);
        info!(objective = %record.id, strategy = %record.resolution_strategy, "resolution date reached");
        return true;
    }
    false
}

#[cfg(test)]
mod test {
    use chrono::{Duration, TimeZone, Utc};

    use super::{admit, after_wave, deadline_passed, expire};
    use crate::{
        config::Limits,
        error::ErrorKind,
        objective::{CreateObjective, ObjectiveRecord, ObjectiveState},
    };

    fn record(strategy: &str) -> ObjectiveRecord {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let draft = CreateObjective {
            title: "t".to_owned(),
            description: String::new(),
            invited_names: vec!["a".to_owned(), "b".to_owned()],
            resolution_date: "2030-01-02T00:00:00Z".to_owned(),
            resolution_strategy: Some(strategy.to_owned()),
            minimum_number: None,
            minimum_percentage: None,
        }
        .into_draft(&Limits::default(), now)
        .unwrap();
        ObjectiveRecord::new("id".to_owned(), draft, [0u8; 32], now)
    }

    #[test]
    fn deadline_second_precision() {
        let deadline = Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap();
        assert!(!deadline_passed(deadline, deadline));
        assert!(!deadline_passed(deadline, deadline + Duration::milliseconds(999)));
        assert!(deadline_passed(deadline, deadline + Duration::seconds(1)));
    }

    #[test]
    fn asap_closes_once() {
        let mut objective = record("ASAP");
        let now = objective.created_at;

        assert!(!after_wave(&mut objective, 0, now));
        assert!(admit(&objective, now).is_ok());

        assert!(after_wave(&mut objective, 2, now));
        assert!(!after_wave(&mut objective, 1, now));
        assert!(matches!(
            admit(&objective, now).unwrap_err().kind(),
            ErrorKind::ObjectiveClosed
        ));
    }

    #[test]
    fn deadline_strategy_ignores_waves() {
        let mut objective = record("DEADLINE");
        let now = objective.created_at;

        assert!(!after_wave(&mut objective, 2, now));
        assert_eq!(objective.state, ObjectiveState::Open);

        let deadline = objective.resolution_date;
        let late = deadline + Duration::seconds(1);
        assert!(matches!(
            admit(&objective, late).unwrap_err().kind(),
            ErrorKind::DeadlinePassed
        ));
        assert!(!expire(&mut objective, deadline));
        assert!(expire(&mut objective, late));
        assert!(!expire(&mut objective, late));
        assert_eq!(objective.state, ObjectiveState::Closed);

        // deadline message wins over the closed one
        assert!(matches!(
            admit(&objective, late).unwrap_err().kind(),
            ErrorKind::DeadlinePassed
        ));
    }
}
