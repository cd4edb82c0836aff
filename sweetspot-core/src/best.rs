//! Best-so-far tracking over measurements in arrival order.

use serde::Serialize;

use crate::codec::CanonicalKey;
use crate::domain::Objective;
use crate::store::ResultRecord;
use crate::types::ParamValue;

/// One measurement as seen by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub key: CanonicalKey,
    pub configuration: Vec<ParamValue>,
    /// Objective scalar; `None` when the result was not numeric.
    pub value: Option<f64>,
    /// 1-based count of measurements up to this one.
    pub measured_points: usize,
}

/// Outcome of observing one record.
#[derive(Debug, Clone, PartialEq)]
pub struct BestUpdate {
    /// 0-based position in the observed sequence.
    pub index: usize,
    pub improved: bool,
    /// Position of the best observation after this update.
    pub best_index: Option<usize>,
}

/// Monotonic best-so-far over all observed measurements.
///
/// The tracker is append-only history: a later overwrite of a key in the
/// result store does not revise earlier entries.
#[derive(Debug, Default)]
pub struct BestTracker {
    observed: Vec<Observation>,
    best_so_far: Vec<Option<usize>>,
    best: Option<(usize, f64)>,
}

impl BestTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` and replace the best if strictly better.
    ///
    /// Records without a numeric objective are appended but never become best.
    pub fn observe(&mut self, record: &ResultRecord, objective: &Objective) -> BestUpdate {
        let index = self.observed.len();
        let value = record.scalar(objective.index);

        self.observed.push(Observation {
            key: record.key.clone(),
            configuration: record.configuration.clone(),
            value,
            measured_points: index + 1,
        });

        let improved = match (value, self.best) {
            (Some(_), None) => true,
            (Some(v), Some((_, incumbent))) => objective.direction.is_better(v, incumbent),
            (None, _) => false,
        };
        if let (true, Some(v)) = (improved, value) {
            self.best = Some((index, v));
        }

        let best_index = self.best.map(|(i, _)| i);
        self.best_so_far.push(best_index);

        BestUpdate {
            index,
            improved,
            best_index,
        }
    }

    /// All observations in arrival order.
    #[must_use]
    pub fn observed(&self) -> &[Observation] {
        &self.observed
    }

    #[must_use]
    pub fn best(&self) -> Option<&Observation> {
        self.best.map(|(i, _)| &self.observed[i])
    }

    /// Best observation as of each index, parallel to [`Self::observed`].
    pub fn best_so_far(&self) -> impl Iterator<Item = Option<&Observation>> {
        self.best_so_far
            .iter()
            .map(|slot| slot.map(|i| &self.observed[i]))
    }

    /// Objective values of the best-so-far sequence.
    #[must_use]
    pub fn best_so_far_values(&self) -> Vec<Option<f64>> {
        self.best_so_far()
            .map(|best| best.and_then(|o| o.value))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    pub fn clear(&mut self) {
        self.observed.clear();
        self.best_so_far.clear();
        self.best = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, ParameterDomain};
    use crate::store::RecordOrigin;
    use serde_json::{Value, json};

    fn objective(direction: Direction) -> Objective {
        Objective {
            name: "energy".to_string(),
            index: 0,
            direction,
        }
    }

    fn record(x: f64, result: Value) -> ResultRecord {
        ResultRecord::new(
            vec![x.into()],
            vec![result],
            &[ParameterDomain::numeric("x", [0.0])],
            RecordOrigin::New,
        )
        .unwrap()
    }

    fn run(values: &[f64], direction: Direction) -> BestTracker {
        let mut tracker = BestTracker::new();
        let objective = objective(direction);
        for (i, v) in values.iter().enumerate() {
            tracker.observe(&record(i as f64, json!(v)), &objective);
        }
        tracker
    }

    #[test]
    fn minimize_best_so_far_sequence() {
        let tracker = run(&[5.0, 3.0, 8.0, 1.0], Direction::Minimize);
        assert_eq!(
            tracker.best_so_far_values(),
            vec![Some(5.0), Some(3.0), Some(3.0), Some(1.0)]
        );
    }

    #[test]
    fn maximize_best_so_far_sequence() {
        let tracker = run(&[5.0, 3.0, 8.0, 1.0], Direction::Maximize);
        assert_eq!(
            tracker.best_so_far_values(),
            vec![Some(5.0), Some(5.0), Some(8.0), Some(8.0)]
        );
    }

    #[test]
    fn first_observation_is_its_own_best() {
        let mut tracker = BestTracker::new();
        let update = tracker.observe(&record(0.0, json!(42)), &objective(Direction::Maximize));

        assert!(update.improved);
        assert_eq!(update.best_index, Some(0));
        assert_eq!(tracker.best().unwrap().value, Some(42.0));
    }

    #[test]
    fn ties_keep_the_earlier_record() {
        let tracker = run(&[2.0, 2.0], Direction::Minimize);
        let best = tracker.best().unwrap();
        assert_eq!(best.measured_points, 1);
        assert_eq!(best.configuration, vec![ParamValue::Number(0.0)]);
    }

    #[test]
    fn non_numeric_results_never_become_best() {
        let mut tracker = BestTracker::new();
        let objective = objective(Direction::Minimize);

        let first = tracker.observe(&record(0.0, json!(null)), &objective);
        let second = tracker.observe(&record(1.0, json!(4)), &objective);
        let third = tracker.observe(&record(2.0, json!("error")), &objective);

        assert!(!first.improved);
        assert!(second.improved);
        assert!(!third.improved);
        assert_eq!(tracker.best_so_far_values(), vec![None, Some(4.0), Some(4.0)]);
    }

    #[test]
    fn best_so_far_length_matches_observed() {
        let tracker = run(&[1.0, 9.0, 0.5, 3.0, 0.5], Direction::Minimize);
        assert_eq!(tracker.best_so_far().count(), tracker.observed().len());
    }

    #[test]
    fn measured_points_count_every_observation() {
        let tracker = run(&[1.0, 1.0, 1.0], Direction::Minimize);
        let counts: Vec<_> = tracker.observed().iter().map(|o| o.measured_points).collect();
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[test]
    fn clear_resets_best() {
        let mut tracker = run(&[1.0], Direction::Minimize);
        tracker.clear();
        assert!(tracker.is_empty());
        assert!(tracker.best().is_none());
    }
}
