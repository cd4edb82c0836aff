//! Aggregated state of the currently active experiment.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::best::{BestTracker, BestUpdate};
use crate::domain::{Direction, SearchSpaceDescriptor};
use crate::events::DescriptionPayload;
use crate::store::{RecordOrigin, ResultRecord, ResultStore};
use crate::types::ExperimentId;

/// Everything aggregated for one experiment generation.
///
/// Created whole on an experiment description and replaced whole on the
/// next one, so a descriptor never coexists with another generation's
/// records. Mutation goes through the router only.
#[derive(Debug)]
pub struct ExperimentState {
    experiment: ExperimentId,
    descriptor: SearchSpaceDescriptor,
    description: DescriptionPayload,
    measurements: ResultStore,
    predictions: ResultStore,
    tracker: BestTracker,
    solution: Option<ResultRecord>,
    default_record: Option<ResultRecord>,
    started_at: DateTime<Utc>,
}

impl ExperimentState {
    pub(crate) fn new(
        experiment: ExperimentId,
        descriptor: SearchSpaceDescriptor,
        description: DescriptionPayload,
    ) -> Self {
        Self {
            experiment,
            descriptor,
            description,
            measurements: ResultStore::new(),
            predictions: ResultStore::new(),
            tracker: BestTracker::new(),
            solution: None,
            default_record: None,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn experiment(&self) -> ExperimentId {
        self.experiment
    }

    #[must_use]
    pub fn descriptor(&self) -> &SearchSpaceDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn global_configuration(&self) -> &Value {
        &self.description.global_configuration
    }

    /// The description this generation was built from.
    #[must_use]
    pub fn description(&self) -> &DescriptionPayload {
        &self.description
    }

    /// Measured records, default and new.
    #[must_use]
    pub fn measurements(&self) -> &ResultStore {
        &self.measurements
    }

    #[must_use]
    pub fn predictions(&self) -> &ResultStore {
        &self.predictions
    }

    #[must_use]
    pub fn tracker(&self) -> &BestTracker {
        &self.tracker
    }

    /// The optimizer-designated final point.
    #[must_use]
    pub fn solution(&self) -> Option<&ResultRecord> {
        self.solution.as_ref()
    }

    /// The most recent baseline measurement.
    #[must_use]
    pub fn default_record(&self) -> Option<&ResultRecord> {
        self.default_record.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Relative improvement of the solution over the baseline.
    ///
    /// Positive means the solution is better under the objective direction.
    /// `None` when either point or its objective is missing, or the baseline
    /// objective is zero.
    #[must_use]
    pub fn improvement(&self) -> Option<f64> {
        let index = self.descriptor.objective().index;
        let solution = self.solution.as_ref()?.scalar(index)?;
        let baseline = self.default_record.as_ref()?.scalar(index)?;
        if baseline == 0.0 {
            return None;
        }
        let delta = match self.descriptor.objective().direction {
            Direction::Minimize => baseline - solution,
            Direction::Maximize => solution - baseline,
        };
        Some(delta / baseline.abs())
    }

    pub(crate) fn record_measurement(&mut self, mut record: ResultRecord) -> BestUpdate {
        let update = self.tracker.observe(&record, self.descriptor.objective());
        record.measured_points = self.tracker.len();
        if record.origin == RecordOrigin::Default {
            self.default_record = Some(record.clone());
        }
        self.measurements.upsert(record);
        update
    }

    pub(crate) fn set_solution(&mut self, record: ResultRecord) -> Option<ResultRecord> {
        self.solution.replace(record)
    }

    pub(crate) fn upsert_prediction(&mut self, record: ResultRecord) {
        self.predictions.upsert(record);
    }
}
