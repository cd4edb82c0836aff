//! Single-writer event router.
//!
//! Every state change goes through [`EventRouter::dispatch`]. An event is
//! validated in full before anything is mutated; an invalid event is dropped
//! with a diagnostic on the info log and leaves the state as it was.

use std::collections::VecDeque;

use tracing::{debug, info, instrument, trace, warn};

use crate::config::{DomainPolicy, EngineConfig};
use crate::domain::{ParameterDomain, SearchSpaceDescriptor};
use crate::error::{Error, Result};
use crate::events::{
    ConfigurationEntry, DescriptionPayload, EventEnvelope, EventKind, ExperimentEvent,
};
use crate::info::{InfoLog, LogLevel};
use crate::state::ExperimentState;
use crate::store::{RecordOrigin, ResultRecord};
use crate::types::{ExperimentId, ParamValue};

/// What the router did with an envelope.
#[derive(Debug)]
pub enum Dispatch {
    /// A new experiment started; `replayed` held events were applied to it
    Reset {
        experiment: ExperimentId,
        replayed: usize,
    },
    /// Description repeated the current experiment (same id, or an untagged identical body)
    Unchanged,
    /// Configuration event applied
    Applied { kind: EventKind, records: usize },
    /// Held until its experiment description arrives
    Buffered,
    /// Held, but the pending queue was full and an older event was evicted
    Overflowed,
    /// Belongs to an earlier experiment; discarded silently
    Stale,
    /// Passed through to the info log
    Logged,
    /// Invalid; state left unchanged
    Dropped(Error),
}

impl Dispatch {
    /// Whether the experiment state changed.
    #[must_use]
    pub fn changed_state(&self) -> bool {
        matches!(self, Self::Reset { .. } | Self::Applied { .. })
    }
}

/// A validated configuration event waiting for, or ready for, application.
#[derive(Debug)]
struct Batch {
    experiment: Option<ExperimentId>,
    kind: EventKind,
    entries: Vec<ConfigurationEntry>,
}

/// Routes events into the active [`ExperimentState`].
#[derive(Debug)]
pub struct EventRouter {
    config: EngineConfig,
    state: Option<ExperimentState>,
    pending: VecDeque<Batch>,
    info: InfoLog,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EventRouter {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            info: InfoLog::new(config.info_capacity),
            config,
            state: None,
            pending: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The active experiment, if a description has been received.
    #[must_use]
    pub fn state(&self) -> Option<&ExperimentState> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn info(&self) -> &InfoLog {
        &self.info
    }

    /// Number of events held for an experiment that has not been described.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Validate and apply one envelope.
    #[instrument(skip_all, fields(event = %envelope.event, subtype = ?envelope.subtype))]
    pub fn dispatch(&mut self, envelope: EventEnvelope) -> Dispatch {
        let event = match ExperimentEvent::from_envelope(&envelope) {
            Ok(event) => event,
            Err(e) => return self.drop_event(&envelope.event, e),
        };

        let experiment = envelope.experiment;
        let (kind, entries) = match event {
            ExperimentEvent::Log { level, message } => {
                self.info.push(level, message);
                return Dispatch::Logged;
            }
            ExperimentEvent::Description(payload) => return self.reset(experiment, payload),
            ExperimentEvent::Default(entries) => (EventKind::Default, entries),
            ExperimentEvent::New(entries) => (EventKind::New, entries),
            ExperimentEvent::Final(entries) => (EventKind::Final, entries),
            ExperimentEvent::Predictions(entries) => (EventKind::Predictions, entries),
        };

        self.route(Batch {
            experiment,
            kind,
            entries,
        })
    }

    fn route(&mut self, batch: Batch) -> Dispatch {
        let Some(current) = self.state.as_ref().map(ExperimentState::experiment) else {
            return self.hold(batch);
        };
        match batch.experiment {
            Some(id) if id < current => {
                trace!(experiment = %id, current = %current, "discarding stale event");
                Dispatch::Stale
            }
            Some(id) if id > current => self.hold(batch),
            _ => self.apply(batch),
        }
    }

    fn reset(&mut self, experiment: Option<ExperimentId>, payload: DescriptionPayload) -> Dispatch {
        // An untagged repeat of the current description is a no-op
        if experiment.is_none()
            && let Some(state) = &self.state
            && state.description() == &payload
        {
            debug!(experiment = %state.experiment(), "description repeats current experiment");
            return Dispatch::Unchanged;
        }

        let id = match (experiment, &self.state) {
            (Some(id), _) => id,
            (None, Some(state)) => ExperimentId::after(state.experiment()),
            (None, None) => ExperimentId::new(),
        };
        if let Some(current) = self.state.as_ref().map(ExperimentState::experiment) {
            if id == current {
                debug!(experiment = %id, "description repeats current experiment");
                return Dispatch::Unchanged;
            }
            if id < current {
                trace!(experiment = %id, current = %current, "discarding stale description");
                return Dispatch::Stale;
            }
        }

        let descriptor = match SearchSpaceDescriptor::from_description(&payload) {
            Ok(descriptor) => descriptor,
            Err(e) => return self.drop_event(EventKind::Description.as_str(), e),
        };

        info!(
            experiment = %id,
            parameters = descriptor.parameters().len(),
            objective = %descriptor.objective().name,
            direction = descriptor.objective().direction.as_str(),
            "experiment reset"
        );
        self.state = Some(ExperimentState::new(id, descriptor, payload));

        let mut replayed = 0;
        for batch in std::mem::take(&mut self.pending) {
            match batch.experiment {
                Some(held) if held < id => {
                    trace!(experiment = %held, "discarding stale held event");
                }
                Some(held) if held > id => self.pending.push_back(batch),
                _ => {
                    replayed += 1;
                    self.apply(batch);
                }
            }
        }
        if replayed > 0 {
            debug!(replayed, "replayed held events");
        }

        Dispatch::Reset {
            experiment: id,
            replayed,
        }
    }

    fn hold(&mut self, batch: Batch) -> Dispatch {
        let capacity = self.config.max_pending_events;
        if capacity == 0 {
            self.note_overflow(batch.kind);
            return Dispatch::Overflowed;
        }

        let mut overflowed = false;
        while self.pending.len() >= capacity {
            if let Some(evicted) = self.pending.pop_front() {
                self.note_overflow(evicted.kind);
                overflowed = true;
            }
        }

        debug!(event = %batch.kind, pending = self.pending.len() + 1, "holding event for description");
        self.pending.push_back(batch);
        if overflowed {
            Dispatch::Overflowed
        } else {
            Dispatch::Buffered
        }
    }

    fn note_overflow(&mut self, kind: EventKind) {
        warn!(event = %kind, "pending queue full, discarding oldest held event");
        self.info.push(
            LogLevel::Warning,
            format!("discarded held {kind} event: pending queue full"),
        );
    }

    fn apply(&mut self, batch: Batch) -> Dispatch {
        let policy = self.config.domain_policy;
        let Some(state) = self.state.as_mut() else {
            return self.hold(batch);
        };

        let records = match build_records(state.descriptor(), policy, batch.kind, &batch.entries) {
            Ok(records) => records,
            Err(e) => return self.drop_event(batch.kind.as_str(), e),
        };
        let count = records.len();

        match batch.kind {
            EventKind::Default | EventKind::New => {
                for record in records {
                    let key = record.key.clone();
                    let update = state.record_measurement(record);
                    debug!(
                        event = %batch.kind,
                        key = %key,
                        measured_points = update.index + 1,
                        improved = update.improved,
                        "measurement recorded"
                    );
                }
            }
            EventKind::Final => {
                for record in records {
                    info!(key = %record.key, "solution designated");
                    state.set_solution(record);
                }
            }
            EventKind::Predictions => {
                for record in records {
                    state.upsert_prediction(record);
                }
                debug!(count, "predictions updated");
            }
            EventKind::Description | EventKind::Log => {}
        }

        Dispatch::Applied {
            kind: batch.kind,
            records: count,
        }
    }

    fn drop_event(&mut self, event: &str, error: Error) -> Dispatch {
        warn!(event, kind = error.kind(), error = %error, "dropping event");
        self.info
            .push(LogLevel::Warning, format!("dropped {event} event: {error}"));
        Dispatch::Dropped(error)
    }
}

/// Resolve every entry of a batch; any failure rejects the whole batch.
fn build_records(
    descriptor: &SearchSpaceDescriptor,
    policy: DomainPolicy,
    kind: EventKind,
    entries: &[ConfigurationEntry],
) -> Result<Vec<ResultRecord>> {
    let origin = match kind {
        EventKind::Default => RecordOrigin::Default,
        EventKind::Final => RecordOrigin::Final,
        EventKind::Predictions => RecordOrigin::Prediction,
        _ => RecordOrigin::New,
    };

    entries
        .iter()
        .map(|entry| {
            let tuple = entry.tuple(descriptor)?;
            if policy == DomainPolicy::Reject {
                check_domains(&tuple, descriptor.parameters())?;
            }
            let results = entry.result_values(descriptor)?;
            ResultRecord::new(tuple, results, descriptor.parameters(), origin)
        })
        .collect()
}

fn check_domains(tuple: &[ParamValue], domains: &[ParameterDomain]) -> Result<()> {
    match tuple.iter().zip(domains).find(|(v, d)| !d.admits(v)) {
        Some((value, domain)) => Err(Error::DomainViolation {
            parameter: domain.name.clone(),
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}
