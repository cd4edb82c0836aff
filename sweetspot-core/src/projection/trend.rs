//! Measured and best-so-far series for the improvement chart.

use serde::Serialize;

use crate::best::{BestTracker, Observation};
use crate::domain::{Direction, Objective};

/// One point of a series, x = measurement count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub measured_points: usize,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub objective: String,
    pub direction: Direction,
    pub observed: Vec<TrendPoint>,
    pub best_so_far: Vec<TrendPoint>,
    pub best: Option<Observation>,
}

pub struct TrendProjector;

impl TrendProjector {
    #[must_use]
    pub fn project(tracker: &BestTracker, objective: &Objective) -> Trend {
        let observed = tracker
            .observed()
            .iter()
            .map(|o| TrendPoint {
                measured_points: o.measured_points,
                value: o.value,
            })
            .collect();

        let best_so_far = tracker
            .best_so_far_values()
            .into_iter()
            .enumerate()
            .map(|(i, value)| TrendPoint {
                measured_points: i + 1,
                value,
            })
            .collect();

        Trend {
            objective: objective.name.clone(),
            direction: objective.direction,
            observed,
            best_so_far,
            best: tracker.best().cloned(),
        }
    }
}
