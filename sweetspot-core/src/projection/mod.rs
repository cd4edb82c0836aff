//! Read-only projections of experiment state into chart-ready structures.
//!
//! Projectors never mutate the stores; they are recomputed on demand.

mod dimension;
mod grid;
mod trend;

pub use dimension::{
    Dimension, DimensionProjector, DimensionSet, OUT_OF_DOMAIN, OutOfDomainValue, PlotValue,
};
pub use grid::{Grid, GridAxes, GridMarker, GridMarkers, GridProjector};
pub use trend::{Trend, TrendPoint, TrendProjector};
