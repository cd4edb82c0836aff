//! sweetspot-core: aggregation and projection engine for live optimization experiments
//!
//! An external optimizer streams experiment events (a search-space
//! description, then measured, final and predicted configurations). This
//! crate folds them into one consistent state and projects that state into
//! the structures charts need.
//!
//! - **Events** ([`EventEnvelope`], [`ExperimentEvent`]) are validated before dispatch
//! - **Router** ([`EventRouter`]) is the single writer of [`ExperimentState`]
//! - **Stores** ([`ResultStore`], [`BestTracker`]) hold records keyed by [`CanonicalKey`]
//! - **Projections** ([`GridProjector`], [`DimensionProjector`], [`TrendProjector`]) are read-only
//! - **Feed** ([`EngineFeed`]) drives a router from an async [`EventSource`]
//!
//! # Quick Start
//!
//! ```
//! use serde_json::json;
//! use sweetspot_core::{EventEnvelope, EventRouter, GridAxes, GridProjector};
//!
//! let mut router = EventRouter::default();
//! router.dispatch(EventEnvelope::new(
//!     "experiment-description",
//!     json!({
//!         "experiment_description": {
//!             "General": { "isMinimizationExperiment": true },
//!             "TaskConfiguration": { "Objectives": ["energy"] }
//!         },
//!         "searchspace_description": {
//!             "boundaries": { "frequency": [1200, 2900], "threads": [1, 8] }
//!         }
//!     }),
//! ));
//! router.dispatch(EventEnvelope::new(
//!     "new-configuration",
//!     json!([{ "configurations": [2900, 8], "results": [41.5] }]),
//! ));
//!
//! let state = router.state().unwrap();
//! let grid = GridProjector::project(
//!     state.measurements(),
//!     state.descriptor(),
//!     &GridAxes::new("threads", "frequency"),
//! )
//! .unwrap();
//! assert_eq!(grid.get(1, 1), Some(41.5));
//! ```

mod best;
mod codec;
pub mod config;
mod domain;
pub mod error;
mod events;
pub mod feed;
mod info;
pub mod projection;
mod router;
mod state;
mod store;
mod types;

// Errors
pub use error::{Error, Result};

// Configuration
pub use config::{DomainPolicy, EngineConfig};

// Identifiers and values
pub use types::{ExperimentId, ParamValue};

// Key codec
pub use codec::{CanonicalKey, KeyCodec, NONE_TOKEN};

// Search space
pub use domain::{Direction, DomainKind, Objective, ParameterDomain, SearchSpaceDescriptor};

// Stores
pub use best::{BestTracker, BestUpdate, Observation};
pub use store::{RecordOrigin, ResultRecord, ResultStore};

// Events and routing
pub use events::{ConfigurationEntry, DescriptionPayload, EventEnvelope, EventKind, ExperimentEvent};
pub use info::{InfoEntry, InfoLog, LogLevel};
pub use router::{Dispatch, EventRouter};
pub use state::ExperimentState;

// Projections
pub use projection::{
    Dimension, DimensionProjector, DimensionSet, Grid, GridAxes, GridMarker, GridMarkers,
    GridProjector, OutOfDomainValue, PlotValue, Trend, TrendPoint, TrendProjector,
};

// Feed
pub use feed::{ChannelSource, Dashboard, EngineFeed, EventSource, FeedStats, JsonLinesSource, SourceError, drain};
