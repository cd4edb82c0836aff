//! End-to-end tests for the event router and projections
//!
//! These drive whole experiments through the public API:
//! - generations: resets racing with in-flight measurements
//! - invalid events leaving aggregated state untouched
//! - projections over a complete run
//! - replay from a JSON-lines file and through a detached feed

use std::io::Write;

use serde_json::{Value, json};
use tokio::io::BufReader;
use uuid::Uuid;

use sweetspot_core::{
    ChannelSource, DimensionProjector, Dispatch, EngineFeed, EventEnvelope, EventRouter,
    ExperimentId, GridAxes, GridProjector, JsonLinesSource, PlotValue, TrendProjector, drain,
};

fn experiment(n: u128) -> ExperimentId {
    ExperimentId(Uuid::from_u128(n))
}

fn description_body(minimize: bool) -> Value {
    json!({
        "global_configuration": { "EventService": { "Address": "localhost" } },
        "experiment_description": {
            "General": { "isMinimizationExperiment": minimize },
            "TaskConfiguration": { "Objectives": ["energy"] }
        },
        "searchspace_description": {
            "boundaries": {
                "frequency": [1200, 1600, 2900],
                "threads": [1, 2, 4, 8],
                "governor": ["powersave", "ondemand", "performance"]
            }
        }
    })
}

fn describe(id: ExperimentId) -> EventEnvelope {
    EventEnvelope::new("experiment", description_body(true))
        .with_subtype("description")
        .with_experiment(id)
}

fn new_point(id: ExperimentId, frequency: i64, threads: i64, governor: &str, energy: f64) -> EventEnvelope {
    EventEnvelope::new(
        "new",
        json!([{ "configurations": [frequency, threads, governor], "results": [energy] }]),
    )
    .with_subtype("configuration")
    .with_experiment(id)
}

// ==================== Generation Tests ====================

#[test]
fn reset_mid_stream_drops_in_flight_records_of_old_generation() {
    let old = experiment(1);
    let current = experiment(2);
    let mut router = EventRouter::default();

    router.dispatch(describe(old));
    router.dispatch(new_point(old, 1200, 1, "powersave", 10.0));

    // reset overtakes three measurements still in flight for the old run
    router.dispatch(describe(current));
    let late: Vec<_> = [(1600, 2, 9.0), (2900, 4, 8.0), (2900, 8, 7.0)]
        .into_iter()
        .map(|(f, t, e)| router.dispatch(new_point(old, f, t, "ondemand", e)))
        .collect();
    router.dispatch(new_point(current, 2900, 8, "performance", 5.5));

    assert!(late.iter().all(|d| matches!(d, Dispatch::Stale)));
    let state = router.state().unwrap();
    assert_eq!(state.experiment(), current);
    assert_eq!(state.measurements().len(), 1);
    assert_eq!(state.tracker().len(), 1);
    assert_eq!(state.tracker().best().unwrap().value, Some(5.5));
    // stale records are not diagnostics
    assert!(router.info().is_empty());
}

#[test]
fn measurements_that_outrun_their_description_are_kept() {
    let next = experiment(7);
    let mut router = EventRouter::default();
    router.dispatch(describe(experiment(6)));

    router.dispatch(new_point(next, 1600, 4, "ondemand", 3.0));
    router.dispatch(new_point(next, 2900, 4, "ondemand", 2.0));
    assert_eq!(router.pending_len(), 2);

    let dispatch = router.dispatch(describe(next));

    assert!(matches!(dispatch, Dispatch::Reset { replayed: 2, .. }));
    assert_eq!(router.state().unwrap().measurements().len(), 2);
}

#[test]
fn hierarchical_search_space_accepts_branch_configurations() {
    let mut router = EventRouter::default();
    let dispatch = router.dispatch(EventEnvelope::new(
        "experiment-description",
        json!({
            "experiment_description": {
                "General": { "isMinimizationExperiment": true },
                "TaskConfiguration": { "Objectives": ["energy"] }
            },
            "searchspace_description": {
                "size": 8,
                "name": "solver",
                "boundaries": [
                    { "RootParameter": "ga", "Boundaries": { "solver": ["ga"], "population": [10, 100] } },
                    { "RootParameter": "sa", "Boundaries": { "solver": ["sa"], "cooling": ["linear", "exponential"] } }
                ],
                "root_parameters_list": ["ga", "sa"]
            }
        }),
    ));
    assert!(matches!(dispatch, Dispatch::Reset { .. }));

    let applied = router.dispatch(EventEnvelope::new(
        "new-configuration",
        json!([
            { "configurations": { "solver": "ga", "population": 100 }, "results": { "energy": 4.0 } },
            { "configurations": { "solver": "sa", "cooling": "linear" }, "results": { "energy": 3.0 } }
        ]),
    ));
    assert!(matches!(applied, Dispatch::Applied { records: 2, .. }));

    let state = router.state().unwrap();
    let dimensions = DimensionProjector::project(state.measurements(), state.descriptor());
    assert_eq!(
        dimensions.dimension("cooling").unwrap().values,
        vec![PlotValue::Missing, PlotValue::Value(0.0)]
    );
    assert_eq!(state.tracker().best().unwrap().value, Some(3.0));
}

// ==================== Error Recovery Tests ====================

#[test]
fn invalid_events_leave_state_unchanged() {
    let id = experiment(1);
    let mut router = EventRouter::default();
    router.dispatch(describe(id));
    router.dispatch(new_point(id, 1200, 1, "powersave", 10.0));

    let bad = [
        // wrong tuple length
        EventEnvelope::new("new-configuration", json!([{ "configurations": [1200, 1], "results": [1.0] }])),
        // undeclared category
        new_point(id, 1200, 2, "turbo", 1.0),
        // null entry next to a valid one
        EventEnvelope::new(
            "new-configuration",
            json!([{ "configurations": [1600, 2, "ondemand"], "results": [1.0] }, null]),
        ),
        // body that is not JSON
        EventEnvelope::new("new-configuration", Value::String("{{".to_string())),
        // unknown event
        EventEnvelope::new("restart", Value::Null),
    ];
    for envelope in bad {
        assert!(matches!(router.dispatch(envelope), Dispatch::Dropped(_)));
    }

    let state = router.state().unwrap();
    assert_eq!(state.measurements().len(), 1);
    assert_eq!(state.tracker().len(), 1);
    assert_eq!(router.info().len(), 5);
    let kinds: Vec<_> = router.info().entries().map(|e| e.message.clone()).collect();
    assert!(kinds[0].contains("schema mismatch"));
    assert!(kinds[1].contains("turbo"));
}

// ==================== Projection Tests ====================

#[test]
fn complete_run_projects_consistently() {
    let id = experiment(3);
    let mut router = EventRouter::default();
    router.dispatch(describe(id));
    router.dispatch(
        EventEnvelope::new(
            "task",
            json!({ "configurations": [2900, 1, "ondemand"], "results": [20.0] }),
        )
        .with_subtype("default")
        .with_experiment(id),
    );
    for (f, t, g, e) in [
        (1200, 1, "powersave", 25.0),
        (1600, 4, "ondemand", 12.0),
        (1600, 8, "performance", 14.0),
        (1200, 8, "powersave", 11.0),
    ] {
        router.dispatch(new_point(id, f, t, g, e));
    }
    router.dispatch(
        EventEnvelope::new(
            "final-configuration",
            json!([{ "configurations": [1200, 8, "powersave"], "results": [11.0] }]),
        )
        .with_experiment(id),
    );
    router.dispatch(
        EventEnvelope::new(
            "predictions",
            json!([{ "configurations": [2900, 8, "performance"], "results": [9.0] }]),
        )
        .with_experiment(id),
    );

    let state = router.state().unwrap();
    assert_eq!(state.measurements().len(), 5);
    assert_eq!(state.predictions().len(), 1);

    // 20 -> 11 under minimization
    let improvement = state.improvement().unwrap();
    assert!((improvement - 0.45).abs() < 1e-9);

    let trend = TrendProjector::project(state.tracker(), state.descriptor().objective());
    let best: Vec<_> = trend.best_so_far.iter().map(|p| p.value.unwrap()).collect();
    assert_eq!(best, vec![20.0, 20.0, 12.0, 12.0, 11.0]);

    let dimensions = DimensionProjector::project(state.measurements(), state.descriptor());
    let governor = dimensions.dimension("governor").unwrap();
    assert_eq!(
        governor.values,
        vec![1.0, 0.0, 1.0, 2.0, 0.0]
            .into_iter()
            .map(PlotValue::Value)
            .collect::<Vec<_>>()
    );
    assert_eq!(dimensions.dimensions.len(), 4);

    // three parameters: no cell has the sentinel in the third position
    let grid = GridProjector::project(
        state.measurements(),
        state.descriptor(),
        &GridAxes::new("threads", "frequency"),
    )
    .unwrap();
    assert_eq!(grid.cells.len(), 4);
    assert!(grid.cells.iter().all(|row| row.len() == 3));
    assert_eq!(grid.filled(), 0);

    let markers = GridProjector::markers(
        state.measurements(),
        state.solution(),
        state.descriptor(),
        &GridAxes::new("threads", "frequency"),
    )
    .unwrap();
    assert_eq!(markers.measured.len(), 5);
    assert_eq!(markers.solution.unwrap().value, Some(11.0));
}

// ==================== Replay Tests ====================

#[tokio::test]
async fn replay_from_json_lines_file() {
    let id = experiment(9);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for envelope in [
        describe(id),
        new_point(id, 1200, 2, "powersave", 4.0),
        new_point(id, 1200, 2, "powersave", 3.0),
    ] {
        writeln!(file, "{}", serde_json::to_string(&envelope).unwrap()).unwrap();
    }
    writeln!(file).unwrap();
    file.flush().unwrap();

    let reader = BufReader::new(tokio::fs::File::open(file.path()).await.unwrap());
    let mut source = JsonLinesSource::new(reader);
    let mut router = EventRouter::default();
    let stats = drain(&mut router, &mut source).await.unwrap();

    assert_eq!(stats.received, 3);
    let state = router.state().unwrap();
    // same key twice: one record, last write wins, both observed
    assert_eq!(state.measurements().len(), 1);
    assert_eq!(state.measurements().all()[0].scalar(0), Some(3.0));
    assert_eq!(state.measurements().all()[0].measured_points, 2);
    assert_eq!(state.tracker().len(), 2);
}

#[tokio::test]
async fn feed_survives_reset_and_detach() {
    let (tx, source) = ChannelSource::channel(16);
    let feed = EngineFeed::spawn(EventRouter::default(), source);
    let dashboard = feed.dashboard();
    let mut changes = feed.subscribe();

    let (old, current) = (experiment(1), experiment(2));
    for envelope in [
        describe(old),
        new_point(old, 1200, 1, "powersave", 9.0),
        describe(current),
        new_point(old, 1600, 1, "powersave", 1.0),
        new_point(current, 2900, 2, "ondemand", 6.0),
    ] {
        tx.send(envelope).await.unwrap();
    }
    changes.wait_for(|version| *version >= 5).await.unwrap();

    feed.detach();
    let stats = feed.join().await;
    assert_eq!(stats.resets, 2);
    assert_eq!(stats.stale, 1);

    let router = dashboard.read().await;
    let state = router.state().unwrap();
    assert_eq!(state.experiment(), current);
    assert_eq!(state.measurements().len(), 1);
    assert_eq!(state.tracker().best().unwrap().value, Some(6.0));
}
