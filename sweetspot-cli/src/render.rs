//! Table and JSON rendering for command output.

use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use sweetspot_core::projection::OUT_OF_DOMAIN;
use sweetspot_core::{
    DimensionSet, Direction, EventRouter, ExperimentId, FeedStats, Grid, InfoEntry, LogLevel,
    ParamValue, PlotValue, SearchSpaceDescriptor, Trend,
};

use crate::config::OutputFormat;

/// Print `value` as pretty JSON or as the table built by `table`.
pub fn emit<T, F>(format: OutputFormat, value: &T, table: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> Table,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => println!("{}", table(value)),
    }
    Ok(())
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}"))
}

/// Render a configuration as `name=value` pairs.
pub fn configuration(descriptor: &SearchSpaceDescriptor, values: &[ParamValue]) -> String {
    descriptor
        .parameter_names()
        .zip(values)
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ==================== Summary ====================

#[derive(Debug, Serialize)]
pub struct PointSummary {
    pub configuration: String,
    pub value: Option<f64>,
}

/// Snapshot of the current experiment for the replay and watch commands.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub experiment: Option<ExperimentId>,
    pub started_at: Option<DateTime<Utc>>,
    pub objective: Option<String>,
    pub direction: Option<Direction>,
    pub parameters: Vec<String>,
    pub measurements: usize,
    pub predictions: usize,
    pub best: Option<PointSummary>,
    pub solution: Option<PointSummary>,
    pub improvement: Option<f64>,
    pub pending: usize,
    pub stats: FeedStats,
    pub recent_info: Vec<InfoEntry>,
}

impl Summary {
    pub fn build(router: &EventRouter, stats: FeedStats, recent: usize) -> Self {
        let recent_info = router.info().recent(recent).cloned().collect();
        let pending = router.pending_len();

        let Some(state) = router.state() else {
            return Self {
                experiment: None,
                started_at: None,
                objective: None,
                direction: None,
                parameters: Vec::new(),
                measurements: 0,
                predictions: 0,
                best: None,
                solution: None,
                improvement: None,
                pending,
                stats,
                recent_info,
            };
        };

        let descriptor = state.descriptor();
        let objective = descriptor.objective();
        Self {
            experiment: Some(state.experiment()),
            started_at: Some(state.started_at()),
            objective: Some(objective.name.clone()),
            direction: Some(objective.direction),
            parameters: descriptor.parameters().iter().map(|p| p.label()).collect(),
            measurements: state.measurements().len(),
            predictions: state.predictions().len(),
            best: state.tracker().best().map(|best| PointSummary {
                configuration: configuration(descriptor, &best.configuration),
                value: best.value,
            }),
            solution: state.solution().map(|record| PointSummary {
                configuration: configuration(descriptor, &record.configuration),
                value: record.scalar(objective.index),
            }),
            improvement: state.improvement(),
            pending,
            stats,
            recent_info,
        }
    }
}

pub fn summary_table(summary: &Summary) -> Table {
    let mut table = new_table(&["Field", "Value"]);
    let text = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    let point = |p: &Option<PointSummary>| {
        p.as_ref()
            .map_or_else(|| "-".to_string(), |p| format!("{} ({})", number(p.value), p.configuration))
    };

    table.add_row(vec!["Experiment".to_string(), text(summary.experiment.map(|id| id.to_string()))]);
    table.add_row(vec![
        "Started".to_string(),
        text(summary.started_at.map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())),
    ]);
    table.add_row(vec![
        "Objective".to_string(),
        match (&summary.objective, summary.direction) {
            (Some(name), Some(direction)) => format!("{name} ({})", direction.as_str()),
            _ => "-".to_string(),
        },
    ]);
    table.add_row(vec!["Parameters".to_string(), summary.parameters.join(", ")]);
    table.add_row(vec!["Measurements".to_string(), summary.measurements.to_string()]);
    table.add_row(vec!["Predictions".to_string(), summary.predictions.to_string()]);
    table.add_row(vec!["Best".to_string(), point(&summary.best)]);
    table.add_row(vec!["Solution".to_string(), point(&summary.solution)]);
    table.add_row(vec![
        "Improvement".to_string(),
        text(summary.improvement.map(|v| format!("{:.1}%", v * 100.0))),
    ]);
    table.add_row(vec!["Pending".to_string(), summary.pending.to_string()]);

    let stats = &summary.stats;
    table.add_row(vec![
        "Events".to_string(),
        format!(
            "{} received, {} applied, {} resets, {} held, {} stale, {} dropped, {} undecodable",
            stats.received,
            stats.applied,
            stats.resets,
            stats.held,
            stats.stale,
            stats.dropped,
            stats.undecodable
        ),
    ]);

    for entry in &summary.recent_info {
        let color = match entry.level {
            LogLevel::Debug | LogLevel::Info => Color::Reset,
            LogLevel::Warning => Color::Yellow,
            LogLevel::Error | LogLevel::Critical => Color::Red,
        };
        table.add_row(vec![
            Cell::new(entry.level.as_str()).fg(color),
            Cell::new(&entry.message),
        ]);
    }
    table
}

// ==================== Projections ====================

pub fn grid_table(grid: &Grid) -> Table {
    let corner = format!("{} \\ {}", grid.row_parameter, grid.column_parameter);
    let mut header = vec![corner];
    header.extend(grid.columns.iter().map(ToString::to_string));
    let header: Vec<&str> = header.iter().map(String::as_str).collect();

    let mut table = new_table(&header);
    for (row, cells) in grid.rows.iter().zip(&grid.cells) {
        let mut line = vec![Cell::new(row.to_string()).fg(Color::Cyan)];
        line.extend(cells.iter().map(|cell| Cell::new(number(*cell))));
        table.add_row(line);
    }
    table
}

fn plot(value: &PlotValue, ticks: Option<&Vec<String>>) -> String {
    match value {
        PlotValue::Value(v) => {
            let label = ticks.and_then(|t| {
                let index = v.round();
                (index >= 0.0).then(|| t.get(index as usize)).flatten()
            });
            label.cloned().unwrap_or_else(|| format!("{v}"))
        }
        PlotValue::Missing => "None".to_string(),
        PlotValue::OutOfDomain => OUT_OF_DOMAIN.to_string(),
    }
}

/// One row per record, one column per dimension.
pub fn dimensions_table(set: &DimensionSet) -> Table {
    let header: Vec<&str> = set.dimensions.iter().map(|d| d.label.as_str()).collect();
    let mut table = new_table(&header);

    let records = set.dimensions.first().map_or(0, |d| d.values.len());
    for record in 0..records {
        let row: Vec<Cell> = set
            .dimensions
            .iter()
            .map(|dimension| {
                let value = &dimension.values[record];
                let cell = Cell::new(plot(value, dimension.tick_text.as_ref()));
                if matches!(value, PlotValue::OutOfDomain) {
                    cell.fg(Color::Red)
                } else {
                    cell
                }
            })
            .collect();
        table.add_row(row);
    }
    table
}

pub fn trend_table(trend: &Trend) -> Table {
    let mut table = new_table(&["#", trend.objective.as_str(), "Best so far"]);
    for (observed, best) in trend.observed.iter().zip(&trend.best_so_far) {
        let improved = observed.value.is_some() && observed.value == best.value;
        let best_cell = Cell::new(number(best.value));
        table.add_row(vec![
            Cell::new(observed.measured_points),
            Cell::new(number(observed.value)),
            if improved {
                best_cell.fg(Color::Green)
            } else {
                best_cell
            },
        ]);
    }
    table
}
