use anyhow::{Result, bail};
use clap::Args;
use serde::Serialize;
use sweetspot_core::{Grid, GridAxes, GridMarkers, GridProjector};

use super::InputArgs;
use crate::config::SweetspotConfig;
use crate::render;

#[derive(Args, Debug)]
pub struct GridArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Parameter plotted along the rows
    #[arg(long)]
    pub rows: Option<String>,

    /// Parameter plotted along the columns
    #[arg(long)]
    pub columns: Option<String>,

    /// Project the prediction store instead of measurements
    #[arg(long)]
    pub predictions: bool,
}

#[derive(Debug, Serialize)]
struct GridView {
    grid: Grid,
    markers: GridMarkers,
}

pub async fn run(args: GridArgs, config: &SweetspotConfig) -> Result<()> {
    let (router, _) = super::replay(&args.input.input, config).await?;
    let state = super::active_state(&router)?;
    let descriptor = state.descriptor();

    // Default to the first two declared parameters
    let mut names = descriptor.parameter_names();
    let axes = match (args.rows, args.columns) {
        (Some(rows), Some(columns)) => GridAxes::new(rows, columns),
        (rows, columns) => {
            let (Some(first), Some(second)) = (names.next(), names.next()) else {
                bail!("a grid needs at least two parameters");
            };
            GridAxes::new(
                rows.unwrap_or_else(|| first.to_string()),
                columns.unwrap_or_else(|| second.to_string()),
            )
        }
    };

    let store = if args.predictions {
        state.predictions()
    } else {
        state.measurements()
    };
    let view = GridView {
        grid: GridProjector::project(store, descriptor, &axes)?,
        markers: GridProjector::markers(store, state.solution(), descriptor, &axes)?,
    };
    render::emit(config.display.format, &view, |view| render::grid_table(&view.grid))
}
