use anyhow::Result;
use clap::Args;
use sweetspot_core::DimensionProjector;
use tracing::warn;

use super::InputArgs;
use crate::config::SweetspotConfig;
use crate::render;

#[derive(Args, Debug)]
pub struct DimensionsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Project the prediction store instead of measurements
    #[arg(long)]
    pub predictions: bool,
}

pub async fn run(args: DimensionsArgs, config: &SweetspotConfig) -> Result<()> {
    let (router, _) = super::replay(&args.input.input, config).await?;
    let state = super::active_state(&router)?;
    let store = if args.predictions {
        state.predictions()
    } else {
        state.measurements()
    };

    let set = DimensionProjector::project(store, state.descriptor());
    for violation in &set.violations {
        warn!(
            record = violation.record,
            parameter = %violation.parameter,
            value = %violation.value,
            "value outside declared domain"
        );
    }
    render::emit(config.display.format, &set, render::dimensions_table)
}
