use anyhow::Result;
use clap::Args;
use sweetspot_core::TrendProjector;

use super::InputArgs;
use crate::config::SweetspotConfig;
use crate::render;

#[derive(Args, Debug)]
pub struct TrendArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub async fn run(args: TrendArgs, config: &SweetspotConfig) -> Result<()> {
    let (router, _) = super::replay(&args.input.input, config).await?;
    let state = super::active_state(&router)?;
    let trend = TrendProjector::project(state.tracker(), state.descriptor().objective());
    render::emit(config.display.format, &trend, render::trend_table)
}
