use anyhow::Result;
use clap::Args;

use super::InputArgs;
use crate::config::SweetspotConfig;
use crate::render::{self, Summary};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub async fn run(args: ReplayArgs, config: &SweetspotConfig) -> Result<()> {
    let (router, stats) = super::replay(&args.input.input, config).await?;
    let summary = Summary::build(&router, stats, config.display.recent_info);
    render::emit(config.display.format, &summary, render::summary_table)
}
