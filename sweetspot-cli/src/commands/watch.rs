use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use sweetspot_core::{EngineFeed, EventRouter};
use tracing::info;

use crate::config::{OutputFormat, SweetspotConfig};
use crate::render::{self, Summary};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// JSON-lines event stream (`-` reads stdin)
    #[arg(default_value = "-")]
    pub input: PathBuf,
}

pub async fn run(args: WatchArgs, config: &SweetspotConfig) -> Result<()> {
    let source = super::open_input(&args.input).await?;
    let feed = EngineFeed::spawn(EventRouter::new(config.engine.clone()), source);
    let dashboard = feed.dashboard();
    let mut changes = feed.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, detaching feed");
                feed.detach();
                break;
            }
            changed = changes.changed() => {
                // Sender drops when the stream ends
                if changed.is_err() {
                    break;
                }
                if config.display.format == OutputFormat::Table {
                    let version = *changes.borrow_and_update();
                    println!("{}", status_line(version, &*dashboard.read().await));
                }
            }
        }
    }

    let stats = feed.join().await;
    let router = dashboard.read().await;
    let summary = Summary::build(&router, stats, config.display.recent_info);
    render::emit(config.display.format, &summary, render::summary_table)
}

fn status_line(version: u64, router: &EventRouter) -> String {
    let Some(state) = router.state() else {
        return format!("#{version} waiting for experiment description ({} held)", router.pending_len());
    };
    let best = state
        .tracker()
        .best()
        .and_then(|best| best.value)
        .map_or_else(|| "-".to_string(), |v| format!("{v}"));
    format!(
        "#{version} {} measured={} best {}={}",
        state.experiment(),
        state.measurements().len(),
        state.descriptor().objective().name,
        best
    )
}
