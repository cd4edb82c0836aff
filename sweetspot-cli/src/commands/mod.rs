pub mod config;
pub mod dimensions;
pub mod grid;
pub mod replay;
pub mod trend;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use sweetspot_core::{EventRouter, ExperimentState, FeedStats, JsonLinesSource, drain};
use tokio::io::{AsyncRead, BufReader};
use tracing::debug;

use crate::config::SweetspotConfig;

/// Event stream input shared by the projection commands.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// JSON-lines event file (`-` reads stdin)
    pub input: PathBuf,
}

pub type InputSource = JsonLinesSource<BufReader<Box<dyn AsyncRead + Unpin + Send>>>;

/// Open a JSON-lines event source, treating `-` as stdin.
pub async fn open_input(path: &Path) -> Result<InputSource> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = if path == Path::new("-") {
        Box::new(tokio::io::stdin())
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        Box::new(file)
    };
    Ok(JsonLinesSource::new(BufReader::new(reader)))
}

/// Replay a whole event stream into a fresh router.
pub async fn replay(path: &Path, config: &SweetspotConfig) -> Result<(EventRouter, FeedStats)> {
    let mut source = open_input(path).await?;
    let mut router = EventRouter::new(config.engine.clone());
    let stats = drain(&mut router, &mut source)
        .await
        .with_context(|| format!("failed to read events from {}", path.display()))?;
    debug!(received = stats.received, applied = stats.applied, "replay finished");
    Ok((router, stats))
}

/// The current experiment, or an error when the stream never described one.
pub fn active_state(router: &EventRouter) -> Result<&ExperimentState> {
    match router.state() {
        Some(state) => Ok(state),
        None => bail!("no experiment description received"),
    }
}
