//! Periodic score board output.

use crate::scoreboard::{Scoreboard, ScoreboardFormat};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Writes a score board snapshot to a sink on a fixed period, starting
/// immediately.
pub struct ScoreboardRenderer {
    scoreboard: Arc<Scoreboard>,
    period: Duration,
    format: ScoreboardFormat,
    sink: Box<dyn Write + Send>,
}

impl ScoreboardRenderer {
    pub fn new(
        scoreboard: Arc<Scoreboard>,
        period: Duration,
        format: ScoreboardFormat,
        sink: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            scoreboard,
            period,
            format,
            sink,
        }
    }

    pub fn stdout(
        scoreboard: Arc<Scoreboard>,
        period: Duration,
        format: ScoreboardFormat,
    ) -> Self {
        Self::new(scoreboard, period, format, Box::new(io::stdout()))
    }

    /// Renderer appending to the file at `path`, creating it if needed.
    pub fn to_file(
        scoreboard: Arc<Scoreboard>,
        period: Duration,
        format: ScoreboardFormat,
        path: &Path,
    ) -> io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::new(scoreboard, period, format, Box::new(file)))
    }

    pub fn render_once(&mut self) -> io::Result<()> {
        self.scoreboard.render_score_board(&mut *self.sink, self.format)?;
        self.sink.flush()
    }

    /// Render every period until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.render_once() {
                        warn!("Failed to render score board: {e}");
                    }
                }
            }
        }

        info!("Score board watcher terminated");
    }
}
