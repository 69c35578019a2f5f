//! Live counters shared by the injectors and the score board renderer.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Table};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Layout used when rendering the score board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ScoreboardFormat {
    /// Human-readable table
    #[default]
    Table,
    /// One JSON object per line
    Json,
}

/// Throughput and in-flight counters of a run.
///
/// Every counter is updated on its own; a snapshot reads each counter's
/// current value but is not atomic across counters.
#[derive(Debug)]
pub struct Scoreboard {
    processed_registrations: AtomicU64,
    processed_unregistrations: AtomicU64,
    processed_interests: AtomicU64,
    active_interests: AtomicU64,
    registry_size: AtomicU64,
    start_time: Instant,
}

/// Point-in-time copy of the score board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreboardSnapshot {
    pub timestamp: String,
    pub elapsed_secs: f64,
    pub processed_registrations: u64,
    pub processed_unregistrations: u64,
    pub processed_interests: u64,
    pub active_interests: u64,
    pub registry_size: u64,
    pub registrations_per_sec: f64,
    pub unregistrations_per_sec: f64,
    pub interests_per_sec: f64,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self {
            processed_registrations: AtomicU64::new(0),
            processed_unregistrations: AtomicU64::new(0),
            processed_interests: AtomicU64::new(0),
            active_interests: AtomicU64::new(0),
            registry_size: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn processed_registration_increment(&self) {
        self.processed_registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_unregistration_increment(&self) {
        self.processed_unregistrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed_interests_increment(&self) {
        self.processed_interests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_interests_increment(&self) {
        self.active_interests.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement the active interest count, saturating at zero.
    pub fn active_interests_decrement(&self) {
        let _ = self
            .active_interests
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn set_registry_size(&self, size: usize) {
        self.registry_size.store(size as u64, Ordering::Relaxed);
    }

    pub fn processed_registrations(&self) -> u64 {
        self.processed_registrations.load(Ordering::Relaxed)
    }

    pub fn processed_unregistrations(&self) -> u64 {
        self.processed_unregistrations.load(Ordering::Relaxed)
    }

    pub fn processed_interests(&self) -> u64 {
        self.processed_interests.load(Ordering::Relaxed)
    }

    pub fn active_interests(&self) -> u64 {
        self.active_interests.load(Ordering::Relaxed)
    }

    pub fn registry_size(&self) -> u64 {
        self.registry_size.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ScoreboardSnapshot {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let registrations = self.processed_registrations();
        let unregistrations = self.processed_unregistrations();
        let interests = self.processed_interests();

        let per_sec = |count: u64| {
            if elapsed > 0.0 {
                count as f64 / elapsed
            } else {
                0.0
            }
        };

        ScoreboardSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            elapsed_secs: elapsed,
            processed_registrations: registrations,
            processed_unregistrations: unregistrations,
            processed_interests: interests,
            active_interests: self.active_interests(),
            registry_size: self.registry_size(),
            registrations_per_sec: per_sec(registrations),
            unregistrations_per_sec: per_sec(unregistrations),
            interests_per_sec: per_sec(interests),
        }
    }

    /// Write the current counters to `sink` in the given layout.
    pub fn render_score_board(
        &self,
        sink: &mut dyn Write,
        format: ScoreboardFormat,
    ) -> io::Result<()> {
        let snapshot = self.snapshot();
        match format {
            ScoreboardFormat::Table => writeln!(sink, "{}", format_table(&snapshot)),
            ScoreboardFormat::Json => {
                let line = serde_json::to_string(&snapshot).map_err(io::Error::other)?;
                writeln!(sink, "{line}")
            }
        }
    }
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a snapshot as a fixed-layout table.
pub fn format_table(snapshot: &ScoreboardSnapshot) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Score board", "Value", "Per second"]);

    let rows = [
        (
            "Registrations processed",
            snapshot.processed_registrations,
            Some(snapshot.registrations_per_sec),
        ),
        (
            "Unregistrations processed",
            snapshot.processed_unregistrations,
            Some(snapshot.unregistrations_per_sec),
        ),
        (
            "Interests processed",
            snapshot.processed_interests,
            Some(snapshot.interests_per_sec),
        ),
        ("Active interests", snapshot.active_interests, None),
        ("Registry size", snapshot.registry_size, None),
    ];

    for (label, value, rate) in rows {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format_number(value)).set_alignment(CellAlignment::Right),
            Cell::new(rate.map(|r| format!("{r:.1}")).unwrap_or_else(|| "-".to_string()))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "Score board after {:.1}s ({})\n{table}",
        snapshot.elapsed_secs, snapshot.timestamp
    )
}

/// `1234567` -> `1,234,567`.
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let lead = match digits.len() % 3 {
        0 => 3,
        r => r,
    };

    let mut groups = vec![&digits[..lead]];
    groups.extend((lead..digits.len()).step_by(3).map(|i| &digits[i..i + 3]));
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_start_at_zero() {
        let scoreboard = Scoreboard::new();
        let snapshot = scoreboard.snapshot();

        assert_eq!(snapshot.processed_registrations, 0);
        assert_eq!(snapshot.processed_unregistrations, 0);
        assert_eq!(snapshot.processed_interests, 0);
        assert_eq!(snapshot.active_interests, 0);
        assert_eq!(snapshot.registry_size, 0);
        assert!(snapshot.registrations_per_sec.is_finite());
    }

    #[test]
    fn test_counter_updates() {
        let scoreboard = Scoreboard::new();

        scoreboard.processed_registration_increment();
        scoreboard.processed_registration_increment();
        scoreboard.processed_unregistration_increment();
        scoreboard.processed_interests_increment();
        scoreboard.active_interests_increment();
        scoreboard.active_interests_increment();
        scoreboard.active_interests_decrement();
        scoreboard.set_registry_size(42);

        assert_eq!(scoreboard.processed_registrations(), 2);
        assert_eq!(scoreboard.processed_unregistrations(), 1);
        assert_eq!(scoreboard.processed_interests(), 1);
        assert_eq!(scoreboard.active_interests(), 1);
        assert_eq!(scoreboard.registry_size(), 42);
    }

    #[test]
    fn test_active_interests_never_underflow() {
        let scoreboard = Scoreboard::new();
        scoreboard.active_interests_decrement();
        assert_eq!(scoreboard.active_interests(), 0);
    }

    #[test]
    fn test_concurrent_updates() {
        let scoreboard = Arc::new(Scoreboard::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&scoreboard);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        s.processed_registration_increment();
                        s.processed_interests_increment();
                        s.active_interests_increment();
                        s.active_interests_decrement();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(scoreboard.processed_registrations(), 8000);
        assert_eq!(scoreboard.processed_interests(), 8000);
        assert_eq!(scoreboard.active_interests(), 0);
    }

    #[test]
    fn test_render_table() {
        let scoreboard = Scoreboard::new();
        for _ in 0..1234 {
            scoreboard.processed_registration_increment();
        }
        scoreboard.set_registry_size(1000);

        let mut out = Vec::new();
        scoreboard
            .render_score_board(&mut out, ScoreboardFormat::Table)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("Score board after"));
        assert!(text.contains("Registrations processed"));
        assert!(text.contains("Unregistrations processed"));
        assert!(text.contains("Interests processed"));
        assert!(text.contains("Active interests"));
        assert!(text.contains("Registry size"));
        assert!(text.contains("1,234"));
        assert!(text.contains("1,000"));
    }

    #[test]
    fn test_render_json_line() {
        let scoreboard = Scoreboard::new();
        scoreboard.processed_interests_increment();
        scoreboard.active_interests_increment();

        let mut out = Vec::new();
        scoreboard
            .render_score_board(&mut out, ScoreboardFormat::Json)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 1);
        let snapshot: ScoreboardSnapshot = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(snapshot.processed_interests, 1);
        assert_eq!(snapshot.active_interests, 1);
        chrono::DateTime::parse_from_rfc3339(&snapshot.timestamp)
            .expect("Timestamp should be valid RFC3339");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(100_000), "100,000");
        assert_eq!(format_number(u64::MAX), "18,446,744,073,709,551,615");
    }
}
