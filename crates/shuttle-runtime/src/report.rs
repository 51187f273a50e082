//! [`TickReport`] – what one tick did, for terminals and logs.

use serde::Serialize;

use crate::steps::ProcessStep;

/// How the main step ended this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum TickOutcome {
    Advanced,
    Skipped(String),
    Retried(String),
    /// The execution budget was spent before the step could run.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    /// Step index the tick started on.
    pub from: usize,
    /// Step index after the tick.
    pub to: usize,
    pub step: &'static str,
    pub outcome: TickOutcome,
    pub elapsed_ms: i64,
    /// Host instruction load at the end of the tick.
    pub load: f64,
    pub waypoint_count: usize,
    /// Waypoint the shuttle is heading for, shown as "Next waypoint".
    pub destination: Option<String>,
    pub status_text: String,
    /// Line produced by the sub-process micro-step, if any.
    pub sub_process: Option<String>,
}

impl TickReport {
    pub fn advanced(&self) -> bool {
        matches!(self.outcome, TickOutcome::Advanced | TickOutcome::Skipped(_))
    }

    /// `true` when this tick finished the last step and wrapped to the first.
    pub fn completed_lap(&self) -> bool {
        self.advanced() && self.from + 1 == ProcessStep::ALL.len()
    }

    /// First line of the progress display.
    pub fn progress(&self) -> String {
        let what = if self.completed_lap() {
            "Completed all steps".to_string()
        } else if self.advanced() {
            format!("Completed step {}", self.from)
        } else {
            format!("Completed step {} partially", self.from)
        };
        format!("{what} in {}ms, {:.0}% load", self.elapsed_ms, self.load * 100.0)
    }
}

impl std::fmt::Display for TickReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.progress())?;
        writeln!(f, "Step: {} ({})", self.from, self.step)?;
        match &self.outcome {
            TickOutcome::Skipped(reason) => writeln!(f, "Skipped: {reason}")?,
            TickOutcome::Retried(reason) => writeln!(f, "Waiting: {reason}")?,
            TickOutcome::Deferred => writeln!(f, "Deferred: execution budget spent")?,
            TickOutcome::Advanced => {}
        }
        if !self.status_text.is_empty() {
            writeln!(f, "{}", self.status_text)?;
        }
        if let Some(line) = &self.sub_process {
            writeln!(f, "{line}")?;
        }
        writeln!(f, "Registered waypoints: #{}", self.waypoint_count)?;
        write!(
            f,
            "Next waypoint: {}",
            self.destination.as_deref().unwrap_or("NA")
        )
    }
}
