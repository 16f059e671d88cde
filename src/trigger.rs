//! State of the "download PDF" control
//!
//! The control disables itself while an export runs, shows the terminal
//! status for [`STATUS_DISPLAY_DELAY`], then returns to idle.

use crate::export::{ExportStatus, ProgressEvent, ProgressSink};
use std::time::{Duration, Instant};

/// How long the terminal status stays on the control
pub const STATUS_DISPLAY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Running { current: usize, total: usize },
    Finished { status: ExportStatus, at: Instant },
}

#[derive(Debug, Clone)]
pub struct ExportTrigger {
    state: TriggerState,
}

impl Default for ExportTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportTrigger {
    pub fn new() -> Self {
        ExportTrigger {
            state: TriggerState::Idle,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Clicks are accepted only when idle
    pub fn is_enabled(&self) -> bool {
        matches!(self.state, TriggerState::Idle)
    }

    /// Mark the control busy before the first page is reported
    pub fn start(&mut self) {
        self.state = TriggerState::Running {
            current: 0,
            total: 0,
        };
    }

    pub fn label(&self) -> String {
        match self.state {
            TriggerState::Idle => "Download PDF".to_string(),
            TriggerState::Running { total: 0, .. } => "Generating PDF...".to_string(),
            TriggerState::Running { current, total } => {
                format!("Processing page {}/{}...", current, total)
            }
            TriggerState::Finished {
                status: ExportStatus::Success,
                ..
            } => "Download Complete!".to_string(),
            TriggerState::Finished {
                status: ExportStatus::Failure,
                ..
            } => "Download Failed".to_string(),
        }
    }

    /// Restore the idle state once the status has been shown long enough
    pub fn tick(&mut self, now: Instant) {
        if let TriggerState::Finished { at, .. } = self.state {
            if now.saturating_duration_since(at) >= STATUS_DISPLAY_DELAY {
                self.state = TriggerState::Idle;
            }
        }
    }
}

impl ProgressSink for ExportTrigger {
    fn report(&mut self, event: ProgressEvent) {
        self.state = match event {
            ProgressEvent::Page { current, total } => TriggerState::Running { current, total },
            ProgressEvent::Finished(status) => TriggerState::Finished {
                status,
                at: Instant::now(),
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_the_run() {
        let mut trigger = ExportTrigger::new();
        assert_eq!(trigger.label(), "Download PDF");
        assert!(trigger.is_enabled());

        trigger.start();
        assert_eq!(trigger.label(), "Generating PDF...");
        assert!(!trigger.is_enabled());

        trigger.report(ProgressEvent::Page { current: 4, total: 78 });
        assert_eq!(trigger.label(), "Processing page 4/78...");

        trigger.report(ProgressEvent::Finished(ExportStatus::Success));
        assert_eq!(trigger.label(), "Download Complete!");
        assert!(!trigger.is_enabled());
    }

    #[test]
    fn status_clears_after_the_delay() {
        let mut trigger = ExportTrigger::new();
        trigger.report(ProgressEvent::Finished(ExportStatus::Failure));
        assert_eq!(trigger.label(), "Download Failed");

        let at = match trigger.state() {
            TriggerState::Finished { at, .. } => at,
            other => panic!("unexpected state {:?}", other),
        };
        trigger.tick(at + Duration::from_millis(500));
        assert!(!trigger.is_enabled());
        trigger.tick(at + STATUS_DISPLAY_DELAY);
        assert!(trigger.is_enabled());
    }
}
