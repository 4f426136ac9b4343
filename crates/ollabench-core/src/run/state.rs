use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    WarmingUp,
    Preparing,
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::WarmingUp => "warming up",
            RunStatus::Preparing => "preparing",
            RunStatus::Running => "running",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Cancelled | RunStatus::Completed | RunStatus::Failed
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunStatus::WarmingUp | RunStatus::Preparing | RunStatus::Running
        )
    }
}

/// Transient progress of the current run, owned by the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    pub completed_count: u32,
    pub total_count: u32,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, total_count: u32) {
        self.status = RunStatus::WarmingUp;
        self.completed_count = 0;
        self.total_count = total_count;
    }

    pub fn transition(&mut self, status: RunStatus) {
        self.status = status;
    }

    /// Returns the new completed count.
    pub fn record_completion(&mut self) -> u32 {
        self.completed_count += 1;
        self.completed_count
    }

    pub fn percentage(&self) -> u8 {
        if self.total_count == 0 {
            return 0;
        }
        ((self.completed_count as u64 * 100) / self.total_count as u64).min(100) as u8
    }
}
