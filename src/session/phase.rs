//! UI-facing generation phase and progress

use serde::Serialize;

use crate::stream::{Stage, StageEvent};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Starting,
    Context,
    Intent,
    Planning,
    Generating,
    Validating,
    Repairing,
    Complete,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Starting => "starting",
            Phase::Context => "context",
            Phase::Intent => "intent",
            Phase::Planning => "planning",
            Phase::Generating => "generating",
            Phase::Validating => "validating",
            Phase::Repairing => "repairing",
            Phase::Complete => "complete",
            Phase::Error => "error",
        }
    }

    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Context => Phase::Context,
            Stage::Intent => Phase::Intent,
            Stage::Plan => Phase::Planning,
            Stage::Generate => Phase::Generating,
            Stage::Validate => Phase::Validating,
            Stage::Repair => Phase::Repairing,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }

    /// Streaming or about to stream
    pub fn is_active(&self) -> bool {
        !matches!(self, Phase::Idle | Phase::Complete | Phase::Error)
    }

    /// Fixed progress shown on entering the phase
    pub fn progress(&self) -> u8 {
        match self {
            Phase::Idle | Phase::Starting => 0,
            Phase::Context => 5,
            Phase::Intent => 15,
            Phase::Planning => 30,
            Phase::Generating => GENERATING_BASE,
            Phase::Validating => 80,
            Phase::Repairing => 85,
            Phase::Complete => 100,
            Phase::Error => 0,
        }
    }
}

const GENERATING_BASE: u8 = 50;
const GENERATING_CAP: u8 = 95;
const PER_FILE: usize = 5;

/// Generating ramps from 50 towards 95 as files arrive
pub fn generating_progress(files: usize) -> u8 {
    let ramp = files.saturating_mul(PER_FILE).min((GENERATING_CAP - GENERATING_BASE) as usize);
    GENERATING_BASE + ramp as u8
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GenerationPhase {
    pub phase: Phase,
    pub message: String,
    pub progress: u8,
}

impl Default for GenerationPhase {
    fn default() -> Self {
        Self::idle("")
    }
}

impl GenerationPhase {
    fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            progress: phase.progress(),
        }
    }

    pub fn idle(message: impl Into<String>) -> Self {
        Self::new(Phase::Idle, message)
    }

    pub fn starting() -> Self {
        Self::new(Phase::Starting, "Starting generation...")
    }

    pub fn stage(event: &StageEvent, files: usize) -> Self {
        let phase = Phase::for_stage(event.stage);
        let message = if event.message.is_empty() {
            format!("{}...", event.stage.as_str())
        } else {
            event.message.clone()
        };
        let mut next = Self::new(phase, message);
        if phase == Phase::Generating {
            next.progress = generating_progress(files);
        }
        next
    }

    pub fn generating(files: usize, path: &str) -> Self {
        Self {
            phase: Phase::Generating,
            message: format!("Writing {}", path),
            progress: generating_progress(files),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(Phase::Complete, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Phase::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generating_progress_is_capped() {
        assert_eq!(generating_progress(0), 50);
        assert_eq!(generating_progress(3), 65);
        assert_eq!(generating_progress(9), 95);
        assert_eq!(generating_progress(500), 95);
    }
}
