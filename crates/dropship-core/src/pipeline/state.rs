//! Pipeline stages and the per-run transition log.

use std::fmt;

use serde::Serialize;
use tracing::info;

/// Steps of a deployment run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Provisioning,
    Packaging,
    CredentialNegotiation,
    Uploading,
    Triggering,
}

impl Stage {
    pub const ORDER: [Stage; 5] = [
        Stage::Provisioning,
        Stage::Packaging,
        Stage::CredentialNegotiation,
        Stage::Uploading,
        Stage::Triggering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Provisioning => "provisioning",
            Stage::Packaging => "packaging",
            Stage::CredentialNegotiation => "credential_negotiation",
            Stage::Uploading => "uploading",
            Stage::Triggering => "triggering",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Running { stage: Stage },
    Done,
    Failed { stage: Stage },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }
}

/// Records every state a run passes through.
#[derive(Debug, Clone)]
pub(crate) struct TransitionLog {
    current: PipelineState,
    history: Vec<PipelineState>,
}

impl TransitionLog {
    pub(crate) fn new() -> Self {
        Self {
            current: PipelineState::Pending,
            history: vec![PipelineState::Pending],
        }
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.push(PipelineState::Running { stage });
        info!(stage = %stage, "Entering stage");
    }

    pub(crate) fn done(&mut self) {
        self.push(PipelineState::Done);
    }

    pub(crate) fn fail(&mut self, stage: Stage) {
        self.push(PipelineState::Failed { stage });
    }

    pub(crate) fn current(&self) -> PipelineState {
        self.current
    }

    pub(crate) fn into_history(self) -> Vec<PipelineState> {
        self.history
    }

    fn push(&mut self, state: PipelineState) {
        debug_assert!(!self.current.is_terminal(), "run already finished");
        self.current = state;
        self.history.push(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_matches_declaration() {
        let mut sorted = Stage::ORDER;
        sorted.sort();
        assert_eq!(sorted, Stage::ORDER);
    }

    #[test]
    fn log_records_every_transition() {
        let mut log = TransitionLog::new();
        log.enter(Stage::Provisioning);
        log.enter(Stage::Packaging);
        log.fail(Stage::Packaging);

        assert_eq!(log.current(), PipelineState::Failed { stage: Stage::Packaging });
        assert_eq!(
            log.into_history(),
            vec![
                PipelineState::Pending,
                PipelineState::Running { stage: Stage::Provisioning },
                PipelineState::Running { stage: Stage::Packaging },
                PipelineState::Failed { stage: Stage::Packaging },
            ]
        );
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_value(PipelineState::Running {
            stage: Stage::CredentialNegotiation,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "running", "stage": "credential_negotiation"})
        );
        assert_eq!(
            serde_json::to_value(PipelineState::Done).unwrap(),
            serde_json::json!({"state": "done"})
        );
    }
}
