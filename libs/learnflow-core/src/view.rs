//! Read-only snapshots of a running session, shaped for display.

use serde::{Deserialize, Serialize};

use crate::exercise::MatchOption;
use crate::report::SessionSummary;
use crate::types::{CefrLevel, StageKind, TranslationDirection};

/// Where the sequencer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "stage", rename_all = "snake_case")]
pub enum SequencerState {
    Running(StageKind),
    Done,
    Abandoned,
}

impl SequencerState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running(_))
    }
}

/// Position and running score of a session. Observational only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Current stage, `None` once the session is over.
    pub stage: Option<StageKind>,
    /// Position of the current task inside its stage.
    pub index: usize,
    /// Number of tasks in the current stage.
    pub total: usize,
    pub running_score: f64,
}

/// The task in front of the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TaskView {
    Translation {
        id: String,
        direction: TranslationDirection,
        word: String,
        variants: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
        attempts_left: u32,
        ruled_out: Vec<usize>,
        can_skip: bool,
    },
    Spelling {
        id: String,
        prompt: String,
    },
    Pronunciation {
        id: String,
        headline: String,
        subtitle: String,
        recording: bool,
        awaiting_score: bool,
    },
    Context {
        id: String,
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<CefrLevel>,
        pool: Vec<String>,
        picked: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        wrong_flag: Option<usize>,
    },
    Matching {
        id: String,
        left: Vec<MatchOption>,
        right: Vec<MatchOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_left: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_right: Option<usize>,
        remaining: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SequencerState,
    pub progress: ProgressEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
}
