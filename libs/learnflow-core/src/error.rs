//! Error types for learnflow-core.

use thiserror::Error;

use crate::types::StageKind;

/// Result type alias using FlowError.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Environmental failures. None of them is fatal to a session: the affected
/// task or report degrades to zero points or is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// A learner action that is not legal in the current session state.
/// Rejected actions never change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("expected a {expected} action but the session is at the {actual} stage")]
    WrongStage {
        expected: StageKind,
        actual: StageKind,
    },

    #[error("option {index} is out of range ({len} variants)")]
    OptionOutOfRange { index: usize, len: usize },

    #[error("option {0} was already ruled out")]
    OptionRuledOut(usize),

    #[error("skip is only allowed after a wrong answer while attempts remain")]
    SkipNotAllowed,

    #[error("a recording is already active")]
    AlreadyRecording,

    #[error("no recording is active")]
    NotRecording,

    #[error("recording handle does not belong to the active recording")]
    StaleRecording,

    #[error("pronunciation score for the current task is still pending")]
    SubmissionPending,

    #[error("token {index} is not in the pool ({len} left)")]
    TokenOutOfRange { index: usize, len: usize },

    #[error("pair {0} is not on the board")]
    UnknownPair(usize),

    #[error("session has finished")]
    Finished,

    #[error("session was abandoned")]
    Abandoned,
}

/// Broken sequencer contract. Indicates a bug, never an environmental failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("score breakdown was already finalized")]
    AlreadyFinalized,

    #[error("{0} stage was recorded twice")]
    StageRecordedTwice(StageKind),

    #[error("{stage} stage left with {unresolved} unresolved tasks")]
    UnresolvedTasks { stage: StageKind, unresolved: usize },
}

/// A fetched task whose payload breaks its own invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task {id}: translation needs at least two variants")]
    TooFewVariants { id: String },

    #[error("task {id}: correct index {index} is out of range")]
    CorrectIndexOutOfRange { id: String, index: usize },

    #[error("task {id}: at least one attempt is required")]
    NoAttempts { id: String },

    #[error("task {id}: empty {field}")]
    EmptyField { id: String, field: &'static str },

    #[error("task {id}: matching task has no pairs")]
    NoPairs { id: String },
}

/// Failure to start a recording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Device(#[from] FlowError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Anything a sequencer operation can reject with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),
}
