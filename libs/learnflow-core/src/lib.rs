//! Stage sequencing and scoring engine for vocabulary learn sessions.
//!
//! Provides:
//! - Task types and the upstream wire format
//! - Grading rules per exercise kind, with a bounded edit-distance check
//! - Per-task state machines (translation attempts, word order, pair matching)
//! - The stage sequencer, score aggregation and outcome reporting
//! - An async session driver over a pluggable transport

pub mod audio;
pub mod distance;
pub mod error;
pub mod exercise;
pub mod grading;
pub mod report;
pub mod score;
pub mod sequencer;
pub mod session;
pub mod transport;
pub mod types;
pub mod view;

pub use audio::{AudioCaptureSession, AudioDevice, RecordingHandle};
pub use distance::{classify, EditClass};
pub use error::{
    ActionError, CaptureError, FlowError, InvariantViolation, Result, SessionError, TaskError,
};
pub use exercise::{MatchOption, SessionRng, Side};
pub use grading::Grade;
pub use report::{OutcomeReporter, ReviewInterval, SessionSummary};
pub use score::ScoreAggregator;
pub use sequencer::{Feedback, PendingPronunciation, PronunciationTicket, StageSequencer};
pub use session::{open_session, run_session, FlowSettings, Learner, LearnerAction, SessionOutcome};
pub use transport::{load_batch, PronunciationResult, SessionMode, Transport};
pub use types::{
    CefrLevel, CollectionId, ContextTask, MatchingTask, PronunciationTask, ScoreBreakdown,
    SpellingTask, StageKind, StageResult, Task, TaskBatch, TaskGroups, TranslationDirection,
    TranslationTask, WordOutcome, WordPair,
};
pub use view::{ProgressEvent, SequencerState, SessionView, TaskView};
