//! Core types for the learn flow: tasks, stages, scores and outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TaskError;

/// Collection identifier as used by the vocabulary API.
pub type CollectionId = i64;

/// Exercise kind. Each kind has its own stage in the learn flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Translation,
    Spelling,
    Pronunciation,
    Context,
    Matching,
}

impl StageKind {
    /// Stage order of a session. Never reordered.
    pub const ORDER: [StageKind; 5] = [
        Self::Translation,
        Self::Spelling,
        Self::Pronunciation,
        Self::Context,
        Self::Matching,
    ];

    /// Get the stage name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Spelling => "spelling",
            Self::Pronunciation => "pronunciation",
            Self::Context => "context",
            Self::Matching => "matching",
        }
    }

    /// Maximum percentage this stage can contribute to the final score.
    pub fn ceiling(self) -> f64 {
        match self {
            Self::Translation => 30.0,
            Self::Spelling => 15.0,
            Self::Pronunciation => 15.0,
            Self::Context => 30.0,
            Self::Matching => 10.0,
        }
    }

    /// Position in [`StageKind::ORDER`].
    pub fn index(self) -> usize {
        match self {
            Self::Translation => 0,
            Self::Spelling => 1,
            Self::Pronunciation => 2,
            Self::Context => 3,
            Self::Matching => 4,
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        Self::ORDER.get(self.index() + 1).copied()
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a translation prompt is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationDirection {
    #[serde(rename = "eng-ru")]
    EngRu,
    #[serde(rename = "ru-eng")]
    RuEng,
    #[serde(rename = "audio-ru")]
    AudioRu,
}

impl Default for TranslationDirection {
    fn default() -> Self {
        Self::EngRu
    }
}

/// CEFR band the upstream generated a context sentence for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CefrLevel {
    A,
    B,
    C,
}

/// Multiple-choice translation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationTask {
    pub id: String,
    #[serde(rename = "type", default)]
    pub direction: TranslationDirection,
    /// Prompt shown to the learner.
    pub word: String,
    pub variants: Vec<String>,
    #[serde(rename = "correct")]
    pub correct_index: usize,
    #[serde(rename = "attempts")]
    pub attempts_allowed: u32,
    #[serde(rename = "audio", default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Typed spelling task: the learner sees `ru` and types `en`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellingTask {
    pub id: String,
    pub en: String,
    pub ru: String,
    /// Decides whether a one-edit miss earns partial credit.
    #[serde(rename = "mistakes", default)]
    pub prior_mistake_count: u32,
}

/// Spoken pronunciation task, scored outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PronunciationTask {
    pub id: String,
    pub en: String,
    pub ru: String,
}

/// Word-order task: rebuild the `en` sentence from its shuffled tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTask {
    pub id: String,
    pub en: String,
    pub ru: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CefrLevel>,
}

impl ContextTask {
    /// Whitespace tokens of the source sentence, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.en.split_whitespace().map(str::to_string).collect()
    }
}

/// One source/target pair of a matching task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordPair {
    pub en: String,
    pub ru: String,
}

/// Pair matching task. Pair ids are the positions in `pairs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingTask {
    pub id: String,
    pub pairs: Vec<WordPair>,
}

/// A gradable exercise as delivered by the vocabulary API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    Translation(TranslationTask),
    Spelling(SpellingTask),
    Pronunciation(PronunciationTask),
    Context(ContextTask),
    Matching(MatchingTask),
}

impl Task {
    pub fn id(&self) -> &str {
        match self {
            Self::Translation(t) => &t.id,
            Self::Spelling(t) => &t.id,
            Self::Pronunciation(t) => &t.id,
            Self::Context(t) => &t.id,
            Self::Matching(t) => &t.id,
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Self::Translation(_) => StageKind::Translation,
            Self::Spelling(_) => StageKind::Spelling,
            Self::Pronunciation(_) => StageKind::Pronunciation,
            Self::Context(_) => StageKind::Context,
            Self::Matching(_) => StageKind::Matching,
        }
    }

    /// Check the payload invariants a task must hold to be playable.
    pub fn validate(&self) -> Result<(), TaskError> {
        let id = || self.id().to_string();
        match self {
            Self::Translation(t) => {
                if t.variants.len() < 2 {
                    return Err(TaskError::TooFewVariants { id: id() });
                }
                if t.correct_index >= t.variants.len() {
                    return Err(TaskError::CorrectIndexOutOfRange {
                        id: id(),
                        index: t.correct_index,
                    });
                }
                if t.attempts_allowed == 0 {
                    return Err(TaskError::NoAttempts { id: id() });
                }
            }
            Self::Spelling(t) => {
                if t.en.trim().is_empty() {
                    return Err(TaskError::EmptyField { id: id(), field: "en" });
                }
            }
            Self::Pronunciation(t) => {
                if t.en.trim().is_empty() {
                    return Err(TaskError::EmptyField { id: id(), field: "en" });
                }
            }
            Self::Context(t) => {
                if t.en.split_whitespace().next().is_none() {
                    return Err(TaskError::EmptyField { id: id(), field: "en" });
                }
            }
            Self::Matching(t) => {
                if t.pairs.is_empty() {
                    return Err(TaskError::NoPairs { id: id() });
                }
            }
        }
        Ok(())
    }
}

/// The tasks fetched for one session. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBatch {
    tasks: Vec<Task>,
}

impl TaskBatch {
    /// Build a batch, dropping tasks whose payload cannot be played.
    pub fn new(tasks: Vec<Task>) -> Self {
        let tasks = tasks
            .into_iter()
            .filter(|task| match task.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(task_id = task.id(), kind = %task.kind(), error = %e, "dropping malformed task");
                    false
                }
            })
            .collect();
        Self { tasks }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Split into one group per kind, keeping fetch order inside each group.
    pub fn into_groups(self) -> TaskGroups {
        let mut groups = TaskGroups::default();
        for task in self.tasks {
            match task {
                Task::Translation(t) => groups.translation.push(t),
                Task::Spelling(t) => groups.spelling.push(t),
                Task::Pronunciation(t) => groups.pronunciation.push(t),
                Task::Context(t) => groups.context.push(t),
                Task::Matching(t) => groups.matching.push(t),
            }
        }
        groups
    }
}

/// A batch partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGroups {
    pub translation: Vec<TranslationTask>,
    pub spelling: Vec<SpellingTask>,
    pub pronunciation: Vec<PronunciationTask>,
    pub context: Vec<ContextTask>,
    pub matching: Vec<MatchingTask>,
}

impl TaskGroups {
    /// Number of tasks in the group for `kind`.
    pub fn count(&self, kind: StageKind) -> usize {
        match kind {
            StageKind::Translation => self.translation.len(),
            StageKind::Spelling => self.spelling.len(),
            StageKind::Pronunciation => self.pronunciation.len(),
            StageKind::Context => self.context.len(),
            StageKind::Matching => self.matching.len(),
        }
    }

    pub fn total(&self) -> usize {
        StageKind::ORDER.iter().map(|k| self.count(*k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// What one stage produced for the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub stage_kind: StageKind,
    /// Stage contribution before the ceiling is applied.
    pub raw_score: f64,
    pub weight_ceiling: f64,
    /// False when the stage had no tasks and was skipped.
    pub attempted: bool,
}

impl StageResult {
    pub fn skipped(stage_kind: StageKind) -> Self {
        Self {
            stage_kind,
            raw_score: 0.0,
            weight_ceiling: stage_kind.ceiling(),
            attempted: false,
        }
    }

    pub fn attempted(stage_kind: StageKind, raw_score: f64) -> Self {
        Self {
            stage_kind,
            raw_score,
            weight_ceiling: stage_kind.ceiling(),
            attempted: true,
        }
    }
}

/// Percentage contributions of the final score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub translation: f64,
    /// Spelling and pronunciation, reported jointly.
    pub spelling_pron: f64,
    pub context: f64,
    pub matching: f64,
}

impl ScoreBreakdown {
    /// Final session score in percent.
    pub fn total(&self) -> f64 {
        self.translation + self.spelling_pron + self.context + self.matching
    }
}

/// Score reported for one word after the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordOutcome {
    pub word: String,
    pub score: f64,
}
