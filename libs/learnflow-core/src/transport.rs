//! Seam to the vocabulary API: task fetching, pronunciation scoring and
//! outcome submission. Retries, auth and encoding belong to implementors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{CollectionId, Task, TaskBatch, WordOutcome};

/// Most words a learn session is built from.
pub const MAX_WORDS_PER_SESSION: usize = 5;

/// Score returned by the external pronunciation scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PronunciationResult {
    pub ok: bool,
    pub points: f64,
    /// Alignment cost against the reference recordings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtw: Option<f64>,
}

/// Operations the engine consumes from the outside world.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Tasks for learning the given words of a collection.
    async fn fetch_tasks(&self, collection_id: CollectionId, word_ids: &[i64]) -> Result<Vec<Task>>;

    /// Tasks for the words of a collection that are due for repetition.
    async fn fetch_repeat_tasks(&self, collection_id: CollectionId) -> Result<Vec<Task>>;

    /// Score a recorded clip of `word` for the given task.
    async fn submit_pronunciation(
        &self,
        task_id: &str,
        word: &str,
        audio: Vec<u8>,
    ) -> Result<PronunciationResult>;

    /// Hand the session's per-word outcomes to spaced-repetition scheduling.
    async fn submit_outcomes(
        &self,
        collection_id: CollectionId,
        outcomes: &[WordOutcome],
    ) -> Result<()>;
}

/// Which words a session is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionMode {
    /// Learn the given words (only the first [`MAX_WORDS_PER_SESSION`] are used).
    Learn {
        #[serde(rename = "wordIds", default)]
        word_ids: Vec<i64>,
    },
    /// Repeat the words the upstream scheduled for today.
    Repeat,
}

/// Fetch the task batch for a session.
///
/// Transport failures degrade to an empty batch, which finishes the session
/// immediately with a zero breakdown.
pub async fn load_batch(
    transport: &dyn Transport,
    collection_id: CollectionId,
    mode: &SessionMode,
) -> TaskBatch {
    let fetched = match mode {
        SessionMode::Learn { word_ids } if word_ids.is_empty() => {
            debug!(collection_id, "no words selected; starting with an empty batch");
            return TaskBatch::empty();
        }
        SessionMode::Learn { word_ids } => {
            let word_ids = &word_ids[..word_ids.len().min(MAX_WORDS_PER_SESSION)];
            transport.fetch_tasks(collection_id, word_ids).await
        }
        SessionMode::Repeat => transport.fetch_repeat_tasks(collection_id).await,
    };

    match fetched {
        Ok(tasks) => {
            debug!(collection_id, count = tasks.len(), "fetched task batch");
            TaskBatch::new(tasks)
        }
        Err(e) => {
            warn!(collection_id, error = %e, "task fetch failed; continuing with an empty batch");
            TaskBatch::empty()
        }
    }
}
