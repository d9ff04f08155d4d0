//! End-of-session outcome report and its spaced-repetition hint.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::transport::Transport;
use crate::types::{CollectionId, ScoreBreakdown, TaskGroups, WordOutcome};

/// Distinct words a session touched, in first-seen order across the
/// spelling, pronunciation and context groups.
pub fn collect_words(groups: &TaskGroups) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let touched = groups
        .spelling
        .iter()
        .map(|t| &t.en)
        .chain(groups.pronunciation.iter().map(|t| &t.en))
        .chain(groups.context.iter().map(|t| &t.en));
    for word in touched {
        if !words.contains(word) {
            words.push(word.clone());
        }
    }
    words
}

/// One outcome per word, each carrying the session's overall score.
pub fn build_outcomes(words: &[String], breakdown: &ScoreBreakdown) -> Vec<WordOutcome> {
    let score = breakdown.total();
    words
        .iter()
        .map(|word| WordOutcome {
            word: word.clone(),
            score,
        })
        .collect()
}

/// Repetition interval the upstream schedules for a session score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInterval {
    pub days: u32,
}

impl ReviewInterval {
    pub fn for_score(score: f64) -> Self {
        let days = if score >= 80.0 {
            7
        } else if score >= 50.0 {
            3
        } else {
            1
        };
        Self { days }
    }

    pub fn next_due(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(i64::from(self.days))
    }
}

/// What the learner sees once the session is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub breakdown: ScoreBreakdown,
    pub score_percent: f64,
    pub words: Vec<String>,
    pub review_interval_days: u32,
    pub next_review_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn new(breakdown: ScoreBreakdown, words: Vec<String>, now: DateTime<Utc>) -> Self {
        let score_percent = breakdown.total();
        let interval = ReviewInterval::for_score(score_percent);
        Self {
            breakdown,
            score_percent,
            words,
            review_interval_days: interval.days,
            next_review_at: interval.next_due(now),
        }
    }
}

/// Fire-and-forget submission of a session's word outcomes.
#[derive(Clone)]
pub struct OutcomeReporter {
    transport: Arc<dyn Transport>,
}

impl OutcomeReporter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Submit one outcome per word on the ambient runtime.
    ///
    /// Nothing waits on the returned task; failures are logged and dropped.
    /// Without a runtime, or with no words, nothing is sent.
    pub fn report(
        &self,
        collection_id: CollectionId,
        breakdown: &ScoreBreakdown,
        words: &[String],
    ) -> Option<JoinHandle<()>> {
        let outcomes = build_outcomes(words, breakdown);
        if outcomes.is_empty() {
            debug!(collection_id, "no words touched; nothing to report");
            return None;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!(collection_id, "no async runtime; outcome report dropped");
            return None;
        };

        let transport = Arc::clone(&self.transport);
        Some(runtime.spawn(async move {
            match transport.submit_outcomes(collection_id, &outcomes).await {
                Ok(()) => debug!(collection_id, count = outcomes.len(), "outcomes submitted"),
                Err(e) => warn!(collection_id, error = %e, "outcome report dropped"),
            }
        }))
    }
}
