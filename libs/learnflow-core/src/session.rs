//! Async driver that runs a session to its end against a [`Learner`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::audio::AudioDevice;
use crate::error::{ActionError, InvariantViolation, SessionError};
use crate::exercise::{SessionRng, Side};
use crate::report::{OutcomeReporter, SessionSummary};
use crate::sequencer::{Feedback, StageSequencer};
use crate::transport::{load_batch, SessionMode, Transport};
use crate::types::{CollectionId, ScoreBreakdown};
use crate::view::{ProgressEvent, SequencerState, SessionView};

/// Pauses between an answer and the next task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    /// Result banner after translation, spelling and pronunciation answers.
    pub feedback_delay_ms: u64,
    /// After a context sentence is assembled.
    pub context_advance_ms: u64,
    /// After a matching pair is tested.
    pub matching_advance_ms: u64,
    /// How long a misplaced token stays flagged.
    pub wrong_flag_ms: u64,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            feedback_delay_ms: 1000,
            context_advance_ms: 500,
            matching_advance_ms: 300,
            wrong_flag_ms: 500,
        }
    }
}

impl FlowSettings {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            feedback_delay_ms: 0,
            context_advance_ms: 0,
            matching_advance_ms: 0,
            wrong_flag_ms: 0,
        }
    }

    pub fn delay_for(&self, feedback: &Feedback) -> Duration {
        let ms = match feedback {
            Feedback::TranslationCorrect { .. }
            | Feedback::TranslationWrong { .. }
            | Feedback::TranslationRevealed { .. }
            | Feedback::TranslationSkipped
            | Feedback::Spelling { .. }
            | Feedback::RecordingUnavailable { .. }
            | Feedback::Pronunciation { .. } => self.feedback_delay_ms,
            Feedback::SentenceAssembled => self.context_advance_ms,
            Feedback::TokenMisplaced { .. } => self.wrong_flag_ms,
            Feedback::PairMatched { .. } | Feedback::PairMismatched => self.matching_advance_ms,
            Feedback::RecordingStarted | Feedback::TokenPlaced { .. } | Feedback::PairSelected => 0,
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearnerAction {
    Choose(usize),
    Skip,
    Spell(String),
    StartRecording,
    StopRecording,
    PickToken(usize),
    SelectMatch { side: Side, pair_id: usize },
    Abandon,
}

/// Whoever answers the tasks: a UI bridge, a bot, a test script.
#[async_trait]
pub trait Learner: Send {
    async fn next_action(&mut self, view: &SessionView) -> LearnerAction;

    fn on_feedback(&mut self, _feedback: &Feedback) {}

    fn on_rejected(&mut self, _error: &ActionError) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(SessionSummary),
    Abandoned,
}

impl SessionOutcome {
    pub fn breakdown(&self) -> Option<ScoreBreakdown> {
        match self {
            Self::Completed(summary) => Some(summary.breakdown),
            Self::Abandoned => None,
        }
    }
}

/// Fetch the batch for `mode` and start a sequencer over it.
pub async fn open_session(
    transport: Arc<dyn Transport>,
    collection_id: CollectionId,
    mode: &SessionMode,
    device: Box<dyn AudioDevice>,
    rng: SessionRng,
) -> Result<StageSequencer, InvariantViolation> {
    let batch = load_batch(transport.as_ref(), collection_id, mode).await;
    StageSequencer::start(
        collection_id,
        batch,
        device,
        rng,
        OutcomeReporter::new(transport),
    )
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Drive `sequencer` with actions from `learner` until it is done or
/// abandoned.
///
/// Pronunciation clips are scored through `transport`; a failed round trip
/// scores zero. Rejected actions are handed back to the learner and the loop
/// continues. Progress is sent whenever it changes.
pub async fn run_session<L>(
    sequencer: &mut StageSequencer,
    learner: &mut L,
    transport: &dyn Transport,
    settings: &FlowSettings,
    progress: Option<UnboundedSender<ProgressEvent>>,
) -> Result<SessionOutcome, InvariantViolation>
where
    L: Learner + ?Sized,
{
    let mut last_progress: Option<ProgressEvent> = None;

    loop {
        let current = sequencer.progress();
        if last_progress != Some(current) {
            if let Some(tx) = &progress {
                let _ = tx.send(current);
            }
            last_progress = Some(current);
        }

        if let Some(summary) = sequencer.summary() {
            return Ok(SessionOutcome::Completed(summary.clone()));
        }
        if sequencer.state() == SequencerState::Abandoned {
            return Ok(SessionOutcome::Abandoned);
        }

        let action = learner.next_action(&sequencer.view()).await;
        debug!(?action, "learner action");

        let result = match action {
            LearnerAction::Choose(option) => sequencer.choose_option(option).map(Some),
            LearnerAction::Skip => sequencer.skip_translation().map(Some),
            LearnerAction::Spell(answer) => sequencer.submit_spelling(&answer).map(Some),
            LearnerAction::StartRecording => sequencer.start_recording().map(Some),
            LearnerAction::StopRecording => match sequencer.stop_recording() {
                Ok(pending) => {
                    let scored = transport
                        .submit_pronunciation(&pending.task_id, &pending.word, pending.audio)
                        .await;
                    sequencer.resolve_pronunciation(pending.ticket, scored)
                }
                Err(e) => Err(e),
            },
            LearnerAction::PickToken(index) => sequencer.pick_token(index).map(Some),
            LearnerAction::SelectMatch { side, pair_id } => {
                sequencer.select_match(side, pair_id).map(Some)
            }
            LearnerAction::Abandon => {
                sequencer.abandon();
                Ok(None)
            }
        };

        match result {
            Ok(Some(feedback)) => {
                learner.on_feedback(&feedback);
                pause(settings.delay_for(&feedback)).await;
                if matches!(feedback, Feedback::TokenMisplaced { .. }) {
                    sequencer.clear_wrong_flag();
                }
            }
            Ok(None) => {}
            Err(SessionError::Action(e)) => {
                debug!(error = %e, "action rejected");
                learner.on_rejected(&e);
            }
            Err(SessionError::Invariant(violation)) => {
                error!(error = %violation, "sequencer invariant violated");
                return Err(violation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::ScriptedDevice;
    use crate::error::{FlowError, Result};
    use crate::transport::PronunciationResult;
    use crate::types::{
        ContextTask, MatchingTask, PronunciationTask, SpellingTask, StageKind, Task,
        TranslationDirection, TranslationTask, WordOutcome, WordPair,
    };
    use crate::view::TaskView;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct FakeUpstream {
        tasks: Vec<Task>,
        pronunciation: PronunciationResult,
        outcomes: Mutex<Vec<WordOutcome>>,
    }

    impl FakeUpstream {
        fn new(tasks: Vec<Task>) -> Arc<Self> {
            Arc::new(Self {
                tasks,
                pronunciation: PronunciationResult {
                    ok: true,
                    points: 3.0,
                    dtw: Some(88.0),
                },
                outcomes: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for FakeUpstream {
        async fn fetch_tasks(&self, _: CollectionId, _: &[i64]) -> Result<Vec<Task>> {
            Ok(self.tasks.clone())
        }

        async fn fetch_repeat_tasks(&self, _: CollectionId) -> Result<Vec<Task>> {
            Err(FlowError::Transport("503".into()))
        }

        async fn submit_pronunciation(&self, _: &str, _: &str, _: Vec<u8>) -> Result<PronunciationResult> {
            Ok(self.pronunciation)
        }

        async fn submit_outcomes(&self, _: CollectionId, outcomes: &[WordOutcome]) -> Result<()> {
            self.outcomes.lock().unwrap().extend_from_slice(outcomes);
            Ok(())
        }
    }

    /// Answers every task correctly, making one wrong move first where the
    /// kind allows it.
    #[derive(Default)]
    struct DiligentLearner {
        feedback: Vec<Feedback>,
        rejected: Vec<ActionError>,
        fumbled: bool,
    }

    #[async_trait]
    impl Learner for DiligentLearner {
        async fn next_action(&mut self, view: &SessionView) -> LearnerAction {
            match view.task.as_ref() {
                Some(TaskView::Translation { ruled_out, .. }) if ruled_out.is_empty() => {
                    LearnerAction::Choose(0)
                }
                Some(TaskView::Translation { .. }) => LearnerAction::Choose(1),
                Some(TaskView::Spelling { .. }) => LearnerAction::Spell("cat".into()),
                Some(TaskView::Pronunciation { awaiting_score, recording, .. }) => {
                    assert!(!awaiting_score);
                    if *recording {
                        LearnerAction::StopRecording
                    } else {
                        LearnerAction::StartRecording
                    }
                }
                Some(TaskView::Context { pool, picked, .. }) => {
                    let expected = ["cats", "purr"][picked.len()];
                    if !self.fumbled {
                        self.fumbled = true;
                        let wrong = pool.iter().position(|t| t != expected).unwrap_or(99);
                        return LearnerAction::PickToken(wrong);
                    }
                    LearnerAction::PickToken(pool.iter().position(|t| t == expected).unwrap())
                }
                Some(TaskView::Matching { left, selected_left, .. }) => match selected_left {
                    None => LearnerAction::SelectMatch {
                        side: Side::Left,
                        pair_id: left[0].pair_id,
                    },
                    Some(id) => LearnerAction::SelectMatch {
                        side: Side::Right,
                        pair_id: *id,
                    },
                },
                None => LearnerAction::Abandon,
            }
        }

        fn on_feedback(&mut self, feedback: &Feedback) {
            self.feedback.push(feedback.clone());
        }

        fn on_rejected(&mut self, error: &ActionError) {
            self.rejected.push(error.clone());
        }
    }

    fn all_kinds() -> Vec<Task> {
        vec![
            Task::Translation(TranslationTask {
                id: "t1".into(),
                direction: TranslationDirection::RuEng,
                word: "кот".into(),
                variants: vec!["dog".into(), "cat".into()],
                correct_index: 1,
                attempts_allowed: 2,
                audio_url: None,
            }),
            Task::Spelling(SpellingTask {
                id: "s1".into(),
                en: "cat".into(),
                ru: "кот".into(),
                prior_mistake_count: 0,
            }),
            Task::Pronunciation(PronunciationTask {
                id: "p1".into(),
                en: "cat".into(),
                ru: "кот".into(),
            }),
            Task::Context(ContextTask {
                id: "c1".into(),
                en: "cats purr".into(),
                ru: "коты мурчат".into(),
                level: None,
            }),
            Task::Matching(MatchingTask {
                id: "m1".into(),
                pairs: vec![
                    WordPair {
                        en: "cat".into(),
                        ru: "кот".into(),
                    },
                    WordPair {
                        en: "dog".into(),
                        ru: "пёс".into(),
                    },
                ],
            }),
        ]
    }

    #[tokio::test]
    async fn drives_a_full_session() {
        let upstream = FakeUpstream::new(all_kinds());
        let mode = SessionMode::Learn { word_ids: vec![1] };
        let mut sequencer = open_session(
            upstream.clone(),
            3,
            &mode,
            ScriptedDevice::working(),
            SessionRng::seeded(1),
        )
        .await
        .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut learner = DiligentLearner::default();
        let outcome = run_session(
            &mut sequencer,
            &mut learner,
            upstream.as_ref(),
            &FlowSettings::immediate(),
            Some(tx),
        )
        .await
        .unwrap();

        let breakdown = outcome.breakdown().unwrap();
        assert_eq!(
            breakdown,
            ScoreBreakdown {
                translation: 30.0,
                spelling_pron: 30.0,
                context: 30.0,
                matching: 10.0,
            }
        );
        assert!(learner.rejected.is_empty());
        assert!(learner
            .feedback
            .contains(&Feedback::TranslationWrong {
                option: 0,
                attempts_left: 1
            }));
        assert!(learner.feedback.iter().any(|f| matches!(f, Feedback::TokenMisplaced { .. })));
        assert!(learner.feedback.contains(&Feedback::Pronunciation {
            ok: true,
            points: 3.0,
            dtw: Some(88.0)
        }));

        let mut stages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if stages.last() != Some(&event.stage) {
                stages.push(event.stage);
            }
        }
        assert_eq!(
            stages,
            vec![
                Some(StageKind::Translation),
                Some(StageKind::Spelling),
                Some(StageKind::Pronunciation),
                Some(StageKind::Context),
                Some(StageKind::Matching),
                None,
            ]
        );

        sequencer.take_report_task().unwrap().await.unwrap();
        let outcomes = upstream.outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.score == 100.0));
    }

    #[tokio::test]
    async fn failed_fetch_completes_with_zero_score() {
        let upstream = FakeUpstream::new(vec![]);
        let mut sequencer = open_session(
            upstream.clone(),
            3,
            &SessionMode::Repeat,
            ScriptedDevice::working(),
            SessionRng::seeded(1),
        )
        .await
        .unwrap();

        let mut learner = DiligentLearner::default();
        let outcome = run_session(
            &mut sequencer,
            &mut learner,
            upstream.as_ref(),
            &FlowSettings::immediate(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.breakdown(), Some(ScoreBreakdown::default()));
        assert!(learner.feedback.is_empty());
    }

    struct Quitter;

    #[async_trait]
    impl Learner for Quitter {
        async fn next_action(&mut self, _view: &SessionView) -> LearnerAction {
            LearnerAction::Abandon
        }
    }

    #[test]
    fn abandoning_ends_without_a_score() {
        tokio_test::block_on(async {
            let upstream = FakeUpstream::new(all_kinds());
            let mut sequencer = open_session(
                upstream.clone(),
                3,
                &SessionMode::Learn { word_ids: vec![1, 2] },
                ScriptedDevice::working(),
                SessionRng::seeded(5),
            )
            .await
            .unwrap();

            let outcome = run_session(
                &mut sequencer,
                &mut Quitter,
                upstream.as_ref(),
                &FlowSettings::default(),
                None,
            )
            .await
            .unwrap();

            assert_eq!(outcome, SessionOutcome::Abandoned);
            assert!(sequencer.take_report_task().is_none());
            assert!(upstream.outcomes.lock().unwrap().is_empty());
        });
    }

    #[test]
    fn delays_follow_feedback_kind() {
        let settings = FlowSettings::default();
        assert_eq!(
            settings.delay_for(&Feedback::TranslationSkipped),
            Duration::from_millis(1000)
        );
        assert_eq!(
            settings.delay_for(&Feedback::SentenceAssembled),
            Duration::from_millis(500)
        );
        assert_eq!(
            settings.delay_for(&Feedback::PairMismatched),
            Duration::from_millis(300)
        );
        assert_eq!(settings.delay_for(&Feedback::PairSelected), Duration::ZERO);
        assert_eq!(
            FlowSettings::immediate().delay_for(&Feedback::TokenMisplaced { index: 0 }),
            Duration::ZERO
        );
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: FlowSettings = serde_json::from_str(r#"{"wrong_flag_ms": 250}"#).unwrap();
        assert_eq!(settings.wrong_flag_ms, 250);
        assert_eq!(settings.feedback_delay_ms, 1000);
    }
}
