//! Stage sequencing for one learn session.
//!
//! Stages run in the fixed order translation, spelling, pronunciation,
//! context, matching. A stage with no tasks is recorded as skipped and passed
//! through immediately. A stage closes only once every task in it has reached
//! a terminal outcome; after the last stage the score is finalized and the
//! outcome report fires, both exactly once.
//!
//! The sequencer is driven by discrete learner actions. Every rejected action
//! leaves the session untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{AudioCaptureSession, AudioDevice, RecordingHandle};
use crate::distance::EditClass;
use crate::error::{ActionError, CaptureError, FlowError, InvariantViolation, SessionError};
use crate::exercise::{
    MatchStep, MatchingBoard, PickOutcome, SessionRng, Side, TranslationAttempt, TranslationStep,
    WordOrderBoard,
};
use crate::grading::{
    context_stage_points, grade_pronunciation, grade_spelling, grade_translation,
    matching_stage_points, normalize_typed_stage,
};
use crate::report::{collect_words, OutcomeReporter, SessionSummary};
use crate::score::ScoreAggregator;
use crate::transport::PronunciationResult;
use crate::types::{CollectionId, ScoreBreakdown, StageKind, StageResult, TaskBatch, TaskGroups};
use crate::view::{ProgressEvent, SequencerState, SessionView, TaskView};

type ActionResult<T> = std::result::Result<T, SessionError>;

/// What an accepted learner action did, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Feedback {
    TranslationCorrect {
        points: f64,
    },
    TranslationWrong {
        option: usize,
        attempts_left: u32,
    },
    TranslationRevealed {
        correct_index: usize,
    },
    TranslationSkipped,
    Spelling {
        class: EditClass,
        points: f64,
        correct: bool,
        expected: String,
    },
    RecordingStarted,
    /// The microphone could not be opened; the task resolved with nothing.
    RecordingUnavailable {
        reason: String,
    },
    Pronunciation {
        ok: bool,
        points: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dtw: Option<f64>,
    },
    TokenPlaced {
        remaining: usize,
    },
    SentenceAssembled,
    TokenMisplaced {
        index: usize,
    },
    PairSelected,
    PairMatched {
        remaining: usize,
    },
    PairMismatched,
}

/// Identifies the pronunciation submission a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PronunciationTicket(u64);

/// A stopped recording waiting for its external score.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPronunciation {
    pub ticket: PronunciationTicket,
    pub task_id: String,
    pub word: String,
    pub audio: Vec<u8>,
}

#[derive(Debug, Clone)]
struct PronunciationSlot {
    english_headline: bool,
    recording: Option<RecordingHandle>,
    pending: Option<PronunciationTicket>,
}

#[derive(Debug, Clone)]
enum ActiveTask {
    Translation(TranslationAttempt),
    Spelling,
    Pronunciation(PronunciationSlot),
    Context(WordOrderBoard),
    Matching(MatchingBoard),
}

impl ActiveTask {
    fn kind(&self) -> StageKind {
        match self {
            Self::Translation(_) => StageKind::Translation,
            Self::Spelling => StageKind::Spelling,
            Self::Pronunciation(_) => StageKind::Pronunciation,
            Self::Context(_) => StageKind::Context,
            Self::Matching(_) => StageKind::Matching,
        }
    }
}

#[derive(Debug, Clone)]
enum Phase {
    Active(ActiveTask),
    Done,
    Abandoned,
}

fn reject(phase: &Phase, expected: StageKind) -> ActionError {
    match phase {
        Phase::Active(task) => ActionError::WrongStage {
            expected,
            actual: task.kind(),
        },
        Phase::Done => ActionError::Finished,
        Phase::Abandoned => ActionError::Abandoned,
    }
}

/// Owns everything one session mutates: task groups, the live stage, the
/// score and the recording lifecycle.
pub struct StageSequencer {
    collection_id: CollectionId,
    groups: TaskGroups,
    words: Vec<String>,
    phase: Phase,
    index: usize,
    stage_points: f64,
    aggregator: ScoreAggregator,
    capture: AudioCaptureSession,
    rng: SessionRng,
    reporter: OutcomeReporter,
    next_ticket: u64,
    summary: Option<SessionSummary>,
    report_task: Option<JoinHandle<()>>,
}

impl StageSequencer {
    /// Group the batch and move to the first stage that has tasks, finishing
    /// straight away when there are none.
    pub fn start(
        collection_id: CollectionId,
        batch: TaskBatch,
        device: Box<dyn AudioDevice>,
        rng: SessionRng,
        reporter: OutcomeReporter,
    ) -> Result<Self, InvariantViolation> {
        let groups = batch.into_groups();
        let words = collect_words(&groups);
        info!(collection_id, tasks = groups.total(), words = words.len(), "session started");

        let mut sequencer = Self {
            collection_id,
            groups,
            words,
            phase: Phase::Done,
            index: 0,
            stage_points: 0.0,
            aggregator: ScoreAggregator::new(),
            capture: AudioCaptureSession::new(device),
            rng,
            reporter,
            next_ticket: 1,
            summary: None,
            report_task: None,
        };
        sequencer.enter_stage(StageKind::Translation)?;
        Ok(sequencer)
    }

    pub fn collection_id(&self) -> CollectionId {
        self.collection_id
    }

    /// Words the session touched, as they will be reported.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn state(&self) -> SequencerState {
        match &self.phase {
            Phase::Active(task) => SequencerState::Running(task.kind()),
            Phase::Done => SequencerState::Done,
            Phase::Abandoned => SequencerState::Abandoned,
        }
    }

    pub fn progress(&self) -> ProgressEvent {
        match &self.phase {
            Phase::Active(task) => ProgressEvent {
                stage: Some(task.kind()),
                index: self.index,
                total: self.groups.count(task.kind()),
                running_score: self.aggregator.running_total(),
            },
            Phase::Done | Phase::Abandoned => ProgressEvent {
                stage: None,
                index: 0,
                total: 0,
                running_score: self.aggregator.running_total(),
            },
        }
    }

    /// Contributions recorded so far.
    pub fn breakdown(&self) -> ScoreBreakdown {
        self.aggregator.breakdown()
    }

    /// Final result, present once the session is done.
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// The background outcome report, if one was dispatched and not taken yet.
    pub fn take_report_task(&mut self) -> Option<JoinHandle<()>> {
        self.report_task.take()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            state: self.state(),
            progress: self.progress(),
            task: self.task_view(),
            summary: self.summary.clone(),
        }
    }

    fn task_view(&self) -> Option<TaskView> {
        let Phase::Active(active) = &self.phase else {
            return None;
        };
        let i = self.index;
        let view = match active {
            ActiveTask::Translation(attempt) => {
                let task = &self.groups.translation[i];
                TaskView::Translation {
                    id: task.id.clone(),
                    direction: task.direction,
                    word: task.word.clone(),
                    variants: task.variants.clone(),
                    audio_url: task.audio_url.clone(),
                    attempts_left: attempt.attempts_left(),
                    ruled_out: attempt.ruled_out().to_vec(),
                    can_skip: attempt.can_skip(),
                }
            }
            ActiveTask::Spelling => {
                let task = &self.groups.spelling[i];
                TaskView::Spelling {
                    id: task.id.clone(),
                    prompt: task.ru.clone(),
                }
            }
            ActiveTask::Pronunciation(slot) => {
                let task = &self.groups.pronunciation[i];
                let (headline, subtitle) = if slot.english_headline {
                    (&task.en, &task.ru)
                } else {
                    (&task.ru, &task.en)
                };
                TaskView::Pronunciation {
                    id: task.id.clone(),
                    headline: headline.clone(),
                    subtitle: subtitle.clone(),
                    recording: slot.recording.is_some(),
                    awaiting_score: slot.pending.is_some(),
                }
            }
            ActiveTask::Context(board) => {
                let task = &self.groups.context[i];
                TaskView::Context {
                    id: task.id.clone(),
                    prompt: task.ru.clone(),
                    level: task.level,
                    pool: board.pool().to_vec(),
                    picked: board.picked().to_vec(),
                    wrong_flag: board.wrong_flag(),
                }
            }
            ActiveTask::Matching(board) => TaskView::Matching {
                id: self.groups.matching[i].id.clone(),
                left: board.left().to_vec(),
                right: board.right().to_vec(),
                selected_left: board.selected(Side::Left),
                selected_right: board.selected(Side::Right),
                remaining: board.remaining(),
            },
        };
        Some(view)
    }

    /// Pick a translation option.
    pub fn choose_option(&mut self, option: usize) -> ActionResult<Feedback> {
        let attempt = match &mut self.phase {
            Phase::Active(ActiveTask::Translation(attempt)) => attempt,
            other => return Err(reject(other, StageKind::Translation).into()),
        };
        let step = attempt.choose(option)?;

        match step {
            TranslationStep::Correct => {
                let grade = grade_translation(self.groups.translation.len(), true);
                self.complete_task(grade.points)?;
                Ok(Feedback::TranslationCorrect {
                    points: grade.points,
                })
            }
            TranslationStep::Wrong { attempts_left } => Ok(Feedback::TranslationWrong {
                option,
                attempts_left,
            }),
            TranslationStep::Revealed { correct_index } => {
                self.complete_task(0.0)?;
                Ok(Feedback::TranslationRevealed { correct_index })
            }
        }
    }

    /// Give up on the current translation task after a wrong pick.
    pub fn skip_translation(&mut self) -> ActionResult<Feedback> {
        let attempt = match &self.phase {
            Phase::Active(ActiveTask::Translation(attempt)) => attempt,
            other => return Err(reject(other, StageKind::Translation).into()),
        };
        if !attempt.can_skip() {
            return Err(ActionError::SkipNotAllowed.into());
        }
        self.complete_task(0.0)?;
        Ok(Feedback::TranslationSkipped)
    }

    pub fn submit_spelling(&mut self, answer: &str) -> ActionResult<Feedback> {
        if !matches!(self.phase, Phase::Active(ActiveTask::Spelling)) {
            return Err(reject(&self.phase, StageKind::Spelling).into());
        }
        let task = &self.groups.spelling[self.index];
        let (class, grade) = grade_spelling(task, answer);
        let expected = task.en.clone();

        self.complete_task(grade.points)?;
        Ok(Feedback::Spelling {
            class,
            points: grade.points,
            correct: grade.is_correct,
            expected,
        })
    }

    /// Open the microphone for the current pronunciation task.
    ///
    /// An unavailable device is not an error: the task resolves with zero
    /// points and the session moves on.
    pub fn start_recording(&mut self) -> ActionResult<Feedback> {
        let slot = match &mut self.phase {
            Phase::Active(ActiveTask::Pronunciation(slot)) => slot,
            other => return Err(reject(other, StageKind::Pronunciation).into()),
        };
        if slot.pending.is_some() {
            return Err(ActionError::SubmissionPending.into());
        }

        match self.capture.start() {
            Ok(handle) => {
                slot.recording = Some(handle);
                Ok(Feedback::RecordingStarted)
            }
            Err(CaptureError::Action(e)) => Err(e.into()),
            Err(CaptureError::Device(e)) => {
                warn!(error = %e, "microphone unavailable; pronunciation task scores zero");
                self.complete_task(0.0)?;
                Ok(Feedback::RecordingUnavailable {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Stop the active recording. The returned clip must be scored externally
    /// and handed back through [`StageSequencer::resolve_pronunciation`]; the
    /// task stays open until then.
    pub fn stop_recording(&mut self) -> ActionResult<PendingPronunciation> {
        let slot = match &mut self.phase {
            Phase::Active(ActiveTask::Pronunciation(slot)) => slot,
            other => return Err(reject(other, StageKind::Pronunciation).into()),
        };
        if slot.pending.is_some() {
            return Err(ActionError::SubmissionPending.into());
        }
        let handle = slot.recording.ok_or(ActionError::NotRecording)?;
        let audio = self.capture.stop(handle)?;

        let ticket = PronunciationTicket(self.next_ticket);
        self.next_ticket += 1;
        slot.recording = None;
        slot.pending = Some(ticket);

        let task = &self.groups.pronunciation[self.index];
        debug!(task_id = %task.id, bytes = audio.len(), "pronunciation clip awaiting score");
        Ok(PendingPronunciation {
            ticket,
            task_id: task.id.clone(),
            word: task.en.clone(),
            audio,
        })
    }

    /// Apply an external pronunciation score.
    ///
    /// Results for a ticket that is no longer pending (the session moved on,
    /// finished or was abandoned) are discarded and yield `None`.
    pub fn resolve_pronunciation(
        &mut self,
        ticket: PronunciationTicket,
        result: Result<PronunciationResult, FlowError>,
    ) -> ActionResult<Option<Feedback>> {
        let pending = matches!(
            &self.phase,
            Phase::Active(ActiveTask::Pronunciation(slot)) if slot.pending == Some(ticket)
        );
        if !pending {
            debug!(?ticket, "discarding pronunciation result for a closed submission");
            return Ok(None);
        }

        if let Err(e) = &result {
            warn!(error = %e, "pronunciation scoring failed; task scores zero");
        }
        let grade = grade_pronunciation(&result);
        let (ok, dtw) = match &result {
            Ok(r) => (r.ok, r.dtw),
            Err(_) => (false, None),
        };

        self.complete_task(grade.points)?;
        Ok(Some(Feedback::Pronunciation {
            ok,
            points: grade.points,
            dtw,
        }))
    }

    /// Pick a token from the current context task's pool.
    pub fn pick_token(&mut self, index: usize) -> ActionResult<Feedback> {
        let board = match &mut self.phase {
            Phase::Active(ActiveTask::Context(board)) => board,
            other => return Err(reject(other, StageKind::Context).into()),
        };

        match board.pick(index)? {
            PickOutcome::Placed { remaining } => Ok(Feedback::TokenPlaced { remaining }),
            PickOutcome::Misplaced { index } => Ok(Feedback::TokenMisplaced { index }),
            PickOutcome::Completed => {
                self.complete_task(0.0)?;
                Ok(Feedback::SentenceAssembled)
            }
        }
    }

    /// Drop the transient wrong-pick flag. No-op outside a context task.
    pub fn clear_wrong_flag(&mut self) {
        if let Phase::Active(ActiveTask::Context(board)) = &mut self.phase {
            board.clear_wrong_flag();
        }
    }

    pub fn select_match(&mut self, side: Side, pair_id: usize) -> ActionResult<Feedback> {
        let board = match &mut self.phase {
            Phase::Active(ActiveTask::Matching(board)) => board,
            other => return Err(reject(other, StageKind::Matching).into()),
        };

        match board.select(side, pair_id)? {
            MatchStep::Selected => Ok(Feedback::PairSelected),
            MatchStep::Mismatched => Ok(Feedback::PairMismatched),
            MatchStep::Matched { remaining } => {
                if remaining == 0 {
                    self.complete_task(0.0)?;
                }
                Ok(Feedback::PairMatched { remaining })
            }
        }
    }

    /// Abandon the session. Any active recording is discarded, pending
    /// results become no-ops, and nothing is finalized or reported.
    ///
    /// Returns false when the session had already ended.
    pub fn abandon(&mut self) -> bool {
        let Phase::Active(task) = &self.phase else {
            return false;
        };
        info!(
            collection_id = self.collection_id,
            stage = %task.kind(),
            index = self.index,
            "session abandoned"
        );
        self.capture.abandon();
        self.phase = Phase::Abandoned;
        true
    }

    fn enter_stage(&mut self, from: StageKind) -> Result<(), InvariantViolation> {
        let mut next = Some(from);
        while let Some(kind) = next {
            if self.groups.count(kind) > 0 {
                debug!(stage = %kind, tasks = self.groups.count(kind), "stage entered");
                self.index = 0;
                self.stage_points = 0.0;
                self.activate(kind);
                return Ok(());
            }
            debug!(stage = %kind, "stage skipped");
            self.aggregator.record_stage(StageResult::skipped(kind))?;
            next = kind.next();
        }
        self.finish()
    }

    fn activate(&mut self, kind: StageKind) {
        let i = self.index;
        let task = match kind {
            StageKind::Translation => {
                ActiveTask::Translation(TranslationAttempt::new(&self.groups.translation[i]))
            }
            StageKind::Spelling => ActiveTask::Spelling,
            StageKind::Pronunciation => ActiveTask::Pronunciation(PronunciationSlot {
                english_headline: self.rng.coin_flip(),
                recording: None,
                pending: None,
            }),
            StageKind::Context => ActiveTask::Context(WordOrderBoard::new(
                self.groups.context[i].tokens(),
                &mut self.rng,
            )),
            StageKind::Matching => {
                ActiveTask::Matching(MatchingBoard::new(&self.groups.matching[i], &mut self.rng))
            }
        };
        self.phase = Phase::Active(task);
    }

    /// Resolve the current task with `points` and move on.
    fn complete_task(&mut self, points: f64) -> Result<(), InvariantViolation> {
        let Phase::Active(task) = &self.phase else {
            return Ok(());
        };
        let kind = task.kind();
        self.stage_points += points;
        self.index += 1;

        if self.index < self.groups.count(kind) {
            self.activate(kind);
            Ok(())
        } else {
            self.close_stage(kind)
        }
    }

    fn close_stage(&mut self, kind: StageKind) -> Result<(), InvariantViolation> {
        let count = self.groups.count(kind);
        if self.index < count {
            return Err(InvariantViolation::UnresolvedTasks {
                stage: kind,
                unresolved: count - self.index,
            });
        }

        let raw = match kind {
            StageKind::Translation => self.stage_points,
            StageKind::Spelling | StageKind::Pronunciation => {
                normalize_typed_stage(self.stage_points, count)
            }
            StageKind::Context => context_stage_points(self.index),
            StageKind::Matching => matching_stage_points(true),
        };
        let contribution = self.aggregator.record_stage(StageResult::attempted(kind, raw))?;
        info!(stage = %kind, tasks = count, contribution, "stage recorded");

        match kind.next() {
            Some(next) => self.enter_stage(next),
            None => self.finish(),
        }
    }

    fn finish(&mut self) -> Result<(), InvariantViolation> {
        let breakdown = self.aggregator.finalize()?;
        self.phase = Phase::Done;
        self.summary = Some(SessionSummary::new(breakdown, self.words.clone(), Utc::now()));
        self.report_task = self
            .reporter
            .report(self.collection_id, &breakdown, &self.words);
        info!(
            collection_id = self.collection_id,
            score = breakdown.total(),
            "session finished"
        );
        Ok(())
    }
}

impl std::fmt::Debug for StageSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSequencer")
            .field("collection_id", &self.collection_id)
            .field("state", &self.state())
            .field("index", &self.index)
            .field("breakdown", &self.aggregator.breakdown())
            .finish_non_exhaustive()
    }
}
