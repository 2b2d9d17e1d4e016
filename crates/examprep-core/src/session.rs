//! Exam session state machine.
//!
//! [`ExamSession`] is pure: transitions happen only when [`ExamSession::advance`]
//! is called. [`ScheduledSession`] drives the same machine on a timer so a
//! front end can animate between questions, and commits the finished record
//! to history.
//!
//! A session is built once per (subject, count, strategy) draw. Starting over
//! means constructing a new session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, ValidationIssue};
use crate::model::{AnswerRecord, ExamRecord, Question};
use crate::selection::Selection;
use crate::store::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The old question is still displayed.
    Exiting,
    /// The new question is displayed but not yet operable.
    Entering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    AtQuestion(usize),
    Transitioning { direction: Direction, phase: Phase },
    Completed,
}

/// Draft answer for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSlot {
    pub text: String,
    pub hint_used: bool,
}

/// Why an operation was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// A transition is in flight.
    Busy,
    /// The current answer is blank.
    EmptyAnswer,
    /// Already at the first question.
    AtFirstQuestion,
    /// The session has finished.
    Completed,
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Ignored(Ignored),
    /// A transition started; call [`ExamSession::advance`] to move it along.
    Transitioning(Direction),
    /// The last question was answered. The session stays on it until
    /// [`ExamSession::complete`] is called.
    Finished(ExamRecord),
}

/// Stateful engine for one exam attempt.
#[derive(Debug, Clone)]
pub struct ExamSession {
    subject_id: String,
    questions: Vec<Question>,
    slots: Vec<AnswerSlot>,
    persisted: Vec<Option<AnswerRecord>>,
    index: usize,
    state: SessionState,
    hint_visible: bool,
    record: Option<ExamRecord>,
}

impl ExamSession {
    /// Start a session at the first question.
    ///
    /// An empty question list has no valid initial state and is rejected.
    pub fn new(subject_id: impl Into<String>, questions: Vec<Question>) -> Result<Self, ExamError> {
        let subject_id = subject_id.into();
        if questions.is_empty() {
            return Err(ValidationIssue::EmptySelection {
                subject: subject_id,
            }
            .into());
        }
        let n = questions.len();
        Ok(Self {
            subject_id,
            questions,
            slots: vec![AnswerSlot::default(); n],
            persisted: vec![None; n],
            index: 0,
            state: SessionState::AtQuestion(0),
            hint_visible: false,
            record: None,
        })
    }

    pub fn from_selection(
        subject_id: impl Into<String>,
        selection: Selection,
    ) -> Result<Self, ExamError> {
        Self::new(subject_id, selection.questions)
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Index of the displayed question.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The displayed question.
    pub fn current_question(&self) -> &Question {
        &self.questions[self.index]
    }

    /// Draft answer for the displayed question.
    pub fn current_answer(&self) -> &AnswerSlot {
        &self.slots[self.index]
    }

    pub fn slot(&self, index: usize) -> Option<&AnswerSlot> {
        self.slots.get(index)
    }

    pub fn is_hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::AtQuestion(_))
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Fraction of questions already passed, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.is_completed() {
            return 1.0;
        }
        self.index as f64 / self.questions.len() as f64
    }

    /// The finished record, once completed.
    pub fn record(&self) -> Option<&ExamRecord> {
        self.record.as_ref()
    }

    fn gate(&self) -> Option<Ignored> {
        match self.state {
            SessionState::AtQuestion(_) => None,
            SessionState::Transitioning { .. } => Some(Ignored::Busy),
            SessionState::Completed => Some(Ignored::Completed),
        }
    }

    /// Replace the draft text of the displayed question.
    pub fn set_answer(&mut self, text: impl Into<String>) -> Result<(), Ignored> {
        if let Some(reason) = self.gate() {
            return Err(reason);
        }
        self.slots[self.index].text = text.into();
        Ok(())
    }

    /// Reveal the reference answer and mark the hint as used.
    ///
    /// The flag stays set even after the hint is hidden again.
    pub fn show_hint(&mut self) -> Result<&str, Ignored> {
        if let Some(reason) = self.gate() {
            return Err(reason);
        }
        self.slots[self.index].hint_used = true;
        self.hint_visible = true;
        Ok(&self.questions[self.index].reference_answer)
    }

    pub fn hide_hint(&mut self) {
        self.hint_visible = false;
    }

    /// Capture the slot at `index` together with that question's own data.
    fn capture(&self, index: usize) -> AnswerRecord {
        let question = &self.questions[index];
        let slot = &self.slots[index];
        AnswerRecord {
            question_id: question.id,
            question_text: question.text.clone(),
            user_answer: slot.text.clone(),
            correct_answer: question.reference_answer.clone(),
            hint_used: slot.hint_used,
            evaluation: None,
        }
    }

    fn persist_current(&mut self) {
        self.persisted[self.index] = Some(self.capture(self.index));
    }

    /// Submit the displayed answer and move forward.
    ///
    /// At the last question this assembles the pending record but leaves the
    /// session operable; call [`ExamSession::complete`] once the record is
    /// stored. Calling `next` again assembles a fresh record.
    pub fn next(&mut self) -> Step {
        if let Some(reason) = self.gate() {
            return Step::Ignored(reason);
        }
        if self.slots[self.index].text.trim().is_empty() {
            return Step::Ignored(Ignored::EmptyAnswer);
        }

        self.persist_current();

        if self.index + 1 < self.questions.len() {
            self.state = SessionState::Transitioning {
                direction: Direction::Next,
                phase: Phase::Exiting,
            };
            return Step::Transitioning(Direction::Next);
        }

        let answers: Vec<AnswerRecord> = (0..self.questions.len())
            .map(|j| match &self.persisted[j] {
                Some(record) => record.clone(),
                None => self.capture(j),
            })
            .collect();
        Step::Finished(ExamRecord::pending(self.subject_id.clone(), answers))
    }

    /// Mark the session as finished with its stored record.
    pub fn complete(&mut self, record: ExamRecord) {
        self.state = SessionState::Completed;
        self.hint_visible = false;
        self.record = Some(record);
    }

    /// Save the displayed answer and move back one question.
    pub fn prev(&mut self) -> Step {
        if let Some(reason) = self.gate() {
            return Step::Ignored(reason);
        }
        if self.index == 0 {
            return Step::Ignored(Ignored::AtFirstQuestion);
        }

        self.persist_current();
        self.state = SessionState::Transitioning {
            direction: Direction::Prev,
            phase: Phase::Exiting,
        };
        Step::Transitioning(Direction::Prev)
    }

    /// Move an in-flight transition to its next phase.
    ///
    /// Exiting swaps in the destination question (restoring its slot and
    /// closing the hint view); entering returns to an idle state. Returns
    /// `false` when no transition is in flight.
    pub fn advance(&mut self) -> bool {
        match self.state {
            SessionState::Transitioning {
                direction,
                phase: Phase::Exiting,
            } => {
                self.index = match direction {
                    Direction::Next => self.index + 1,
                    Direction::Prev => self.index - 1,
                };
                self.hint_visible = false;
                self.state = SessionState::Transitioning {
                    direction,
                    phase: Phase::Entering,
                };
                true
            }
            SessionState::Transitioning {
                phase: Phase::Entering,
                ..
            } => {
                self.state = SessionState::AtQuestion(self.index);
                true
            }
            _ => false,
        }
    }

    /// Complete any in-flight transition immediately.
    pub fn settle(&mut self) {
        while self.advance() {}
    }
}

// ---------------------------------------------------------------------------
// Timed wrapper
// ---------------------------------------------------------------------------

/// Presentation delays for the two transition phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTiming {
    pub exit: Duration,
    pub enter: Duration,
}

impl Default for TransitionTiming {
    fn default() -> Self {
        Self {
            exit: Duration::from_millis(150),
            enter: Duration::from_millis(150),
        }
    }
}

impl TransitionTiming {
    pub fn instant() -> Self {
        Self {
            exit: Duration::ZERO,
            enter: Duration::ZERO,
        }
    }
}

/// Shared handle that runs an [`ExamSession`]'s transitions on a timer.
///
/// While a transition is pending, other holders of the handle see the
/// session as busy and their navigation and hint requests are ignored.
#[derive(Clone)]
pub struct ScheduledSession {
    inner: Arc<Mutex<ExamSession>>,
    history: History,
    timing: TransitionTiming,
}

impl ScheduledSession {
    pub fn new(session: ExamSession, history: History, timing: TransitionTiming) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
            history,
            timing,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExamSession> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read the session state.
    pub fn with_session<R>(&self, f: impl FnOnce(&ExamSession) -> R) -> R {
        f(&self.lock())
    }

    pub fn set_answer(&self, text: impl Into<String>) -> Result<(), Ignored> {
        self.lock().set_answer(text)
    }

    /// Reveal the reference answer, returning a copy of it.
    pub fn show_hint(&self) -> Result<String, Ignored> {
        self.lock().show_hint().map(str::to_string)
    }

    pub fn hide_hint(&self) {
        self.lock().hide_hint();
    }

    /// Submit and move forward. On the last question the finished record is
    /// appended to history before the session completes.
    ///
    /// If the append fails the session stays on the last question with its
    /// answers intact, so calling `next` again retries the commit.
    pub async fn next(&self) -> Result<Step, ExamError> {
        let step = {
            let mut session = self.lock();
            let step = session.next();
            if let Step::Finished(record) = &step {
                if let Err(e) = self.history.append(record.clone()) {
                    tracing::warn!(subject = %record.subject_id, "failed to save finished exam: {e}");
                    return Err(e);
                }
                session.complete(record.clone());
            }
            step
        };

        match &step {
            Step::Transitioning(_) => self.run_transition().await,
            Step::Finished(record) => {
                tracing::info!(
                    exam_id = %record.id,
                    subject = %record.subject_id,
                    questions = record.total_questions,
                    "exam completed"
                );
            }
            Step::Ignored(_) => {}
        }
        Ok(step)
    }

    pub async fn prev(&self) -> Step {
        let step = self.lock().prev();
        if let Step::Transitioning(_) = step {
            self.run_transition().await;
        }
        step
    }

    async fn run_transition(&self) {
        tokio::time::sleep(self.timing.exit).await;
        self.lock().advance();
        tokio::time::sleep(self.timing.enter).await;
        self.lock().advance();
    }
}
