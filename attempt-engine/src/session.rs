use std::time::Duration;

use chrono::{DateTime, Utc};
use pulse_types::{
    AttemptResult, OptionId, Question, QuestionId, SubmitAttemptRequest, Test, TestId, UserId,
    events::{Event, EventKind},
};
use serde_json::json;
use tracing::debug;

use crate::{
    answers::AnswerStore,
    api::SessionContext,
    error::Error,
    sequencer::QuestionSequence,
    stats::{AttemptStats, attempt_stats},
    timer::per_question_budget,
    validate::validate_test,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    InProgress,
    /// A scoring request is outstanding
    Submitting,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvanceTrigger {
    /// The user asked for the next question
    Manual,
    /// The countdown of question `index` ran out
    Timeout { index: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Advance {
    /// Moved on to the question at this index
    Question(usize),
    /// The last question was left. The request must be sent to the scoring
    /// service, and its outcome reported back.
    Submit(SubmitAttemptRequest),
    /// Nothing changed
    Ignored,
}

/// State of one user's pass through a test.
///
/// Phases move `InProgress -> Submitting -> Completed`. A failed submission
/// returns to `InProgress` on the last question with every answer kept.
#[derive(Debug)]
pub struct AttemptSession {
    test_id: TestId,
    title: String,
    passing_score: f64,
    user_id: UserId,
    sequence: QuestionSequence,
    budget: Duration,
    index: usize,
    answers: AnswerStore,
    started_at: DateTime<Utc>,
    phase: Phase,
    result: Option<AttemptResult>,
    events: Vec<Event>,
}

impl AttemptSession {
    pub fn start(test: Test, context: &SessionContext, now: DateTime<Utc>) -> Result<Self, Error> {
        let sequence = QuestionSequence::new(&test)?;
        validate_test(&test)?;
        let user_id = context.user_id.clone().ok_or(Error::MissingIdentity)?;

        let budget = per_question_budget(test.duration_in_m, sequence.count());
        let first_question = sequence.question_at(0)?.id.clone();

        let mut session = Self {
            test_id: test.id,
            title: test.title,
            passing_score: test.passing_score,
            user_id,
            sequence,
            budget,
            index: 0,
            answers: AnswerStore::new(),
            started_at: now,
            phase: Phase::InProgress,
            result: None,
            events: Vec::new(),
        };
        session.push_event(
            now,
            EventKind::QuestionVisit,
            Some(first_question),
            json!({ "index": 0 }),
        );

        Ok(session)
    }

    pub fn test_id(&self) -> &TestId {
        &self.test_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn passing_score(&self) -> f64 {
        self.passing_score
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.sequence.count()
    }

    /// Time allowed for each question
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn current_question(&self) -> Result<&Question, Error> {
        self.sequence.question_at(self.index)
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn stats(&self) -> AttemptStats {
        attempt_stats(&self.events, self.count())
    }

    /// Manual advance requires the active question to be answered. The timer
    /// is not bound by this.
    pub fn can_advance_manually(&self) -> bool {
        self.phase == Phase::InProgress
            && self
                .current_question()
                .is_ok_and(|q| self.answers.has_answer(&q.id))
    }

    /// Records the selection for the active question. Questions already left
    /// behind cannot be changed.
    ///
    /// Returns the option previously selected for the question.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
        now: DateTime<Utc>,
    ) -> Result<Option<OptionId>, Error> {
        if self.phase != Phase::InProgress {
            return Err(Error::NotInProgress);
        }

        let question = self.current_question()?;
        if question.id != question_id {
            return Err(Error::QuestionNotActive(question_id));
        }
        if !question.options.iter().any(|o| o.id == option_id) {
            return Err(Error::UnknownOption {
                question: question_id,
                option: option_id,
            });
        }

        self.push_event(
            now,
            EventKind::AnswerSelected,
            Some(question_id.clone()),
            json!({ "optionId": option_id }),
        );
        Ok(self.answers.record_answer(question_id, option_id))
    }

    /// Single transition for leaving the active question, whether the user
    /// asked for it or the countdown ran out.
    pub fn advance(
        &mut self,
        trigger: AdvanceTrigger,
        now: DateTime<Utc>,
    ) -> Result<Advance, Error> {
        if self.phase != Phase::InProgress {
            debug!(attempt = %self.test_id, ?trigger, phase = ?self.phase, "ignoring advance");
            return Ok(Advance::Ignored);
        }

        let question_id = self.current_question()?.id.clone();
        match trigger {
            AdvanceTrigger::Manual => {
                if !self.answers.has_answer(&question_id) {
                    return Err(Error::Unanswered(question_id));
                }
            }
            AdvanceTrigger::Timeout { index } => {
                if index != self.index {
                    debug!(attempt = %self.test_id, index, current = self.index, "stale timeout");
                    return Ok(Advance::Ignored);
                }
                self.push_event(
                    now,
                    EventKind::TimerExpired,
                    Some(question_id.clone()),
                    json!({ "index": index }),
                );
            }
        }

        if self.sequence.is_last(self.index) {
            self.phase = Phase::Submitting;
            let time_spent = (now - self.started_at).num_seconds().max(0) as u64;
            let request = SubmitAttemptRequest {
                test_id: self.test_id.clone(),
                user_id: self.user_id.clone(),
                answers: self.answers.snapshot(),
                time_spent,
            };
            self.push_event(
                now,
                EventKind::SubmissionStarted,
                None,
                json!({ "answered": request.answers.len(), "timeSpent": time_spent }),
            );
            return Ok(Advance::Submit(request));
        }

        self.index += 1;
        let next_question = self.current_question()?.id.clone();
        self.push_event(
            now,
            EventKind::QuestionVisit,
            Some(next_question),
            json!({ "index": self.index }),
        );
        Ok(Advance::Question(self.index))
    }

    pub fn submission_succeeded(
        &mut self,
        result: AttemptResult,
        now: DateTime<Utc>,
    ) -> Result<&AttemptResult, Error> {
        if self.phase != Phase::Submitting {
            return Err(Error::NoSubmissionInFlight);
        }

        self.phase = Phase::Completed;
        // Answers have been delivered, nothing reads them after this
        self.answers = AnswerStore::new();
        self.push_event(
            now,
            EventKind::SubmissionCompleted,
            None,
            json!({ "score": result.score, "passed": result.passed }),
        );
        Ok(&*self.result.insert(result))
    }

    pub fn submission_failed(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), Error> {
        if self.phase != Phase::Submitting {
            return Err(Error::NoSubmissionInFlight);
        }

        self.phase = Phase::InProgress;
        self.push_event(
            now,
            EventKind::SubmissionFailed,
            None,
            json!({ "reason": reason }),
        );
        Ok(())
    }

    fn push_event(
        &mut self,
        timestamp: DateTime<Utc>,
        kind: EventKind,
        question_id: Option<QuestionId>,
        meta: serde_json::Value,
    ) {
        self.events.push(Event {
            timestamp,
            kind,
            question_id,
            meta,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pulse_types::AnswerOption;

    fn two_question_test() -> Test {
        let question = |id: &str, sort_order: i64| Question {
            id: id.into(),
            question_text: format!("Question {id}"),
            points: 1,
            sort_order,
            options: vec![
                AnswerOption {
                    id: format!("{id}-yes").as_str().into(),
                    option_text: "yes".to_string(),
                    is_correct: true,
                },
                AnswerOption {
                    id: format!("{id}-no").as_str().into(),
                    option_text: "no".to_string(),
                    is_correct: false,
                },
            ],
        };
        Test {
            id: "t1".into(),
            title: "Two questions".to_string(),
            duration_in_m: 2,
            passing_score: 50.0,
            // Delivered out of order
            questions: vec![question("q2", 2), question("q1", 1)],
        }
    }

    fn start() -> (AttemptSession, DateTime<Utc>) {
        let now = Utc::now();
        let session =
            AttemptSession::start(two_question_test(), &SessionContext::for_user("u1"), now)
                .unwrap();
        (session, now)
    }

    #[test]
    fn starts_at_lowest_sort_position_with_even_budget() {
        let (session, _) = start();
        assert_eq!(session.index(), 0);
        assert_eq!(session.current_question().unwrap().id.as_str(), "q1");
        assert_eq!(session.budget(), Duration::from_secs(60));
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.events()[0].kind, EventKind::QuestionVisit);
    }

    #[test]
    fn refuses_to_start_without_identity() {
        let err = AttemptSession::start(two_question_test(), &SessionContext::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::MissingIdentity));
    }

    #[test]
    fn refuses_to_start_without_questions() {
        let mut test = two_question_test();
        test.questions.clear();
        let err = AttemptSession::start(test, &SessionContext::for_user("u1"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::NoQuestions(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn manual_advance_requires_an_answer() {
        let (mut session, now) = start();
        assert!(!session.can_advance_manually());

        let err = session.advance(AdvanceTrigger::Manual, now).unwrap_err();
        assert!(matches!(err, Error::Unanswered(_)));
        assert!(!err.is_fatal());
        assert_eq!(session.index(), 0);

        session
            .record_answer("q1".into(), "q1-yes".into(), now)
            .unwrap();
        assert!(session.can_advance_manually());
        assert_eq!(
            session.advance(AdvanceTrigger::Manual, now).unwrap(),
            Advance::Question(1)
        );
    }

    #[test]
    fn timeout_advances_without_an_answer() {
        let (mut session, now) = start();
        assert_eq!(
            session
                .advance(AdvanceTrigger::Timeout { index: 0 }, now)
                .unwrap(),
            Advance::Question(1)
        );
        assert!(!session.answers().has_answer(&"q1".into()));
    }

    #[test]
    fn stale_timeout_is_ignored() {
        let (mut session, now) = start();
        session
            .advance(AdvanceTrigger::Timeout { index: 0 }, now)
            .unwrap();

        assert_eq!(
            session
                .advance(AdvanceTrigger::Timeout { index: 0 }, now)
                .unwrap(),
            Advance::Ignored
        );
        assert_eq!(session.index(), 1);
    }

    #[test]
    fn only_active_question_accepts_answers() {
        let (mut session, now) = start();
        let err = session
            .record_answer("q2".into(), "q2-yes".into(), now)
            .unwrap_err();
        assert!(matches!(err, Error::QuestionNotActive(_)));

        let err = session
            .record_answer("q1".into(), "q2-yes".into(), now)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownOption { .. }));

        session
            .record_answer("q1".into(), "q1-yes".into(), now)
            .unwrap();
        session.advance(AdvanceTrigger::Manual, now).unwrap();
        let err = session
            .record_answer("q1".into(), "q1-no".into(), now)
            .unwrap_err();
        assert!(matches!(err, Error::QuestionNotActive(_)));
    }

    #[test]
    fn leaving_last_question_submits_once() {
        let (mut session, started) = start();
        session
            .record_answer("q1".into(), "q1-yes".into(), started)
            .unwrap();
        session.advance(AdvanceTrigger::Manual, started).unwrap();
        session
            .record_answer("q2".into(), "q2-no".into(), started)
            .unwrap();

        let later = started + TimeDelta::seconds(75);
        let Advance::Submit(request) = session.advance(AdvanceTrigger::Manual, later).unwrap()
        else {
            panic!("expected submission");
        };
        assert_eq!(request.time_spent, 75);
        assert_eq!(request.user_id.as_str(), "u1");
        assert_eq!(request.answers.len(), 2);
        assert!(session.is_in_flight());

        // Timer racing the click
        assert_eq!(
            session
                .advance(AdvanceTrigger::Timeout { index: 1 }, later)
                .unwrap(),
            Advance::Ignored
        );
        assert_eq!(
            session.advance(AdvanceTrigger::Manual, later).unwrap(),
            Advance::Ignored
        );
        assert!(matches!(
            session.record_answer("q2".into(), "q2-yes".into(), later),
            Err(Error::NotInProgress)
        ));
    }

    #[test]
    fn failed_submission_keeps_answers_for_retry() {
        let (mut session, now) = start();
        session
            .record_answer("q1".into(), "q1-yes".into(), now)
            .unwrap();
        session.advance(AdvanceTrigger::Manual, now).unwrap();
        session
            .record_answer("q2".into(), "q2-yes".into(), now)
            .unwrap();
        let Advance::Submit(first) = session.advance(AdvanceTrigger::Manual, now).unwrap() else {
            panic!("expected submission");
        };

        session.submission_failed("connection reset", now).unwrap();
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.index(), 1);

        let Advance::Submit(second) = session.advance(AdvanceTrigger::Manual, now).unwrap() else {
            panic!("expected submission");
        };
        assert_eq!(first.answers, second.answers);

        let result = AttemptResult {
            score: 100.0,
            correct_answers: 2,
            wrong_answers: 0,
            total_questions: 2,
            passed: true,
            passing_criteria: 50.0,
        };
        let stored = session.submission_succeeded(result.clone(), now).unwrap();
        assert_eq!(stored, &result);
        assert_eq!(session.phase(), Phase::Completed);
        assert!(session.answers().is_empty());
        assert!(matches!(
            session.submission_failed("late", now),
            Err(Error::NoSubmissionInFlight)
        ));
    }
}
