//! Event loop running one attempt.
//!
//! Timer ticks, user actions and the scoring response are handled one at a
//! time on a single task, so the session is never touched concurrently.
use std::{future::Future, pin::Pin, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use futures_util::future::OptionFuture;
use pulse_types::{AttemptResult, OptionId, Question, QuestionId, SubmitAttemptRequest, TestId};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, error, info, trace, warn};

use crate::{
    api::{AttemptApi, SessionContext},
    error::Error,
    session::{Advance, AdvanceTrigger, AttemptSession},
    stats::AttemptStats,
    timer::{QuestionTimer, TimerEvent},
};

/// Shown to the user when scoring fails. Details of the failure are only logged.
pub const SUBMISSION_FAILED_MESSAGE: &str = "Failed to submit test. Please try again.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    Select { option_id: OptionId },
    Next,
    /// Dismisses the result
    Acknowledge,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    Question {
        index: usize,
        count: usize,
        question: QuestionView,
        budget: Duration,
        selected: Option<OptionId>,
    },
    Tick {
        index: usize,
        remaining: Duration,
    },
    AnswerRecorded {
        question_id: QuestionId,
        option_id: OptionId,
        can_advance: bool,
    },
    /// An action was refused, the attempt continues
    Rejected {
        reason: String,
    },
    Submitting,
    SubmissionFailed {
        message: String,
    },
    Completed {
        result: AttemptResult,
        stats: AttemptStats,
    },
}

/// A question as presented to the user, without correctness flags
#[derive(Clone, Debug, PartialEq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub text: String,
    pub points: u32,
    pub options: Vec<OptionView>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionView {
    pub id: OptionId,
    pub text: String,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            text: question.question_text.clone(),
            points: question.points,
            options: question
                .options
                .iter()
                .map(|o| OptionView {
                    id: o.id.clone(),
                    text: o.option_text.clone(),
                })
                .collect(),
        }
    }
}

type Submission<'a> = Pin<Box<dyn Future<Output = anyhow::Result<AttemptResult>> + 'a>>;

/// Wall clock anchored at the start of the attempt and advanced by the
/// monotonic runtime clock.
struct AttemptClock {
    wall: DateTime<Utc>,
    start: Instant,
}

impl AttemptClock {
    fn start() -> Self {
        Self {
            wall: Utc::now(),
            start: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::from_std(self.start.elapsed()).unwrap_or(TimeDelta::zero());
        self.wall + elapsed
    }
}

/// Runs an attempt of `test_id` until its result is acknowledged.
///
/// Returns the result once the user acknowledges it, or closes `actions` after
/// the attempt was submitted. Closing `actions` before that abandons the attempt.
#[tracing::instrument(skip_all, fields(test = %test_id), err(Debug))]
pub async fn run_attempt<A: AttemptApi>(
    api: &A,
    test_id: &TestId,
    context: &SessionContext,
    mut actions: mpsc::Receiver<UserAction>,
    updates: mpsc::UnboundedSender<Update>,
) -> Result<AttemptResult, Error> {
    let test = match api.fetch_test(test_id).await {
        Ok(Some(test)) => test,
        Ok(None) => return Err(Error::TestNotFound(test_id.clone())),
        Err(e) => {
            error!(error = ?e, "unable to fetch test");
            return Err(Error::Fetch(format!("{e:#}")));
        }
    };

    let clock = AttemptClock::start();
    let mut session = AttemptSession::start(test, context, clock.now())?;
    info!(
        questions = session.count(),
        budget_in_s = session.budget().as_secs(),
        "attempt started"
    );

    let mut timer = QuestionTimer::new();
    enter_question(&session, &mut timer, &updates)?;

    let mut submission: OptionFuture<Submission<'_>> = None.into();
    let mut input_open = true;

    loop {
        tokio::select! {
            Some(outcome) = &mut submission, if session.is_in_flight() => {
                submission = None.into();
                match outcome {
                    Ok(result) => {
                        let result = session.submission_succeeded(result, clock.now())?.clone();
                        info!(score = result.score, passed = result.passed, "attempt scored");
                        send(&updates, Update::Completed {
                            result: result.clone(),
                            stats: session.stats(),
                        });
                        if !input_open {
                            return Ok(result);
                        }
                    }
                    Err(e) => {
                        error!(error = ?e, "unable to submit attempt");
                        session.submission_failed(&e.to_string(), clock.now())?;
                        send(&updates, Update::SubmissionFailed {
                            message: SUBMISSION_FAILED_MESSAGE.to_string(),
                        });
                        if !input_open {
                            warn!(
                                index = session.index(),
                                "attempt abandoned after failed submission"
                            );
                            return Err(Error::Abandoned);
                        }
                        enter_question(&session, &mut timer, &updates)?;
                    }
                }
            }
            event = timer.next_event() => match event {
                TimerEvent::Tick { index, remaining } => {
                    send(&updates, Update::Tick { index, remaining });
                }
                TimerEvent::Expired { index } => {
                    debug!(index, "question timer expired");
                    let trigger = AdvanceTrigger::Timeout { index };
                    let request = advance(&mut session, &mut timer, &updates, trigger, &clock)?;
                    if let Some(request) = request {
                        submission = Some(Box::pin(api.submit_attempt(request)) as Submission<'_>)
                            .into();
                    }
                }
            },
            action = actions.recv(), if input_open => match action {
                Some(UserAction::Select { option_id }) => {
                    select_option(&mut session, option_id, &updates, &clock)?;
                }
                Some(UserAction::Next) => {
                    let trigger = AdvanceTrigger::Manual;
                    let request = advance(&mut session, &mut timer, &updates, trigger, &clock)?;
                    if let Some(request) = request {
                        submission = Some(Box::pin(api.submit_attempt(request)) as Submission<'_>)
                            .into();
                    }
                }
                Some(UserAction::Acknowledge) => {
                    if let Some(result) = session.result() {
                        return Ok(result.clone());
                    }
                    debug!("no result to acknowledge");
                }
                None => {
                    if let Some(result) = session.result() {
                        return Ok(result.clone());
                    }
                    // A submission already sent still gets its result
                    if session.is_in_flight() {
                        debug!("input closed while submitting");
                        input_open = false;
                    } else {
                        warn!(index = session.index(), "attempt abandoned");
                        return Err(Error::Abandoned);
                    }
                }
            },
        }
    }
}

/// Shows the active question and restarts its countdown
fn enter_question(
    session: &AttemptSession,
    timer: &mut QuestionTimer,
    updates: &mpsc::UnboundedSender<Update>,
) -> Result<(), Error> {
    let question = session.current_question()?;
    timer.start(session.index(), session.budget());

    send(
        updates,
        Update::Question {
            index: session.index(),
            count: session.count(),
            question: QuestionView::from(question),
            budget: session.budget(),
            selected: session.answers().selected(&question.id).cloned(),
        },
    );
    Ok(())
}

fn advance(
    session: &mut AttemptSession,
    timer: &mut QuestionTimer,
    updates: &mpsc::UnboundedSender<Update>,
    trigger: AdvanceTrigger,
    clock: &AttemptClock,
) -> Result<Option<SubmitAttemptRequest>, Error> {
    match session.advance(trigger, clock.now()) {
        Ok(Advance::Question(index)) => {
            debug!(index, ?trigger, "advanced to question");
            enter_question(session, timer, updates)?;
            Ok(None)
        }
        Ok(Advance::Submit(request)) => {
            timer.cancel();
            info!(
                answered = request.answers.len(),
                time_spent = request.time_spent,
                ?trigger,
                "submitting attempt"
            );
            send(updates, Update::Submitting);
            Ok(Some(request))
        }
        Ok(Advance::Ignored) => Ok(None),
        Err(e) if !e.is_fatal() => {
            debug!(error = %e, "advance rejected");
            send(
                updates,
                Update::Rejected {
                    reason: e.to_string(),
                },
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn select_option(
    session: &mut AttemptSession,
    option_id: OptionId,
    updates: &mpsc::UnboundedSender<Update>,
    clock: &AttemptClock,
) -> Result<(), Error> {
    let question_id = session.current_question()?.id.clone();

    match session.record_answer(question_id.clone(), option_id.clone(), clock.now()) {
        Ok(_) => send(
            updates,
            Update::AnswerRecorded {
                question_id,
                option_id,
                can_advance: session.can_advance_manually(),
            },
        ),
        Err(e) if !e.is_fatal() => {
            debug!(error = %e, "selection rejected");
            send(
                updates,
                Update::Rejected {
                    reason: e.to_string(),
                },
            );
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

fn send(updates: &mpsc::UnboundedSender<Update>, update: Update) {
    if updates.send(update).is_err() {
        trace!("update receiver dropped");
    }
}
