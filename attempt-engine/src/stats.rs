use chrono::{DateTime, Utc};
use pulse_types::{
    QuestionId,
    events::{Event, EventKind},
};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttemptStats {
    pub time_to_answers: Vec<TimeToAnswer>,
    pub total_questions: usize,
    pub answered: usize,
    /// Seconds from the start of the attempt until answers were submitted
    pub time_to_complete: f64,
    pub average_time_per_question: f64,
}

/// Seconds between a question being shown and its final selection
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeToAnswer {
    pub question_id: QuestionId,
    pub value: f64,
}

struct Visit {
    question_id: QuestionId,
    shown_at: DateTime<Utc>,
    answered_at: Option<DateTime<Utc>>,
}

/// Derives statistics from an attempt timeline.
///
/// The attempt is considered finished at its last submission, so time spent
/// waiting on the scoring service is not counted.
pub fn attempt_stats(events: &[Event], total_questions: usize) -> AttemptStats {
    let mut visits: Vec<Visit> = vec![];
    let mut started_at = None;
    let mut finished_at = None;

    for event in events {
        started_at.get_or_insert(event.timestamp);

        match event.kind {
            EventKind::QuestionVisit => {
                if let Some(question_id) = &event.question_id {
                    if !visits.iter().any(|v| &v.question_id == question_id) {
                        visits.push(Visit {
                            question_id: question_id.clone(),
                            shown_at: event.timestamp,
                            answered_at: None,
                        });
                    }
                }
            }
            EventKind::AnswerSelected => {
                if let Some(visit) = visits
                    .iter_mut()
                    .find(|v| Some(&v.question_id) == event.question_id.as_ref())
                {
                    visit.answered_at = Some(event.timestamp);
                }
            }
            EventKind::SubmissionStarted => {
                finished_at = Some(event.timestamp);
            }
            EventKind::TimerExpired
            | EventKind::SubmissionFailed
            | EventKind::SubmissionCompleted => {}
        }
    }

    let time_to_answers: Vec<TimeToAnswer> = visits
        .iter()
        .filter_map(|v| {
            v.answered_at.map(|answered_at| TimeToAnswer {
                question_id: v.question_id.clone(),
                value: seconds_between(v.shown_at, answered_at),
            })
        })
        .collect();

    let time_to_complete = match (started_at, finished_at.or(events.last().map(|e| e.timestamp))) {
        (Some(start), Some(end)) => seconds_between(start, end),
        _ => 0.0,
    };
    let average_time_per_question = if total_questions == 0 {
        0.0
    } else {
        time_to_complete / total_questions as f64
    };

    AttemptStats {
        answered: time_to_answers.len(),
        time_to_answers,
        total_questions,
        time_to_complete,
        average_time_per_question,
    }
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds().max(0) as f64 / 1000.0
}
