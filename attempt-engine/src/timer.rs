use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Shortest budget a question can get. A zero budget would expire every
/// question as soon as it is shown.
pub const MIN_QUESTION_BUDGET: Duration = Duration::from_secs(1);

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Splits the test duration evenly across its questions, rounding down to whole
/// seconds.
pub fn per_question_budget(duration_in_m: u32, question_count: usize) -> Duration {
    let total_in_s = u64::from(duration_in_m) * 60;
    let count = question_count.max(1) as u64;
    let budget = Duration::from_secs(total_in_s / count);
    budget.max(MIN_QUESTION_BUDGET)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { index: usize, remaining: Duration },
    Expired { index: usize },
}

#[derive(Debug)]
struct ActiveTimer {
    index: usize,
    remaining_in_s: u64,
    interval: Interval,
}

/// Countdown for the active question.
///
/// Holds at most one running countdown. Starting a new one drops the previous
/// interval first, so a countdown never reports for a question that is no
/// longer shown.
#[derive(Debug, Default)]
pub struct QuestionTimer {
    slot: Option<ActiveTimer>,
}

impl QuestionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, index: usize, budget: Duration) {
        self.cancel();

        let budget = budget.max(MIN_QUESTION_BUDGET);
        let mut interval = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::trace!(index, budget_in_s = budget.as_secs(), "starting question timer");
        self.slot = Some(ActiveTimer {
            index,
            remaining_in_s: budget.as_secs(),
            interval,
        });
    }

    pub fn cancel(&mut self) {
        if let Some(active) = self.slot.take() {
            tracing::trace!(index = active.index, "cancelled question timer");
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.slot
            .as_ref()
            .map(|active| Duration::from_secs(active.remaining_in_s))
    }

    /// Resolves on the next tick of the running countdown. Never resolves while
    /// no countdown is running.
    ///
    /// Cancel safe: the countdown only changes once a tick has been observed.
    pub async fn next_event(&mut self) -> TimerEvent {
        let Some(active) = self.slot.as_mut() else {
            return std::future::pending().await;
        };

        active.interval.tick().await;
        active.remaining_in_s = active.remaining_in_s.saturating_sub(1);

        let index = active.index;
        let remaining_in_s = active.remaining_in_s;
        if remaining_in_s == 0 {
            self.slot = None;
            TimerEvent::Expired { index }
        } else {
            TimerEvent::Tick {
                index,
                remaining: Duration::from_secs(remaining_in_s),
            }
        }
    }
}
