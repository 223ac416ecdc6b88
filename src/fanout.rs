//! The fan-out/fan-in primitive: launch `n` independent tasks, collect their
//! outcomes through one channel, optionally bounded by a timeout.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use log::{debug, trace, warn};

use crate::cancel::CancelToken;
use crate::error::TaskError;
use crate::task::{Outcome, Phase, TaskContext, TaskId};

/// Aggregated view of one fan-out round: outcomes in arrival order, plus
/// whether collection was cut short by the timeout.
///
/// Arrival order is completion order. Two tasks launched in sequence may
/// report in either order; nothing relates arrival order to task ids.
#[derive(Debug)]
pub struct FanOutReport<T> {
    pub outcomes: Vec<Outcome<T>>,
    pub timed_out: bool,
}

impl<T> FanOutReport<T> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Task ids in arrival order.
    pub fn ids(&self) -> Vec<TaskId> {
        self.outcomes.iter().map(Outcome::id).collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }
}

/// Transient aggregation state for one round: the delivery channel's receiving
/// end, how many outcomes are still expected, and what has arrived so far.
pub struct Collector<T> {
    inbox: Receiver<Outcome<T>>,
    expected: usize,
    received: Vec<Outcome<T>>,
    phase: Phase,
}

impl<T> Collector<T> {
    fn new(inbox: Receiver<Outcome<T>>, expected: usize) -> Self {
        Self {
            inbox,
            expected,
            received: Vec::with_capacity(expected),
            phase: Phase::Launching,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The bounded collection loop: receive until `expected` outcomes have
    /// arrived or the deadline passes. Returns true when the deadline cut
    /// collection short.
    fn drain(&mut self, deadline: Option<Instant>) -> bool {
        self.phase = Phase::Collecting;
        let mut timed_out = false;

        while self.received.len() < self.expected {
            let next = match deadline {
                Some(at) => self.inbox.recv_deadline(at),
                None => self.inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match next {
                Ok(outcome) => {
                    trace!("collected outcome from task {}", outcome.id());
                    self.received.push(outcome);
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "collection timed out with {} of {} outcomes",
                        self.received.len(),
                        self.expected
                    );
                    timed_out = true;
                    break;
                }
                // Every worker sends exactly once before dropping its sender,
                // so the channel cannot disconnect while outcomes are missing.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.phase = Phase::Done;
        timed_out
    }

    fn finish(self) -> Vec<Outcome<T>> {
        self.received
    }
}

/// Runs a fixed set of independent tasks concurrently and gathers their
/// outcomes. Build with [`FanOut::new`], optionally bound the wait with
/// [`FanOut::timeout`], then call [`FanOut::run`].
pub struct FanOut {
    tasks: usize,
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl FanOut {
    pub fn new(tasks: usize) -> Self {
        Self {
            tasks,
            timeout: None,
            cancel: CancelToken::new(),
        }
    }

    /// Bounds the collection wait. Without one the run waits indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The round's cancellation token, shared with every task through its
    /// [`TaskContext`]. Tripped automatically when the timeout fires.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Launches one worker thread per task and collects their outcomes.
    ///
    /// Each worker delivers exactly one [`Outcome`], success or failure, into
    /// a channel sized for every outcome, so a worker outliving a timed-out
    /// round never blocks on its final send. With `tasks == 0` this returns
    /// an empty report immediately without spawning anything.
    pub fn run<T, F>(self, task_fn: F) -> FanOutReport<T>
    where
        T: Send + 'static,
        F: Fn(&TaskContext) -> Result<T, TaskError> + Send + Sync + 'static,
    {
        if self.tasks == 0 {
            return FanOutReport {
                outcomes: Vec::new(),
                timed_out: false,
            };
        }

        let (tx, rx) = channel::bounded(self.tasks);
        let task_fn = Arc::new(task_fn);
        let deadline = self.timeout.map(|t| Instant::now() + t);

        debug!("launching {} tasks", self.tasks);
        for id in 1..=self.tasks {
            let tx = tx.clone();
            let task_fn = Arc::clone(&task_fn);
            let ctx = TaskContext::new(id, self.cancel.clone());
            thread::spawn(move || {
                let outcome = run_task(id, &ctx, task_fn.as_ref());
                // A timed-out collector may already have dropped the
                // receiver; an undeliverable outcome is simply discarded.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut collector = Collector::new(rx, self.tasks);
        let timed_out = collector.drain(deadline);
        if timed_out {
            self.cancel.cancel();
        }

        FanOutReport {
            outcomes: collector.finish(),
            timed_out,
        }
    }
}

/// Launches `n` concurrent executions of `task_fn`, tagged `1..=n`, and
/// collects their outcomes in arrival order, waiting at most `timeout` when
/// one is given.
pub fn run_fan_out<T, F>(n: usize, task_fn: F, timeout: Option<Duration>) -> FanOutReport<T>
where
    T: Send + 'static,
    F: Fn(&TaskContext) -> Result<T, TaskError> + Send + Sync + 'static,
{
    let mut runner = FanOut::new(n);
    if let Some(t) = timeout {
        runner = runner.timeout(t);
    }
    runner.run(task_fn)
}

fn run_task<T, F>(id: TaskId, ctx: &TaskContext, task_fn: &F) -> Outcome<T>
where
    F: Fn(&TaskContext) -> Result<T, TaskError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| task_fn(ctx))) {
        Ok(Ok(value)) => Outcome::Success { id, value },
        Ok(Err(error)) => Outcome::Failure { id, error },
        Err(payload) => Outcome::Failure {
            id,
            error: TaskError::Panicked(panic_message(payload.as_ref())),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_task_reports_exactly_once() {
        let report = run_fan_out(8, |ctx| Ok(ctx.id * 2), None);

        assert_eq!(report.len(), 8);
        assert!(!report.timed_out);

        let ids: HashSet<TaskId> = report.ids().into_iter().collect();
        assert_eq!(ids, (1..=8).collect::<HashSet<_>>());
        for outcome in &report.outcomes {
            assert_eq!(outcome.value(), Some(&(outcome.id() * 2)));
        }
    }

    #[test]
    fn test_zero_tasks_returns_immediately() {
        let report: FanOutReport<()> = run_fan_out(0, |_| Ok(()), None);
        assert!(report.is_empty());
        assert!(!report.timed_out);
    }

    #[test]
    fn test_one_failure_does_not_abort_the_round() {
        let report = run_fan_out(
            3,
            |ctx| {
                if ctx.id == 2 {
                    Err(TaskError::Failed("simulated failure".to_string()))
                } else {
                    Ok(format!("worker {} finished", ctx.id))
                }
            },
            None,
        );

        assert_eq!(report.len(), 3);
        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);

        let failed: Vec<TaskId> = report
            .outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(Outcome::id)
            .collect();
        assert_eq!(failed, vec![2]);
    }

    #[test]
    fn test_panic_is_reported_as_failure() {
        let report = run_fan_out(
            2,
            |ctx| {
                if ctx.id == 1 {
                    panic!("worker blew up");
                }
                Ok(ctx.id)
            },
            None,
        );

        assert_eq!(report.len(), 2);
        let failure = report
            .outcomes
            .iter()
            .find(|o| !o.is_success())
            .expect("one outcome should be a failure");
        assert_eq!(failure.id(), 1);
        assert_eq!(
            failure.error(),
            Some(&TaskError::Panicked("worker blew up".to_string()))
        );
    }

    #[test]
    fn test_timeout_returns_partial_report_promptly() {
        let started = Instant::now();
        let report = run_fan_out(
            5,
            |ctx| {
                thread::sleep(Duration::from_millis(500));
                Ok(ctx.id)
            },
            Some(Duration::from_millis(30)),
        );

        assert!(report.timed_out);
        assert!(report.is_empty());
        // Must come back near the timeout, not after the workers finish.
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_timeout_keeps_outcomes_collected_so_far() {
        let report = run_fan_out(
            4,
            |ctx| {
                if ctx.id > 2 {
                    thread::sleep(Duration::from_millis(600));
                }
                Ok(ctx.id)
            },
            Some(Duration::from_millis(250)),
        );

        assert!(report.timed_out);
        let ids: HashSet<TaskId> = report.ids().into_iter().collect();
        assert_eq!(ids, [1, 2].into_iter().collect::<HashSet<_>>());
    }

    #[test]
    fn test_timeout_trips_the_cancel_token() {
        let runner = FanOut::new(3).timeout(Duration::from_millis(30));
        let token = runner.cancel_token();

        let report = runner.run(|_| {
            thread::sleep(Duration::from_millis(300));
            Ok(())
        });

        assert!(report.timed_out);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_collector_reaches_done_after_draining() {
        let (tx, rx) = channel::bounded(2);
        tx.send(Outcome::Success { id: 1, value: 10 }).unwrap();
        tx.send(Outcome::Success { id: 2, value: 20 }).unwrap();
        drop(tx);

        let mut collector = Collector::new(rx, 2);
        assert_eq!(collector.phase(), Phase::Launching);

        let timed_out = collector.drain(None);
        assert!(!timed_out);
        assert_eq!(collector.phase(), Phase::Done);
        assert_eq!(collector.finish().len(), 2);
    }
}
