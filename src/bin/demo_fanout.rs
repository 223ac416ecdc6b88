//! Fan-out/fan-in walk-through: launch workers, collect their outcomes,
//! survive a failing task, race a round against a timeout.
//!
//! Run with: cargo run --bin demo_fanout [task-count]
//! Set RUST_LOG=trace to watch outcomes arrive.

use std::env;
use std::thread;
use std::time::Duration;

use colored::Colorize;
use fanout::{run_fan_out, FanOut, Outcome, TaskError};
use itertools::Itertools;
use rand::Rng;

/// Simulated work: sleep a randomized amount, then report.
fn simulated_work(id: usize) -> Result<String, TaskError> {
    let millis = rand::thread_rng().gen_range(50..250);
    thread::sleep(Duration::from_millis(millis));
    Ok(format!("Worker {} finished after {}ms", id, millis))
}

fn main() {
    env_logger::init();

    let tasks = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or_else(num_cpus::get);

    println!("{}", "=== 1. Basic Fan-Out ===".bold());
    let report = run_fan_out(tasks, |ctx| simulated_work(ctx.id), None);
    for outcome in &report.outcomes {
        match outcome {
            Outcome::Success { value, .. } => println!("Received: {}", value),
            Outcome::Failure { id, error } => {
                println!("{}", format!("Task {} failed: {}", id, error).red())
            }
        }
    }
    // Arrival order is completion order, so this varies run to run.
    println!("Arrival order: {}", report.ids().iter().join(", "));

    println!("\n{}", "=== 2. One Task Fails, the Rest Deliver ===".bold());
    let report = run_fan_out(
        3,
        |ctx| {
            if ctx.id == 2 {
                Err(TaskError::Failed("simulated I/O error".to_string()))
            } else {
                simulated_work(ctx.id)
            }
        },
        None,
    );
    println!(
        "{} succeeded, {} failed, {} outcomes in total",
        report.success_count(),
        report.failure_count(),
        report.len()
    );

    println!("\n{}", "=== 3. Racing a Timeout ===".bold());
    let runner = FanOut::new(4).timeout(Duration::from_millis(100));
    let report = runner.run(|ctx| {
        // Slow workers poll the cancel token and bail out once the
        // collector has abandoned the round.
        for _ in 0..40 {
            if ctx.is_cancelled() {
                return Err(TaskError::Failed("cancelled".to_string()));
            }
            thread::sleep(Duration::from_millis(10));
        }
        Ok(format!("Worker {} finished", ctx.id))
    });
    if report.timed_out {
        println!(
            "{}",
            format!("Timed out with {} of 4 outcomes collected", report.len()).yellow()
        );
    }

    println!("\n{}", "=== Key Points ===".bold());
    println!("1. Each task delivers exactly one outcome, success or failure");
    println!("2. Arrival order is completion order, never launch order");
    println!("3. A timeout returns partial outcomes plus a flag, not a hang");
    println!("4. Timed-out rounds trip a cancel token that tasks may poll");
}
