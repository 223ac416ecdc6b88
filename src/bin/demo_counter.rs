//! Mutex-guarded shared counter: several workers increment one counter and
//! the final value always equals workers x increments.
//!
//! Run with: cargo run --bin demo_counter [workers] [increments]
//! Set RUST_LOG=trace to watch individual increments.

use std::env;

use colored::Colorize;
use fanout::run_counter;

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let workers = args.next().and_then(|a| a.parse().ok()).unwrap_or(5);
    let increments = args.next().and_then(|a| a.parse().ok()).unwrap_or(3);

    println!("{}", "=== Mutex Counter ===".bold());
    println!(
        "Starting {} workers, {} increments each...",
        workers, increments
    );

    let total = run_counter(workers, increments);
    let expected = (workers * increments) as u64;

    println!("Final counter value: {} (expected {})", total, expected);
    if total == expected {
        println!("{}", "Counter held under contention".green());
    } else {
        println!("{}", "Lost increments, mutual exclusion is broken".red());
    }
}
