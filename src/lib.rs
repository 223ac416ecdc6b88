//! Bounded fan-out/fan-in over worker threads.
//!
//! Launch a fixed set of independent tasks, let each deliver exactly one
//! outcome through a shared channel, and gather the outcomes in arrival
//! order, optionally racing the collection against a timeout. A companion
//! [`counter`] module covers the simpler shared-state contract: a
//! mutex-guarded counter that several workers increment concurrently.
//!
//! The demos log through the `log` facade; run them with `RUST_LOG=trace`
//! to watch outcomes arrive.

pub mod cancel;
pub mod counter;
pub mod error;
pub mod fanout;
pub mod task;

pub use cancel::CancelToken;
pub use counter::{run_counter, SharedCounter};
pub use error::TaskError;
pub use fanout::{run_fan_out, FanOut, FanOutReport};
pub use task::{Outcome, Phase, TaskContext, TaskId};
