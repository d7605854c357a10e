//! # taskpool
//!
//! A bounded-concurrency scheduler for interdependent tasks.
//!
//! Given a set of tasks, each exposing an id and the ids of the tasks it
//! depends on, [`run_tasks`] executes a caller-supplied command per task such
//! that a task only runs after all of its named dependencies have finished,
//! while at most `concurrency` commands execute at once. Failures either
//! cancel the rest of the run (the default) or let the remaining tasks
//! proceed (`continue_on_fail`).
//!
//! Guarantees:
//!
//! - for any task T and dependency D in the same run, D's command fully
//!   returns before T's command begins
//! - parallelism is bounded strictly by `concurrency`, never by task count
//! - no task is left waiting forever: completion signals fire even for tasks
//!   that error or unwind
//! - cancellation is cooperative: running commands are never interrupted
//!   mid-flight, but every suspended task observes it immediately
//!
//! The crate makes no assumptions about what a task does; commands typically
//! call remote APIs and publish their outputs through [`Results`] for
//! downstream consumers.

pub mod cancel;
pub mod error;
pub mod results;
pub mod task;

pub use cancel::CancelToken;
pub use error::TaskError;
pub use results::Results;
pub use task::{run_tasks, Task};
