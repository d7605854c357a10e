//! Dependency-ordered task execution.

use crate::cancel::CancelToken;
use crate::error::TaskError;
use anyhow::anyhow;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, watch};

/// A unit of work the scheduler can order and execute.
///
/// The scheduler knows nothing else about a task's nature. Dependency ids
/// that name no task in the run's set are treated as already satisfied.
pub trait Task: Send + Sync {
    fn id(&self) -> String;
    fn dependencies(&self) -> Vec<String>;
}

/// Per-run scheduler state: completion signals, the concurrency token pool,
/// and the aggregated error list.
struct Job {
    signals: HashMap<String, watch::Sender<bool>>,
    semaphore: Semaphore,
    /// Run-scope cancellation, derived from the caller's token.
    scope: CancelToken,
    /// The caller's token, consulted to attribute a cancellation.
    external: CancelToken,
    continue_on_fail: bool,
    errors: Mutex<Vec<TaskError>>,
}

impl Job {
    fn record(&self, error: TaskError) {
        let mut errors = self.errors.lock().unwrap_or_else(|e| e.into_inner());
        errors.push(error);
    }

    /// Record the outcome of a task unwound by cancellation.
    ///
    /// A caller-initiated cancellation is an error the caller must see. A
    /// cancellation triggered by another task's failure is not: that failure
    /// is already attributed once, to the task that failed, and the unwound
    /// task is merely skipped.
    fn record_cancellation(&self, task: &str) {
        if self.external.is_cancelled() {
            self.record(TaskError::Cancelled {
                task: task.to_string(),
                source: anyhow!("run cancelled by caller"),
            });
        } else {
            log::debug!("task '{task}' skipped: run cancelled after an earlier failure");
        }
    }
}

/// Fires a task's completion signal when dropped, so dependents are released
/// even if the command errors or unwinds.
struct SignalGuard<'a>(&'a watch::Sender<bool>);

impl Drop for SignalGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

/// Execute `tasks` with bounded concurrency, respecting dependency order.
///
/// Every task is launched concurrently; each one waits for its named
/// dependencies' completion signals, acquires one of `concurrency` tokens,
/// and runs `command`. With `continue_on_fail` unset, the first command
/// error cancels the run scope: commands already in flight finish, tasks
/// still waiting are skipped. With it set, a failure only affects its own
/// task; dependents still run once the failed dependency has signalled.
///
/// Cancelling `cancel` stops the run the same way, except that every
/// unfinished task then reports [`TaskError::Cancelled`].
///
/// Returns the unordered list of errors produced; empty on full success.
pub async fn run_tasks<T, F, Fut>(
    cancel: &CancelToken,
    tasks: Vec<Arc<T>>,
    concurrency: usize,
    continue_on_fail: bool,
    command: F,
) -> Vec<TaskError>
where
    T: Task + ?Sized + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    if let Some(ids) = find_duplicates(&tasks) {
        return vec![TaskError::Duplicate { ids }];
    }

    let mut signals = HashMap::with_capacity(tasks.len());
    for task in &tasks {
        let (tx, _rx) = watch::channel(false);
        signals.insert(task.id(), tx);
    }

    let job = Arc::new(Job {
        signals,
        semaphore: Semaphore::new(concurrency.max(1)),
        scope: cancel.child(),
        external: cancel.clone(),
        continue_on_fail,
        errors: Mutex::new(Vec::new()),
    });
    let command = Arc::new(command);

    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        let id = task.id();
        let runner = run_task(Arc::clone(&job), task, Arc::clone(&command));
        handles.push((id, tokio::spawn(runner)));
    }

    for (id, handle) in handles {
        if handle.await.is_err() {
            job.record(TaskError::Failed {
                task: id,
                source: anyhow!("task runner panicked"),
            });
        }
    }

    let mut errors = job.errors.lock().unwrap_or_else(|e| e.into_inner());
    std::mem::take(&mut *errors)
}

async fn run_task<T, F, Fut>(job: Arc<Job>, task: Arc<T>, command: Arc<F>)
where
    T: Task + ?Sized + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let id = task.id();
    let Some(signal) = job.signals.get(&id) else {
        return;
    };
    // Dropped on every exit path, so dependents never wait forever.
    let _signal = SignalGuard(signal);

    for dep in task.dependencies() {
        // A dependency outside the task set is already satisfied.
        let Some(tx) = job.signals.get(&dep) else {
            continue;
        };
        let mut rx = tx.subscribe();
        tokio::select! {
            res = rx.wait_for(|done| *done) => {
                let _ = res;
            }
            () = job.scope.cancelled() => {}
        }
        // Re-check after the wait: the dependency's signal and the scope's
        // cancellation can fire concurrently, and a task must not start
        // once a failure is known.
        if job.scope.is_cancelled() {
            job.record_cancellation(&id);
            return;
        }
    }

    let permit = tokio::select! {
        permit = job.semaphore.acquire() => permit,
        () = job.scope.cancelled() => {
            job.record_cancellation(&id);
            return;
        }
    };
    let Ok(permit) = permit else {
        return;
    };
    if job.scope.is_cancelled() {
        drop(permit);
        job.record_cancellation(&id);
        return;
    }

    if let Err(err) = command(task).await {
        if !job.continue_on_fail {
            // Cancel before the token is released so no other task slips in
            // once the failure is known.
            job.scope.cancel();
        }
        job.record(TaskError::Failed {
            task: id,
            source: err,
        });
    }
    drop(permit);
}

fn find_duplicates<T: Task + ?Sized>(tasks: &[Arc<T>]) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for task in tasks {
        let id = task.id();
        if !seen.insert(id.clone()) && !duplicates.contains(&id) {
            duplicates.push(id);
        }
    }
    (!duplicates.is_empty()).then_some(duplicates)
}
