//! Tokio-backed task scheduler.

use super::domain::{TaskName, TaskSnapshot, TaskState, TaskStatus};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct TaskEntry {
    fire_time: DateTime<Utc>,
    payload: serde_json::Value,
    state: TaskState,
    timer: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct SchedulerState {
    tasks: HashMap<TaskName, TaskEntry>,
    shut_down: bool,
}

type SharedState = Arc<Mutex<SchedulerState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, SchedulerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of named one-shot timers.
///
/// Timers run on the Tokio runtime that is current at registration time.
#[derive(Debug)]
pub struct TaskScheduler<C>
where
    C: Clock + Send + Sync,
{
    clock: Arc<C>,
    state: SharedState,
}

impl<C> TaskScheduler<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// Registers `callback` to run once with `data` at `fire_time`.
    ///
    /// Returns `false`, scheduling nothing, when the name is empty or
    /// already used, when `fire_time` is not strictly in the future, when
    /// the scheduler has been shut down, or when no Tokio runtime is active.
    pub fn register_task<F, Fut>(
        &self,
        name: &str,
        fire_time: DateTime<Utc>,
        callback: F,
        data: serde_json::Value,
    ) -> bool
    where
        F: FnOnce(serde_json::Value) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(task_name) = TaskName::new(name) else {
            tracing::warn!(name, "rejected task with invalid name");
            return false;
        };
        let now = self.clock.utc();
        if fire_time <= now {
            tracing::warn!(task = %task_name, %fire_time, "rejected task scheduled in the past");
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::error!(task = %task_name, "no async runtime to drive task timer");
            return false;
        };

        let mut state = lock(&self.state);
        if state.shut_down {
            tracing::warn!(task = %task_name, "rejected task after scheduler shutdown");
            return false;
        }
        if state.tasks.contains_key(&task_name) {
            tracing::warn!(task = %task_name, "rejected duplicate task name");
            return false;
        }

        let delay = (fire_time - now).to_std().unwrap_or_default();
        let timer_state = Arc::clone(&self.state);
        let timer_name = task_name.clone();
        let timer = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(payload) = begin_firing(&timer_state, &timer_name) else {
                return;
            };
            tracing::debug!(task = %timer_name, "task firing");
            callback(payload).await;
            finish_firing(&timer_state, &timer_name);
        });

        state.tasks.insert(
            task_name.clone(),
            TaskEntry {
                fire_time,
                payload: data,
                state: TaskState::Pending,
                timer: Some(timer),
            },
        );
        tracing::debug!(task = %task_name, %fire_time, "task registered");
        true
    }

    /// Returns whether `name` exists and whether its callback completed.
    #[must_use]
    pub fn get_task_status(&self, name: &str) -> TaskStatus {
        let Ok(task_name) = TaskName::new(name) else {
            return TaskStatus::UNKNOWN;
        };
        lock(&self.state)
            .tasks
            .get(&task_name)
            .map_or(TaskStatus::UNKNOWN, |entry| TaskStatus {
                exists: true,
                complete: entry.state.is_complete(),
            })
    }

    /// Cancels the timer for `name`.
    ///
    /// Returns `false` for an unknown name and `true` otherwise, including
    /// when the task already fired. A fired task stays fired.
    pub fn cancel_task(&self, name: &str) -> bool {
        let Ok(task_name) = TaskName::new(name) else {
            return false;
        };
        let mut state = lock(&self.state);
        let Some(entry) = state.tasks.get_mut(&task_name) else {
            return false;
        };
        if entry.state == TaskState::Pending {
            entry.state = TaskState::Cancelled;
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
            tracing::debug!(task = %task_name, "task cancelled");
        }
        true
    }

    /// Returns a snapshot of every registered task, ordered by name.
    #[must_use]
    pub fn get_all_tasks(&self) -> Vec<TaskSnapshot> {
        let state = lock(&self.state);
        let mut tasks: Vec<TaskSnapshot> = state
            .tasks
            .iter()
            .map(|(name, entry)| {
                TaskSnapshot::new(
                    name.clone(),
                    entry.fire_time,
                    entry.payload.clone(),
                    entry.state,
                )
            })
            .collect();
        tasks.sort_by(|left, right| left.name().cmp(right.name()));
        tasks
    }

    /// Returns the number of tasks still waiting to fire.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        lock(&self.state)
            .tasks
            .values()
            .filter(|entry| entry.state == TaskState::Pending)
            .count()
    }

    /// Cancels every pending timer and rejects further registrations.
    pub fn shutdown(&self) {
        let mut state = lock(&self.state);
        state.shut_down = true;
        let mut cancelled = 0_usize;
        for entry in state.tasks.values_mut() {
            if entry.state == TaskState::Pending {
                entry.state = TaskState::Cancelled;
                if let Some(timer) = entry.timer.take() {
                    timer.abort();
                }
                cancelled += 1;
            }
        }
        tracing::info!(cancelled, "task scheduler shut down");
    }

    /// Returns `true` once [`Self::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        lock(&self.state).shut_down
    }
}

fn begin_firing(state: &SharedState, name: &TaskName) -> Option<serde_json::Value> {
    let mut guard = lock(state);
    let entry = guard.tasks.get_mut(name)?;
    if entry.state != TaskState::Pending {
        return None;
    }
    entry.state = TaskState::Running;
    entry.timer = None;
    Some(entry.payload.clone())
}

fn finish_firing(state: &SharedState, name: &TaskName) {
    if let Some(entry) = lock(state).tasks.get_mut(name) {
        entry.state = TaskState::Fired;
    }
}
