use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bb_view::View;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::SupervisorConfig;
use crate::error::{ActionError, ActionResult};
use crate::registry::{library_of, Loader, Worker};

/// Lifecycle state of an [`Action`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Stopped,
    Running,
    Failed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Failed => "failed",
        })
    }
}

/// Snapshot of an action's supervision counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    pub status: ActionStatus,
    pub consecutive_errors: usize,
    pub total_errors: u64,
    pub invocations: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct TaskState {
    status: ActionStatus,
    consecutive_errors: usize,
    total_errors: u64,
    invocations: u64,
    last_error: Option<String>,
    last_error_at: Option<DateTime<Utc>>,
}

impl TaskState {
    fn new() -> Self {
        Self {
            status: ActionStatus::Stopped,
            consecutive_errors: 0,
            total_errors: 0,
            invocations: 0,
            last_error: None,
            last_error_at: None,
        }
    }

    fn record_error(&mut self, message: String) {
        self.total_errors += 1;
        self.last_error = Some(message);
        self.last_error_at = Some(Utc::now());
    }

    fn report(&self) -> ActionReport {
        ActionReport {
            status: self.status,
            consecutive_errors: self.consecutive_errors,
            total_errors: self.total_errors,
            invocations: self.invocations,
            last_error: self.last_error.clone(),
            last_error_at: self.last_error_at,
        }
    }
}

/// State shared between an [`Action`] and its background task.
///
/// `status` doubles as the stop flag: the task keeps going only while it
/// reads `Running`. Every sleep waits on `wake`, so `stop` interrupts it.
struct Shared {
    state: Mutex<TaskState>,
    wake: Condvar,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout` unless the action leaves `Running` first.
    /// Returns `true` if the task should keep going.
    fn pause(&self, timeout: Duration) -> bool {
        let guard = self.state();
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, timeout, |s| s.status == ActionStatus::Running)
            .unwrap_or_else(PoisonError::into_inner);
        guard.status == ActionStatus::Running
    }
}

/// A supervised worker bound to one [`View`].
///
/// [`run`](Self::run) resolves the worker through the loader and starts a
/// background thread that invokes it repeatedly. A success resets the
/// consecutive-error counter; a failure (returned error or panic) increments
/// it and backs off. Once the counter exceeds
/// [`SupervisorConfig::critical_errors`] the action is `Failed` and the
/// thread exits. Only an explicit `run` restarts it.
pub struct Action {
    path: PathBuf,
    name: String,
    view: Arc<View>,
    loader: Arc<dyn Loader>,
    config: SupervisorConfig,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Action {
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        view: Arc<View>,
        loader: Arc<dyn Loader>,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            view,
            loader,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(TaskState::new()),
                wake: Condvar::new(),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The library the worker is resolved from.
    pub fn library(&self) -> ActionResult<String> {
        library_of(&self.path)
    }

    pub fn view(&self) -> &Arc<View> {
        &self.view
    }

    pub fn status(&self) -> ActionStatus {
        self.shared.state().status
    }

    pub fn report(&self) -> ActionReport {
        self.shared.state().report()
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the background task. A no-op while already running.
    ///
    /// Starting from `Failed` resets the consecutive-error counter. If the
    /// worker cannot be resolved the action becomes `Failed` and the error
    /// is returned.
    pub fn run(&self) -> ActionResult<()> {
        let mut task = self.task();
        if self.status() == ActionStatus::Running {
            debug!(action = %self.name, "already running");
            return Ok(());
        }
        // A previous task has already exited or is about to.
        if let Some(handle) = task.take() {
            self.join(handle);
        }

        let worker = match self.loader.load(&self.path, &self.name) {
            Ok(worker) => worker,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        {
            let mut state = self.shared.state();
            state.status = ActionStatus::Running;
            state.consecutive_errors = 0;
        }

        let shared = Arc::clone(&self.shared);
        let view = Arc::clone(&self.view);
        let config = self.config.clone();
        let name = self.name.clone();
        let spawned = thread::Builder::new()
            .name(format!("action-{}", self.name))
            .spawn(move || supervise(&name, &shared, &view, &worker, &config));

        match spawned {
            Ok(handle) => {
                *task = Some(handle);
                info!(action = %self.name, path = %self.path.display(), "action started");
                Ok(())
            }
            Err(source) => {
                let e = ActionError::Spawn {
                    name: self.name.clone(),
                    source,
                };
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Stop the background task and wait until it has exited.
    ///
    /// A `Failed` action stays `Failed`. The call returns once the worker
    /// will not be invoked again; a pending backoff is cut short.
    pub fn stop(&self) {
        let mut task = self.task();
        {
            let mut state = self.shared.state();
            if state.status == ActionStatus::Running {
                state.status = ActionStatus::Stopped;
            }
        }
        self.shared.wake.notify_all();

        if let Some(handle) = task.take() {
            self.join(handle);
            info!(action = %self.name, status = %self.status(), "action stopped");
        }
    }

    fn join(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            error!(action = %self.name, "task thread panicked");
        }
    }

    fn fail(&self, e: &ActionError) {
        error!(action = %self.name, error = %e, "action failed to start");
        let mut state = self.shared.state();
        state.status = ActionStatus::Failed;
        state.record_error(e.to_string());
    }
}

impl Drop for Action {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

/// The task loop.
fn supervise(name: &str, shared: &Shared, view: &View, worker: &Worker, config: &SupervisorConfig) {
    debug!(action = %name, "task loop entered");
    loop {
        {
            let mut state = shared.state();
            if state.status != ActionStatus::Running {
                break;
            }
            state.invocations += 1;
        }

        let failure = match catch_unwind(AssertUnwindSafe(|| worker(view))) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(payload) => Some(format!("worker panicked: {}", panic_message(payload.as_ref()))),
        };

        let pause = match failure {
            None => {
                shared.state().consecutive_errors = 0;
                config.idle
            }
            Some(message) => {
                let mut state = shared.state();
                state.consecutive_errors += 1;
                let failures = state.consecutive_errors;
                if failures > config.critical_errors {
                    let e = ActionError::Supervision {
                        name: name.to_string(),
                        failures,
                    };
                    error!(action = %name, last = %message, error = %e, "giving up");
                    state.record_error(message);
                    state.last_error = Some(e.to_string());
                    // A concurrent stop wins over the failure.
                    if state.status == ActionStatus::Running {
                        state.status = ActionStatus::Failed;
                    }
                    break;
                }
                warn!(action = %name, failures, error = %message, "worker failed");
                state.record_error(message);
                config.backoff
            }
        };

        if !shared.pause(pause) {
            break;
        }
    }
    debug!(action = %name, "task loop exited");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
