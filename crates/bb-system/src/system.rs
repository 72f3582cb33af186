use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bb_action::{Action, ActionReport, Loader};
use bb_memory::{Memory, Store};
use bb_view::View;
use tracing::{error, info, warn};

use crate::config::SystemConfig;
use crate::error::{SystemError, SystemResult};
use crate::roster::{self, ActionRecord};

/// Top-level owner of the store and the action roster.
///
/// Every action gets its own [`View`] over the single [`Memory`]. The roster
/// keeps insertion order, which is also the order of `run_all`, `stop_all`
/// and the persisted roster file.
///
/// Dropping a `System` shuts it down: all actions are stopped and the node
/// list and roster are saved.
pub struct System {
    config: SystemConfig,
    memory: Arc<Memory>,
    loader: Arc<dyn Loader>,
    actions: RwLock<Vec<Arc<Action>>>,
    closed: AtomicBool,
}

impl System {
    /// Load the node list and roster named by `config`.
    ///
    /// Missing files start empty. Actions are created stopped.
    pub fn open(config: SystemConfig, loader: Arc<dyn Loader>) -> SystemResult<Self> {
        let memory = Arc::new(Memory::load(&config.nodes_path())?);
        let system = Self {
            config,
            memory,
            loader,
            actions: RwLock::new(Vec::new()),
            // Nothing is saved on drop until the roster has loaded.
            closed: AtomicBool::new(true),
        };

        let records = roster::load(&system.config.actions_path())?;
        for record in records {
            system.append_action(record.path, record.name)?;
        }
        system.closed.store(false, Ordering::SeqCst);
        info!(
            nodes = system.memory.len(),
            actions = system.roster().len(),
            "system opened"
        );
        Ok(system)
    }

    fn roster(&self) -> RwLockReadGuard<'_, Vec<Arc<Action>>> {
        self.actions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn roster_mut(&self) -> RwLockWriteGuard<'_, Vec<Arc<Action>>> {
        self.actions.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn memory(&self) -> &Arc<Memory> {
        &self.memory
    }

    /// A fresh view over the store.
    pub fn view(&self) -> View {
        View::new(Arc::clone(&self.memory) as Arc<dyn Store>)
    }

    /// Snapshot of the roster.
    pub fn actions(&self) -> Vec<Arc<Action>> {
        self.roster().clone()
    }

    pub fn action(&self, name: &str) -> SystemResult<Arc<Action>> {
        self.roster()
            .iter()
            .find(|a| a.name() == name)
            .cloned()
            .ok_or_else(|| SystemError::UnknownAction(name.to_string()))
    }

    /// Add an action to the end of the roster. It starts stopped.
    pub fn append_action(
        &self,
        path: impl Into<PathBuf>,
        name: impl Into<String>,
    ) -> SystemResult<Arc<Action>> {
        let name = name.into();
        let mut roster = self.roster_mut();
        if roster.iter().any(|a| a.name() == name) {
            return Err(SystemError::DuplicateAction(name));
        }
        let action = Arc::new(Action::new(
            path,
            name,
            Arc::new(self.view()),
            Arc::clone(&self.loader),
            self.config.supervisor.clone(),
        ));
        info!(action = %action.name(), path = %action.path().display(), "action appended");
        roster.push(Arc::clone(&action));
        Ok(action)
    }

    /// Remove an action from the roster, stopping it first.
    pub fn remove_action(&self, name: &str) -> SystemResult<()> {
        let action = {
            let mut roster = self.roster_mut();
            let index = roster
                .iter()
                .position(|a| a.name() == name)
                .ok_or_else(|| SystemError::UnknownAction(name.to_string()))?;
            roster.remove(index)
        };
        action.stop();
        info!(action = %name, "action removed");
        Ok(())
    }

    pub fn run(&self, name: &str) -> SystemResult<()> {
        Ok(self.action(name)?.run()?)
    }

    pub fn stop(&self, name: &str) -> SystemResult<()> {
        self.action(name)?.stop();
        Ok(())
    }

    /// Start every action in roster order and return how many are running.
    ///
    /// An action that fails to start is logged and left `Failed`; the
    /// others still start.
    pub fn run_all(&self) -> usize {
        let mut running = 0;
        for action in self.actions() {
            match action.run() {
                Ok(()) => running += 1,
                Err(e) => warn!(action = %action.name(), error = %e, "action did not start"),
            }
        }
        info!(running, "run all");
        running
    }

    /// Stop every action in roster order.
    pub fn stop_all(&self) {
        for action in self.actions() {
            action.stop();
        }
        info!("stop all");
    }

    pub fn report(&self, name: &str) -> SystemResult<ActionReport> {
        Ok(self.action(name)?.report())
    }

    /// Reports for every action in roster order.
    pub fn reports(&self) -> Vec<(String, ActionReport)> {
        self.roster()
            .iter()
            .map(|a| (a.name().to_string(), a.report()))
            .collect()
    }

    /// Persist the node list and the roster.
    pub fn save(&self) -> SystemResult<()> {
        self.memory.save(&self.config.nodes_path())?;
        let records: Vec<ActionRecord> = self
            .roster()
            .iter()
            .map(|a| ActionRecord {
                path: a.path().to_path_buf(),
                name: a.name().to_string(),
            })
            .collect();
        roster::save(&self.config.actions_path(), &records)?;
        info!(actions = records.len(), "roster saved");
        Ok(())
    }

    /// Stop all actions, then save.
    pub fn shutdown(&self) -> SystemResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.stop_all();
        self.save()
    }
}

impl Drop for System {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.shutdown() {
            error!(error = %e, "shutdown on drop failed");
        }
    }
}
