//! The registrar: `(namespace, name)` → registered automation.
//!
//! The host scheduler queries the compiled descriptors at registration time
//! and calls [`Registrar::fire`] when one matches. Each firing runs the
//! action block on its own task; with RESTART a new firing aborts the
//! in-flight run first, so at most one run of that automation is ever live.

use std::collections::HashMap;
use std::sync::Arc;

use hearth_script::{AutomationAst, StmtAst};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::EvalError;
use crate::eval::Runtime;
use crate::host::{Host, LogLevel};
use crate::scope::{Binding, GlobalVars, Scope};
use crate::triggers::{compile_triggers, TriggerSpec};
use crate::value::Value;

/// Everything the registrar keeps for one named rule.
#[derive(Debug, Clone)]
pub struct AutomationDefinition {
    pub namespace: String,
    pub name: String,
    /// Variable the firing payload is written to before the block runs.
    pub trigger_var: String,
    pub restart: bool,
    pub triggers: Vec<TriggerSpec>,
    pub actions: Vec<StmtAst>,
}

struct Entry {
    def: AutomationDefinition,
    /// Persistent per-automation scope; the lock keeps evaluation of this
    /// automation sequential.
    scope: tokio::sync::Mutex<Scope>,
}

type Key = (String, String);

pub struct Registrar {
    runtime: Runtime,
    globals: GlobalVars,
    entries: Mutex<HashMap<Key, Arc<Entry>>>,
    running: Mutex<HashMap<Key, JoinHandle<()>>>,
}

impl Registrar {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            runtime: Runtime::new(host),
            globals: GlobalVars::default(),
            entries: Mutex::new(HashMap::new()),
            running: Mutex::new(HashMap::new()),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The global map every registered automation shares.
    pub fn globals(&self) -> GlobalVars {
        Arc::clone(&self.globals)
    }

    /// Host-injected area shortcut configuration, visible to every scope.
    pub fn set_area_shortcuts(&self, shortcuts: indexmap::IndexMap<String, Vec<String>>) {
        let map = shortcuts
            .into_iter()
            .map(|(name, areas)| (name, areas.into()))
            .collect();
        self.globals
            .write()
            .insert("area_shortcuts".into(), Binding::Data(Value::Map(map)));
    }

    /// Register an automation: evaluate its global assignments into the
    /// shared map, compile its trigger descriptors, and store it under
    /// `(namespace, name)`. Re-registering the same key replaces the prior
    /// entry (and cancels its live run, if any). Returns the compiled
    /// specs for the external scheduler.
    pub fn register(
        &self,
        namespace: &str,
        automation: AutomationAst,
    ) -> Result<Vec<TriggerSpec>, EvalError> {
        let mut scope = Scope::new(Arc::clone(&self.globals));
        for assignment in &automation.globals {
            scope.assign(assignment);
        }
        let specs = compile_triggers(&automation.triggers, &scope)?;
        let def = AutomationDefinition {
            namespace: namespace.to_string(),
            name: automation.name.clone(),
            trigger_var: automation.trigger_var,
            restart: automation.restart,
            triggers: specs.clone(),
            actions: automation.actions,
        };
        let key: Key = (namespace.to_string(), automation.name);
        if let Some(handle) = self.running.lock().remove(&key) {
            handle.abort();
        }
        self.entries.lock().insert(
            key,
            Arc::new(Entry {
                def,
                scope: tokio::sync::Mutex::new(scope),
            }),
        );
        Ok(specs)
    }

    /// Drop an automation and cancel its live run.
    pub fn unregister(&self, namespace: &str, name: &str) {
        let key: Key = (namespace.to_string(), name.to_string());
        self.entries.lock().remove(&key);
        if let Some(handle) = self.running.lock().remove(&key) {
            handle.abort();
        }
    }

    /// Registered `(namespace, name)` pairs.
    pub fn automations(&self) -> Vec<(String, String)> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Compiled descriptors for one automation.
    pub fn descriptors(&self, namespace: &str, name: &str) -> Option<Vec<TriggerSpec>> {
        self.entries
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .map(|e| e.def.triggers.clone())
    }

    /// Run one firing inline and return the action results. For tests and
    /// hosts that manage their own concurrency.
    pub async fn run_once(
        &self,
        namespace: &str,
        name: &str,
        payload: Value,
    ) -> Result<Vec<Value>, EvalError> {
        let entry = self.entry(namespace, name)?;
        Ok(execute(&self.runtime, &entry, payload).await)
    }

    /// Handle a trigger firing: spawn the action block on its own task.
    /// With RESTART, an in-flight run is aborted before the new one starts;
    /// without it, runs may overlap (they still serialize on the
    /// automation's scope).
    pub fn fire(&self, namespace: &str, name: &str, payload: Value) -> Result<(), EvalError> {
        let entry = self.entry(namespace, name)?;
        let key: Key = (namespace.to_string(), name.to_string());
        let mut running = self.running.lock();
        if let Some(prior) = running.remove(&key) {
            if entry.def.restart && !prior.is_finished() {
                prior.abort();
            }
        }
        let runtime = self.runtime.clone();
        let handle = tokio::spawn(async move {
            execute(&runtime, &entry, payload).await;
        });
        running.insert(key, handle);
        Ok(())
    }

    fn entry(&self, namespace: &str, name: &str) -> Result<Arc<Entry>, EvalError> {
        self.entries
            .lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| {
                EvalError::Config(format!("no automation registered as {namespace}/{name}"))
            })
    }
}

async fn execute(runtime: &Runtime, entry: &Entry, payload: Value) -> Vec<Value> {
    let mut scope = entry.scope.lock().await;
    scope.set_local(entry.def.trigger_var.clone(), Binding::Data(payload));
    runtime
        .host()
        .log(LogLevel::Info, &format!("running {}", entry.def.name))
        .await;
    runtime.run_block(&entry.def.actions, &mut scope).await
}
