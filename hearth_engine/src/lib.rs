//! hearth_engine: evaluation engine for hearth scripts.
//!
//! Takes the AST produced by `hearth_script` and runs it against a pluggable
//! [`Host`] — the only side-effect boundary (`get_state`, `set_state`,
//! `call_service`, `sleep`, `log`). The engine owns:
//!
//! - [`Value`] — the runtime value model service calls and comparisons use
//! - [`Scope`] — per-automation local variables over a shared global map
//! - [`Runtime`] — the evaluator for values, targets, conditions, and
//!   command blocks
//! - the trigger-descriptor compiler ([`compile_trigger`]) whose strings are
//!   the wire format handed to an external scheduler
//! - [`Registrar`] — the `(namespace, name)` registry the scheduler fires
//!   into, with restart cancellation
//!
//! The engine never schedules time and never persists state; both are the
//! host's business.

mod error;
mod eval;
mod host;
mod registrar;
mod scope;
mod triggers;
mod value;

pub use error::{EvalError, HostError};
pub use eval::control::Selected;
pub use eval::target::ResolvedTarget;
pub use eval::Runtime;
pub use host::{Host, HostCall, LogLevel, ScriptedHost};
pub use registrar::{AutomationDefinition, Registrar};
pub use scope::{Binding, GlobalVars, Scope};
pub use triggers::{compile_trigger, compile_triggers, TriggerKind, TriggerSpec};
pub use value::{ServiceData, Value};
