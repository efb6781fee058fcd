//! Variable scope: a per-automation local map over a shared global map.
//!
//! Assignments store the parsed right-hand node unevaluated; trigger firings
//! and host configuration inject plain data. No process-wide state — every
//! eval call receives the scope it reads explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use hearth_script::{AssignmentAst, Namespace, ValueAst, VarRef};
use parking_lot::RwLock;

use crate::error::EvalError;
use crate::value::Value;

/// The external/global variable map, shared by every automation registered
/// against the same registrar.
pub type GlobalVars = Arc<RwLock<HashMap<String, Binding>>>;

/// What a variable name is bound to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A parsed node, evaluated lazily at each reference.
    Node(ValueAst),
    /// Plain data: trigger payloads, host-injected configuration.
    Data(Value),
}

#[derive(Debug, Clone)]
pub struct Scope {
    locals: HashMap<String, Binding>,
    globals: GlobalVars,
}

impl Scope {
    pub fn new(globals: GlobalVars) -> Self {
        Self {
            locals: HashMap::new(),
            globals,
        }
    }

    /// A scope with its own fresh global map (tests, one-off evaluation).
    pub fn detached() -> Self {
        Self::new(Arc::new(RwLock::new(HashMap::new())))
    }

    pub fn globals(&self) -> GlobalVars {
        Arc::clone(&self.globals)
    }

    /// Lookup order: local, then global.
    pub fn get(&self, key: &str) -> Option<Binding> {
        if let Some(b) = self.locals.get(key) {
            return Some(b.clone());
        }
        self.globals.read().get(key).cloned()
    }

    /// Local map only; a name visible globally is absent here.
    pub fn get_local(&self, key: &str) -> Option<Binding> {
        self.locals.get(key).cloned()
    }

    pub fn set_local(&mut self, key: impl Into<String>, binding: Binding) {
        self.locals.insert(key.into(), binding);
    }

    pub fn set_global(&self, key: impl Into<String>, binding: Binding) {
        self.globals.write().insert(key.into(), binding);
    }

    /// Execute an assignment into the map its namespace tag names.
    pub fn assign(&mut self, assignment: &AssignmentAst) {
        let binding = Binding::Node(assignment.value.clone());
        match assignment.namespace {
            Namespace::Local => self.set_local(assignment.var.name.clone(), binding),
            Namespace::Global => self.set_global(assignment.var.name.clone(), binding),
        }
    }

    /// Resolve a variable reference to its binding, following at most one
    /// var-to-var link. A second link is an error rather than a walk.
    pub fn fetch(&self, var: &VarRef) -> Result<Binding, EvalError> {
        let binding = self
            .get(&var.name)
            .ok_or_else(|| EvalError::Scope(var.name.clone()))?;
        match binding {
            Binding::Node(ValueAst::Var(inner)) => {
                let next = self
                    .get(&inner.name)
                    .ok_or_else(|| EvalError::Scope(inner.name.clone()))?;
                if matches!(next, Binding::Node(ValueAst::Var(_))) {
                    return Err(EvalError::Scope(format!(
                        "{} resolves through more than one variable",
                        var.name
                    )));
                }
                Ok(next)
            },
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_shadows_global() {
        let mut scope = Scope::detached();
        scope.set_global("@x", Binding::Data(Value::Int(1)));
        scope.set_local("@x", Binding::Data(Value::Int(2)));
        match scope.get("@x") {
            Some(Binding::Data(Value::Int(2))) => {},
            other => panic!("expected local value, got {other:?}"),
        }
    }

    #[test]
    fn globals_are_shared_between_scopes() {
        let a = Scope::detached();
        let b = Scope::new(a.globals());
        a.set_global("@foo", Binding::Data(Value::Str("bar".into())));
        assert!(matches!(b.get("@foo"), Some(Binding::Data(Value::Str(_)))));
        assert!(b.get_local("@foo").is_none());
    }

    #[test]
    fn fetch_follows_one_var_hop_only() {
        let mut scope = Scope::detached();
        scope.set_local(
            "@a",
            Binding::Node(ValueAst::Var(VarRef {
                name: "@b".into(),
                attribute: None,
            })),
        );
        scope.set_local(
            "@b",
            Binding::Node(ValueAst::Var(VarRef {
                name: "@a".into(),
                attribute: None,
            })),
        );
        let var = VarRef {
            name: "@a".into(),
            attribute: None,
        };
        assert!(matches!(scope.fetch(&var), Err(EvalError::Scope(_))));
    }
}
