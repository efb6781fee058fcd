//! Target resolution: what set of entities and areas a command acts on.
//!
//! Var elements substitute their resolved value one hop, flattening one
//! level of list; leaves classify as entities or areas. Area names expand
//! recursively through the `area_shortcuts` global with bounded depth.

use hearth_script::{TargetAst, ValueAst};
use indexmap::IndexMap;

use crate::error::EvalError;
use crate::scope::{Binding, Scope};
use crate::value::Value;

use super::Runtime;

const MAX_AREA_DEPTH: usize = 32;

/// Resolved form of a target: `{entity_id: [...], area_id: [...]}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedTarget {
    pub entity_id: Vec<String>,
    pub area_id: Vec<String>,
}

impl ResolvedTarget {
    pub fn is_empty(&self) -> bool {
        self.entity_id.is_empty() && self.area_id.is_empty()
    }

    /// Entity names grouped by their domain prefix, first-seen domain order,
    /// source order within a domain.
    pub fn by_domain(&self) -> IndexMap<String, Vec<String>> {
        let mut out: IndexMap<String, Vec<String>> = IndexMap::new();
        for name in &self.entity_id {
            let domain = name.split('.').next().unwrap_or_default().to_string();
            out.entry(domain).or_default().push(name.clone());
        }
        out
    }
}

impl Runtime {
    /// Resolve a target against the scope. Idempotent: no scope mutation.
    pub async fn resolve_target(
        &self,
        target: &TargetAst,
        scope: &Scope,
    ) -> Result<ResolvedTarget, EvalError> {
        let (elements, area_mode) = match target {
            TargetAst::Entities(e) => (e, false),
            TargetAst::Areas(a) => (a, true),
        };
        let mut resolved = ResolvedTarget::default();
        for element in elements {
            classify(scope, element, area_mode, &mut resolved)?;
        }
        Ok(resolved)
    }
}

fn classify(
    scope: &Scope,
    node: &ValueAst,
    area_mode: bool,
    out: &mut ResolvedTarget,
) -> Result<(), EvalError> {
    match node {
        ValueAst::Var(var) => match scope.fetch(var)? {
            Binding::Node(ValueAst::List(items)) => {
                for item in &items {
                    classify_leaf(scope, item, area_mode, out)?;
                }
                Ok(())
            },
            Binding::Node(other) => classify_leaf(scope, &other, area_mode, out),
            Binding::Data(value) => classify_data(scope, &value, area_mode, out),
        },
        other => classify_leaf(scope, other, area_mode, out),
    }
}

fn classify_leaf(
    scope: &Scope,
    node: &ValueAst,
    area_mode: bool,
    out: &mut ResolvedTarget,
) -> Result<(), EvalError> {
    match node {
        ValueAst::Entity(e) => {
            out.entity_id.push(e.name());
            Ok(())
        },
        ValueAst::Area(a) => expand_areas(scope, &a.name, &mut out.area_id),
        // Vars inside a list substituted one level before classification.
        ValueAst::Var(var) => match scope.fetch(var)? {
            Binding::Node(inner) => match inner {
                ValueAst::Entity(e) => {
                    out.entity_id.push(e.name());
                    Ok(())
                },
                ValueAst::Area(a) => expand_areas(scope, &a.name, &mut out.area_id),
                ValueAst::Str(s) => classify_name(scope, &s, area_mode, out),
                _ => Err(EvalError::TypeMismatch(format!(
                    "{} does not resolve to a target element",
                    var.name
                ))),
            },
            Binding::Data(value) => classify_data(scope, &value, area_mode, out),
        },
        ValueAst::Str(s) => classify_name(scope, s, area_mode, out),
        other => Err(EvalError::TypeMismatch(format!(
            "cannot target a {}",
            node_kind(other)
        ))),
    }
}

fn classify_data(
    scope: &Scope,
    value: &Value,
    area_mode: bool,
    out: &mut ResolvedTarget,
) -> Result<(), EvalError> {
    match value {
        Value::Str(s) => classify_name(scope, s, area_mode, out),
        Value::List(items) => {
            for item in items {
                match item {
                    Value::Str(s) => classify_name(scope, s, area_mode, out)?,
                    other => {
                        return Err(EvalError::TypeMismatch(format!(
                            "cannot target a {}",
                            other.type_name()
                        )));
                    },
                }
            }
            Ok(())
        },
        other => Err(EvalError::TypeMismatch(format!(
            "cannot target a {}",
            other.type_name()
        ))),
    }
}

fn classify_name(
    scope: &Scope,
    name: &str,
    area_mode: bool,
    out: &mut ResolvedTarget,
) -> Result<(), EvalError> {
    if area_mode {
        expand_areas(scope, name, &mut out.area_id)
    } else {
        out.entity_id.push(name.to_string());
        Ok(())
    }
}

fn node_kind(node: &ValueAst) -> &'static str {
    match node {
        ValueAst::Str(_) => "string",
        ValueAst::Number(_) => "number",
        ValueAst::Entity(_) => "entity",
        ValueAst::Area(_) => "area",
        ValueAst::Var(_) => "variable",
        ValueAst::List(_) => "list",
        ValueAst::Dict(_) => "dict",
    }
}

/// Expand an area name through the `area_shortcuts` global. A name that is
/// not a shortcut key passes through unchanged. Cycles and over-deep
/// nesting fail with a `Config` error instead of recursing forever.
pub(crate) fn expand_areas(
    scope: &Scope,
    name: &str,
    out: &mut Vec<String>,
) -> Result<(), EvalError> {
    let shortcuts = match scope.get("area_shortcuts") {
        Some(Binding::Data(Value::Map(map))) => map,
        _ => {
            out.push(name.to_string());
            return Ok(());
        },
    };
    let mut chain = Vec::new();
    expand_with(&shortcuts, name, &mut chain, out)
}

fn expand_with(
    shortcuts: &indexmap::IndexMap<String, Value>,
    name: &str,
    chain: &mut Vec<String>,
    out: &mut Vec<String>,
) -> Result<(), EvalError> {
    let Some(entry) = shortcuts.get(name) else {
        out.push(name.to_string());
        return Ok(());
    };
    if chain.iter().any(|seen| seen == name) {
        chain.push(name.to_string());
        return Err(EvalError::Config(format!(
            "area shortcut cycle: {}",
            chain.join(" -> ")
        )));
    }
    if chain.len() >= MAX_AREA_DEPTH {
        return Err(EvalError::Config(format!(
            "area shortcuts nest deeper than {MAX_AREA_DEPTH} at '{name}'"
        )));
    }
    chain.push(name.to_string());
    match entry {
        Value::List(items) => {
            for item in items {
                match item {
                    Value::Str(s) => expand_with(shortcuts, s, chain, out)?,
                    other => {
                        return Err(EvalError::Config(format!(
                            "area shortcut '{name}' must map to names, found {}",
                            other.type_name()
                        )));
                    },
                }
            }
        },
        Value::Str(s) => expand_with(shortcuts, s, chain, out)?,
        other => {
            return Err(EvalError::Config(format!(
                "area shortcut '{name}' must map to names, found {}",
                other.type_name()
            )));
        },
    }
    chain.pop();
    Ok(())
}
