//! The evaluator: walks the AST against a [`Scope`] and a [`Host`].
//!
//! All recursion over the tree is synchronous except where it reaches the
//! host boundary; recursive entry points return boxed futures so blocks can
//! nest conditionals arbitrarily deep.

pub(crate) mod command;
pub(crate) mod control;
pub(crate) mod target;

use std::sync::Arc;

use futures::future::BoxFuture;
use hearth_script::{DictAst, EntityRef, ValueAst, VarRef};

use crate::error::EvalError;
use crate::host::{Host, LogLevel};
use crate::scope::{Binding, Scope};
use crate::value::{ServiceData, Value};

/// Evaluation engine bound to one host. Cheap to clone; holds no mutable
/// state of its own.
#[derive(Clone)]
pub struct Runtime {
    host: Arc<dyn Host>,
}

impl Runtime {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Evaluate a value node to a runtime value.
    pub fn eval_value<'a>(
        &'a self,
        node: &'a ValueAst,
        scope: &'a Scope,
    ) -> BoxFuture<'a, Result<Value, EvalError>> {
        Box::pin(async move {
            match node {
                ValueAst::Str(s) => Ok(Value::Str(s.clone())),
                ValueAst::Number(n) => Ok((*n).into()),
                ValueAst::Entity(e) => self.eval_entity(e, None).await,
                ValueAst::Area(a) => Ok(Value::Str(a.name.clone())),
                ValueAst::Var(v) => self.eval_var(v, scope).await,
                ValueAst::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.eval_value(item, scope).await?);
                    }
                    Ok(Value::List(out))
                },
                ValueAst::Dict(d) => self.eval_dict(d, scope, None).await,
            }
        })
    }

    /// Entity references resolve through `get_state`, except the
    /// `name`/`id`/`domain` pseudo-attributes which answer from the
    /// reference itself.
    pub(crate) async fn eval_entity(
        &self,
        entity: &EntityRef,
        attribute: Option<&str>,
    ) -> Result<Value, EvalError> {
        match attribute.or(entity.attribute.as_deref()) {
            Some("name") => Ok(Value::Str(format!("{}.{}", entity.domain, entity.id))),
            Some("id") => Ok(Value::Str(entity.id.clone())),
            Some("domain") => Ok(Value::Str(entity.domain.clone())),
            _ => {
                let path = entity.name_with(attribute);
                self.host
                    .log(LogLevel::Debug, &format!("fetching state of {path}"))
                    .await;
                Ok(self.host.get_state(&path).await?)
            },
        }
    }

    /// Resolve a variable (single hop) and evaluate what it holds, applying
    /// attribute projection for entities, dicts, and payload maps.
    async fn eval_var(&self, var: &VarRef, scope: &Scope) -> Result<Value, EvalError> {
        match scope.fetch(var)? {
            Binding::Node(node) => match (&node, var.attribute.as_deref()) {
                (ValueAst::Entity(e), attr) => self.eval_entity(e, attr).await,
                (ValueAst::Dict(d), Some(attr)) => self.eval_dict(d, scope, Some(attr)).await,
                (_, Some(attr)) => Err(EvalError::TypeMismatch(format!(
                    "{}:{attr} — bound value has no attributes",
                    var.name
                ))),
                (_, None) => self.eval_value(&node, scope).await,
            },
            Binding::Data(value) => match var.attribute.as_deref() {
                None => Ok(value),
                Some(attr) => match value {
                    Value::Map(map) => map
                        .get(attr)
                        .cloned()
                        .ok_or_else(|| EvalError::Scope(format!("{}:{attr}", var.name))),
                    other => Err(EvalError::TypeMismatch(format!(
                        "{}:{attr} — {} has no attributes",
                        var.name,
                        other.type_name()
                    ))),
                },
            },
        }
    }

    /// Evaluate a dict to a map, or project one entry when an attribute is
    /// given. Values evaluate lazily, here.
    pub(crate) async fn eval_dict(
        &self,
        dict: &DictAst,
        scope: &Scope,
        attribute: Option<&str>,
    ) -> Result<Value, EvalError> {
        if let Some(attr) = attribute {
            let node = dict
                .get(attr)
                .ok_or_else(|| EvalError::Scope(format!("dict key '{attr}'")))?;
            return self.eval_value(node, scope).await;
        }
        Ok(Value::Map(self.eval_dict_data(dict, scope).await?))
    }

    /// Dict evaluated to a flat keyword map, for WITH clauses.
    pub(crate) async fn eval_dict_data(
        &self,
        dict: &DictAst,
        scope: &Scope,
    ) -> Result<ServiceData, EvalError> {
        let mut out = ServiceData::new();
        for (key, node) in &dict.entries {
            out.insert(key.clone(), self.eval_value(node, scope).await?);
        }
        Ok(out)
    }
}
