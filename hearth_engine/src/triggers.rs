//! Trigger-descriptor compilation.
//!
//! Descriptor strings are the sole wire format between the engine and an
//! external scheduler; their exact shape is reproduced byte-for-byte:
//!
//! - state: `light.l1 == 'on' and light.l1.old == 'off'`, numeric bounds
//!   wrapped as `float(light.l1) > 21`
//! - time: `once(sat 07:00:00 + 0s)`, `once( sunset + -900s)` (the empty
//!   day keeps its leading space)

use hearth_script::{
    DaySpec, OffsetDirection, StateChangeAst, SunAst, TriggerAst, TriggerBound, ValueAst, WeeklyAst,
};
use serde::Serialize;

use crate::error::EvalError;
use crate::scope::{Binding, Scope};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerKind {
    State,
    Time,
}

/// One compiled trigger: the descriptor handed to the scheduler, plus the
/// hold duration for state triggers with a FOR clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerSpec {
    pub kind: TriggerKind,
    pub descriptor: String,
    pub hold: Option<f64>,
}

/// Compile every trigger of an automation, in source order.
pub fn compile_triggers(
    triggers: &[TriggerAst],
    scope: &Scope,
) -> Result<Vec<TriggerSpec>, EvalError> {
    let mut specs = Vec::new();
    for trigger in triggers {
        specs.extend(compile_trigger(trigger, scope)?);
    }
    Ok(specs)
}

/// Compile one trigger into its descriptors (one per referenced entity for
/// state triggers, one per day × time for schedules).
pub fn compile_trigger(trigger: &TriggerAst, scope: &Scope) -> Result<Vec<TriggerSpec>, EvalError> {
    match trigger {
        TriggerAst::StateChange(sc) => compile_state(sc, scope),
        TriggerAst::Weekly(w) => Ok(compile_weekly(w)),
        TriggerAst::Sun(s) => Ok(compile_sun(s)),
    }
}

fn compile_state(sc: &StateChangeAst, scope: &Scope) -> Result<Vec<TriggerSpec>, EvalError> {
    let hold = sc.hold.map(|d| d.seconds());
    let mut specs = Vec::new();
    for name in state_entities(&sc.entities, scope)? {
        let mut parts = Vec::new();
        if let Some(bound) = &sc.new {
            parts.push(render_bound(&name, "", bound)?);
        }
        if let Some(bound) = &sc.old {
            parts.push(render_bound(&name, ".old", bound)?);
        }
        let descriptor = if parts.is_empty() {
            name.clone()
        } else {
            parts.join(" and ")
        };
        specs.push(TriggerSpec {
            kind: TriggerKind::State,
            descriptor,
            hold,
        });
    }
    Ok(specs)
}

/// Entity names a state trigger watches. Vars resolve one hop, flattening
/// one level of list.
fn state_entities(elements: &[ValueAst], scope: &Scope) -> Result<Vec<String>, EvalError> {
    let mut names = Vec::new();
    for element in elements {
        match element {
            ValueAst::Entity(e) => names.push(e.name()),
            ValueAst::Var(var) => match scope.fetch(var)? {
                Binding::Node(ValueAst::Entity(e)) => names.push(e.name()),
                Binding::Node(ValueAst::List(items)) => {
                    for item in &items {
                        match item {
                            ValueAst::Entity(e) => names.push(e.name()),
                            ValueAst::Var(inner) => match scope.fetch(inner)? {
                                Binding::Node(ValueAst::Entity(e)) => names.push(e.name()),
                                _ => {
                                    return Err(EvalError::Config(format!(
                                        "{} does not name an entity",
                                        inner.name
                                    )));
                                },
                            },
                            _ => {
                                return Err(EvalError::Config(
                                    "state triggers watch entities".into(),
                                ));
                            },
                        }
                    }
                },
                Binding::Data(Value::Str(s)) => names.push(s),
                _ => {
                    return Err(EvalError::Config(format!(
                        "{} does not name an entity",
                        var.name
                    )));
                },
            },
            _ => return Err(EvalError::Config("state triggers watch entities".into())),
        }
    }
    Ok(names)
}

/// Numeric bounds are wrapped in `float(...)` so the scheduler compares
/// numerically rather than lexicographically; strings are single-quoted;
/// an entity bound compiles to its dotted name for state-vs-state predicates.
fn render_bound(name: &str, suffix: &str, bound: &TriggerBound) -> Result<String, EvalError> {
    let op = bound.op.as_str();
    match &bound.value {
        ValueAst::Number(n) => Ok(format!("float({name}{suffix}) {op} {n}")),
        ValueAst::Str(s) => Ok(format!("{name}{suffix} {op} '{s}'")),
        ValueAst::Entity(e) => Ok(format!("{name}{suffix} {op} {}", e.name())),
        _ => Err(EvalError::Config("unsupported trigger bound value".into())),
    }
}

fn compile_weekly(weekly: &WeeklyAst) -> Vec<TriggerSpec> {
    let mut specs = Vec::new();
    for day in expand_days(&weekly.days) {
        for time in &weekly.times {
            specs.push(TriggerSpec {
                kind: TriggerKind::Time,
                descriptor: format!("once({day} {time} + 0s)"),
                hold: None,
            });
        }
    }
    specs
}

fn compile_sun(sun: &SunAst) -> Vec<TriggerSpec> {
    let offset = match &sun.offset {
        Some((duration, direction)) => {
            let seconds = duration.seconds();
            match direction {
                OffsetDirection::Before => -seconds,
                OffsetDirection::After => seconds,
            }
        },
        None => 0.0,
    };
    let event = sun.event.as_str();
    let mut specs = Vec::new();
    for day in expand_days(&sun.days) {
        specs.push(TriggerSpec {
            kind: TriggerKind::Time,
            descriptor: format!("once({day} {event} + {}s)", fmt_seconds(offset)),
            hold: None,
        });
    }
    specs
}

/// No ON clause means one unqualified (empty) day: "every day".
fn expand_days(days: &[DaySpec]) -> Vec<String> {
    if days.is_empty() {
        return vec![String::new()];
    }
    let mut out = Vec::new();
    for day in days {
        for token in day.days() {
            out.push((*token).to_string());
        }
    }
    out
}

fn fmt_seconds(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{}", seconds as i64)
    } else {
        format!("{seconds}")
    }
}
