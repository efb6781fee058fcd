//! The host boundary: the only place evaluation touches the outside world.
//!
//! A real host wires these five operations to its state store, service bus,
//! and timer. Each call is a suspension point; everything else in the engine
//! is synchronous tree-walking.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::error::HostError;
use crate::value::{ServiceData, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
impl LogLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}
impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// Capability set the engine requires from its host.
#[async_trait]
pub trait Host: Send + Sync {
    /// Resolve an entity path (optionally attribute-qualified) to its
    /// current value.
    async fn get_state(&self, path: &str) -> Result<Value, HostError>;
    /// Write a value; returns whatever the backend reports.
    async fn set_state(&self, path: &str, value: Value) -> Result<Value, HostError>;
    /// Dispatch one side-effecting action.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: ServiceData,
    ) -> Result<Value, HostError>;
    /// Cooperative delay; must not block other automations.
    async fn sleep(&self, seconds: f64);
    /// Diagnostic sink.
    async fn log(&self, level: LogLevel, message: &str);
}

/// One recorded host interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    GetState {
        path: String,
    },
    SetState {
        path: String,
        value: Value,
    },
    CallService {
        domain: String,
        service: String,
        data: ServiceData,
    },
    Sleep {
        seconds: f64,
    },
    Log {
        level: LogLevel,
        message: String,
    },
}

/// Deterministic, replayable host double: serves states from a scripted map,
/// records every interaction, and completes sleeps immediately. Used by the
/// test suites and the demo binary.
#[derive(Default)]
pub struct ScriptedHost {
    states: RwLock<HashMap<String, Value>>,
    calls: Mutex<Vec<HostCall>>,
    /// Service names that should fail, to exercise error paths.
    failing_services: RwLock<Vec<String>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(self, path: impl Into<String>, value: Value) -> Self {
        self.states.write().insert(path.into(), value);
        self
    }

    pub fn put_state(&self, path: impl Into<String>, value: Value) {
        self.states.write().insert(path.into(), value);
    }

    /// Make `call_service` fail for the given service name.
    pub fn fail_service(&self, service: impl Into<String>) {
        self.failing_services.write().push(service.into());
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    /// Only the recorded service calls, in dispatch order.
    pub fn service_calls(&self) -> Vec<(String, String, ServiceData)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                HostCall::CallService {
                    domain,
                    service,
                    data,
                } => Some((domain.clone(), service.clone(), data.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Host for ScriptedHost {
    async fn get_state(&self, path: &str) -> Result<Value, HostError> {
        self.record(HostCall::GetState { path: path.into() });
        Ok(self.states.read().get(path).cloned().unwrap_or(Value::Null))
    }

    async fn set_state(&self, path: &str, value: Value) -> Result<Value, HostError> {
        self.record(HostCall::SetState {
            path: path.into(),
            value: value.clone(),
        });
        self.states.write().insert(path.into(), value.clone());
        Ok(value)
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: ServiceData,
    ) -> Result<Value, HostError> {
        self.record(HostCall::CallService {
            domain: domain.into(),
            service: service.into(),
            data: data.clone(),
        });
        if self.failing_services.read().iter().any(|s| s == service) {
            return Err(HostError::new(
                format!("{domain}.{service}"),
                "scripted failure",
            ));
        }
        let mut result = ServiceData::new();
        result.insert("domain".into(), Value::Str(domain.into()));
        result.insert("service".into(), Value::Str(service.into()));
        result.insert("data".into(), Value::Map(data));
        Ok(Value::Map(result))
    }

    async fn sleep(&self, seconds: f64) {
        // Recorded, never slept: runs replay identically.
        self.record(HostCall::Sleep { seconds });
    }

    async fn log(&self, level: LogLevel, message: &str) {
        self.record(HostCall::Log {
            level,
            message: message.into(),
        });
        log::log!(level.as_log_level(), "{message}");
    }
}
