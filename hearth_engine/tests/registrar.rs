//! Registration, firing, scope sharing, and restart cancellation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hearth_engine::{
    EvalError, Host, HostCall, HostError, LogLevel, Registrar, ScriptedHost, ServiceData, Value,
};
use hearth_script::parse_automation;
use indexmap::IndexMap;

fn register(registrar: &Registrar, script: &str) -> String {
    let automation = parse_automation(script).expect("parse ok");
    let name = automation.name.clone();
    registrar.register("test", automation).expect("register ok");
    name
}

#[tokio::test]
async fn globals_are_visible_across_automations_but_not_local() {
    let host = Arc::new(ScriptedHost::new());
    let registrar = Registrar::new(host.clone());

    // writer declares @foo at top-of-file (global namespace)
    register(
        &registrar,
        "@foo = 'bar'\nAUTO writer WHEN 07:00 THEN PASS",
    );
    // reader never declared @foo locally, yet resolves it via the shared map
    let reader = register(
        &registrar,
        "AUTO reader WHEN 07:00 THEN SET sensor.copy TO @foo",
    );

    registrar
        .run_once("test", &reader, Value::Null)
        .await
        .expect("run ok");
    assert!(host.calls().contains(&HostCall::SetState {
        path: "sensor.copy".into(),
        value: Value::Str("bar".into()),
    }));
}

#[tokio::test]
async fn in_block_assignment_stays_local_to_its_automation() {
    let host = Arc::new(ScriptedHost::new());
    let registrar = Registrar::new(host.clone());

    let writer = register(
        &registrar,
        "AUTO writer WHEN 07:00 THEN @secret = 'hidden' PASS",
    );
    let reader = register(
        &registrar,
        "AUTO reader WHEN 07:00 THEN SET sensor.leak TO @secret",
    );

    registrar
        .run_once("test", &writer, Value::Null)
        .await
        .expect("run ok");
    // the reader cannot see the writer's local; its block aborts on the
    // unresolved reference
    registrar
        .run_once("test", &reader, Value::Null)
        .await
        .expect("run ok");
    assert!(!host
        .calls()
        .iter()
        .any(|c| matches!(c, HostCall::SetState { path, .. } if path == "sensor.leak")));
}

#[tokio::test]
async fn firing_payload_lands_under_the_trigger_variable() {
    let host = Arc::new(ScriptedHost::new());
    let registrar = Registrar::new(host.clone());
    let name = register(
        &registrar,
        "AUTO echo @evt WHEN light.a CHANGES THEN SET sensor.last TO @evt:entity",
    );

    let mut payload = IndexMap::new();
    payload.insert("entity".to_string(), Value::Str("light.a".into()));
    registrar
        .run_once("test", &name, Value::Map(payload))
        .await
        .expect("run ok");

    assert!(host.calls().contains(&HostCall::SetState {
        path: "sensor.last".into(),
        value: Value::Str("light.a".into()),
    }));
}

#[tokio::test]
async fn reregistering_replaces_the_prior_entry() {
    let host = Arc::new(ScriptedHost::new());
    let registrar = Registrar::new(host.clone());
    register(&registrar, "AUTO dup WHEN 07:00 THEN TURN ON light light.old");
    let name = register(&registrar, "AUTO dup WHEN 07:00 THEN TURN ON light light.new");

    assert_eq!(registrar.automations().len(), 1);
    registrar
        .run_once("test", &name, Value::Null)
        .await
        .expect("run ok");
    let calls = host.service_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].2.get("entity_id"),
        Some(&vec!["light.new".to_string()].into())
    );
}

#[tokio::test]
async fn unknown_automation_is_a_config_error() {
    let registrar = Registrar::new(Arc::new(ScriptedHost::new()));
    let err = registrar
        .run_once("test", "ghost", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::Config(_)));
}

#[tokio::test]
async fn area_shortcuts_expand_recursively_in_targets() {
    let host = Arc::new(ScriptedHost::new());
    let registrar = Registrar::new(host.clone());
    let mut shortcuts = IndexMap::new();
    shortcuts.insert(
        "downstairs".to_string(),
        vec!["kitchen".to_string(), "den_zone".to_string()],
    );
    shortcuts.insert("den_zone".to_string(), vec!["den".to_string(), "hall".to_string()]);
    registrar.set_area_shortcuts(shortcuts);

    let name = register(
        &registrar,
        "AUTO lights WHEN 07:00 THEN TURN OFF light AREA downstairs",
    );
    registrar
        .run_once("test", &name, Value::Null)
        .await
        .expect("run ok");

    let calls = host.service_calls();
    assert_eq!(
        calls[0].2.get("area_id"),
        Some(&vec!["kitchen".to_string(), "den".to_string(), "hall".to_string()].into())
    );
}

#[tokio::test]
async fn area_shortcut_cycles_fail_instead_of_recursing() {
    let host = Arc::new(ScriptedHost::new());
    let registrar = Registrar::new(host.clone());
    let mut shortcuts = IndexMap::new();
    shortcuts.insert("a".to_string(), vec!["b".to_string()]);
    shortcuts.insert("b".to_string(), vec!["a".to_string()]);
    registrar.set_area_shortcuts(shortcuts);

    let name = register(&registrar, "AUTO looped WHEN 07:00 THEN TURN OFF light AREA a");
    registrar
        .run_once("test", &name, Value::Null)
        .await
        .expect("run ok");

    // the command failed with a config error; nothing was dispatched
    assert!(host.service_calls().is_empty());
    assert!(host.calls().iter().any(
        |c| matches!(c, HostCall::Log { level: LogLevel::Error, message } if message.contains("cycle"))
    ));
}

#[tokio::test]
async fn target_resolution_is_idempotent() {
    let host = Arc::new(ScriptedHost::new());
    let registrar = Registrar::new(host.clone());
    let name = register(
        &registrar,
        "@group = (light.a, light.b)\nAUTO twice WHEN 07:00 THEN TURN ON light @group",
    );

    registrar.run_once("test", &name, Value::Null).await.expect("run ok");
    registrar.run_once("test", &name, Value::Null).await.expect("run ok");

    let calls = host.service_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], calls[1]);
}

/// Host whose sleep parks on a gate the test controls; everything else
/// delegates to a ScriptedHost.
struct GatedHost {
    inner: ScriptedHost,
    gate: tokio::sync::Notify,
}

#[async_trait]
impl Host for GatedHost {
    async fn get_state(&self, path: &str) -> Result<Value, HostError> {
        self.inner.get_state(path).await
    }
    async fn set_state(&self, path: &str, value: Value) -> Result<Value, HostError> {
        self.inner.set_state(path, value).await
    }
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: ServiceData,
    ) -> Result<Value, HostError> {
        self.inner.call_service(domain, service, data).await
    }
    async fn sleep(&self, seconds: f64) {
        self.inner.sleep(seconds).await; // records the suspension
        self.gate.notified().await;
    }
    async fn log(&self, level: LogLevel, message: &str) {
        self.inner.log(level, message).await;
    }
}

async fn wait_for<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn restart_cancels_the_inflight_run() {
    let host = Arc::new(GatedHost {
        inner: ScriptedHost::new(),
        gate: tokio::sync::Notify::new(),
    });
    let registrar = Registrar::new(host.clone());
    let name = register(
        &registrar,
        "AUTO nightly RESTART WHEN 07:00 THEN WAIT 10 minutes SET sensor.done TO 1",
    );

    registrar.fire("test", &name, Value::Null).expect("fire ok");
    wait_for(|| {
        host.inner
            .calls()
            .iter()
            .filter(|c| matches!(c, HostCall::Sleep { .. }))
            .count()
            == 1
    })
    .await;

    // second firing while the first is parked in WAIT: the first is aborted
    registrar.fire("test", &name, Value::Null).expect("fire ok");
    wait_for(|| {
        host.inner
            .calls()
            .iter()
            .filter(|c| matches!(c, HostCall::Sleep { .. }))
            .count()
            == 2
    })
    .await;

    host.gate.notify_waiters();
    wait_for(|| {
        host.inner
            .calls()
            .iter()
            .any(|c| matches!(c, HostCall::SetState { path, .. } if path == "sensor.done"))
    })
    .await;

    // only the second run completed; the first never reached its SET
    let writes = host
        .inner
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::SetState { .. }))
        .count();
    assert_eq!(writes, 1);
}

#[tokio::test]
async fn unregister_drops_the_entry() {
    let registrar = Registrar::new(Arc::new(ScriptedHost::new()));
    let name = register(&registrar, "AUTO gone WHEN 07:00 THEN PASS");
    assert!(registrar.descriptors("test", &name).is_some());
    registrar.unregister("test", &name);
    assert!(registrar.descriptors("test", &name).is_none());
    assert!(registrar.fire("test", &name, Value::Null).is_err());
}
