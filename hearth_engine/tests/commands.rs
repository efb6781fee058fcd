//! Command dispatch against the scripted host.

use std::sync::Arc;

use hearth_engine::{HostCall, Registrar, ScriptedHost, Value};
use hearth_script::parse_automation;

async fn run(script: &str, host: Arc<ScriptedHost>) -> Vec<Value> {
    let registrar = Registrar::new(host);
    let automation = parse_automation(script).expect("parse ok");
    let name = automation.name.clone();
    registrar.register("test", automation).expect("register ok");
    registrar
        .run_once("test", &name, Value::Null)
        .await
        .expect("run ok")
}

#[tokio::test]
async fn dim_area_to_percent_builds_the_expected_call() {
    let host = Arc::new(ScriptedHost::new());
    run(
        "AUTO dim_test WHEN 07:00 THEN DIM AREA cupola TO 50%",
        host.clone(),
    )
    .await;

    let calls = host.service_calls();
    assert_eq!(calls.len(), 1);
    let (domain, service, data) = &calls[0];
    assert_eq!(domain, "light");
    assert_eq!(service, "turn_on");
    assert_eq!(data.get("area_id"), Some(&vec!["cupola".to_string()].into()));
    assert_eq!(data.get("brightness_pct"), Some(&Value::Int(50)));
    assert_eq!(data.len(), 2);
}

#[tokio::test]
async fn dim_by_negative_delta_turns_off_without_brightness() {
    let host = Arc::new(ScriptedHost::new());
    run(
        "AUTO dim_off WHEN 07:00 THEN DIM light.desk BY -20",
        host.clone(),
    )
    .await;

    let calls = host.service_calls();
    assert_eq!(calls[0].1, "turn_off");
    assert!(calls[0].2.get("brightness_step").is_none());
}

#[tokio::test]
async fn close_defaults_to_position_zero() {
    let host = Arc::new(ScriptedHost::new());
    run(
        "AUTO close_test WHEN 07:00 THEN CLOSE cover.downstairs_window",
        host.clone(),
    )
    .await;

    let calls = host.service_calls();
    assert_eq!(calls.len(), 1);
    let (domain, service, data) = &calls[0];
    assert_eq!(domain, "cover");
    assert_eq!(service, "set_cover_position");
    assert_eq!(
        data.get("entity_id"),
        Some(&vec!["cover.downstairs_window".to_string()].into())
    );
    assert_eq!(data.get("position"), Some(&Value::Int(0)));
}

#[tokio::test]
async fn turn_partitions_one_call_per_domain() {
    let host = Arc::new(ScriptedHost::new());
    run(
        "AUTO multi WHEN 07:00 THEN TURN ON light light.desk, switch.fan, light.shelf",
        host.clone(),
    )
    .await;

    let calls = host.service_calls();
    assert_eq!(calls.len(), 2);
    // first-seen-domain order, source order within a domain
    assert_eq!(calls[0].0, "light");
    assert_eq!(
        calls[0].2.get("entity_id"),
        Some(&vec!["light.desk".to_string(), "light.shelf".to_string()].into())
    );
    assert_eq!(calls[1].0, "switch");
    assert_eq!(calls[1].1, "turn_on");
}

#[tokio::test]
async fn set_writes_each_entity_directly() {
    let host = Arc::new(ScriptedHost::new());
    let results = run(
        "AUTO temps WHEN 07:00 THEN SET climate.up, climate.down TO 68",
        host.clone(),
    )
    .await;

    assert_eq!(results.len(), 2);
    assert!(host.service_calls().is_empty());
    let writes: Vec<_> = host
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::SetState { .. }))
        .collect();
    assert_eq!(writes.len(), 2);
    assert_eq!(
        writes[0],
        HostCall::SetState {
            path: "climate.up".into(),
            value: Value::Int(68),
        }
    );
}

#[tokio::test]
async fn arm_derives_service_from_mode() {
    let host = Arc::new(ScriptedHost::new());
    run(
        "AUTO arm WHEN 07:00 THEN ARM NIGHT alarm_control_panel.main WITH (code = '9')",
        host.clone(),
    )
    .await;

    let calls = host.service_calls();
    assert_eq!(calls[0].0, "alarm_control_panel");
    assert_eq!(calls[0].1, "alarm_arm_night");
    assert_eq!(calls[0].2.get("code"), Some(&Value::Str("9".into())));
}

#[tokio::test]
async fn call_takes_domain_and_service_from_the_reference() {
    let host = Arc::new(ScriptedHost::new());
    run(
        "AUTO scene WHEN 07:00 THEN CALL scene.turn_on ON AREA living_room WITH (transition = 2)",
        host.clone(),
    )
    .await;

    let calls = host.service_calls();
    assert_eq!(calls[0].0, "scene");
    assert_eq!(calls[0].1, "turn_on");
    assert_eq!(
        calls[0].2.get("area_id"),
        Some(&vec!["living_room".to_string()].into())
    );
}

#[tokio::test]
async fn wait_suspends_through_the_host() {
    let host = Arc::new(ScriptedHost::new());
    run("AUTO nap WHEN 07:00 THEN WAIT 45 minutes PASS", host.clone()).await;

    assert!(host
        .calls()
        .iter()
        .any(|c| matches!(c, HostCall::Sleep { seconds } if *seconds == 2700.0)));
}

#[tokio::test]
async fn host_failure_does_not_abort_the_rest_of_the_block() {
    let host = Arc::new(ScriptedHost::new());
    host.fail_service("broken");
    run(
        "AUTO resilient WHEN 07:00 THEN CALL test.broken TURN ON light light.desk",
        host.clone(),
    )
    .await;

    let calls = host.service_calls();
    // the failing call was attempted, and the next command still ran
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1, "turn_on");
    assert!(host.calls().iter().any(
        |c| matches!(c, HostCall::Log { message, .. } if message.contains("continuing block"))
    ));
}

#[tokio::test]
async fn unresolved_variable_aborts_the_block() {
    let host = Arc::new(ScriptedHost::new());
    run(
        "AUTO fatal WHEN 07:00 THEN SET sensor.x TO @missing TURN ON light light.desk",
        host.clone(),
    )
    .await;

    assert!(host.service_calls().is_empty());
    assert!(host.calls().iter().any(
        |c| matches!(c, HostCall::Log { message, .. } if message.contains("aborting rest of block"))
    ));
}

#[tokio::test]
async fn later_commands_observe_earlier_state_writes() {
    let host = Arc::new(ScriptedHost::new());
    run(
        r#"
AUTO chain WHEN 07:00
THEN
    SET sensor.mode TO 'cozy'
    IF sensor.mode == 'cozy' THEN TURN ON light light.lamp END
"#,
        host.clone(),
    )
    .await;

    assert_eq!(host.service_calls().len(), 1);
}
