//! Trigger descriptor compilation: the wire format must hold byte-for-byte.

use std::sync::Arc;

use hearth_engine::{Registrar, ScriptedHost, TriggerKind, TriggerSpec};
use hearth_script::parse_automation;

fn compile(script: &str) -> Vec<TriggerSpec> {
    let registrar = Registrar::new(Arc::new(ScriptedHost::new()));
    let automation = parse_automation(script).expect("parse ok");
    registrar.register("test", automation).expect("register ok")
}

fn descriptors(script: &str) -> Vec<String> {
    compile(script).into_iter().map(|s| s.descriptor).collect()
}

#[test]
fn state_change_compiles_one_descriptor_per_entity() {
    let got = descriptors(
        "AUTO t WHEN light.l1, light.l2 CHANGES FROM 'off' TO 'on' THEN PASS",
    );
    assert_eq!(
        got,
        vec![
            "light.l1 == 'on' and light.l1.old == 'off'".to_string(),
            "light.l2 == 'on' and light.l2.old == 'off'".to_string(),
        ]
    );
}

#[test]
fn bare_changes_compiles_to_the_entity_name() {
    let got = descriptors("AUTO t WHEN binary_sensor.door CHANGES THEN PASS");
    assert_eq!(got, vec!["binary_sensor.door".to_string()]);
}

#[test]
fn numeric_bounds_are_wrapped_for_numeric_comparison() {
    let got = descriptors("AUTO t WHEN sensor.temp CHANGES TO > 21 THEN PASS");
    assert_eq!(got, vec!["float(sensor.temp) > 21".to_string()]);

    let got = descriptors("AUTO t WHEN sensor.temp CHANGES FROM <= 19.5 THEN PASS");
    assert_eq!(got, vec!["float(sensor.temp.old) <= 19.5".to_string()]);
}

#[test]
fn entity_bound_compiles_to_a_state_vs_state_predicate() {
    let got = descriptors("AUTO t WHEN sensor.inside CHANGES TO sensor.outside THEN PASS");
    assert_eq!(got, vec!["sensor.inside == sensor.outside".to_string()]);
}

#[test]
fn hold_clause_records_seconds() {
    let specs = compile("AUTO t WHEN climate.den CHANGES TO 'off' FOR 5 minutes THEN PASS");
    assert_eq!(specs[0].kind, TriggerKind::State);
    assert_eq!(specs[0].hold, Some(300.0));

    let specs = compile("AUTO t WHEN climate.den CHANGES THEN PASS");
    assert_eq!(specs[0].hold, None);
}

#[test]
fn weekly_schedule_crosses_days_and_times() {
    let got = descriptors("AUTO t WHEN 07:00 ON weekend THEN PASS");
    assert_eq!(
        got,
        vec![
            "once(sat 07:00:00 + 0s)".to_string(),
            "once(sun 07:00:00 + 0s)".to_string(),
        ]
    );
}

#[test]
fn weekly_schedule_without_days_keeps_the_empty_day_field() {
    let got = descriptors("AUTO t WHEN 07:00 THEN PASS");
    assert_eq!(got, vec!["once( 07:00:00 + 0s)".to_string()]);
}

#[test]
fn weekday_group_expands_before_the_cross_product() {
    let got = descriptors("AUTO t WHEN 06:45, 21:00 ON weekday THEN PASS");
    assert_eq!(got.len(), 10);
    assert_eq!(got[0], "once(mon 06:45:00 + 0s)");
    assert_eq!(got[1], "once(mon 21:00:00 + 0s)");
    assert_eq!(got[9], "once(fri 21:00:00 + 0s)");
}

#[test]
fn sun_event_offsets_are_signed_seconds() {
    let got = descriptors("AUTO t WHEN 15 minutes BEFORE sunset THEN PASS");
    assert_eq!(got, vec!["once( sunset + -900s)".to_string()]);

    let got = descriptors("AUTO t WHEN 1 hour AFTER sunrise ON sat THEN PASS");
    assert_eq!(got, vec!["once(sat sunrise + 3600s)".to_string()]);

    let got = descriptors("AUTO t WHEN sunrise THEN PASS");
    assert_eq!(got, vec!["once( sunrise + 0s)".to_string()]);
}

#[test]
fn var_entity_lists_expand_at_registration() {
    let got = descriptors(
        r#"
@watched = (light.l1, light.l2)
AUTO t
WHEN @watched CHANGES TO 'on'
THEN PASS
"#,
    );
    assert_eq!(
        got,
        vec![
            "light.l1 == 'on'".to_string(),
            "light.l2 == 'on'".to_string(),
        ]
    );
}

#[test]
fn time_specs_are_time_kind() {
    let specs = compile("AUTO t WHEN 07:00 THEN PASS");
    assert_eq!(specs[0].kind, TriggerKind::Time);
}
