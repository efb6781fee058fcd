//! Parse-shape coverage for every command variant.

use hearth_script::{
    ArmMode, CommandAst, CoverVerb, DimMode, DurationAst, LockVerb, NumberLit, OnOff, StmtAst,
    TargetAst, ValueAst, parse_automation,
};

fn first_command(actions: &str) -> CommandAst {
    let src = format!("AUTO t WHEN 07:00\n{actions}\n");
    let auto = parse_automation(&src).expect("parse ok");
    match auto.actions.into_iter().next().expect("one action") {
        StmtAst::Command(c) => c,
        other => panic!("expected command, got {other:?}"),
    }
}

#[test]
fn pass_parses() {
    assert_eq!(first_command("THEN PASS"), CommandAst::Pass);
}

#[test]
fn set_parses_equals_and_to_forms() {
    let CommandAst::Set { targets, value } = first_command("THEN SET home.temperature = 70") else {
        panic!("expected SET");
    };
    assert_eq!(targets.len(), 1);
    assert_eq!(*value, ValueAst::Number(NumberLit::Int(70)));

    let CommandAst::Set { targets, .. } =
        first_command("THEN SET upstairs.lights, main_room.lights TO 20")
    else {
        panic!("expected SET");
    };
    assert_eq!(targets.len(), 2);
}

#[test]
fn wait_parses_clock_and_relative_forms() {
    let CommandAst::Wait(d) = first_command("THEN WAIT 45 minutes") else {
        panic!("expected WAIT");
    };
    assert_eq!(d.seconds(), 2700.0);

    let CommandAst::Wait(d) = first_command("THEN WAIT 01:30") else {
        panic!("expected WAIT");
    };
    assert!(matches!(d, DurationAst::Clock(_)));
    assert_eq!(d.seconds(), 5400.0);
}

#[test]
fn turn_parses_off_direction() {
    let CommandAst::Turn { state, domain, .. } = first_command("THEN TURN OFF light light.desk")
    else {
        panic!("expected TURN");
    };
    assert_eq!(state, OnOff::Off);
    assert_eq!(domain, "light");
}

#[test]
fn dim_by_negative_delta_parses() {
    let CommandAst::Dim {
        mode,
        amount,
        percent,
        ..
    } = first_command("THEN DIM light.desk BY -20")
    else {
        panic!("expected DIM");
    };
    assert_eq!(mode, DimMode::By);
    assert_eq!(*amount, ValueAst::Number(NumberLit::Int(-20)));
    assert!(!percent);
}

#[test]
fn dim_to_percent_parses() {
    let CommandAst::Dim { mode, percent, .. } = first_command("THEN DIM AREA cupola TO 50 %")
    else {
        panic!("expected DIM");
    };
    assert_eq!(mode, DimMode::To);
    assert!(percent);
}

#[test]
fn lock_and_unlock_parse_with_code() {
    let CommandAst::Lock { verb, with_data, .. } =
        first_command("THEN UNLOCK lock.front_door WITH (code = '1234')")
    else {
        panic!("expected LOCK");
    };
    assert_eq!(verb, LockVerb::Unlock);
    assert_eq!(with_data.unwrap().entries[0].0, "code");
}

#[test]
fn arm_and_disarm_parse() {
    let CommandAst::Arm { mode, .. } = first_command("THEN ARM VACATION alarm_control_panel.main")
    else {
        panic!("expected ARM");
    };
    assert_eq!(mode, ArmMode::Vacation);

    assert!(matches!(
        first_command("THEN DISARM alarm_control_panel.main"),
        CommandAst::Disarm { .. }
    ));
}

#[test]
fn open_close_parses_optional_position() {
    let CommandAst::OpenClose { verb, position, .. } =
        first_command("THEN CLOSE cover.downstairs_window")
    else {
        panic!("expected CLOSE");
    };
    assert_eq!(verb, CoverVerb::Close);
    assert!(position.is_none());

    let CommandAst::OpenClose { position, .. } = first_command("THEN OPEN cover.blinds TO 40")
    else {
        panic!("expected OPEN");
    };
    assert_eq!(position, Some(NumberLit::Int(40)));
}

#[test]
fn call_parses_service_target_and_data() {
    let CommandAst::Call {
        service,
        target,
        with_data,
    } = first_command("THEN CALL scene.turn_on ON AREA living_room WITH (transition = 2)")
    else {
        panic!("expected CALL");
    };
    assert_eq!(service.domain, "scene");
    assert_eq!(service.id, "turn_on");
    assert!(matches!(target, Some(TargetAst::Areas(_))));
    assert_eq!(with_data.unwrap().entries.len(), 1);
}

#[test]
fn in_block_assignment_is_local() {
    let src = "AUTO t WHEN 07:00\nTHEN @level = 20\nPASS\n";
    let auto = parse_automation(src).expect("parse ok");
    let StmtAst::Assignment(a) = &auto.actions[0] else {
        panic!("expected assignment");
    };
    assert_eq!(a.namespace, hearth_script::Namespace::Local);
    assert_eq!(auto.actions.len(), 2);
}
