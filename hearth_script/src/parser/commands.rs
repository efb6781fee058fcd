//! Builders for commands, assignments, and control-flow statements.

use pest::iterators::Pair;

use crate::{
    ArmMode, AssignmentAst, CaseAst, CaseTest, CommandAst, CoverVerb, DimMode, ElseAst, IfAst,
    LockVerb, Namespace, OnOff, StmtAst, SwitchAst, ValueAst,
};

use super::conditions::parse_condition_pair;
use super::helpers::parse_number;
use super::triggers::parse_duration;
use super::values::{
    parse_area_list, parse_dict, parse_entity, parse_entity_list, parse_scalar, parse_target,
    parse_value_list, parse_variable,
};
use super::{ParseError, Rule};

pub(super) fn parse_block(pair: Pair<Rule>) -> Result<Vec<StmtAst>, ParseError> {
    let mut out = Vec::new();
    for p in pair.into_inner().filter(|p| p.as_rule() == Rule::block_item) {
        out.push(parse_stmt(p)?);
    }
    Ok(out)
}

fn parse_stmt(pair: Pair<Rule>) -> Result<StmtAst, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty statement"))?;
    match inner.as_rule() {
        Rule::if_block => Ok(StmtAst::If(parse_if(inner)?)),
        Rule::switch_block => Ok(StmtAst::Switch(parse_switch(inner)?)),
        Rule::command => Ok(StmtAst::Command(parse_command(inner)?)),
        Rule::assignment => Ok(StmtAst::Assignment(parse_assignment(inner, Namespace::Local)?)),
        _ => Err(ParseError::Shape("unexpected statement kind")),
    }
}

pub(super) fn parse_if(pair: Pair<Rule>) -> Result<IfAst, ParseError> {
    let mut condition = None;
    let mut then_branch = None;
    let mut else_branch = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::condition => condition = Some(parse_condition_pair(p)?),
            Rule::block => then_branch = Some(parse_block(p)?),
            Rule::else_clause => {
                let inner = p
                    .into_inner()
                    .find(|q| matches!(q.as_rule(), Rule::if_block | Rule::block))
                    .ok_or(ParseError::Shape("empty ELSE clause"))?;
                else_branch = Some(match inner.as_rule() {
                    Rule::if_block => ElseAst::If(Box::new(parse_if(inner)?)),
                    _ => ElseAst::Block(parse_block(inner)?),
                });
            },
            Rule::kw_if | Rule::kw_end => {},
            _ => return Err(ParseError::Shape("unexpected IF shape")),
        }
    }
    Ok(IfAst {
        condition: condition.ok_or(ParseError::Shape("IF missing condition"))?,
        then_branch: then_branch.ok_or(ParseError::Shape("IF missing block"))?,
        else_branch,
    })
}

pub(super) fn parse_switch(pair: Pair<Rule>) -> Result<SwitchAst, ParseError> {
    let mut subject = None;
    let mut cases = Vec::new();
    let mut default = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::switch_subject => {
                let scalar = p
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty switch subject"))?;
                subject = Some(parse_scalar(scalar)?);
            },
            Rule::switch_case => cases.push(parse_case(p)?),
            Rule::default_clause => {
                let block = p
                    .into_inner()
                    .find(|q| q.as_rule() == Rule::block)
                    .ok_or(ParseError::Shape("DEFAULT missing block"))?;
                default = Some(parse_block(block)?);
            },
            Rule::kw_switch | Rule::kw_end => {},
            _ => return Err(ParseError::Shape("unexpected SWITCH shape")),
        }
    }
    if cases.is_empty() {
        return Err(ParseError::Shape("SWITCH needs at least one CASE"));
    }
    Ok(SwitchAst { subject, cases, default })
}

fn parse_case(pair: Pair<Rule>) -> Result<CaseAst, ParseError> {
    let mut test = None;
    let mut block = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::case_test => {
                let inner = p
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty case test"))?;
                test = Some(match inner.as_rule() {
                    Rule::condition => CaseTest::Condition(parse_condition_pair(inner)?),
                    Rule::scalar => CaseTest::Value(parse_scalar(inner)?),
                    _ => return Err(ParseError::Shape("unexpected case test")),
                });
            },
            Rule::block => block = Some(parse_block(p)?),
            Rule::kw_case => {},
            _ => return Err(ParseError::Shape("unexpected CASE shape")),
        }
    }
    Ok(CaseAst {
        test: test.ok_or(ParseError::Shape("CASE missing test"))?,
        block: block.ok_or(ParseError::Shape("CASE missing block"))?,
    })
}

pub(super) fn parse_assignment(pair: Pair<Rule>, namespace: Namespace) -> Result<AssignmentAst, ParseError> {
    let mut it = pair.into_inner();
    let var = parse_variable(it.next().ok_or(ParseError::Shape("assignment missing variable"))?)?;
    let rhs = it.next().ok_or(ParseError::Shape("assignment missing value"))?;
    let value = parse_assign_value(rhs)?;
    Ok(AssignmentAst { var, value, namespace })
}

fn parse_assign_value(pair: Pair<Rule>) -> Result<ValueAst, ParseError> {
    let mut it = pair.into_inner();
    let first = it.next().ok_or(ParseError::Shape("empty assignment value"))?;
    match first.as_rule() {
        Rule::dict => Ok(ValueAst::Dict(parse_dict(first)?)),
        Rule::kw_area => {
            let list = it.next().ok_or(ParseError::Shape("AREA value missing list"))?;
            Ok(ValueAst::List(parse_area_list(list)?))
        },
        Rule::value_list => {
            let mut items = parse_value_list(first)?;
            // A one-element list assigns the scalar itself.
            if items.len() == 1 {
                Ok(items.remove(0))
            } else {
                Ok(ValueAst::List(items))
            }
        },
        _ => Err(ParseError::Shape("unexpected assignment value")),
    }
}

pub(super) fn parse_command(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty command"))?;
    match inner.as_rule() {
        Rule::pass_cmd => Ok(CommandAst::Pass),
        Rule::set_cmd => parse_set(inner),
        Rule::wait_cmd => parse_wait(inner),
        Rule::turn_cmd => parse_turn(inner),
        Rule::toggle_cmd => parse_toggle(inner),
        Rule::dim_cmd => parse_dim(inner),
        Rule::lock_cmd => parse_lock(inner),
        Rule::arm_cmd => parse_arm(inner),
        Rule::disarm_cmd => parse_disarm(inner),
        Rule::open_close_cmd => parse_open_close(inner),
        Rule::call_cmd => parse_call(inner),
        _ => Err(ParseError::Shape("unknown command")),
    }
}

fn parse_with(pair: Pair<Rule>) -> Result<crate::DictAst, ParseError> {
    let dict = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::dict)
        .ok_or(ParseError::Shape("WITH missing dict"))?;
    parse_dict(dict)
}

fn parse_set(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut targets = None;
    let mut value = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::entity_list => targets = Some(parse_entity_list(p)?),
            Rule::scalar => value = Some(parse_scalar(p)?),
            Rule::kw_set | Rule::kw_to => {},
            _ => return Err(ParseError::Shape("unexpected SET shape")),
        }
    }
    Ok(CommandAst::Set {
        targets: targets.ok_or(ParseError::Shape("SET missing targets"))?,
        value: Box::new(value.ok_or(ParseError::Shape("SET missing value"))?),
    })
}

fn parse_wait(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let duration = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::duration)
        .ok_or(ParseError::Shape("WAIT missing duration"))?;
    Ok(CommandAst::Wait(parse_duration(duration)?))
}

fn parse_turn(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut state = None;
    let mut domain = None;
    let mut target = None;
    let mut with_data = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_on => state = Some(OnOff::On),
            Rule::kw_off => state = Some(OnOff::Off),
            Rule::ident => domain = Some(p.as_str().to_string()),
            Rule::target => target = Some(parse_target(p)?),
            Rule::with_clause => with_data = Some(parse_with(p)?),
            Rule::kw_turn => {},
            _ => return Err(ParseError::Shape("unexpected TURN shape")),
        }
    }
    Ok(CommandAst::Turn {
        state: state.ok_or(ParseError::Shape("TURN missing ON/OFF"))?,
        domain: domain.ok_or(ParseError::Shape("TURN missing domain"))?,
        target: target.ok_or(ParseError::Shape("TURN missing target"))?,
        with_data,
    })
}

fn parse_toggle(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut domain = None;
    let mut target = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::ident => domain = Some(p.as_str().to_string()),
            Rule::target => target = Some(parse_target(p)?),
            Rule::kw_toggle => {},
            _ => return Err(ParseError::Shape("unexpected TOGGLE shape")),
        }
    }
    Ok(CommandAst::Toggle {
        domain: domain.ok_or(ParseError::Shape("TOGGLE missing domain"))?,
        target: target.ok_or(ParseError::Shape("TOGGLE missing target"))?,
    })
}

fn parse_dim(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut target = None;
    let mut mode = None;
    let mut amount = None;
    let mut percent = false;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::target => target = Some(parse_target(p)?),
            Rule::kw_to => mode = Some(DimMode::To),
            Rule::kw_by => mode = Some(DimMode::By),
            Rule::dim_amount => {
                let inner = p
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty DIM amount"))?;
                amount = Some(match inner.as_rule() {
                    Rule::number => ValueAst::Number(parse_number(inner.as_str())?),
                    Rule::variable => ValueAst::Var(parse_variable(inner)?),
                    Rule::entity => ValueAst::Entity(parse_entity(inner)?),
                    _ => return Err(ParseError::Shape("unexpected DIM amount")),
                });
            },
            Rule::percent => percent = true,
            Rule::kw_dim => {},
            _ => return Err(ParseError::Shape("unexpected DIM shape")),
        }
    }
    Ok(CommandAst::Dim {
        target: target.ok_or(ParseError::Shape("DIM missing target"))?,
        mode: mode.ok_or(ParseError::Shape("DIM missing TO/BY"))?,
        amount: Box::new(amount.ok_or(ParseError::Shape("DIM missing amount"))?),
        percent,
    })
}

fn parse_lock(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut verb = None;
    let mut target = None;
    let mut with_data = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_lock => verb = Some(LockVerb::Lock),
            Rule::kw_unlock => verb = Some(LockVerb::Unlock),
            Rule::target => target = Some(parse_target(p)?),
            Rule::with_clause => with_data = Some(parse_with(p)?),
            _ => return Err(ParseError::Shape("unexpected LOCK shape")),
        }
    }
    Ok(CommandAst::Lock {
        verb: verb.ok_or(ParseError::Shape("LOCK missing verb"))?,
        target: target.ok_or(ParseError::Shape("LOCK missing target"))?,
        with_data,
    })
}

fn parse_arm(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut mode = None;
    let mut target = None;
    let mut with_data = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::arm_mode => {
                mode = Some(match p.as_str().to_ascii_lowercase().as_str() {
                    "home" => ArmMode::Home,
                    "away" => ArmMode::Away,
                    "night" => ArmMode::Night,
                    "vacation" => ArmMode::Vacation,
                    _ => return Err(ParseError::Shape("unknown ARM mode")),
                });
            },
            Rule::target => target = Some(parse_target(p)?),
            Rule::with_clause => with_data = Some(parse_with(p)?),
            Rule::kw_arm => {},
            _ => return Err(ParseError::Shape("unexpected ARM shape")),
        }
    }
    Ok(CommandAst::Arm {
        mode: mode.ok_or(ParseError::Shape("ARM missing mode"))?,
        target: target.ok_or(ParseError::Shape("ARM missing target"))?,
        with_data,
    })
}

fn parse_disarm(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut target = None;
    let mut with_data = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::target => target = Some(parse_target(p)?),
            Rule::with_clause => with_data = Some(parse_with(p)?),
            Rule::kw_disarm => {},
            _ => return Err(ParseError::Shape("unexpected DISARM shape")),
        }
    }
    Ok(CommandAst::Disarm {
        target: target.ok_or(ParseError::Shape("DISARM missing target"))?,
        with_data,
    })
}

fn parse_open_close(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut verb = None;
    let mut target = None;
    let mut position = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_open => verb = Some(CoverVerb::Open),
            Rule::kw_close => verb = Some(CoverVerb::Close),
            Rule::target => target = Some(parse_target(p)?),
            Rule::number => {
                let n = parse_number(p.as_str())?;
                if !(0.0..=100.0).contains(&n.as_f64()) {
                    return Err(ParseError::ShapeAt {
                        msg: "cover position must be between 0 and 100",
                        context: n.to_string(),
                    });
                }
                position = Some(n);
            },
            Rule::kw_to => {},
            _ => return Err(ParseError::Shape("unexpected OPEN/CLOSE shape")),
        }
    }
    Ok(CommandAst::OpenClose {
        verb: verb.ok_or(ParseError::Shape("OPEN/CLOSE missing verb"))?,
        target: target.ok_or(ParseError::Shape("OPEN/CLOSE missing target"))?,
        position,
    })
}

fn parse_call(pair: Pair<Rule>) -> Result<CommandAst, ParseError> {
    let mut service = None;
    let mut target = None;
    let mut with_data = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::entity => service = Some(parse_entity(p)?),
            Rule::target => target = Some(parse_target(p)?),
            Rule::with_clause => with_data = Some(parse_with(p)?),
            Rule::kw_call | Rule::kw_on => {},
            _ => return Err(ParseError::Shape("unexpected CALL shape")),
        }
    }
    let service = service.ok_or(ParseError::Shape("CALL missing service reference"))?;
    if service.attribute.is_some() {
        return Err(ParseError::Shape("CALL service takes a plain domain.service reference"));
    }
    Ok(CommandAst::Call {
        service,
        target,
        with_data,
    })
}
