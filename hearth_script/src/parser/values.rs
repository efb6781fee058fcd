//! Builders for the literal and container nodes.

use pest::iterators::Pair;

use crate::{AreaRef, DictAst, EntityRef, TargetAst, ValueAst, VarRef};

use super::helpers::{parse_number, unescape};
use super::{ParseError, Rule};

pub(super) fn parse_scalar(pair: Pair<Rule>) -> Result<ValueAst, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty scalar"))?;
    match inner.as_rule() {
        Rule::string => Ok(ValueAst::Str(parse_string_lit(inner)?)),
        Rule::number => Ok(ValueAst::Number(parse_number(inner.as_str())?)),
        Rule::entity => Ok(ValueAst::Entity(parse_entity(inner)?)),
        Rule::variable => Ok(ValueAst::Var(parse_variable(inner)?)),
        _ => Err(ParseError::Shape("unexpected scalar kind")),
    }
}

pub(super) fn parse_string_lit(pair: Pair<Rule>) -> Result<String, ParseError> {
    let quoted = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty string rule"))?;
    unescape(quoted.as_str())
}

pub(super) fn parse_entity(pair: Pair<Rule>) -> Result<EntityRef, ParseError> {
    let mut it = pair.into_inner();
    let domain = it
        .next()
        .ok_or(ParseError::Shape("entity missing domain"))?
        .as_str()
        .to_string();
    let id = it
        .next()
        .ok_or(ParseError::Shape("entity missing id"))?
        .as_str()
        .to_string();
    let attribute = it.next().map(|p| p.as_str().to_string());
    Ok(EntityRef { domain, id, attribute })
}

pub(super) fn parse_variable(pair: Pair<Rule>) -> Result<VarRef, ParseError> {
    let mut it = pair.into_inner();
    let name = it
        .next()
        .ok_or(ParseError::Shape("variable missing name"))?
        .as_str();
    let attribute = it.next().map(|p| p.as_str().to_string());
    Ok(VarRef {
        name: format!("@{name}"),
        attribute,
    })
}

/// Elements of a plain value list (String/Number/Entity/Var).
pub(super) fn parse_value_list(pair: Pair<Rule>) -> Result<Vec<ValueAst>, ParseError> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::scalar)
        .map(parse_scalar)
        .collect()
}

/// Elements of an entity-or-var list (targets, state triggers, SET).
pub(super) fn parse_entity_list(pair: Pair<Rule>) -> Result<Vec<ValueAst>, ParseError> {
    let mut out = Vec::new();
    for item in pair.into_inner().filter(|p| p.as_rule() == Rule::entity_or_var) {
        let inner = item
            .into_inner()
            .next()
            .ok_or(ParseError::Shape("empty entity list element"))?;
        match inner.as_rule() {
            Rule::entity => out.push(ValueAst::Entity(parse_entity(inner)?)),
            Rule::variable => out.push(ValueAst::Var(parse_variable(inner)?)),
            _ => return Err(ParseError::Shape("unexpected entity list element")),
        }
    }
    Ok(out)
}

/// Elements of an area-or-var list.
pub(super) fn parse_area_list(pair: Pair<Rule>) -> Result<Vec<ValueAst>, ParseError> {
    let mut out = Vec::new();
    for item in pair.into_inner().filter(|p| p.as_rule() == Rule::area_or_var) {
        let inner = item
            .into_inner()
            .next()
            .ok_or(ParseError::Shape("empty area list element"))?;
        match inner.as_rule() {
            Rule::area_ref => {
                let name = inner
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("area missing name"))?
                    .as_str()
                    .to_string();
                out.push(ValueAst::Area(AreaRef { name }));
            },
            Rule::variable => out.push(ValueAst::Var(parse_variable(inner)?)),
            _ => return Err(ParseError::Shape("unexpected area list element")),
        }
    }
    Ok(out)
}

pub(super) fn parse_dict(pair: Pair<Rule>) -> Result<DictAst, ParseError> {
    let mut entries: Vec<(String, ValueAst)> = Vec::new();
    for p in pair.into_inner().filter(|p| p.as_rule() == Rule::dict_pair) {
        let mut it = p.into_inner();
        let key = it
            .next()
            .ok_or(ParseError::Shape("dict pair missing key"))?
            .as_str()
            .to_string();
        let value = parse_scalar(it.next().ok_or(ParseError::Shape("dict pair missing value"))?)?;
        if entries.iter().any(|(k, _)| *k == key) {
            return Err(ParseError::DuplicateKey(key));
        }
        entries.push((key, value));
    }
    Ok(DictAst { entries })
}

pub(super) fn parse_target(pair: Pair<Rule>) -> Result<TargetAst, ParseError> {
    let mut it = pair.into_inner();
    let first = it.next().ok_or(ParseError::Shape("empty target"))?;
    match first.as_rule() {
        Rule::kw_area => {
            let list = it.next().ok_or(ParseError::Shape("AREA target missing list"))?;
            Ok(TargetAst::Areas(parse_area_list(list)?))
        },
        Rule::entity_list => Ok(TargetAst::Entities(parse_entity_list(first)?)),
        _ => Err(ParseError::Shape("unexpected target shape")),
    }
}
