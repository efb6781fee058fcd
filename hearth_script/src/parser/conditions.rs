//! Builders for comparisons and boolean condition trees.
//!
//! The grammar encodes the precedence climb (NOT over AND over OR); these
//! builders fold consecutive same-operator chains into one n-ary node and
//! wrap a bare comparison at the root as a one-child `All`.

use pest::iterators::Pair;

use crate::{CompareOp, ComparisonAst, ConditionAst};

use super::values::parse_scalar;
use super::{ParseError, Rule};

pub(super) fn parse_condition_pair(pair: Pair<Rule>) -> Result<ConditionAst, ParseError> {
    let or = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty condition"))?;
    let tree = parse_or(or)?;
    Ok(match tree {
        ConditionAst::Comparison(_) => ConditionAst::All(vec![tree]),
        other => other,
    })
}

fn parse_or(pair: Pair<Rule>) -> Result<ConditionAst, ParseError> {
    let mut children = Vec::new();
    for p in pair.into_inner().filter(|p| p.as_rule() == Rule::and_expr) {
        children.push(parse_and(p)?);
    }
    match children.len() {
        0 => Err(ParseError::Shape("empty OR chain")),
        1 => Ok(children.remove(0)),
        _ => Ok(ConditionAst::Any(children)),
    }
}

fn parse_and(pair: Pair<Rule>) -> Result<ConditionAst, ParseError> {
    let mut children = Vec::new();
    for p in pair.into_inner().filter(|p| p.as_rule() == Rule::not_expr) {
        children.push(parse_not(p)?);
    }
    match children.len() {
        0 => Err(ParseError::Shape("empty AND chain")),
        1 => Ok(children.remove(0)),
        _ => Ok(ConditionAst::All(children)),
    }
}

fn parse_not(pair: Pair<Rule>) -> Result<ConditionAst, ParseError> {
    let mut negated = false;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::kw_not => negated = !negated,
            Rule::not_expr => {
                let inner = parse_not(p)?;
                return Ok(if negated {
                    ConditionAst::Not(Box::new(inner))
                } else {
                    inner
                });
            },
            Rule::cond_primary => {
                let inner = parse_primary(p)?;
                return Ok(if negated {
                    ConditionAst::Not(Box::new(inner))
                } else {
                    inner
                });
            },
            _ => return Err(ParseError::Shape("unexpected NOT operand")),
        }
    }
    Err(ParseError::Shape("empty NOT expression"))
}

fn parse_primary(pair: Pair<Rule>) -> Result<ConditionAst, ParseError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or(ParseError::Shape("empty condition primary"))?;
    match inner.as_rule() {
        Rule::or_expr => parse_or(inner),
        Rule::comparison => Ok(ConditionAst::Comparison(parse_comparison(inner)?)),
        _ => Err(ParseError::Shape("unexpected condition primary")),
    }
}

pub(super) fn parse_comparison(pair: Pair<Rule>) -> Result<ComparisonAst, ParseError> {
    let mut it = pair.into_inner();
    let left = parse_scalar(it.next().ok_or(ParseError::Shape("comparison missing left term"))?)?;
    let op = parse_compare_op(
        it.next()
            .ok_or(ParseError::Shape("comparison missing operator"))?
            .as_str(),
    )?;
    let right = parse_scalar(it.next().ok_or(ParseError::Shape("comparison missing right term"))?)?;
    Ok(ComparisonAst { left, op, right })
}

pub(super) fn parse_compare_op(text: &str) -> Result<CompareOp, ParseError> {
    match text {
        "==" => Ok(CompareOp::Eq),
        "!=" => Ok(CompareOp::Ne),
        "<" => Ok(CompareOp::Lt),
        "<=" => Ok(CompareOp::Le),
        ">" => Ok(CompareOp::Gt),
        ">=" => Ok(CompareOp::Ge),
        _ => Err(ParseError::Shape("unknown comparison operator")),
    }
}
