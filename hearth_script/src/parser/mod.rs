//! Parser and AST builders for the hearth rule language.
//!
//! Wraps the Pest-generated grammar with builders that construct the AST in
//! the crate root. Entry points: [`parse_file`] for a whole source file
//! (automations separated by `;`), [`parse_automation`] for the first one.

use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::{AutomationAst, Namespace, StmtAst};

mod commands;
mod conditions;
mod helpers;
mod triggers;
mod values;

use commands::{parse_assignment, parse_block, parse_if, parse_switch};
use triggers::parse_trigger_pair;

#[derive(PestParser)]
#[grammar = "src/grammar.pest"]
struct DslParser;

/// Errors that can happen when parsing script source.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed source; the message carries pest's rendered position and
    /// expected-token information.
    #[error("parse error: {0}")]
    Syntax(String),
    #[error("unexpected grammar shape: {0}")]
    Shape(&'static str),
    #[error("{msg} ({context})")]
    ShapeAt { msg: &'static str, context: String },
    #[error("duplicate dict key '{0}'")]
    DuplicateKey(String),
}

/// Parse a whole source file into its automations.
///
/// # Errors
/// Returns an error if the source cannot be parsed; a failure anywhere in
/// the file fails the whole file (independent files load independently).
pub fn parse_file(source: &str) -> Result<Vec<AutomationAst>, ParseError> {
    let mut pairs =
        DslParser::parse(Rule::file, source).map_err(|e| ParseError::Syntax(e.to_string()))?;
    let file = pairs.next().ok_or(ParseError::Shape("expected file"))?;
    let mut automations = Vec::new();
    for item in file.into_inner() {
        if item.as_rule() == Rule::automation {
            automations.push(build_automation(item)?);
        }
    }
    Ok(automations)
}

/// Parse a single automation; returns the first one found.
///
/// # Errors
/// Returns an error if the source cannot be parsed or holds no automation.
pub fn parse_automation(source: &str) -> Result<AutomationAst, ParseError> {
    let v = parse_file(source)?;
    v.into_iter().next().ok_or(ParseError::Shape("no automation found"))
}

fn build_automation(pair: pest::iterators::Pair<Rule>) -> Result<AutomationAst, ParseError> {
    let mut name = None;
    let mut trigger_var = None;
    let mut restart = false;
    let mut globals = Vec::new();
    let mut triggers = Vec::new();
    let mut actions: Vec<StmtAst> = Vec::new();

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::global_assignment => {
                let inner = item
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty global assignment"))?;
                globals.push(parse_assignment(inner, Namespace::Global)?);
            },
            Rule::controls => {
                for c in item.into_inner() {
                    match c.as_rule() {
                        Rule::ident => name = Some(c.as_str().to_string()),
                        Rule::variable => {
                            trigger_var = Some(values::parse_variable(c)?.name);
                        },
                        Rule::kw_restart => restart = true,
                        Rule::kw_automation => {},
                        _ => return Err(ParseError::Shape("unexpected controls shape")),
                    }
                }
            },
            Rule::when_clause => {
                let trig = item
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::trigger)
                    .ok_or(ParseError::Shape("WHEN missing trigger"))?;
                triggers.push(parse_trigger_pair(trig)?);
            },
            Rule::action_item => {
                let inner = item
                    .into_inner()
                    .next()
                    .ok_or(ParseError::Shape("empty action item"))?;
                match inner.as_rule() {
                    Rule::if_block => actions.push(StmtAst::If(parse_if(inner)?)),
                    Rule::switch_block => actions.push(StmtAst::Switch(parse_switch(inner)?)),
                    Rule::block => actions.extend(parse_block(inner)?),
                    _ => return Err(ParseError::Shape("unexpected action item")),
                }
            },
            _ => {},
        }
    }

    Ok(AutomationAst {
        name: name.ok_or(ParseError::Shape("automation missing name"))?,
        trigger_var: trigger_var.unwrap_or_else(|| "@trigger".to_string()),
        restart,
        globals,
        triggers,
        actions,
    })
}
