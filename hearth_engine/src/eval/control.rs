//! Blocks, IF/ELSE, SWITCH/CASE, and boolean condition evaluation.

use futures::future::BoxFuture;
use hearth_script::{
    CaseTest, CommandAst, CompareOp, ComparisonAst, ConditionAst, ElseAst, IfAst, StmtAst,
    SwitchAst,
};

use crate::error::EvalError;
use crate::host::LogLevel;
use crate::scope::Scope;
use crate::value::Value;

use super::Runtime;

/// Which SWITCH clause ran. `NoMatch` is a distinct outcome, not case 0:
/// case indices are 1-based and 0-like reporting is reserved for DEFAULT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected {
    Case(usize),
    Default,
    NoMatch,
}

impl Runtime {
    /// Run a command block: statements in source order, later commands
    /// observing earlier mutations. Per-command failures are logged through
    /// the host sink and the remaining commands still execute; an
    /// unresolved variable aborts the remainder of the block.
    pub fn run_block<'a>(
        &'a self,
        statements: &'a [StmtAst],
        scope: &'a mut Scope,
    ) -> BoxFuture<'a, Vec<Value>> {
        Box::pin(async move {
            let mut results = Vec::new();
            for statement in statements {
                let what = describe(statement);
                self.host()
                    .log(LogLevel::Debug, &format!("executing {what}"))
                    .await;
                let outcome = match statement {
                    StmtAst::Assignment(a) => {
                        scope.assign(a);
                        Ok(Vec::new())
                    },
                    StmtAst::Command(c) => self.eval_command(c, scope).await,
                    StmtAst::If(i) => self.eval_if(i, scope).await,
                    StmtAst::Switch(s) => self.eval_switch(s, scope).await.map(|(_, r)| r),
                };
                match outcome {
                    Ok(mut r) => results.append(&mut r),
                    Err(err @ EvalError::Scope(_)) => {
                        self.host()
                            .log(
                                LogLevel::Error,
                                &format!("{what}: {err}; aborting rest of block"),
                            )
                            .await;
                        break;
                    },
                    Err(err) => {
                        self.host()
                            .log(LogLevel::Error, &format!("{what}: {err}; continuing block"))
                            .await;
                    },
                }
            }
            results
        })
    }

    /// Both sides are always evaluated before the operator applies; there is
    /// no lazy short-circuit at the comparison level.
    pub async fn eval_comparison(
        &self,
        comparison: &ComparisonAst,
        scope: &Scope,
    ) -> Result<bool, EvalError> {
        let left = self.eval_value(&comparison.left, scope).await?;
        let right = self.eval_value(&comparison.right, scope).await?;
        let result = left.compare(comparison.op, &right)?;
        self.host()
            .log(
                LogLevel::Debug,
                &format!("comparison {result}: ({left} {} {right})", comparison.op),
            )
            .await;
        Ok(result)
    }

    /// Evaluate a condition tree. Every leaf is evaluated exactly once,
    /// depth-first left-to-right, before any combinator folds — side effects
    /// in comparisons always occur even when a later OR branch would
    /// short-circuit in a conventional language.
    pub async fn eval_condition(
        &self,
        condition: &ConditionAst,
        scope: &Scope,
    ) -> Result<bool, EvalError> {
        let mut leaves = Vec::new();
        collect_leaves(condition, &mut leaves);
        let mut outcomes = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            outcomes.push(self.eval_comparison(leaf, scope).await?);
        }
        let mut next = 0usize;
        Ok(fold(condition, &outcomes, &mut next))
    }

    pub fn eval_if<'a>(
        &'a self,
        if_ast: &'a IfAst,
        scope: &'a mut Scope,
    ) -> BoxFuture<'a, Result<Vec<Value>, EvalError>> {
        Box::pin(async move {
            if self.eval_condition(&if_ast.condition, scope).await? {
                return Ok(self.run_block(&if_ast.then_branch, scope).await);
            }
            match &if_ast.else_branch {
                Some(ElseAst::If(nested)) => self.eval_if(nested, scope).await,
                Some(ElseAst::Block(block)) => Ok(self.run_block(block, scope).await),
                None => Ok(Vec::new()),
            }
        })
    }

    /// Cases evaluate top to bottom; the first hit runs and reporting stops
    /// there. DEFAULT runs only when nothing matched.
    pub async fn eval_switch(
        &self,
        switch: &SwitchAst,
        scope: &mut Scope,
    ) -> Result<(Selected, Vec<Value>), EvalError> {
        let subject = match &switch.subject {
            Some(node) => Some(self.eval_value(node, scope).await?),
            None => None,
        };
        for (index, case) in switch.cases.iter().enumerate() {
            let hit = match &case.test {
                CaseTest::Condition(condition) => self.eval_condition(condition, scope).await?,
                CaseTest::Value(node) => {
                    let subject = subject.as_ref().ok_or_else(|| {
                        EvalError::Config("CASE with a bare value needs a SWITCH subject".into())
                    })?;
                    let right = self.eval_value(node, scope).await?;
                    subject.compare(CompareOp::Eq, &right)?
                },
            };
            if hit {
                let results = self.run_block(&case.block, scope).await;
                return Ok((Selected::Case(index + 1), results));
            }
        }
        if let Some(default) = &switch.default {
            let results = self.run_block(default, scope).await;
            return Ok((Selected::Default, results));
        }
        Ok((Selected::NoMatch, Vec::new()))
    }
}

fn describe(statement: &StmtAst) -> String {
    match statement {
        StmtAst::Assignment(a) => format!("assignment {}", a.var.name),
        StmtAst::If(_) => "IF".to_string(),
        StmtAst::Switch(_) => "SWITCH".to_string(),
        StmtAst::Command(c) => match c {
            CommandAst::Pass => "PASS".to_string(),
            CommandAst::Set { .. } => "SET".to_string(),
            CommandAst::Wait(_) => "WAIT".to_string(),
            CommandAst::Turn { .. } => "TURN".to_string(),
            CommandAst::Toggle { .. } => "TOGGLE".to_string(),
            CommandAst::Dim { .. } => "DIM".to_string(),
            CommandAst::Lock { .. } => "LOCK".to_string(),
            CommandAst::Arm { .. } => "ARM".to_string(),
            CommandAst::Disarm { .. } => "DISARM".to_string(),
            CommandAst::OpenClose { .. } => "OPEN/CLOSE".to_string(),
            CommandAst::Call { service, .. } => format!("CALL {}", service.name()),
        },
    }
}

fn collect_leaves<'c>(condition: &'c ConditionAst, out: &mut Vec<&'c ComparisonAst>) {
    match condition {
        ConditionAst::Comparison(c) => out.push(c),
        ConditionAst::Not(inner) => collect_leaves(inner, out),
        ConditionAst::All(children) | ConditionAst::Any(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        },
    }
}

fn fold(condition: &ConditionAst, outcomes: &[bool], next: &mut usize) -> bool {
    match condition {
        ConditionAst::Comparison(_) => {
            let r = outcomes[*next];
            *next += 1;
            r
        },
        ConditionAst::Not(inner) => !fold(inner, outcomes, next),
        ConditionAst::All(children) => {
            let mut acc = true;
            for child in children {
                acc &= fold(child, outcomes, next);
            }
            acc
        },
        ConditionAst::Any(children) => {
            let mut acc = false;
            for child in children {
                acc |= fold(child, outcomes, next);
            }
            acc
        },
    }
}
