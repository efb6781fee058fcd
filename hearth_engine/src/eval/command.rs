//! Command evaluation: service-name derivation and per-domain dispatch.
//!
//! Every side effect funnels through one `call_service(domain, service,
//! kwargs)` on the host, except SET which writes state directly.

use hearth_script::{
    ArmMode, CommandAst, CoverVerb, DictAst, DimMode, LockVerb, NumberLit, OnOff, TargetAst,
    ValueAst,
};
use indexmap::IndexMap;

use crate::error::EvalError;
use crate::host::LogLevel;
use crate::scope::Scope;
use crate::value::{ServiceData, Value};

use super::Runtime;

impl Runtime {
    /// Evaluate one command; returns the host results, one per dispatched
    /// call (SET: one per written entity).
    pub async fn eval_command(
        &self,
        command: &CommandAst,
        scope: &Scope,
    ) -> Result<Vec<Value>, EvalError> {
        match command {
            CommandAst::Pass => {
                self.host().log(LogLevel::Debug, "passing").await;
                Ok(Vec::new())
            },
            CommandAst::Set { targets, value } => self.eval_set(targets, value, scope).await,
            CommandAst::Wait(duration) => {
                self.host().sleep(duration.seconds()).await;
                Ok(Vec::new())
            },
            CommandAst::Turn {
                state,
                domain,
                target,
                with_data,
            } => {
                let base = self.with_data(with_data.as_ref(), scope).await?;
                let service = match state {
                    OnOff::On => "turn_on",
                    OnOff::Off => "turn_off",
                };
                self.dispatch(domain, service, Some(target), scope, base).await
            },
            CommandAst::Toggle { domain, target } => {
                self.dispatch(domain, "toggle", Some(target), scope, ServiceData::new())
                    .await
            },
            CommandAst::Dim {
                target,
                mode,
                amount,
                percent,
            } => self.eval_dim(target, *mode, amount, *percent, scope).await,
            CommandAst::Lock {
                verb,
                target,
                with_data,
            } => {
                let base = self.with_data(with_data.as_ref(), scope).await?;
                self.dispatch("lock", verb.as_str(), Some(target), scope, base).await
            },
            CommandAst::Arm {
                mode,
                target,
                with_data,
            } => {
                let base = self.with_data(with_data.as_ref(), scope).await?;
                let service = arm_service(*mode);
                self.dispatch("alarm_control_panel", service, Some(target), scope, base)
                    .await
            },
            CommandAst::Disarm { target, with_data } => {
                let base = self.with_data(with_data.as_ref(), scope).await?;
                self.dispatch("alarm_control_panel", "alarm_disarm", Some(target), scope, base)
                    .await
            },
            CommandAst::OpenClose {
                verb,
                target,
                position,
            } => {
                let mut base = ServiceData::new();
                base.insert("position".into(), cover_position(*verb, *position));
                self.dispatch("cover", "set_cover_position", Some(target), scope, base)
                    .await
            },
            CommandAst::Call {
                service,
                target,
                with_data,
            } => {
                let base = self.with_data(with_data.as_ref(), scope).await?;
                self.dispatch(&service.domain, &service.id, target.as_ref(), scope, base)
                    .await
            },
        }
    }

    async fn with_data(
        &self,
        with_data: Option<&DictAst>,
        scope: &Scope,
    ) -> Result<ServiceData, EvalError> {
        match with_data {
            Some(dict) => self.eval_dict_data(dict, scope).await,
            None => Ok(ServiceData::new()),
        }
    }

    /// SET writes state directly for each resolved target entity.
    async fn eval_set(
        &self,
        targets: &[ValueAst],
        value: &ValueAst,
        scope: &Scope,
    ) -> Result<Vec<Value>, EvalError> {
        let new_value = self.eval_value(value, scope).await?;
        let resolved = self
            .resolve_target(&TargetAst::Entities(targets.to_vec()), scope)
            .await?;
        if !resolved.area_id.is_empty() {
            return Err(EvalError::TypeMismatch("SET writes entities, not areas".into()));
        }
        let mut results = Vec::with_capacity(resolved.entity_id.len());
        for name in &resolved.entity_id {
            results.push(self.host().set_state(name, new_value.clone()).await?);
        }
        Ok(results)
    }

    async fn eval_dim(
        &self,
        target: &TargetAst,
        mode: DimMode,
        amount: &ValueAst,
        percent: bool,
        scope: &Scope,
    ) -> Result<Vec<Value>, EvalError> {
        let amount_value = self.eval_value(amount, scope).await?;
        let delta = amount_value.as_f64().ok_or_else(|| {
            EvalError::TypeMismatch(format!(
                "DIM amount must be numeric, got {}",
                amount_value.type_name()
            ))
        })?;
        let mut param = String::from(match mode {
            DimMode::To => "brightness",
            DimMode::By => "brightness_step",
        });
        if percent {
            param.push_str("_pct");
        }
        let mut base = ServiceData::new();
        let service = if delta > 0.0 || percent {
            base.insert(param, amount_value);
            "turn_on"
        } else {
            "turn_off"
        };
        self.dispatch("light", service, Some(target), scope, base).await
    }

    /// Build kwargs and issue one `call_service` per domain present in the
    /// target. Entities group by their own domain; `area_id` rides on the
    /// command's domain. Without a target, one call on the command's domain.
    pub(crate) async fn dispatch(
        &self,
        domain: &str,
        service: &str,
        target: Option<&TargetAst>,
        scope: &Scope,
        base: ServiceData,
    ) -> Result<Vec<Value>, EvalError> {
        let Some(target) = target else {
            let result = self.host().call_service(domain, service, base).await?;
            return Ok(vec![result]);
        };

        let resolved = self.resolve_target(target, scope).await?;
        let mut calls: IndexMap<String, ServiceData> = IndexMap::new();
        for (dom, ids) in resolved.by_domain() {
            let mut data = base.clone();
            data.insert("entity_id".into(), ids.into());
            calls.insert(dom, data);
        }
        if !resolved.area_id.is_empty() {
            let data = calls
                .entry(domain.to_string())
                .or_insert_with(|| base.clone());
            data.insert("area_id".into(), resolved.area_id.clone().into());
        }
        if calls.is_empty() {
            self.host()
                .log(
                    LogLevel::Warn,
                    &format!("{domain}.{service}: target resolved to nothing, skipping"),
                )
                .await;
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(calls.len());
        for (dom, data) in calls {
            results.push(self.host().call_service(&dom, service, data).await?);
        }
        Ok(results)
    }
}

fn arm_service(mode: ArmMode) -> &'static str {
    match mode {
        ArmMode::Home => "alarm_arm_home",
        ArmMode::Away => "alarm_arm_away",
        ArmMode::Night => "alarm_arm_night",
        ArmMode::Vacation => "alarm_arm_vacation",
    }
}

/// Cover position with the CLOSE inversion: `100 - requested` for CLOSE,
/// `requested` for OPEN, default 100 when unspecified.
fn cover_position(verb: CoverVerb, requested: Option<NumberLit>) -> Value {
    let requested = requested.map(|n| n.as_f64()).unwrap_or(100.0);
    let position = match verb {
        CoverVerb::Close => 100.0 - requested,
        CoverVerb::Open => requested,
    };
    if position.fract() == 0.0 {
        Value::Int(position as i64)
    } else {
        Value::Float(position)
    }
}
