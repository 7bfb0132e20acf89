//! Named operators over dynamic JSON payloads.
//!
//! The typed combinators cover composition written in Rust. Pipelines that
//! are described by name, for instance a step that says "run `allOf` over
//! these operands", go through this registry instead. Every operator
//! name maps to one variant of the closed [`Operator`] enum, and every
//! payload is a [`serde_json::Value`].
//!
//! # Argument shapes
//!
//! | Operator | Arguments |
//! |---|---|
//! | `anyOf`, `someOf`, `allOf`, `pipe` | one or more operands or values |
//! | `someFrom` | exactly one keyed operand list |
//! | `wait` | delay in ms, then an optional value |
//! | `not` | exactly one operand or value |
//! | `try` | one operand or value, then an optional fallback value |
//!
//! A plain value argument stands for an operand already resolved with it.
//!
//! # Result encoding
//!
//! - group results become arrays, with `null` at rejected slots
//! - keyed results and errors become objects in insertion order
//! - aggregated rejections become arrays in operand order
//! - progress is the serialized [`Progress`](crate::Progress)

use core::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use super::operand::Operand;
use super::{all_of_with_flow, any_of_with_flow, fallback, fallback_or, invert};
use super::{pipe_with_flow, some_from_with_flow, some_of_with_flow};
use crate::config::FlowConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::promise::Promise;
use crate::time::{wait, Scheduler};
use crate::tracing_compat::debug;
use crate::types::{Flow, Payload};

/// A promise over dynamic payloads: value, reason and progress are JSON.
pub type DynPromise = Promise<Value, Value, Value>;

/// An operand over dynamic payloads.
pub type DynOperand = Operand<Value, Value, Value>;

/// The closed set of named operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// First success.
    AnyOf,
    /// Settle all, succeed if any succeeded.
    SomeOf,
    /// Keyed `SomeOf`.
    SomeFrom,
    /// Settle all, succeed if all succeeded.
    AllOf,
    /// Sequential steps.
    Pipe,
    /// Delay.
    Wait,
    /// Swap success and failure.
    Not,
    /// Resolve with a fallback on failure.
    Try,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::AnyOf,
        Self::SomeOf,
        Self::SomeFrom,
        Self::AllOf,
        Self::Pipe,
        Self::Wait,
        Self::Not,
        Self::Try,
    ];

    /// Canonical snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnyOf => "any_of",
            Self::SomeOf => "some_of",
            Self::SomeFrom => "some_from",
            Self::AllOf => "all_of",
            Self::Pipe => "pipe",
            Self::Wait => "wait",
            Self::Not => "not",
            Self::Try => "try",
        }
    }

    const fn is_group(self) -> bool {
        matches!(self, Self::AnyOf | Self::SomeOf | Self::AllOf | Self::Pipe)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s {
            "anyOf" | "any_of" => Self::AnyOf,
            "someOf" | "some_of" => Self::SomeOf,
            "someFrom" | "some_from" => Self::SomeFrom,
            "allOf" | "all_of" => Self::AllOf,
            "pipe" => Self::Pipe,
            "wait" => Self::Wait,
            "not" | "invert" => Self::Not,
            "try" | "fallback" | "anyway" => Self::Try,
            other => return Err(Error::unknown_operator(other)),
        };
        Ok(op)
    }
}

/// One argument to a named operator.
#[derive(Debug)]
pub enum Arg {
    /// A promise or a function producing one.
    Operand(DynOperand),
    /// A plain value.
    Value(Value),
    /// Named operands, for `someFrom`.
    Keyed(Vec<(String, DynOperand)>),
}

impl Arg {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Operand(_) => "operand",
            Self::Value(_) => "value",
            Self::Keyed(_) => "keyed operands",
        }
    }

    fn into_operand(self) -> Result<DynOperand> {
        match self {
            Self::Operand(op) => Ok(op),
            Self::Value(v) => Ok(Operand::Ready(Promise::resolved(v))),
            Self::Keyed(_) => Err(Error::type_mismatch("operand", "keyed operands")),
        }
    }
}

impl From<DynOperand> for Arg {
    fn from(op: DynOperand) -> Self {
        Self::Operand(op)
    }
}

impl From<DynPromise> for Arg {
    fn from(promise: DynPromise) -> Self {
        Self::Operand(Operand::Ready(promise))
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<K: Into<String>> From<Vec<(K, DynOperand)>> for Arg {
    fn from(entries: Vec<(K, DynOperand)>) -> Self {
        Self::Keyed(entries.into_iter().map(|(k, op)| (k.into(), op)).collect())
    }
}

/// Checks that `args` fit the shape `op` expects.
///
/// # Errors
///
/// [`ErrorKind::NoOperands`] for an empty group, and
/// [`ErrorKind::InvalidArguments`] or [`ErrorKind::TypeMismatch`] for a
/// malformed list.
pub fn validate(op: Operator, args: &[Arg]) -> Result<()> {
    let count = |min: usize, max: usize| {
        if (min..=max).contains(&args.len()) {
            Ok(())
        } else {
            Err(Error::invalid_arguments(format!(
                "{op} takes {min}..={max} arguments, got {}",
                args.len()
            )))
        }
    };
    let not_keyed = |arg: &Arg| match arg {
        Arg::Keyed(_) => Err(Error::type_mismatch("operand or value", arg.kind())),
        _ => Ok(()),
    };
    let value_at = |index: usize| match args.get(index) {
        None | Some(Arg::Value(_)) => Ok(()),
        Some(other) => Err(Error::type_mismatch("value", other.kind())),
    };

    match op {
        group if group.is_group() => {
            if args.is_empty() {
                return Err(Error::no_operands(group.name()));
            }
            args.iter().try_for_each(not_keyed)
        }
        Operator::SomeFrom => {
            count(1, 1)?;
            match &args[0] {
                Arg::Keyed(entries) if entries.is_empty() => Err(Error::no_operands("some_from")),
                Arg::Keyed(_) => Ok(()),
                other => Err(Error::type_mismatch("keyed operands", other.kind())),
            }
        }
        Operator::Wait => {
            count(1, 2)?;
            delay_arg(&args[0])?;
            value_at(1)
        }
        Operator::Not => {
            count(1, 1)?;
            not_keyed(&args[0])
        }
        Operator::Try => {
            count(1, 2)?;
            not_keyed(&args[0])?;
            value_at(1)
        }
        _ => Ok(()),
    }
}

fn delay_arg(arg: &Arg) -> Result<Duration> {
    match arg {
        Arg::Value(Value::Number(n)) => n.as_u64().map(Duration::from_millis).ok_or_else(|| {
            Error::invalid_arguments(format!("wait delay must be a whole number of ms, got {n}"))
        }),
        Arg::Value(other) => Err(Error::type_mismatch("number", json_kind(other))),
        other => Err(Error::type_mismatch("number", other.kind())),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Encodes a construction error as a rejection reason.
#[must_use]
pub fn error_value(err: &Error) -> Value {
    let mut map = Map::new();
    map.insert("kind".to_owned(), Value::String(format!("{:?}", err.kind())));
    map.insert("message".to_owned(), Value::String(err.to_string()));
    Value::Object(map)
}

fn to_json<S: Serialize>(value: &S) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn slots_value(slots: Vec<Option<Value>>) -> Value {
    Value::Array(slots.into_iter().map(|s| s.unwrap_or(Value::Null)).collect())
}

fn into_dyn<T, E, P, F, G>(promise: &Promise<T, E, P>, on_value: F, on_error: G) -> DynPromise
where
    T: Payload,
    E: Payload,
    P: Payload + Serialize,
    F: FnOnce(T) -> Value + Send + 'static,
    G: FnOnce(E) -> Value + Send + 'static,
{
    promise.transform(
        move |outcome| outcome.map(on_value).map_err(on_error),
        |progress| Some(to_json(progress)),
    )
}

/// Runs `op` over `args`.
///
/// `flow` is the value handed over by an enclosing pipe or group; see the
/// typed combinators for how each operator uses it.
///
/// # Errors
///
/// Any error [`validate`] reports.
pub(crate) fn run(
    op: Operator,
    args: Vec<Arg>,
    flow: Option<Flow<Value>>,
    scheduler: &Arc<dyn Scheduler>,
    config: &FlowConfig,
) -> Result<DynPromise> {
    validate(op, &args)?;
    debug!(operator = %op, args = args.len(), "running named operator");

    let mut args = args.into_iter();
    let promise = match op {
        Operator::AnyOf => {
            let operands = args.map(Arg::into_operand).collect::<Result<Vec<_>>>()?;
            let p = any_of_with_flow(operands, flow)?;
            into_dyn(&p, |v| v, Value::Array)
        }
        Operator::SomeOf => {
            let operands = args.map(Arg::into_operand).collect::<Result<Vec<_>>>()?;
            let p = some_of_with_flow(operands, flow)?;
            into_dyn(&p, slots_value, Value::Array)
        }
        Operator::AllOf => {
            let operands = args.map(Arg::into_operand).collect::<Result<Vec<_>>>()?;
            let p = all_of_with_flow(operands, flow)?;
            into_dyn(&p, Value::Array, |e| e)
        }
        Operator::Pipe => {
            let steps = args.map(Arg::into_operand).collect::<Result<Vec<_>>>()?;
            let p = pipe_with_flow(steps, flow)?;
            into_dyn(&p, |v| v, |e| e)
        }
        Operator::SomeFrom => {
            let Some(Arg::Keyed(entries)) = args.next() else {
                return Err(Error::new(ErrorKind::Internal).with_message("someFrom lost its entries"));
            };
            let p = some_from_with_flow(entries, flow)?;
            into_dyn(
                &p,
                |results| Value::Object(results.into_iter().map(|(k, v)| (k, v.unwrap_or(Value::Null))).collect()),
                |errors| Value::Object(errors.into_iter().collect()),
            )
        }
        Operator::Wait => {
            let delay = args.next().map_or(Ok(Duration::ZERO), |a| delay_arg(&a))?;
            let value = match args.next() {
                Some(Arg::Value(v)) => v,
                _ => flow.map_or(Value::Null, Flow::into_inner),
            };
            let p = wait::<Value, Value>(Arc::clone(scheduler), delay, value).into_promise();
            p.transform(|s| s, |()| None::<Value>)
        }
        Operator::Not => {
            let operand = next_operand(&mut args)?;
            invert(operand).invoke(flow)
        }
        Operator::Try => {
            let operand = next_operand(&mut args)?;
            let started = Operand::<Value, Value, Value>::Ready(operand.invoke(flow));
            let tick = config.fallback_tick;
            let wrapped = match args.next() {
                Some(Arg::Value(v)) => fallback_or(scheduler.as_ref(), started, tick, v),
                _ => fallback(scheduler.as_ref(), started, tick),
            };
            wrapped.promise().transform(|s| s, |()| None::<Value>)
        }
    };
    Ok(promise)
}

fn next_operand(args: &mut impl Iterator<Item = Arg>) -> Result<DynOperand> {
    args.next()
        .ok_or_else(|| Error::invalid_arguments("missing operand"))?
        .into_operand()
}
