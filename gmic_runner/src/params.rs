//! Typed filter parameters and their positional encoding.
//!
//! A filter declares an ordered list of [`ParamSpec`]s. [`ParamValues`] is
//! the editing surface: it starts from the declared defaults and checks
//! names, types and ranges on every change. [`encode`] turns the values into
//! the comma separated argument list G'MIC expects and performs no
//! validation of its own.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::{RunnerError, RunnerResult};

/// One choice of an enum parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub nick: &'static str,
    pub label: &'static str,
}

impl Choice {
    pub const fn new(nick: &'static str, label: &'static str) -> Self {
        Self { nick, label }
    }
}

/// Type, domain and default of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Float { min: f64, max: f64, default: f64 },
    Int { min: i64, max: i64, default: i64 },
    Enum { choices: &'static [Choice], default: usize },
    Bool { default: bool },
    Text { default: &'static str },
}

impl ParamKind {
    fn type_name(&self) -> &'static str {
        match self {
            ParamKind::Float { .. } => "float",
            ParamKind::Int { .. } => "integer",
            ParamKind::Enum { .. } => "enum",
            ParamKind::Bool { .. } => "boolean",
            ParamKind::Text { .. } => "string",
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match *self {
            ParamKind::Float { default, .. } => ParamValue::Float(default),
            ParamKind::Int { default, .. } => ParamValue::Int(default),
            ParamKind::Enum { default, .. } => ParamValue::Enum(default),
            ParamKind::Bool { default } => ParamValue::Bool(default),
            ParamKind::Text { default } => ParamValue::Text(default.to_owned()),
        }
    }
}

/// A named, typed parameter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn new(name: &'static str, label: &'static str, kind: ParamKind) -> Self {
        Self { name, label, kind }
    }

    pub const fn float(
        name: &'static str,
        label: &'static str,
        min: f64,
        max: f64,
        default: f64,
    ) -> Self {
        Self::new(name, label, ParamKind::Float { min, max, default })
    }

    pub const fn int(
        name: &'static str,
        label: &'static str,
        min: i64,
        max: i64,
        default: i64,
    ) -> Self {
        Self::new(name, label, ParamKind::Int { min, max, default })
    }

    pub const fn choice(
        name: &'static str,
        label: &'static str,
        choices: &'static [Choice],
        default: usize,
    ) -> Self {
        Self::new(name, label, ParamKind::Enum { choices, default })
    }

    pub const fn boolean(name: &'static str, label: &'static str, default: bool) -> Self {
        Self::new(name, label, ParamKind::Bool { default })
    }

    pub const fn text(name: &'static str, label: &'static str, default: &'static str) -> Self {
        Self::new(name, label, ParamKind::Text { default })
    }

    /// Coerces `value` to this parameter's type and checks its domain.
    pub fn check(&self, value: ParamValue) -> RunnerResult<ParamValue> {
        let mismatch = || RunnerError::ParameterType {
            name: self.name.to_owned(),
            expected: self.kind.type_name(),
        };
        let out_of_range = |value: f64, min: f64, max: f64| RunnerError::OutOfRange {
            name: self.name.to_owned(),
            value,
            min,
            max,
        };

        match (self.kind, value) {
            (ParamKind::Float { min, max, .. }, value) => {
                let v = match value {
                    ParamValue::Float(v) => v,
                    ParamValue::Int(v) => v as f64,
                    _ => return Err(mismatch()),
                };
                if !(min..=max).contains(&v) {
                    return Err(out_of_range(v, min, max));
                }
                Ok(ParamValue::Float(v))
            }
            (ParamKind::Int { min, max, .. }, ParamValue::Int(v)) => {
                if !(min..=max).contains(&v) {
                    return Err(out_of_range(v as f64, min as f64, max as f64));
                }
                Ok(ParamValue::Int(v))
            }
            (ParamKind::Enum { choices, .. }, ParamValue::Enum(i)) => {
                if i >= choices.len() {
                    return Err(out_of_range(i as f64, 0.0, (choices.len() as f64 - 1.0).max(0.0)));
                }
                Ok(ParamValue::Enum(i))
            }
            (ParamKind::Bool { .. }, v @ ParamValue::Bool(_)) => Ok(v),
            (ParamKind::Text { .. }, v @ ParamValue::Text(_)) => Ok(v),
            _ => Err(mismatch()),
        }
    }

    /// Reads a JSON value for this parameter. Enums take an index or a nick.
    pub fn from_json(&self, value: &Value) -> RunnerResult<ParamValue> {
        let mismatch = || RunnerError::ParameterType {
            name: self.name.to_owned(),
            expected: self.kind.type_name(),
        };
        let parsed = match (self.kind, value) {
            (ParamKind::Float { .. }, Value::Number(n)) => {
                ParamValue::Float(n.as_f64().ok_or_else(mismatch)?)
            }
            (ParamKind::Int { .. }, Value::Number(n)) => match n.as_i64() {
                Some(v) => ParamValue::Int(v),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => ParamValue::Int(f as i64),
                    _ => return Err(mismatch()),
                },
            },
            (ParamKind::Enum { .. }, Value::Number(n)) => {
                ParamValue::Enum(n.as_u64().ok_or_else(mismatch)? as usize)
            }
            (ParamKind::Enum { choices, .. }, Value::String(nick)) => ParamValue::Enum(
                choices
                    .iter()
                    .position(|c| c.nick == nick.as_str())
                    .ok_or_else(mismatch)?,
            ),
            (ParamKind::Bool { .. }, Value::Bool(b)) => ParamValue::Bool(*b),
            (ParamKind::Bool { .. }, Value::Number(n)) => match n.as_u64() {
                Some(0) => ParamValue::Bool(false),
                Some(1) => ParamValue::Bool(true),
                _ => return Err(mismatch()),
            },
            (ParamKind::Text { .. }, Value::String(s)) => ParamValue::Text(s.clone()),
            _ => return Err(mismatch()),
        };
        self.check(parsed)
    }
}

/// A parameter value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Enum(usize),
    Bool(bool),
    Text(String),
}

impl fmt::Display for ParamValue {
    /// Token as it appears in a G'MIC argument list. Floats use six
    /// decimals; text is quoted verbatim, embedded quotes included.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v:.6}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Enum(i) => write!(f, "{i}"),
            ParamValue::Bool(b) => write!(f, "{}", u8::from(*b)),
            ParamValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Current values of one filter's parameters, in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamValues {
    filter: &'static str,
    specs: &'static [ParamSpec],
    values: Vec<ParamValue>,
}

impl ParamValues {
    /// Declared defaults of `specs`.
    pub fn defaults(filter: &'static str, specs: &'static [ParamSpec]) -> Self {
        Self {
            filter,
            specs,
            values: specs.iter().map(|s| s.kind.default_value()).collect(),
        }
    }

    /// Defaults overridden by the members of a JSON object.
    pub fn from_json(
        filter: &'static str,
        specs: &'static [ParamSpec],
        json: &Value,
    ) -> RunnerResult<Self> {
        let mut values = Self::defaults(filter, specs);
        let object = match json {
            Value::Object(map) => map,
            Value::Null => return Ok(values),
            _ => {
                return Err(RunnerError::InvalidParams(
                    "parameters must be a JSON object".into(),
                ));
            }
        };
        for (name, raw) in object {
            let idx = values.position(name)?;
            values.values[idx] = specs[idx].from_json(raw)?;
        }
        Ok(values)
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        let idx = self.specs.iter().position(|s| s.name == name)?;
        self.values.get(idx)
    }

    /// Changes one parameter after checking its type and range.
    pub fn set(&mut self, name: &str, value: ParamValue) -> RunnerResult<()> {
        let idx = self.position(name)?;
        self.values[idx] = self.specs[idx].check(value)?;
        Ok(())
    }

    fn position(&self, name: &str) -> RunnerResult<usize> {
        self.specs
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| RunnerError::UnknownParameter {
                filter: self.filter.to_owned(),
                name: name.to_owned(),
            })
    }
}

/// Comma separated positional argument list.
pub fn encode(values: &ParamValues) -> String {
    values
        .values()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
