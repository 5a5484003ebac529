//! Typed task arguments.
//!
//! Every argument carries a declared type tag next to its JSON value, so the
//! execution backend can hand workers correctly typed parameters. The tag
//! vocabulary is the one understood by the execution system: scalar numeric
//! widths, `bool`, `string`, and `[]T` slices of any scalar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskError;

/// One typed argument of a task submission.
///
/// # Examples
///
/// ```
/// use taskgate_tasks::TaskArg;
/// use serde_json::json;
///
/// let arg = TaskArg::new("string", json!("hi"));
/// assert!(arg.validate().is_ok());
///
/// let bad = TaskArg::new("int8", json!(300));
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskArg {
    /// Optional argument name, passed through to the worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Declared type tag (`"int64"`, `"string"`, `"[]float64"`, ...).
    #[serde(rename = "type")]
    pub arg_type: String,

    /// The argument value.
    pub value: Value,
}

impl TaskArg {
    /// Creates an unnamed argument.
    pub fn new(arg_type: impl Into<String>, value: Value) -> Self {
        Self {
            name: None,
            arg_type: arg_type.into(),
            value,
        }
    }

    /// Sets the argument name (builder pattern).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parses the declared type tag.
    pub fn parsed_type(&self) -> Result<ArgType, TaskError> {
        self.arg_type.parse()
    }

    /// Checks that the type tag is known and the value conforms to it.
    pub fn validate(&self) -> Result<(), TaskError> {
        let arg_type = self.parsed_type()?;
        if arg_type.accepts(&self.value) {
            Ok(())
        } else {
            Err(TaskError::InvalidRequest(format!(
                "argument value does not match declared type {arg_type}"
            )))
        }
    }
}

/// Validates every argument of a submission, reporting the first bad index.
pub fn validate_args(args: &[TaskArg]) -> Result<(), TaskError> {
    for (index, arg) in args.iter().enumerate() {
        arg.validate().map_err(|e| match e {
            TaskError::InvalidRequest(msg) => {
                TaskError::InvalidRequest(format!("argument {index}: {msg}"))
            },
            other => other,
        })?;
    }
    Ok(())
}

/// Scalar type of an argument or of a slice element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// `bool`
    Bool,
    /// `string`
    String,
    /// Signed integer of the given bit width (`int` is 64).
    Int(u32),
    /// Unsigned integer of the given bit width (`uint` is 64).
    Uint(u32),
    /// Floating point of the given bit width.
    Float(u32),
}

impl ScalarType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::String => value.is_string(),
            Self::Int(bits) => value.as_i64().is_some_and(|n| {
                if bits >= 64 {
                    return true;
                }
                let max = (1i64 << (bits - 1)) - 1;
                let min = -(1i64 << (bits - 1));
                (min..=max).contains(&n)
            }),
            Self::Uint(bits) => value
                .as_u64()
                .is_some_and(|n| bits >= 64 || n <= (1u64 << bits) - 1),
            Self::Float(bits) => value.as_f64().is_some_and(|f| {
                f.is_finite() && (bits >= 64 || f.abs() <= f64::from(f32::MAX))
            }),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Float(bits) => write!(f, "float{bits}"),
        }
    }
}

impl FromStr for ScalarType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scalar = match s {
            "bool" => Self::Bool,
            "string" => Self::String,
            "int" | "int64" => Self::Int(64),
            "int8" => Self::Int(8),
            "int16" => Self::Int(16),
            "int32" => Self::Int(32),
            "uint" | "uint64" => Self::Uint(64),
            "uint8" => Self::Uint(8),
            "uint16" => Self::Uint(16),
            "uint32" => Self::Uint(32),
            "float32" => Self::Float(32),
            "float64" => Self::Float(64),
            other => {
                return Err(TaskError::InvalidRequest(format!(
                    "unsupported argument type: {other}"
                )))
            },
        };
        Ok(scalar)
    }
}

/// Parsed argument type tag: a scalar, or a `[]` slice of one.
///
/// # Examples
///
/// ```
/// use taskgate_tasks::{ArgType, ScalarType};
///
/// let t: ArgType = "[]int32".parse().unwrap();
/// assert_eq!(t, ArgType::Slice(ScalarType::Int(32)));
/// assert_eq!(t.to_string(), "[]int32");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// A single value.
    Scalar(ScalarType),
    /// A JSON array whose elements all have the scalar type.
    Slice(ScalarType),
}

impl ArgType {
    /// Returns `true` if `value` conforms to this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Scalar(scalar) => scalar.accepts(value),
            Self::Slice(scalar) => value
                .as_array()
                .is_some_and(|items| items.iter().all(|item| scalar.accepts(item))),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Slice(scalar) => write!(f, "[]{scalar}"),
        }
    }
}

impl FromStr for ArgType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("[]") {
            Some(inner) => inner.parse().map(Self::Slice),
            None => s.parse().map(Self::Scalar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_scalar_and_slice_tags() {
        assert_eq!(
            "int".parse::<ArgType>().unwrap(),
            ArgType::Scalar(ScalarType::Int(64))
        );
        assert_eq!(
            "[]string".parse::<ArgType>().unwrap(),
            ArgType::Slice(ScalarType::String)
        );
        assert!("map".parse::<ArgType>().is_err());
        assert!("[][]int".parse::<ArgType>().is_err());
    }

    #[test]
    fn integer_widths_are_enforced() {
        assert!(TaskArg::new("int8", json!(127)).validate().is_ok());
        assert!(TaskArg::new("int8", json!(128)).validate().is_err());
        assert!(TaskArg::new("int8", json!(-128)).validate().is_ok());
        assert!(TaskArg::new("uint8", json!(255)).validate().is_ok());
        assert!(TaskArg::new("uint8", json!(-1)).validate().is_err());
        assert!(TaskArg::new("int64", json!(i64::MIN)).validate().is_ok());
        assert!(TaskArg::new("int", json!(1.5)).validate().is_err());
    }

    #[test]
    fn floats_bools_and_strings() {
        assert!(TaskArg::new("float64", json!(1.5)).validate().is_ok());
        assert!(TaskArg::new("float32", json!(3)).validate().is_ok());
        assert!(TaskArg::new("float32", json!(1e300)).validate().is_err());
        assert!(TaskArg::new("bool", json!(true)).validate().is_ok());
        assert!(TaskArg::new("bool", json!("true")).validate().is_err());
        assert!(TaskArg::new("string", json!(1)).validate().is_err());
    }

    #[test]
    fn slices_check_every_element() {
        assert!(TaskArg::new("[]int64", json!([1, 2, 3])).validate().is_ok());
        assert!(TaskArg::new("[]int64", json!([1, "2"])).validate().is_err());
        assert!(TaskArg::new("[]string", json!([])).validate().is_ok());
        assert!(TaskArg::new("[]string", json!("a")).validate().is_err());
    }

    #[test]
    fn validate_args_reports_index() {
        let args = vec![
            TaskArg::new("string", json!("ok")),
            TaskArg::new("int", json!("nope")),
        ];
        let err = validate_args(&args).unwrap_err();
        assert!(err.to_string().contains("argument 1"));
    }

    #[test]
    fn serde_uses_type_key() {
        let arg: TaskArg =
            serde_json::from_value(json!({"type": "string", "value": "hi"})).unwrap();
        assert_eq!(arg.arg_type, "string");
        assert!(arg.name.is_none());

        let json = serde_json::to_value(arg.with_name("greeting")).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["name"], "greeting");
    }
}
