//! Parameter declarations and the values they resolve to.
//!
//! A command declares its parameters explicitly, in order, with a
//! [`Validator`] per parameter. Nothing is inferred from handler signatures.
//!
//! ```
//! use shellac_kernel::params::{ParamSpec, Validator};
//!
//! let layers = ParamSpec::named("layers", Validator::range(2, 10))
//!     .default(2)
//!     .describe("How many layers to bake");
//! assert!(!layers.required);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use shellac_types::Value;

/// How a parameter is written on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Filled from bare tokens, in declaration order.
    Positional,
    /// `-name value`.
    Named,
    /// `-name`, no value. Resolves to `true` when present.
    Flag,
    /// `-name v1 v2 ...`: one or more values, up to the next option.
    List,
    /// Every token left over after positionals, verbatim.
    Remainder,
}

/// Allowed values for a choice parameter.
#[derive(Clone)]
pub enum ChoiceSet {
    Static(Vec<String>),
    /// Evaluated on every resolution, never cached.
    Dynamic(Arc<dyn Fn() -> Vec<String> + Send + Sync>),
}

impl ChoiceSet {
    /// The allowed values right now.
    pub fn current(&self) -> Vec<String> {
        match self {
            ChoiceSet::Static(values) => values.clone(),
            ChoiceSet::Dynamic(supplier) => supplier(),
        }
    }
}

impl fmt::Debug for ChoiceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceSet::Static(values) => f.debug_tuple("Static").field(values).finish(),
            ChoiceSet::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Converts one raw token into a typed value.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Any non-empty string.
    Text,
    Int,
    Float,
    /// `true` or `false`.
    Bool,
    /// A JSON document.
    Json,
    /// An integer within inclusive bounds. Either bound may be open.
    Range { min: Option<i64>, max: Option<i64> },
    Choices(ChoiceSet),
    /// Flags only: the token's presence is the value.
    Presence,
}

/// Why a raw token was rejected.
///
/// The resolver binds these to a parameter name.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Coercion(String),
    Range { min: Option<i64>, max: Option<i64> },
    Choice { allowed: Vec<String> },
}

impl Validator {
    /// Inclusive integer range.
    pub fn range(min: i64, max: i64) -> Self {
        Validator::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Fixed set of allowed strings.
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Validator::Choices(ChoiceSet::Static(values.into_iter().map(Into::into).collect()))
    }

    /// Allowed strings produced by `supplier` each time a command line is
    /// resolved.
    pub fn dynamic_choices<F>(supplier: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        Validator::Choices(ChoiceSet::Dynamic(Arc::new(supplier)))
    }

    /// Short type name for help output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Validator::Text => "text",
            Validator::Int | Validator::Range { .. } => "int",
            Validator::Float => "float",
            Validator::Bool => "bool",
            Validator::Json => "json",
            Validator::Choices(_) => "choice",
            Validator::Presence => "flag",
        }
    }

    /// Validate one raw token.
    pub fn validate(&self, raw: &str) -> Result<Value, Rejection> {
        match self {
            Validator::Text => {
                if raw.is_empty() {
                    Err(Rejection::Coercion("value cannot be empty".to_string()))
                } else {
                    Ok(Value::String(raw.to_string()))
                }
            }
            Validator::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Rejection::Coercion(format!("\"{}\" is not an integer", raw))),
            Validator::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float)
                .ok_or_else(|| Rejection::Coercion(format!("\"{}\" is not a number", raw))),
            Validator::Bool => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(Rejection::Coercion(format!(
                    "\"{}\" is not a boolean, use true or false",
                    raw
                ))),
            },
            Validator::Json => serde_json::from_str::<serde_json::Value>(raw)
                .map(Value::from)
                .map_err(|e| Rejection::Coercion(format!("invalid JSON: {}", e))),
            Validator::Range { min, max } => {
                let in_range = |n: i64| min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi);
                match raw.trim().parse::<i64>() {
                    Ok(n) if in_range(n) => Ok(Value::Int(n)),
                    _ => Err(Rejection::Range {
                        min: *min,
                        max: *max,
                    }),
                }
            }
            Validator::Choices(set) => {
                let allowed = set.current();
                if allowed.iter().any(|a| a == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(Rejection::Choice { allowed })
                }
            }
            Validator::Presence => Ok(Value::Bool(true)),
        }
    }
}

/// Declaration of one command parameter.
///
/// Required parameters never carry a default; setting a default makes the
/// parameter optional and marking it required drops the default.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub validator: Validator,
    pub description: String,
}

impl ParamSpec {
    fn new(name: impl Into<String>, kind: ParamKind, required: bool, validator: Validator) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            default: None,
            validator,
            description: String::new(),
        }
    }

    /// A required positional parameter.
    pub fn positional(name: impl Into<String>, validator: Validator) -> Self {
        Self::new(name, ParamKind::Positional, true, validator)
    }

    /// An optional `-name value` parameter.
    pub fn named(name: impl Into<String>, validator: Validator) -> Self {
        Self::new(name, ParamKind::Named, false, validator)
    }

    /// A presence-only `-name` flag, `false` when absent.
    pub fn flag(name: impl Into<String>) -> Self {
        let mut spec = Self::new(name, ParamKind::Flag, false, Validator::Presence);
        spec.default = Some(Value::Bool(false));
        spec
    }

    /// An optional `-name v1 v2 ...` parameter taking one or more values,
    /// each checked by `validator`.
    pub fn list(name: impl Into<String>, validator: Validator) -> Self {
        Self::new(name, ParamKind::List, false, validator)
    }

    /// Collects every leftover token as a list of strings.
    pub fn remainder(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Remainder, false, Validator::Text)
    }

    /// Mark the parameter required. Clears any default.
    pub fn required(mut self) -> Self {
        self.required = true;
        self.default = None;
        self
    }

    /// Make the parameter optional with a default.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    /// Make the parameter optional with no default; it is simply absent
    /// from the resolved args when not given.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Help text.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Values the completion engine may offer for this parameter.
    ///
    /// Dynamic choice sets are evaluated on every call.
    pub fn current_choices(&self) -> Option<Vec<String>> {
        match &self.validator {
            Validator::Choices(set) => Some(set.current()),
            Validator::Bool => Some(vec!["true".to_string(), "false".to_string()]),
            _ => None,
        }
    }

    /// True for kinds written as `-name` options.
    pub fn is_option(&self) -> bool {
        matches!(self.kind, ParamKind::Named | ParamKind::Flag | ParamKind::List)
    }

    /// Usage fragment: `<name>`, `-name <int>`, `[-flag]`, `-name <int>...`, `[name...]`.
    pub fn usage(&self) -> String {
        let body = match self.kind {
            ParamKind::Positional => format!("<{}>", self.name),
            ParamKind::Named => format!("-{} <{}>", self.name, self.validator.type_name()),
            ParamKind::Flag => format!("-{}", self.name),
            ParamKind::List => format!("-{} <{}>...", self.name, self.validator.type_name()),
            ParamKind::Remainder => format!("{}...", self.name),
        };
        if self.required {
            body
        } else {
            format!("[{}]", body)
        }
    }
}

/// Resolved arguments handed to a command handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: BTreeMap<String, Value>,
}

impl Args {
    /// Create empty args.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Get a string value. Scalars are rendered.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// True if a flag was given (or a bool parameter is `true`).
    pub fn has_flag(&self, name: &str) -> bool {
        self.get_bool(name).unwrap_or(false)
    }

    /// Get a list parameter's values. Empty if absent.
    pub fn get_values(&self, name: &str) -> Vec<Value> {
        self.get(name).and_then(Value::as_list).unwrap_or_default()
    }

    /// Get a remainder or list parameter's items as strings. Empty if absent.
    pub fn get_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .and_then(Value::as_string_list)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
