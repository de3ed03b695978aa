//! Argument resolution: raw tokens in, typed [`Args`] out.
//!
//! Runs before any handler or job exists. A failure here means the command
//! never started, so there is nothing to clean up.

use std::collections::BTreeSet;

use shellac_types::{Value, EXIT_NOT_FOUND, EXIT_USAGE};

use crate::params::{Args, ParamKind, ParamSpec, Rejection};

/// Reserved option accepted by async commands to start in the background.
pub const BACKGROUND_FLAG: &str = "background";

/// Reserved option that shows a command's help instead of running it.
pub const HELP_FLAG: &str = "help";

/// Errors raised while turning a command line into a validated invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown command: {name}")]
    NotFound { name: String },

    #[error("ambiguous command \"{input}\", could be: {}", .candidates.join(", "))]
    Ambiguous { input: String, candidates: Vec<String> },

    #[error("missing required parameter: {param}")]
    MissingRequired { param: String },

    #[error("{param}: {message}")]
    TypeCoercion { param: String, message: String },

    #[error("{param}: \"{value}\" is not an integer in the range {}.", bounds(.min, .max))]
    Range {
        param: String,
        value: String,
        min: Option<i64>,
        max: Option<i64>,
    },

    #[error("{param}: \"{value}\" must be one of {}.", .allowed.join(", "))]
    Choice {
        param: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("duplicate parameter -{param}")]
    DuplicateParameter { param: String },

    #[error("unknown parameter -{param}")]
    UnknownParameter { param: String },

    #[error("unexpected argument \"{value}\"")]
    UnexpectedArgument { value: String },

    #[error("-{param} needs a value")]
    MissingValue { param: String },
}

impl ResolveError {
    /// The parameter this error is bound to, if any.
    pub fn param(&self) -> Option<&str> {
        match self {
            ResolveError::MissingRequired { param }
            | ResolveError::TypeCoercion { param, .. }
            | ResolveError::Range { param, .. }
            | ResolveError::Choice { param, .. }
            | ResolveError::DuplicateParameter { param }
            | ResolveError::UnknownParameter { param }
            | ResolveError::MissingValue { param } => Some(param),
            ResolveError::NotFound { .. }
            | ResolveError::Ambiguous { .. }
            | ResolveError::UnexpectedArgument { .. } => None,
        }
    }

    /// Exit code reported for a link that failed to resolve.
    pub fn exit_code(&self) -> i64 {
        match self {
            ResolveError::NotFound { .. } => EXIT_NOT_FOUND,
            _ => EXIT_USAGE,
        }
    }
}

/// `{2-10}`, with open ends shown as `-inf` and `inf`.
fn bounds(min: &Option<i64>, max: &Option<i64>) -> String {
    let min = min.map_or_else(|| "-inf".to_string(), |n| n.to_string());
    let max = max.map_or_else(|| "inf".to_string(), |n| n.to_string());
    format!("{{{}-{}}}", min, max)
}

/// A validated invocation, ready to hand to a handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invocation {
    pub args: Args,
    /// The `-background` option was given.
    pub background: bool,
    /// `-help` was given. Nothing else was resolved and the command must
    /// not run.
    pub help: bool,
}

/// True for `-name` tokens. Negative numbers and a lone `-` are values.
fn is_option(token: &str) -> bool {
    match token.strip_prefix('-') {
        Some(rest) => !rest.is_empty() && !rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'),
        None => false,
    }
}

fn reject(param: &ParamSpec, raw: &str, rejection: Rejection) -> ResolveError {
    let param_name = param.name.clone();
    match rejection {
        Rejection::Coercion(message) => ResolveError::TypeCoercion {
            param: param_name,
            message,
        },
        Rejection::Range { min, max } => ResolveError::Range {
            param: param_name,
            value: raw.to_string(),
            min,
            max,
        },
        Rejection::Choice { allowed } => ResolveError::Choice {
            param: param_name,
            value: raw.to_string(),
            allowed,
        },
    }
}

fn validate(param: &ParamSpec, raw: &str) -> Result<Value, ResolveError> {
    param.validator.validate(raw).map_err(|r| reject(param, raw, r))
}

/// Bind raw argument tokens to `params`.
///
/// `accepts_background` enables the reserved `-background` option; it is
/// only meaningful for async commands. A parameter of the same name takes
/// precedence over the reserved option.
///
/// Options may appear anywhere before the remainder starts; `--` ends
/// option parsing. A `-help` option stops resolution at that point and
/// returns an invocation with only `help` set, so missing required
/// parameters are not reported. Errors in earlier tokens still are.
pub fn resolve(
    params: &[ParamSpec],
    raw: &[String],
    accepts_background: bool,
) -> Result<Invocation, ResolveError> {
    let positionals: Vec<&ParamSpec> = params
        .iter()
        .filter(|p| p.kind == ParamKind::Positional)
        .collect();
    let remainder = params.iter().find(|p| p.kind == ParamKind::Remainder);

    let mut invocation = Invocation::default();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut next_positional = 0;
    let mut rest: Option<Vec<String>> = None;
    let mut options_done = false;
    let mut tokens = raw.iter().peekable();

    while let Some(token) = tokens.next() {
        if let Some(rest) = rest.as_mut() {
            rest.push(token.clone());
            continue;
        }

        if !options_done && token == "--" {
            options_done = true;
            continue;
        }

        if !options_done && is_option(token) {
            let name = &token[1..];
            let param = params
                .iter()
                .find(|p| p.name == name && p.is_option());

            let Some(param) = param else {
                if name == HELP_FLAG {
                    return Ok(Invocation {
                        help: true,
                        ..Invocation::default()
                    });
                }
                if accepts_background && name == BACKGROUND_FLAG {
                    if invocation.background {
                        return Err(ResolveError::DuplicateParameter {
                            param: name.to_string(),
                        });
                    }
                    invocation.background = true;
                    continue;
                }
                return Err(ResolveError::UnknownParameter {
                    param: name.to_string(),
                });
            };

            if !seen.insert(param.name.as_str()) {
                return Err(ResolveError::DuplicateParameter {
                    param: param.name.clone(),
                });
            }

            let value = match param.kind {
                ParamKind::Flag => Value::Bool(true),
                ParamKind::List => {
                    let mut values = Vec::new();
                    while let Some(raw_value) = tokens.next_if(|t| !is_option(t) && t.as_str() != "--") {
                        values.push(validate(param, raw_value)?);
                    }
                    if values.is_empty() {
                        return Err(ResolveError::MissingValue {
                            param: param.name.clone(),
                        });
                    }
                    Value::list(values)
                }
                _ => {
                    let raw_value = tokens.next().ok_or_else(|| ResolveError::MissingValue {
                        param: param.name.clone(),
                    })?;
                    validate(param, raw_value)?
                }
            };
            invocation.args.insert(param.name.clone(), value);
            continue;
        }

        if let Some(param) = positionals.get(next_positional) {
            next_positional += 1;
            let value = validate(param, token)?;
            seen.insert(param.name.as_str());
            invocation.args.insert(param.name.clone(), value);
        } else if remainder.is_some() {
            rest = Some(vec![token.clone()]);
        } else {
            return Err(ResolveError::UnexpectedArgument {
                value: token.clone(),
            });
        }
    }

    if let (Some(param), Some(rest)) = (remainder, rest) {
        invocation.args.insert(param.name.clone(), Value::string_list(rest));
    }

    for param in params {
        if invocation.args.contains(&param.name) {
            continue;
        }
        if let Some(default) = &param.default {
            invocation.args.insert(param.name.clone(), default.clone());
        } else if param.required {
            return Err(ResolveError::MissingRequired {
                param: param.name.clone(),
            });
        }
    }

    Ok(invocation)
}
