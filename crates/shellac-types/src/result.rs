//! ExecResult: the outcome of running one chain link or a whole line.

use crate::value::Value;

/// Exit code for a link that ran and succeeded.
pub const EXIT_OK: i64 = 0;
/// Exit code for a handler error or a cancelled job.
pub const EXIT_FAILURE: i64 = 1;
/// Exit code for parse errors and argument validation failures.
pub const EXIT_USAGE: i64 = 2;
/// Exit code for an unknown command.
pub const EXIT_NOT_FOUND: i64 = 127;

/// The result of executing a command, or of a chain of commands.
///
/// - `code`: exit code (0 = success)
/// - `out`: text intended for the user (status lines, rendered results)
/// - `err`: error message if failed
/// - `data`: the handler's result value, untouched
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecResult {
    /// Exit code. 0 means success.
    pub code: i64,
    /// Text output.
    pub out: String,
    /// Error text.
    pub err: String,
    /// Handler result value, if the handler produced one.
    pub data: Option<Value>,
}

impl ExecResult {
    /// Create a successful result with output.
    pub fn success(out: impl Into<String>) -> Self {
        Self {
            code: EXIT_OK,
            out: out.into(),
            err: String::new(),
            data: None,
        }
    }

    /// Create a successful result carrying a handler value.
    ///
    /// `out` is the value's display form; `Null` renders as nothing.
    pub fn success_data(data: Value) -> Self {
        let out = data.to_string();
        Self {
            code: EXIT_OK,
            out,
            err: String::new(),
            data: (!data.is_null()).then_some(data),
        }
    }

    /// Create a failed result with an error message.
    pub fn failure(code: i64, err: impl Into<String>) -> Self {
        Self {
            code,
            out: String::new(),
            err: err.into(),
            data: None,
        }
    }

    /// True if the command succeeded (exit code 0).
    pub fn ok(&self) -> bool {
        self.code == EXIT_OK
    }

    /// Fold a later link's result into this one.
    ///
    /// Text is concatenated line-wise; the code and data become the later
    /// link's, since a chain reports the status of the last link that ran.
    pub fn accumulate(&mut self, next: ExecResult) {
        append_line(&mut self.out, &next.out);
        append_line(&mut self.err, &next.err);
        self.code = next.code;
        self.data = next.data;
    }
}

fn append_line(buf: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !buf.is_empty() && !buf.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str(text);
}

impl Default for ExecResult {
    fn default() -> Self {
        Self::success("")
    }
}

/// Convert serde_json::Value to our Value.
///
/// Arrays and objects are preserved as `Value::Json`.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Json(json),
    }
}

/// Convert our Value to serde_json::Value for serialization.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Json(json) => json.clone(),
    }
}
