//! Executable SQL commands with positional parameters.

use std::fmt;

/// A parameter value bound to a [`SqlCommand`].
///
/// Parameters are referenced from command text as `@0`, `@1`, ... and are
/// always carried separately from the text. This keeps caller-supplied
/// values out of the command string on every path.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Text value.
    Text(String),
}

impl ParamValue {
    /// Renders the value as a row-key string.
    ///
    /// Returns `None` for values that cannot key a row (null, float, bool).
    #[must_use]
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::Int(i) => Some(i.to_string()),
            Self::Text(t) => Some(t.clone()),
            Self::Null | Self::Bool(_) | Self::Float(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An executable command: text plus positionally bound parameters.
///
/// The text references parameters as `@0`, `@1`, ...; the backend resolves
/// each reference against `params` at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    /// The command text.
    pub text: String,
    /// Positionally bound parameters.
    pub params: Vec<ParamValue>,
}

impl SqlCommand {
    /// Creates a new command.
    pub fn new(text: impl Into<String>, params: Vec<ParamValue>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }

    /// Creates a command with no parameters.
    pub fn bare(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

impl fmt::Display for SqlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)?;
        if !self.params.is_empty() {
            write!(f, " [{} params]", self.params.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_key_rendering() {
        assert_eq!(ParamValue::Int(42).as_key().as_deref(), Some("42"));
        assert_eq!(ParamValue::from("abc").as_key().as_deref(), Some("abc"));
        assert!(ParamValue::Null.as_key().is_none());
        assert!(ParamValue::Float(1.5).as_key().is_none());
    }

    #[test]
    fn command_display_mentions_params() {
        let cmd = SqlCommand::new("select data from t where id = @0", vec![ParamValue::Int(1)]);
        assert_eq!(format!("{cmd}"), "select data from t where id = @0 [1 params]");
    }

    #[test]
    fn bare_command_has_no_params() {
        let cmd = SqlCommand::bare("select data from t");
        assert!(cmd.params.is_empty());
    }
}
