//! Step-function arguments: positional values plus keyword values.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

/// A single argument value passed to a step function.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Free-form text.
    Text(String),
}

impl ArgValue {
    /// Integer value, if this is an [`ArgValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean value, if this is an [`ArgValue::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value, if this is an [`ArgValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Positional and keyword arguments bound into a step profile.
///
/// Keyword order is preserved, so two argument sets built in the same
/// order render identically. Equality ignores keyword order.
#[derive(Clone, Debug, Default)]
pub struct StepArgs {
    positional: SmallVec<[ArgValue; 4]>,
    keyword: IndexMap<String, ArgValue>,
}

impl StepArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument (builder style).
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument (builder style).
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Positional argument at `index`.
    pub fn positional(&self, index: usize) -> Option<&ArgValue> {
        self.positional.get(index)
    }

    /// Keyword argument `name`.
    pub fn keyword(&self, name: &str) -> Option<&ArgValue> {
        self.keyword.get(name)
    }

    /// Keyword `name`, else positional `index`.
    ///
    /// Lets step functions accept an argument either way.
    pub fn lookup(&self, name: &str, index: usize) -> Option<&ArgValue> {
        self.keyword(name).or_else(|| self.positional(index))
    }

    /// All positional arguments in order.
    pub fn positionals(&self) -> &[ArgValue] {
        &self.positional
    }

    /// All keyword arguments in insertion order.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.keyword.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether there are no arguments at all.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl PartialEq for StepArgs {
    fn eq(&self, other: &Self) -> bool {
        self.positional == other.positional
            && self.keyword.len() == other.keyword.len()
            && self
                .keyword
                .iter()
                .all(|(k, v)| other.keyword.get(k) == Some(v))
    }
}

impl fmt::Display for StepArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{value}")?;
        }
        for (name, value) in &self.keyword {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
