use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Name-keyed values in registration order.
pub type FormValues = IndexMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Text(String),
    Number(Decimal),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by group validators: null, false, zero and empty text or lists are
    /// falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(value) => *value,
            Value::Text(text) => !text.is_empty(),
            Value::Number(number) => !number.is_zero(),
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Length in characters for text, `None` for everything else.
    pub(crate) fn char_len(&self) -> Option<usize> {
        self.as_str().map(|text| text.chars().count())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMessage(String);

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ErrorMessage {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ErrorMessage {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<&str> for ErrorMessage {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Search,
    Password,
    Tel,
    Url,
    Email,
    Number,
    Checkbox,
    Radio,
    Textarea,
    File,
    Select,
    Submit,
    Reset,
}

impl FieldKind {
    /// Kinds whose widgets expose a readable caret position.
    pub fn supports_selection(self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Search
                | FieldKind::Password
                | FieldKind::Tel
                | FieldKind::Url
        )
    }

    pub(crate) fn fallback_value(self, multiple: bool) -> Value {
        if multiple {
            return Value::List(Vec::new());
        }
        match self {
            FieldKind::Checkbox => Value::Bool(false),
            FieldKind::Number => Value::Null,
            _ => Value::Text(String::new()),
        }
    }
}
