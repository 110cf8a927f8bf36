//! Dynamically typed values flowing through filter chains.
//!
//! A [`Value`] borrows from the page it was selected from (HTML nodes, JSON
//! sub-trees). [`Value::detach`] turns it into a `'static` value that no
//! longer references any page, and [`FromValue`] converts it into a plain
//! Rust type when an item element builds its target object.

use std::borrow::Cow;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::dom::{self, NodeRef};
use crate::error::{Error, Result};

/// Result of a selection or of a filter.
#[derive(Clone)]
pub enum Value<'a> {
    /// No value available.
    Empty,
    Bool(bool),
    Int(i64),
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Duration(TimeDelta),
    /// A JSON value, borrowed from a JSON page or owned.
    Json(Cow<'a, serde_json::Value>),
    /// An ordered HTML selection. May be empty.
    Nodes(Vec<NodeRef<'a>>),
    List(Vec<Value<'a>>),
}

impl<'a> Value<'a> {
    /// Single-node selection.
    #[must_use]
    pub fn node(node: NodeRef<'a>) -> Self {
        Value::Nodes(vec![node])
    }

    /// Borrowed JSON value.
    #[must_use]
    pub fn json(value: &'a serde_json::Value) -> Self {
        Value::Json(Cow::Borrowed(value))
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Json(_) => "json",
            Value::Nodes(_) => "nodes",
            Value::List(_) => "list",
        }
    }

    /// True for `Empty`, JSON `null` and empty selections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Json(v) => v.is_null(),
            Value::Nodes(nodes) => nodes.is_empty(),
            _ => false,
        }
    }

    /// Textual form of the value.
    ///
    /// Nodes give their descendant text fragments, each stripped, joined with
    /// a space. Returns `None` for [`Value::Empty`] and JSON `null`.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Empty => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Decimal(d) => Some(d.to_string()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            Value::Time(t) => Some(t.format("%H:%M:%S").to_string()),
            Value::Duration(d) => Some(d.num_seconds().to_string()),
            Value::Json(v) => match v.as_ref() {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            },
            Value::Nodes(nodes) => Some(
                nodes
                    .iter()
                    .flat_map(dom::iter_text)
                    .map(|t| t.trim().to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            Value::List(items) => Some(
                items
                    .iter()
                    .filter_map(Value::to_text)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    /// Converts the value into one that references no page.
    ///
    /// Nodes become their text (see [`Value::to_text`]); borrowed JSON is
    /// cloned.
    #[must_use]
    pub fn detach(self) -> Value<'static> {
        match self {
            Value::Empty => Value::Empty,
            Value::Bool(b) => Value::Bool(b),
            Value::Int(i) => Value::Int(i),
            Value::Text(s) => Value::Text(s),
            Value::Decimal(d) => Value::Decimal(d),
            Value::Date(d) => Value::Date(d),
            Value::DateTime(dt) => Value::DateTime(dt),
            Value::Time(t) => Value::Time(t),
            Value::Duration(d) => Value::Duration(d),
            Value::Json(v) => Value::Json(Cow::Owned(v.into_owned())),
            nodes @ Value::Nodes(_) => nodes.to_text().map_or(Value::Empty, Value::Text),
            Value::List(items) => Value::List(items.into_iter().map(Value::detach).collect()),
        }
    }

    /// JSON rendering used for output. Decimals are rendered as strings to
    /// keep their exact scale.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Empty => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Int(i) => J::from(*i),
            Value::Json(v) => v.as_ref().clone(),
            Value::List(items) => J::Array(items.iter().map(Value::to_json).collect()),
            other => other.to_text().map_or(J::Null, J::String),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str("Empty"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Decimal(d) => write!(f, "Decimal({d})"),
            Value::Date(d) => write!(f, "Date({d})"),
            Value::DateTime(dt) => write!(f, "DateTime({dt})"),
            Value::Time(t) => write!(f, "Time({t})"),
            Value::Duration(d) => write!(f, "Duration({d})"),
            Value::Json(v) => write!(f, "Json({v})"),
            Value::Nodes(nodes) => {
                let tags: Vec<String> = nodes
                    .iter()
                    .map(|n| dom::tag_name(n).unwrap_or_else(|| "#text".to_string()))
                    .collect();
                write!(f, "Nodes({tags:?})")
            }
            Value::List(items) => f.debug_list().entries(items).finish(),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text().unwrap_or_default())
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Empty, Value::Empty) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (a @ Value::Nodes(x), b @ Value::Nodes(y)) => {
                x.len() == y.len() && a.to_text() == b.to_text()
            }
            _ => false,
        }
    }
}

impl From<&str> for Value<'_> {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value<'_> {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value<'_> {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Decimal> for Value<'_> {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value<'_> {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value<'_> {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<serde_json::Value> for Value<'_> {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(Cow::Owned(v))
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Empty, Into::into)
    }
}

/// Conversion from a [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: Value<'_>) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value<'_>) -> Error {
    Error::parse(
        "FromValue",
        value.to_text().unwrap_or_default(),
        format!("expected {expected}, got {}", value.kind()),
    )
}

impl FromValue for Value<'static> {
    fn from_value(value: Value<'_>) -> Result<Self> {
        Ok(value.detach())
    }
}

impl FromValue for String {
    fn from_value(value: Value<'_>) -> Result<Self> {
        value.to_text().ok_or_else(|| mismatch("text", &value))
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match &value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(i) => Ok(Decimal::from(*i)),
            Value::Json(v) if v.is_number() => {
                Decimal::from_str(&v.to_string()).map_err(|_| mismatch("decimal", &value))
            }
            Value::Text(s) => Decimal::from_str(s.trim()).map_err(|_| mismatch("decimal", &value)),
            _ => Err(mismatch("decimal", &value)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match &value {
            Value::Int(i) => Ok(*i),
            Value::Json(v) => v.as_i64().ok_or_else(|| mismatch("int", &value)),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("int", &value)),
            _ => Err(mismatch("int", &value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Json(v) => v.as_bool().ok_or_else(|| mismatch("bool", &value)),
            _ => Err(mismatch("bool", &value)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match &value {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            _ => Err(mismatch("date", &value)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match &value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            _ => Err(mismatch("datetime", &value)),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match &value {
            Value::Time(t) => Ok(*t),
            Value::DateTime(dt) => Ok(dt.time()),
            _ => Err(mismatch("time", &value)),
        }
    }
}

impl FromValue for TimeDelta {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match &value {
            Value::Duration(d) => Ok(*d),
            _ => Err(mismatch("duration", &value)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value<'_>) -> Result<Self> {
        Ok(value.to_json())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value<'_>) -> Result<Self> {
        if value.is_empty() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value<'_>) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Nodes(nodes) => nodes
                .into_iter()
                .map(|n| T::from_value(Value::node(n)))
                .collect(),
            Value::Json(Cow::Borrowed(serde_json::Value::Array(items))) => items
                .iter()
                .map(|v| T::from_value(Value::json(v)))
                .collect(),
            Value::Json(Cow::Owned(serde_json::Value::Array(items))) => items
                .into_iter()
                .map(|v| T::from_value(Value::from(v)))
                .collect(),
            Value::Empty => Ok(Vec::new()),
            other => Ok(vec![T::from_value(other)?]),
        }
    }
}
