//! Value types and conversions for dbset

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// One row as fetched from the backend: column name to value.
///
/// A `BTreeMap` keeps the serialized form canonical, which is what dirty
/// tracking compares.
pub type Row = BTreeMap<String, Value>;

/// Bound statement parameters keyed by placeholder (`:name`).
pub type Params = BTreeMap<String, Value>;

/// Build a [`Row`] from `(column, value)` pairs.
///
/// ```
/// use dbset::value::{row, Value};
///
/// let r = row([("id", Value::Integer(1)), ("name", Value::Text("Ada".into()))]);
/// assert_eq!(r.len(), 2);
/// ```
pub fn row<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Row {
    pairs.into_iter().map(|(column, value)| (column.to_string(), value)).collect()
}

/// The key `row` stores `column` under.
///
/// Column names match ASCII case-insensitively, as SQL identifiers do, since
/// the backend may report `customerId` as `customerid`. An exact match wins.
pub fn column_key<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    if let Some((key, _)) = row.get_key_value(column) {
        return Some(key.as_str());
    }
    row.keys().find(|key| key.eq_ignore_ascii_case(column)).map(String::as_str)
}

/// Value of `column` in `row`, matched like [`column_key`].
pub fn lookup<'a>(row: &'a Row, column: &str) -> Option<&'a Value> {
    match row.get(column) {
        Some(value) => Some(value),
        None => row.iter().find(|(key, _)| key.eq_ignore_ascii_case(column)).map(|(_, value)| value),
    }
}

/// A dynamically typed column value
///
/// These variants map to SQLite's storage classes:
/// - `Integer` maps to INTEGER (64-bit signed)
/// - `Real` maps to REAL (64-bit floating point)
/// - `Text` maps to TEXT (UTF-8 string)
/// - `Blob` maps to BLOB (binary data)
/// - `Null` maps to NULL
///
/// Serialization is untagged, so a row serializes to a plain JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Loose truthiness used for primary keys: `NULL`, zero, `""`, `"0"` and
    /// an empty blob are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Integer(v) => *v != 0,
            Value::Real(v) => *v != 0.0,
            Value::Text(s) => !s.is_empty() && s != "0",
            Value::Blob(b) => !b.is_empty(),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<turso::Value> for Value {
    fn from(value: turso::Value) -> Self {
        match value {
            turso::Value::Null => Value::Null,
            turso::Value::Integer(v) => Value::Integer(v),
            turso::Value::Real(v) => Value::Real(v),
            turso::Value::Text(v) => Value::Text(v),
            turso::Value::Blob(v) => Value::Blob(v),
        }
    }
}

impl From<Value> for turso::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => turso::Value::Null,
            Value::Integer(v) => turso::Value::Integer(v),
            Value::Real(v) => turso::Value::Real(v),
            Value::Text(v) => turso::Value::Text(v),
            Value::Blob(v) => turso::Value::Blob(v),
        }
    }
}

/// Trait for converting Rust types into database values
///
/// Implemented for common Rust types so they can be bound as statement
/// parameters or assigned to record fields.
///
/// # Example
///
/// ```ignore
/// use dbset::IntoValue;
///
/// let value: Value = 42i64.into_value();
/// let text: Value = "hello".into_value();
/// ```
pub trait IntoValue {
    /// Convert this value into a database [`Value`]
    fn into_value(self) -> Value;
}

/// Trait for converting database values into Rust types
///
/// # Example
///
/// ```ignore
/// use dbset::{FromValue, Value};
///
/// let value = Value::Integer(42);
/// let num: i64 = i64::from_value(value)?;
/// ```
pub trait FromValue: Sized {
    /// Convert a database [`Value`] into this type
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to this type,
    /// or if the value is null and this type is not nullable.
    fn from_value(value: Value) -> Result<Self>;

    /// Convert from value, returning the default value for null
    fn from_value_opt(value: Value) -> Result<Self>
    where Self: Default {
        if matches!(value, Value::Null) { Ok(Self::default()) } else { Self::from_value(value) }
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for i16 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for i8 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for u16 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for u8 {
    fn into_value(self) -> Value {
        Value::Integer(self as i64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Real(self as f64)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Blob(self)
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Value {
        Value::Blob(self.to_vec())
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Integer(if self { 1 } else { 0 })
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &Value {
    fn into_value(self) -> Value {
        self.clone()
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(v),
            Value::Real(v) => Ok(v as i64),
            Value::Text(ref s) => {
                s.trim().parse().map_err(|_| Error::TypeConversion { expected: "Integer", actual: format!("{:?}", value) })
            }
            Value::Null => Err(Error::UnexpectedNull),
            other => Err(Error::TypeConversion { expected: "Integer", actual: format!("{:?}", other) }),
        }
    }
}

/// Narrowing integer conversions; out-of-range values are a
/// [`Error::TypeConversion`], never truncated.
macro_rules! impl_from_value_narrowing {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide)
                        .map_err(|_| Error::TypeConversion { expected: stringify!($ty), actual: wide.to_string() })
                }
            }
        )*
    };
}

impl_from_value_narrowing!(i32, i16, i8, u64, u32, u16, u8);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            Value::Null => Err(Error::UnexpectedNull),
            other => Err(Error::TypeConversion { expected: "Real", actual: format!("{:?}", other) }),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Null => Err(Error::UnexpectedNull),
            other => Err(Error::TypeConversion { expected: "Text", actual: format!("{:?}", other) }),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            Value::Null => Err(Error::UnexpectedNull),
            other => Err(Error::TypeConversion { expected: "Blob", actual: format!("{:?}", other) }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(v != 0),
            Value::Null => Err(Error::UnexpectedNull),
            other => Err(Error::TypeConversion { expected: "Integer (boolean)", actual: format!("{:?}", other) }),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn from_value_opt(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

// Optional chrono support
#[cfg(feature = "with-chrono")]
mod chrono_impl {
    use chrono::DateTime;
    use chrono::NaiveDate;
    use chrono::NaiveDateTime;
    use chrono::Utc;

    use super::*;

    impl IntoValue for NaiveDateTime {
        fn into_value(self) -> Value {
            Value::Text(self.format("%Y-%m-%d %H:%M:%S").to_string())
        }
    }

    impl FromValue for NaiveDateTime {
        fn from_value(value: Value) -> Result<Self> {
            match value {
                Value::Text(s) => NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S"))
                    .map_err(|_| Error::TypeConversion { expected: "NaiveDateTime", actual: s }),
                Value::Null => Err(Error::UnexpectedNull),
                other => Err(Error::TypeConversion { expected: "Text (datetime)", actual: format!("{:?}", other) }),
            }
        }
    }

    impl IntoValue for DateTime<Utc> {
        fn into_value(self) -> Value {
            Value::Text(self.format("%Y-%m-%d %H:%M:%S").to_string())
        }
    }

    impl FromValue for DateTime<Utc> {
        fn from_value(value: Value) -> Result<Self> {
            let ndt = NaiveDateTime::from_value(value)?;
            Ok(DateTime::from_naive_utc_and_offset(ndt, Utc))
        }
    }

    impl IntoValue for NaiveDate {
        fn into_value(self) -> Value {
            Value::Text(self.format("%Y-%m-%d").to_string())
        }
    }

    impl FromValue for NaiveDate {
        fn from_value(value: Value) -> Result<Self> {
            match value {
                Value::Text(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|_| Error::TypeConversion { expected: "NaiveDate", actual: s }),
                Value::Null => Err(Error::UnexpectedNull),
                other => Err(Error::TypeConversion { expected: "Text (date)", actual: format!("{:?}", other) }),
            }
        }
    }
}

// Optional UUID support
#[cfg(feature = "with-uuid")]
mod uuid_impl {
    use uuid::Uuid;

    use super::*;

    impl IntoValue for Uuid {
        fn into_value(self) -> Value {
            Value::Text(self.to_string())
        }
    }

    impl FromValue for Uuid {
        fn from_value(value: Value) -> Result<Self> {
            match value {
                Value::Text(s) => {
                    Uuid::parse_str(&s).map_err(|_| Error::TypeConversion { expected: "UUID", actual: s })
                }
                Value::Blob(b) => Uuid::from_slice(&b)
                    .map_err(|_| Error::TypeConversion { expected: "UUID", actual: format!("{:?}", b) }),
                Value::Null => Err(Error::UnexpectedNull),
                other => {
                    Err(Error::TypeConversion { expected: "Text or Blob (UUID)", actual: format!("{:?}", other) })
                }
            }
        }
    }
}

/// Wrapper for columns holding JSON documents as TEXT
#[derive(Clone, Debug, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoValue for Json<T> {
    fn into_value(self) -> Value {
        match serde_json::to_string(&self.0) {
            Ok(s) => Value::Text(s),
            Err(_) => Value::Null,
        }
    }
}

impl<T: serde::de::DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(Json(serde_json::from_str(&s)?)),
            Value::Null => Err(Error::UnexpectedNull),
            other => Err(Error::TypeConversion { expected: "Text (JSON)", actual: format!("{:?}", other) }),
        }
    }
}
