//! Runtime values carried by records and passed to fields.
//!
//! A [`Value`] is either a typed runtime value (what a record holds) or a
//! storage primitive (what a field hands to the driver). Storage values only
//! ever use `Null`, `Integer`, `Float` and `Text`; temporal values are
//! converted to canonical text by [`Field::serialize`](crate::Field::serialize).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::record::Record;

/// Canonical text form of a [`Value::Date`].
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical text form of a [`Value::DateTime`].
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single column value.
///
/// # Examples
///
/// ```
/// use ormlet_core::Value;
///
/// assert_eq!(Value::from(20), Value::Integer(20));
/// assert_eq!(Value::from("hello"), Value::Text("hello".into()));
/// assert_eq!(Value::from(None::<i64>), Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL `NULL`, also the value of an unset attribute.
    #[default]
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Calendar date without time zone.
    Date(NaiveDate),
    /// Date and time without time zone.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A record converts to its primary key, which is how foreign keys and
/// relation filters refer to it.
impl From<&Record> for Value {
    fn from(record: &Record) -> Self {
        record.id().map_or(Value::Null, Value::Integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_canonical_temporal_text() {
        let date = NaiveDate::from_ymd_opt(2017, 7, 7).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2017-07-07");
        let dt = date.and_hms_opt(9, 5, 3).unwrap();
        assert_eq!(Value::DateTime(dt).to_string(), "2017-07-07 09:05:03");
    }

    #[test]
    fn float_accessor_widens_integers() {
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Value::Text("3".into()).as_f64(), None);
    }

    #[test]
    fn option_maps_none_to_null() {
        assert!(Value::from(None::<String>).is_null());
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
