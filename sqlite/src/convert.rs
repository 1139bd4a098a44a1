//! Conversion between [`Value`] and SQLite's dynamic values.

use ormlet_core::{DATE_FORMAT, DATETIME_FORMAT, Value};
use rusqlite::types::Value as SqlValue;

use crate::error::{Result, SqliteError};

/// Converts a value into a bindable SQLite parameter.
///
/// Fields hand over storage values already, but temporal values are
/// accepted too and bound as their canonical text.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()),
    }
}

/// Converts a raw column value read from SQLite.
pub(crate) fn from_sql(value: SqlValue) -> Result<Value> {
    match value {
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Integer(i) => Ok(Value::Integer(i)),
        SqlValue::Real(f) => Ok(Value::Float(f)),
        SqlValue::Text(s) => Ok(Value::Text(s)),
        SqlValue::Blob(bytes) => Err(SqliteError::ConversionError(format!(
            "blob columns are not supported ({} bytes)",
            bytes.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_temporal_values_bind_as_text() {
        let date = NaiveDate::from_ymd_opt(2017, 7, 7).unwrap();
        assert_eq!(to_sql(&Value::Date(date)), SqlValue::Text("2017-07-07".into()));
        assert_eq!(
            to_sql(&Value::DateTime(date.and_hms_opt(0, 0, 0).unwrap())),
            SqlValue::Text("2017-07-07 00:00:00".into())
        );
    }

    #[test]
    fn test_from_sql_maps_storage_classes() {
        assert_eq!(from_sql(SqlValue::Integer(4)).unwrap(), Value::Integer(4));
        assert_eq!(from_sql(SqlValue::Real(0.5)).unwrap(), Value::Float(0.5));
        assert_eq!(from_sql(SqlValue::Null).unwrap(), Value::Null);
        assert!(matches!(
            from_sql(SqlValue::Blob(vec![1, 2])),
            Err(SqliteError::ConversionError(_))
        ));
    }
}
