use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::fmt;
use uuid::Uuid;

/// A single typed column value.
///
/// [`Cell`] covers the scalar Postgres types the engine stages and reads back.
/// `Null` is its own variant rather than an `Option` wrapper so a row is always
/// a uniform `Vec<Cell>` regardless of column nullability.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Cell {
    /// Returns whether this cell holds a SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Returns the value as an `i64` when the cell holds an integer type.
    ///
    /// Used for reading surrogate correlation ids back out of output rows,
    /// which may surface as any integer width depending on the driver.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::I16(value) => Some(i64::from(*value)),
            Cell::I32(value) => Some(i64::from(*value)),
            Cell::I64(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a `&str` when the cell holds text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::I16(value) => write!(f, "{value}"),
            Cell::I32(value) => write!(f, "{value}"),
            Cell::I64(value) => write!(f, "{value}"),
            Cell::F32(value) => write!(f, "{value}"),
            Cell::F64(value) => write!(f, "{value}"),
            Cell::String(value) => write!(f, "{value}"),
            Cell::Bytes(value) => write!(f, "<{} bytes>", value.len()),
            Cell::Uuid(value) => write!(f, "{value}"),
            Cell::Date(value) => write!(f, "{value}"),
            Cell::Time(value) => write!(f, "{value}"),
            Cell::Timestamp(value) => write!(f, "{value}"),
            Cell::TimestampTz(value) => write!(f, "{value}"),
            Cell::Json(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_i64_widens_integers() {
        assert_eq!(Cell::I16(7).as_i64(), Some(7));
        assert_eq!(Cell::I32(7).as_i64(), Some(7));
        assert_eq!(Cell::I64(7).as_i64(), Some(7));
        assert_eq!(Cell::String("7".to_string()).as_i64(), None);
        assert_eq!(Cell::Null.as_i64(), None);
    }

    #[test]
    fn test_null_detection() {
        assert!(Cell::Null.is_null());
        assert!(!Cell::Bool(false).is_null());
    }
}
