// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query_error::QueryError;

use super::sql_type::ValueType;

/// A literal value appearing in an expression, or bound to a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    TinyInt(u8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Char(char),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    /// A set of values, only meaningful as the right-hand side of a set-membership test
    List(Vec<SqlValue>),
    Json(serde_json::Value),
}

impl SqlValue {
    pub fn list<T: Into<SqlValue>>(values: impl IntoIterator<Item = T>) -> Self {
        SqlValue::List(values.into_iter().map(Into::into).collect())
    }

    /// The kind of this value; `None` for [`SqlValue::Null`], which carries no type of its own.
    pub fn value_type(&self) -> Option<ValueType> {
        let value_type = match self {
            SqlValue::Null => return None,
            SqlValue::Bool(_) => ValueType::Bool,
            SqlValue::TinyInt(_) => ValueType::TinyInt,
            SqlValue::SmallInt(_) => ValueType::SmallInt,
            SqlValue::Int(_) => ValueType::Int,
            SqlValue::BigInt(_) => ValueType::BigInt,
            SqlValue::Real(_) => ValueType::Real,
            SqlValue::Float(_) => ValueType::Float,
            SqlValue::Decimal(_) => ValueType::Decimal,
            SqlValue::String(_) => ValueType::String,
            SqlValue::Char(_) => ValueType::Char,
            SqlValue::Date(_) => ValueType::Date,
            SqlValue::Time(_) => ValueType::Time,
            SqlValue::DateTime(_) => ValueType::DateTime,
            SqlValue::DateTimeOffset(_) => ValueType::DateTimeOffset,
            SqlValue::Uuid(_) => ValueType::Uuid,
            SqlValue::Bytes(_) => ValueType::Bytes,
            SqlValue::List(_) => ValueType::List,
            SqlValue::Json(_) => ValueType::Json,
        };
        Some(value_type)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Is this the zero value of its type? Such values are bound as SQL `NULL`, so that an
    /// omitted value doesn't silently turn into `0` or `false`.
    ///
    /// Strings and byte arrays have no zero value (their default is "absent", which is already
    /// [`SqlValue::Null`]), so an empty string is bound as-is.
    pub fn is_default(&self) -> bool {
        match self {
            SqlValue::Null => true,
            SqlValue::Bool(v) => !v,
            SqlValue::TinyInt(v) => *v == 0,
            SqlValue::SmallInt(v) => *v == 0,
            SqlValue::Int(v) => *v == 0,
            SqlValue::BigInt(v) => *v == 0,
            SqlValue::Real(v) => *v == 0.0,
            SqlValue::Float(v) => *v == 0.0,
            SqlValue::Decimal(v) => v.is_zero(),
            SqlValue::Char(v) => *v == '\0',
            SqlValue::Date(v) => Some(*v) == min_date(),
            SqlValue::Time(v) => Some(*v) == NaiveTime::from_hms_opt(0, 0, 0),
            SqlValue::DateTime(v) => Some(*v) == min_date_time(),
            SqlValue::DateTimeOffset(v) => Some(v.naive_utc()) == min_date_time(),
            SqlValue::Uuid(v) => v.is_nil(),
            SqlValue::String(_) | SqlValue::Bytes(_) | SqlValue::List(_) | SqlValue::Json(_) => {
                false
            }
        }
    }

    /// Render the value as SQL text, for contexts where parameterization is suppressed.
    pub fn to_literal(&self) -> Result<String, QueryError> {
        let literal = match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => (if *v { "1" } else { "0" }).to_string(),
            SqlValue::TinyInt(v) => v.to_string(),
            SqlValue::SmallInt(v) => v.to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::BigInt(v) => v.to_string(),
            SqlValue::Real(v) => finite(v.is_finite(), v.to_string(), ValueType::Real)?,
            SqlValue::Float(v) => finite(v.is_finite(), v.to_string(), ValueType::Float)?,
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::String(v) => quote_unicode(v),
            SqlValue::Char(v) => quote_unicode(&v.to_string()),
            SqlValue::Date(v) => quote(&v.format("%Y-%m-%d").to_string()),
            SqlValue::Time(v) => quote(&v.format("%H:%M:%S%.f").to_string()),
            SqlValue::DateTime(v) => quote(&v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            SqlValue::DateTimeOffset(v) => quote(&v.to_rfc3339()),
            SqlValue::Uuid(v) => quote(&v.hyphenated().to_string()),
            SqlValue::Bytes(v) => {
                let mut hex = String::with_capacity(2 + v.len() * 2);
                hex.push_str("0x");
                for byte in v {
                    let _ = write!(hex, "{byte:02X}");
                }
                hex
            }
            SqlValue::List(values) => values
                .iter()
                .map(SqlValue::to_literal)
                .collect::<Result<Vec<_>, _>>()?
                .join(", "),
            SqlValue::Json(_) => {
                return Err(QueryError::UnsupportedValueType(ValueType::Json.to_string()));
            }
        };

        Ok(literal)
    }
}

/// Quote a string as an SQL literal, doubling any embedded single quotes.
pub fn quote(value: &str) -> String {
    format!("'{}'", escape(value))
}

/// Quote a string as a Unicode (`N'...'`) literal
pub fn quote_unicode(value: &str) -> String {
    format!("N{}", quote(value))
}

pub fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

// T-SQL has no literal for NaN or the infinities.
fn finite(is_finite: bool, value: String, value_type: ValueType) -> Result<String, QueryError> {
    if is_finite {
        Ok(value)
    } else {
        Err(QueryError::UnsupportedValueType(format!(
            "{value_type} (non-finite {value})"
        )))
    }
}

fn min_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1, 1, 1)
}

fn min_date_time() -> Option<NaiveDateTime> {
    Some(min_date()?.and_time(NaiveTime::from_hms_opt(0, 0, 0)?))
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_value!(
    bool => Bool,
    u8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Real,
    f64 => Float,
    Decimal => Decimal,
    &str => String,
    String => String,
    char => Char,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    Uuid => Uuid,
    serde_json::Value => Json,
);

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_are_default() {
        assert!(SqlValue::Int(0).is_default());
        assert!(SqlValue::Bool(false).is_default());
        assert!(SqlValue::Uuid(Uuid::nil()).is_default());
        assert!(SqlValue::Decimal(Decimal::ZERO).is_default());
        assert!(SqlValue::Date(NaiveDate::from_ymd_opt(1, 1, 1).unwrap()).is_default());

        assert!(!SqlValue::Int(99).is_default());
        assert!(!SqlValue::from("").is_default());
        assert!(!SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).is_default());
    }

    #[test]
    fn literals() {
        assert_eq!(SqlValue::Int(42).to_literal().unwrap(), "42");
        assert_eq!(SqlValue::from("O'Hara").to_literal().unwrap(), "N'O''Hara'");
        assert_eq!(SqlValue::Char('é').to_literal().unwrap(), "N'é'");
        assert_eq!(SqlValue::Null.to_literal().unwrap(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_literal().unwrap(), "1");
        assert_eq!(SqlValue::Bytes(vec![0, 171]).to_literal().unwrap(), "0x00AB");
        assert_eq!(
            SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
                .to_literal()
                .unwrap(),
            "'2024-02-29'"
        );
        assert_eq!(
            SqlValue::list([1, 2, 3]).to_literal().unwrap(),
            "1, 2, 3"
        );
        assert!(SqlValue::Json(serde_json::json!({"a": 1})).to_literal().is_err());
    }

    #[test]
    fn non_finite_numbers_have_no_literal() {
        assert_eq!(SqlValue::Float(1.5).to_literal().unwrap(), "1.5");
        assert!(matches!(
            SqlValue::Float(f64::NAN).to_literal(),
            Err(QueryError::UnsupportedValueType(_))
        ));
        assert!(matches!(
            SqlValue::Real(f32::INFINITY).to_literal(),
            Err(QueryError::UnsupportedValueType(_))
        ));
        assert!(SqlValue::Float(f64::NEG_INFINITY).to_literal().is_err());
    }

    #[test]
    fn option_conversion() {
        assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::String("x".into()));
    }
}
