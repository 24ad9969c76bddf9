// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::query_error::QueryError;

/// Size used for variable-length types when no explicit size is given (renders as `MAX`).
pub const DEFAULT_SIZE: i32 = -1;
pub const DEFAULT_PRECISION: u8 = 38;
pub const DEFAULT_SCALE: u8 = 10;

/// The kind of a runtime value, independent of how it maps to SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Bool,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    String,
    Char,
    Date,
    Time,
    DateTime,
    DateTimeOffset,
    Uuid,
    Bytes,
    List,
    Json,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// SQL Server column/parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal,
    Money,
    Char,
    VarChar,
    NChar,
    NVarChar,
    Date,
    Time,
    DateTime,
    DateTime2,
    DateTimeOffset,
    UniqueIdentifier,
    VarBinary,
}

impl SqlType {
    /// The fixed value-type to SQL-type lookup used whenever a column annotation doesn't say
    /// otherwise.
    pub fn infer(value_type: ValueType) -> Result<SqlType, QueryError> {
        let sql_type = match value_type {
            ValueType::Bool => SqlType::Bit,
            ValueType::TinyInt => SqlType::TinyInt,
            ValueType::SmallInt => SqlType::SmallInt,
            ValueType::Int => SqlType::Int,
            ValueType::BigInt => SqlType::BigInt,
            ValueType::Real => SqlType::Real,
            ValueType::Float => SqlType::Float,
            ValueType::Decimal => SqlType::Decimal,
            ValueType::String => SqlType::NVarChar,
            ValueType::Char => SqlType::NChar,
            ValueType::Date => SqlType::Date,
            ValueType::Time => SqlType::Time,
            ValueType::DateTime => SqlType::DateTime2,
            ValueType::DateTimeOffset => SqlType::DateTimeOffset,
            ValueType::Uuid => SqlType::UniqueIdentifier,
            ValueType::Bytes => SqlType::VarBinary,
            ValueType::List | ValueType::Json => {
                return Err(QueryError::UnsupportedValueType(value_type.to_string()));
            }
        };

        Ok(sql_type)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SqlType::Bit => "BIT",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Float => "FLOAT",
            SqlType::Decimal => "DECIMAL",
            SqlType::Money => "MONEY",
            SqlType::Char => "CHAR",
            SqlType::VarChar => "VARCHAR",
            SqlType::NChar => "NCHAR",
            SqlType::NVarChar => "NVARCHAR",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::DateTime => "DATETIME",
            SqlType::DateTime2 => "DATETIME2",
            SqlType::DateTimeOffset => "DATETIMEOFFSET",
            SqlType::UniqueIdentifier => "UNIQUEIDENTIFIER",
            SqlType::VarBinary => "VARBINARY",
        }
    }

    /// Does the declaration take a length (`NVARCHAR(50)`)?
    pub fn is_sized(&self) -> bool {
        matches!(
            self,
            SqlType::Char | SqlType::VarChar | SqlType::NChar | SqlType::NVarChar | SqlType::VarBinary
        )
    }

    /// Render a full type declaration such as `NVARCHAR(MAX)` or `DECIMAL(18, 2)`.
    pub fn declaration(&self, size: i32, precision: u8, scale: u8) -> String {
        if self.is_sized() {
            if size <= 0 {
                format!("{}(MAX)", self.type_name())
            } else {
                format!("{}({size})", self.type_name())
            }
        } else if *self == SqlType::Decimal {
            format!("{}({precision}, {scale})", self.type_name())
        } else {
            self.type_name().to_string()
        }
    }

    /// Parse and normalize a declaration written by hand: a type name optionally followed by
    /// `(n)`, `(MAX)` or `(p, s)`. Anything else is rejected.
    pub fn parse_declaration(declaration: &str) -> Result<String, QueryError> {
        let invalid = || QueryError::UnsupportedValueType(declaration.to_string());
        let declaration = declaration.trim();

        let (name, arguments) = match declaration.split_once('(') {
            Some((name, rest)) => (name, Some(rest.strip_suffix(')').ok_or_else(invalid)?)),
            None => (declaration, None),
        };
        if !name.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        let sql_type: SqlType = name.trim().parse()?;

        let Some(arguments) = arguments else {
            return Ok(sql_type.type_name().to_string());
        };
        let arguments: Vec<_> = arguments.split(',').map(str::trim).collect();
        let valid = match arguments.as_slice() {
            [size] => size.eq_ignore_ascii_case("MAX") || size.parse::<u32>().is_ok(),
            [precision, scale] => precision.parse::<u8>().is_ok() && scale.parse::<u8>().is_ok(),
            _ => false,
        };
        if !valid {
            return Err(invalid());
        }

        let arguments: Vec<_> = arguments
            .iter()
            .map(|argument| argument.to_uppercase())
            .collect();
        Ok(format!("{}({})", sql_type.type_name(), arguments.join(", ")))
    }
}

impl Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for SqlType {
    type Err = QueryError;

    /// Parse a type name as written in a column annotation (case-insensitive, any length
    /// suffix such as `(50)` is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let base = s.split('(').next().unwrap_or_default().trim().to_uppercase();

        let sql_type = match base.as_str() {
            "BIT" => SqlType::Bit,
            "TINYINT" => SqlType::TinyInt,
            "SMALLINT" => SqlType::SmallInt,
            "INT" | "INTEGER" => SqlType::Int,
            "BIGINT" => SqlType::BigInt,
            "REAL" => SqlType::Real,
            "FLOAT" => SqlType::Float,
            "DECIMAL" | "NUMERIC" => SqlType::Decimal,
            "MONEY" => SqlType::Money,
            "CHAR" => SqlType::Char,
            "VARCHAR" => SqlType::VarChar,
            "NCHAR" => SqlType::NChar,
            "NVARCHAR" => SqlType::NVarChar,
            "DATE" => SqlType::Date,
            "TIME" => SqlType::Time,
            "DATETIME" => SqlType::DateTime,
            "DATETIME2" => SqlType::DateTime2,
            "DATETIMEOFFSET" => SqlType::DateTimeOffset,
            "UNIQUEIDENTIFIER" => SqlType::UniqueIdentifier,
            "VARBINARY" => SqlType::VarBinary,
            _ => return Err(QueryError::UnsupportedValueType(s.to_string())),
        };

        Ok(sql_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_table() {
        assert_eq!(SqlType::infer(ValueType::Int).unwrap(), SqlType::Int);
        assert_eq!(SqlType::infer(ValueType::String).unwrap(), SqlType::NVarChar);
        assert_eq!(
            SqlType::infer(ValueType::Uuid).unwrap(),
            SqlType::UniqueIdentifier
        );
        assert!(matches!(
            SqlType::infer(ValueType::Json),
            Err(QueryError::UnsupportedValueType(name)) if name == "Json"
        ));
    }

    #[test]
    fn parse_names() {
        assert_eq!("nvarchar".parse::<SqlType>().unwrap(), SqlType::NVarChar);
        assert_eq!("Decimal(18, 2)".parse::<SqlType>().unwrap(), SqlType::Decimal);
        assert!("geography".parse::<SqlType>().is_err());
    }

    #[test]
    fn declarations() {
        assert_eq!(
            SqlType::NVarChar.declaration(DEFAULT_SIZE, DEFAULT_PRECISION, DEFAULT_SCALE),
            "NVARCHAR(MAX)"
        );
        assert_eq!(SqlType::VarChar.declaration(50, 0, 0), "VARCHAR(50)");
        assert_eq!(SqlType::Decimal.declaration(-1, 18, 2), "DECIMAL(18, 2)");
        assert_eq!(SqlType::Int.declaration(10, 18, 2), "INT");
    }

    #[test]
    fn hand_written_declarations() {
        assert_eq!(SqlType::parse_declaration(" int ").unwrap(), "INT");
        assert_eq!(SqlType::parse_declaration("nvarchar(max)").unwrap(), "NVARCHAR(MAX)");
        assert_eq!(SqlType::parse_declaration("varchar( 20 )").unwrap(), "VARCHAR(20)");
        assert_eq!(SqlType::parse_declaration("decimal(1,1)").unwrap(), "DECIMAL(1, 1)");

        for declaration in [
            "DECIMAL(1,1)); DROP TABLE Table1; --",
            "DECIMAL(1,1) --",
            "INT; DELETE",
            "VARCHAR(MAX, 2)",
            "DECIMAL(1, 2, 3)",
            "VARCHAR()",
            "geography",
        ] {
            assert!(
                matches!(
                    SqlType::parse_declaration(declaration),
                    Err(QueryError::UnsupportedValueType(_))
                ),
                "{declaration}"
            );
        }
    }
}
