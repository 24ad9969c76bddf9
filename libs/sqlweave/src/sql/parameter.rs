// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::trace;

use crate::{config::DEFAULT_PARAMETER_PREFIX, query_error::QueryError};

use super::{
    column::ColumnModel,
    sql_type::{SqlType, ValueType},
    value::SqlValue,
};

/// The marker preceding every bind name in the SQL text.
pub const PARAMETER_MARKER: char = '@';

/// A bind parameter, as handed to the database driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
    /// The name including the marker, as it appears in the SQL text (`@p0`)
    pub name: String,
    /// The name without the marker (`p0`)
    pub raw_name: String,
    /// The value, or [`SqlValue::Null`] if the supplied value was its type's default
    pub value: SqlValue,
    pub sql_type: SqlType,
    pub size: Option<i32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

/// Owner of the bind parameters of one statement (or one chain of statements).
///
/// Every counter-incrementing `add*` method names the parameter `{prefix}{counter}`, so names
/// are unique and strictly increasing for the lifetime of the manager regardless of which
/// clause asked for them. To keep numbering continuous across concatenated statements, hand the
/// same manager to the next builder.
#[derive(Debug, Clone)]
pub struct ParameterManager {
    default_prefix: String,
    counter: usize,
    parameters: Vec<ParameterModel>,
}

impl Default for ParameterManager {
    fn default() -> Self {
        Self::new(DEFAULT_PARAMETER_PREFIX)
    }
}

impl ParameterManager {
    pub fn new(default_prefix: impl Into<String>) -> Self {
        Self {
            default_prefix: default_prefix.into(),
            counter: 0,
            parameters: vec![],
        }
    }

    /// The prefix used by the translator when no clause-specific prefix is requested
    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// Add a parameter whose SQL type is inferred from the value.
    pub fn add(
        &mut self,
        value: impl Into<SqlValue>,
        prefix: &str,
    ) -> Result<String, QueryError> {
        let value = value.into();
        let value_type = value
            .value_type()
            .ok_or_else(|| QueryError::UnsupportedValueType("null".to_string()))?;
        let sql_type = SqlType::infer(value_type)?;

        Ok(self.push_numbered(value, prefix, sql_type, None, None, None))
    }

    /// Add a parameter compared against (or assigned to) `column`, taking its type, size,
    /// precision and scale from the column.
    pub fn add_for_column(
        &mut self,
        value: impl Into<SqlValue>,
        column: &ColumnModel,
        prefix: &str,
    ) -> Result<String, QueryError> {
        let value = value.into();
        ensure_scalar(&value)?;

        Ok(self.push_numbered(
            value,
            prefix,
            column.sql_type,
            Some(column.size),
            Some(column.precision),
            Some(column.scale),
        ))
    }

    /// Add a parameter with an explicitly chosen SQL type.
    pub fn add_typed(
        &mut self,
        value: impl Into<SqlValue>,
        sql_type: SqlType,
        prefix: &str,
    ) -> Result<String, QueryError> {
        let value = value.into();
        ensure_scalar(&value)?;

        Ok(self.push_numbered(value, prefix, sql_type, None, None, None))
    }

    /// Add an externally named parameter. The counter is left untouched, so the caller is
    /// responsible for the name not clashing with generated ones.
    pub fn add_raw(
        &mut self,
        value: impl Into<SqlValue>,
        raw_name: &str,
        sql_type: SqlType,
    ) -> String {
        let parameter = new_parameter(value.into(), raw_name.to_string(), sql_type, None, None, None);
        let name = parameter.name.clone();
        self.parameters.push(parameter);
        name
    }

    /// Import already-built parameters (for example those of a concatenated statement). The
    /// counter is left untouched.
    pub fn add_many(&mut self, parameters: impl IntoIterator<Item = ParameterModel>) {
        self.parameters.extend(parameters);
    }

    pub fn parameters(&self) -> &[ParameterModel] {
        &self.parameters
    }

    pub fn into_parameters(self) -> Vec<ParameterModel> {
        self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    fn push_numbered(
        &mut self,
        value: SqlValue,
        prefix: &str,
        sql_type: SqlType,
        size: Option<i32>,
        precision: Option<u8>,
        scale: Option<u8>,
    ) -> String {
        let raw_name = format!("{prefix}{}", self.counter);
        self.counter += 1;

        let parameter = new_parameter(value, raw_name, sql_type, size, precision, scale);
        trace!(name = %parameter.name, sql_type = %parameter.sql_type, "Allocated parameter");

        let name = parameter.name.clone();
        self.parameters.push(parameter);
        name
    }
}

fn new_parameter(
    value: SqlValue,
    raw_name: String,
    sql_type: SqlType,
    size: Option<i32>,
    precision: Option<u8>,
    scale: Option<u8>,
) -> ParameterModel {
    let value = if value.is_default() {
        SqlValue::Null
    } else {
        value
    };

    ParameterModel {
        name: format!("{PARAMETER_MARKER}{raw_name}"),
        raw_name,
        value,
        sql_type,
        size,
        precision,
        scale,
    }
}

// Lists and JSON documents can't be bound as one parameter, whatever the target column says.
fn ensure_scalar(value: &SqlValue) -> Result<(), QueryError> {
    match value.value_type() {
        Some(value_type @ (ValueType::List | ValueType::Json)) => {
            Err(QueryError::UnsupportedValueType(value_type.to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use crate::sql::sql_type::ValueType;

    use super::*;

    #[test]
    fn names_are_unique_and_increasing() {
        let mut params = ParameterManager::default();

        assert_eq!(params.add(99, "p").unwrap(), "@p0");
        assert_eq!(params.add("hello", "p").unwrap(), "@p1");
        assert_eq!(params.add(true, "w").unwrap(), "@w2");

        let raw_names: Vec<_> = params.parameters().iter().map(|p| &p.raw_name).collect();
        assert_eq!(raw_names, vec!["p0", "p1", "w2"]);
        assert_eq!(params.parameters()[1].sql_type, SqlType::NVarChar);
    }

    #[test]
    fn default_values_bind_as_null() {
        let mut params = ParameterManager::default();
        params.add(0, "p").unwrap();
        params.add(false, "p").unwrap();
        params.add("", "p").unwrap();

        let parameters = params.parameters();
        assert_eq!(parameters[0].value, SqlValue::Null);
        assert_eq!(parameters[0].sql_type, SqlType::Int);
        assert_eq!(parameters[1].value, SqlValue::Null);
        assert_eq!(parameters[2].value, SqlValue::String(String::new()));
    }

    #[test]
    fn column_metadata_is_copied() {
        let column = ColumnModel {
            name: "Code".to_string(),
            value_type: ValueType::String,
            sql_type: SqlType::VarChar,
            size: 12,
            precision: 38,
            scale: 10,
            table_alias: "a".to_string(),
        };

        let mut params = ParameterManager::default();
        params.add_for_column("X-1", &column, "p").unwrap();

        let parameter = &params.parameters()[0];
        assert_eq!(parameter.sql_type, SqlType::VarChar);
        assert_eq!(parameter.size, Some(12));
    }

    #[test]
    fn raw_and_bulk_additions_keep_the_counter() {
        let mut params = ParameterManager::default();
        assert_eq!(params.add_raw(5, "tenant", SqlType::Int), "@tenant");

        let mut other = ParameterManager::default();
        other.add(7, "q").unwrap();
        params.add_many(other.into_parameters());

        assert_eq!(params.add(8, "p").unwrap(), "@p0");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn unsupported_values() {
        let mut params = ParameterManager::default();

        assert!(matches!(
            params.add(SqlValue::list([1, 2]), "p"),
            Err(QueryError::UnsupportedValueType(_))
        ));
        assert!(matches!(
            params.add(SqlValue::Null, "p"),
            Err(QueryError::UnsupportedValueType(_))
        ));
        assert!(matches!(
            params.add_typed(serde_json::json!([1]), SqlType::NVarChar, "p"),
            Err(QueryError::UnsupportedValueType(_))
        ));
        assert!(params.is_empty());
    }
}
