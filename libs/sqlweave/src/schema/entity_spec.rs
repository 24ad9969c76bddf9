// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    query_error::QueryError,
    sql::{
        column::ColumnModel,
        sql_type::{DEFAULT_PRECISION, DEFAULT_SCALE, DEFAULT_SIZE, SqlType, ValueType},
    },
};

/// Static description of an entity: the table it maps to and its properties.
///
/// This is the explicit counterpart of annotating a record type. Build it by hand (see the
/// builder methods), deserialize it (see [`EntityCatalog`](super::catalog::EntityCatalog)), or
/// attach it to a Rust type through [`Entity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// The entity name, used to refer to the entity in expressions
    pub name: String,
    /// The table (or table variable) name. Registration fails if missing.
    #[serde(default)]
    pub table_name: Option<String>,
    /// The property used as the key for convention joins
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

/// Per-property annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub value_type: ValueType,
    /// An explicit SQL type name such as `"varchar"`. Takes effect unless `sql_type` is set.
    #[serde(default)]
    pub sql_type_name: Option<String>,
    #[serde(default)]
    pub sql_type: Option<SqlType>,
    #[serde(default)]
    pub size: Option<i32>,
    #[serde(default)]
    pub precision: Option<u8>,
    #[serde(default)]
    pub scale: Option<u8>,
}

/// A Rust type with a static entity description.
pub trait Entity {
    /// The entity name (must match `entity_spec().name`)
    const NAME: &'static str;

    fn entity_spec() -> EntitySpec;
}

impl EntitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            primary_key: None,
            properties: vec![],
        }
    }

    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn primary_key(mut self, property: impl Into<String>) -> Self {
        self.primary_key = Some(property.into());
        self
    }

    pub fn property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    pub fn table_name(&self) -> Result<&str, QueryError> {
        self.table_name
            .as_deref()
            .ok_or_else(|| QueryError::MetadataMissing(self.name.clone()))
    }

    /// Read the property annotations into one column per property, bound to `table_alias`.
    pub fn column_models(
        &self,
        table_alias: &str,
    ) -> Result<IndexMap<String, ColumnModel>, QueryError> {
        let mut columns = IndexMap::with_capacity(self.properties.len());

        for property in &self.properties {
            let column = property
                .column_model(table_alias)
                .map_err(|e| QueryError::InvalidMetadata {
                    entity: self.name.clone(),
                    message: e.to_string(),
                })?;

            if columns.insert(property.name.clone(), column).is_some() {
                return Err(QueryError::InvalidMetadata {
                    entity: self.name.clone(),
                    message: format!("property `{}` is declared more than once", property.name),
                });
            }
        }

        Ok(columns)
    }
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            sql_type_name: None,
            sql_type: None,
            size: None,
            precision: None,
            scale: None,
        }
    }

    pub fn sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    pub fn sql_type_name(mut self, name: impl Into<String>) -> Self {
        self.sql_type_name = Some(name.into());
        self
    }

    pub fn size(mut self, size: i32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    fn resolved_sql_type(&self) -> Result<SqlType, QueryError> {
        match (self.sql_type, &self.sql_type_name) {
            (Some(sql_type), _) => Ok(sql_type),
            (None, Some(name)) => name.parse(),
            (None, None) => SqlType::infer(self.value_type),
        }
    }

    fn column_model(&self, table_alias: &str) -> Result<ColumnModel, QueryError> {
        Ok(ColumnModel {
            name: self.name.clone(),
            value_type: self.value_type,
            sql_type: self.resolved_sql_type()?,
            size: self.size.unwrap_or(DEFAULT_SIZE),
            precision: self.precision.unwrap_or(DEFAULT_PRECISION),
            scale: self.scale.unwrap_or(DEFAULT_SCALE),
            table_alias: table_alias.to_string(),
        })
    }
}
