// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use crate::{query_error::QueryError, schema::entity_spec::EntitySpec};

use super::column::ColumnModel;

/// An entity registered in one statement, under one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub entity: String,
    pub table_name: String,
    pub alias: String,
    pub primary_key: Option<String>,
    /// Keyed by property name, in declaration order
    pub columns: IndexMap<String, ColumnModel>,
}

impl TableModel {
    pub fn from_spec(spec: &EntitySpec, alias: &str) -> Result<Self, QueryError> {
        Ok(Self {
            entity: spec.name.clone(),
            table_name: spec.table_name()?.to_string(),
            alias: alias.to_string(),
            primary_key: spec.primary_key.clone(),
            columns: spec.column_models(alias)?,
        })
    }

    pub fn column(&self, property: &str) -> Result<&ColumnModel, QueryError> {
        self.columns
            .get(property)
            .ok_or_else(|| QueryError::UnknownColumn {
                entity: self.entity.clone(),
                column: property.to_string(),
            })
    }

    /// `Table AS alias`, as used in FROM and JOIN clauses
    pub fn aliased_name(&self) -> String {
        format!("{} AS {}", self.table_name, self.alias)
    }
}
