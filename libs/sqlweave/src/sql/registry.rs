// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::DEFAULT_ALIAS_PREFIX,
    query_error::QueryError,
    schema::entity_spec::{Entity, EntitySpec},
};

use super::{column::ColumnModel, join::JoinModel, table::TableModel};

/// The tables of one statement, keyed by entity name, and the joins between them.
///
/// The first registered table is the base of the FROM clause; tables registered through the
/// join methods follow in registration order. Every statement, sub-query included, owns its
/// own registry, so aliases only need to be unique within it.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    alias_prefix: String,
    pub(super) tables: IndexMap<String, TableModel>,
    pub(super) joins: Vec<JoinModel>,
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ALIAS_PREFIX)
    }
}

impl TableRegistry {
    pub fn new(alias_prefix: impl Into<String>) -> Self {
        Self {
            alias_prefix: alias_prefix.into(),
            tables: IndexMap::new(),
            joins: vec![],
        }
    }

    /// Register `T` under `alias`, or under a generated alias if none is given.
    pub fn add_table<T: Entity>(&mut self, alias: Option<&str>) -> Result<&mut Self, QueryError> {
        self.add_table_spec(&T::entity_spec(), alias)
    }

    pub fn add_table_spec(
        &mut self,
        spec: &EntitySpec,
        alias: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        let table = self.prepare_table(spec, alias)?;
        self.insert_table(table);
        Ok(self)
    }

    /// Build the table model for `spec` without registering it yet, checking that neither the
    /// entity nor the alias is taken.
    pub(super) fn prepare_table(
        &self,
        spec: &EntitySpec,
        alias: Option<&str>,
    ) -> Result<TableModel, QueryError> {
        if self.contains_entity(&spec.name) {
            return Err(QueryError::DuplicateEntity(spec.name.clone()));
        }

        let alias = match alias {
            Some(alias) if self.alias_in_use(alias) => {
                return Err(QueryError::DuplicateAlias(alias.to_string()));
            }
            Some(alias) => alias.to_string(),
            None => self.generate_alias(),
        };

        TableModel::from_spec(spec, &alias)
    }

    pub(super) fn insert_table(&mut self, table: TableModel) {
        debug!(
            entity = %table.entity,
            table = %table.table_name,
            alias = %table.alias,
            "Registered table"
        );
        self.tables.insert(table.entity.clone(), table);
    }

    pub fn get_table(&self, entity: &str) -> Result<&TableModel, QueryError> {
        self.tables
            .get(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))
    }

    pub fn get_column(&self, entity: &str, property: &str) -> Result<&ColumnModel, QueryError> {
        self.get_table(entity)?.column(property)
    }

    pub fn contains_entity(&self, entity: &str) -> bool {
        self.tables.contains_key(entity)
    }

    /// The registered tables, base table first
    pub fn tables(&self) -> impl Iterator<Item = &TableModel> {
        self.tables.values()
    }

    pub fn base_table(&self) -> Result<&TableModel, QueryError> {
        self.tables
            .first()
            .map(|(_, table)| table)
            .ok_or(QueryError::NoTableRegistered)
    }

    pub fn joins(&self) -> &[JoinModel] {
        &self.joins
    }

    /// The FROM clause: `FROM Table1 AS a INNER JOIN Table2 AS b ON a.X=b.X ...`
    pub fn compile(&self) -> Result<String, QueryError> {
        let base = self.base_table()?;
        Ok(self.with_joins(format!("FROM {}", base.aliased_name())))
    }

    /// The FROM clause with the base table unaliased, for statements whose columns are rendered
    /// bare or by table name.
    pub fn compile_without_alias(&self) -> Result<String, QueryError> {
        let base = self.base_table()?;
        Ok(self.with_joins(format!("FROM {}", base.table_name)))
    }

    fn with_joins(&self, mut from: String) -> String {
        for join in &self.joins {
            from.push(' ');
            from.push_str(&join.to_string());
        }
        from
    }

    pub(crate) fn alias_in_use(&self, alias: &str) -> bool {
        self.tables.values().any(|table| table.alias == alias)
            || self
                .joins
                .iter()
                .any(|join| join.is_cte_join && join.target_table_alias == alias)
    }

    fn generate_alias(&self) -> String {
        loop {
            let suffix = Uuid::new_v4().simple().to_string();
            let alias = format!("{}{}", self.alias_prefix, &suffix[..8]);
            if !self.alias_in_use(&alias) {
                return alias;
            }
        }
    }
}
