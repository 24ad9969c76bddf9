// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::instrument;

use crate::{
    config::QueryConfig,
    query_error::QueryError,
    schema::entity_spec::{Entity, EntitySpec},
    sql::{
        clause::condition::{ConditionClause, LogicalOp},
        expr::Expr,
        parameter::ParameterManager,
        registry::TableRegistry,
        translator::ExpressionTranslator,
    },
};

use super::statement::{Statement, join_clauses};

/// A DELETE over a single table. SQL Server can't alias the target of a plain `DELETE FROM`, so
/// columns are rendered as `Table.Column`.
#[derive(Debug)]
pub struct DeleteQuery {
    config: QueryConfig,
    params: ParameterManager,
    registry: TableRegistry,
    where_clause: ConditionClause,
}

impl DeleteQuery {
    pub fn from<T: Entity>() -> Result<Self, QueryError> {
        Self::from_spec(&T::entity_spec(), QueryConfig::default())
    }

    pub fn from_spec(spec: &EntitySpec, config: QueryConfig) -> Result<Self, QueryError> {
        let params = ParameterManager::new(&config.parameter_prefix);
        Self::new(spec, config, params)
    }

    /// Delete from `T`, continuing the parameter numbering of a previous statement
    pub fn from_with_parameters<T: Entity>(
        params: ParameterManager,
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        Self::new(&T::entity_spec(), config, params)
    }

    fn new(
        spec: &EntitySpec,
        config: QueryConfig,
        params: ParameterManager,
    ) -> Result<Self, QueryError> {
        let mut registry = TableRegistry::new(&config.alias_prefix);
        registry.add_table_spec(spec, None)?;

        Ok(Self {
            config,
            params,
            registry,
            where_clause: ConditionClause::where_clause(),
        })
    }

    pub fn and_where(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.condition(LogicalOp::And, expr)
    }

    pub fn or_where(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.condition(LogicalOp::Or, expr)
    }

    #[instrument(name = "DeleteQuery::compile", skip(self))]
    pub fn compile(&self) -> Result<String, QueryError> {
        let table = self.registry.base_table()?;
        Ok(join_clauses([
            format!("DELETE FROM {}", table.table_name),
            self.where_clause.compile(),
        ]))
    }

    pub fn into_parts(self) -> Result<(String, ParameterManager), QueryError> {
        let sql = self.compile()?;
        Ok((sql, self.params))
    }

    pub fn build(self) -> Result<Statement, QueryError> {
        let (sql, params) = self.into_parts()?;
        Ok(Statement {
            sql,
            params: params.into_parameters(),
        })
    }

    fn condition(&mut self, op: LogicalOp, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = ExpressionTranslator::new(&self.registry, &mut self.params)
            .with_inline_literals(self.config.inline_literals);
        let fragment = translator.translate_for_no_alias_context(&expr)?;
        self.where_clause.push(op, fragment.sql);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        schema::test_helper::{T1, T2},
        sql::{expr::col, function::in_list, value::SqlValue},
    };

    use super::*;

    #[test]
    fn delete_by_key() {
        let mut query = DeleteQuery::from::<T1>().unwrap();
        query.and_where(col::<T1>("PropertyID").eq(42)).unwrap();

        assert_binding!(
            query.build().unwrap().into_sql(),
            "DELETE FROM Table1 WHERE Table1.PropertyID = @p0",
            42
        );
    }

    #[test]
    fn delete_everything() {
        let query = DeleteQuery::from::<T2>().unwrap();
        assert_binding!(query.build().unwrap().into_sql(), "DELETE FROM Table2");
    }

    #[test]
    fn combined_conditions() {
        let mut query = DeleteQuery::from::<T2>().unwrap();
        query
            .and_where(in_list(col::<T2>("Region"), [1, 2]))
            .unwrap()
            .or_where(col::<T2>("Name").eq(SqlValue::Null))
            .unwrap();

        assert_binding!(
            query.build().unwrap().into_sql(),
            "DELETE FROM Table2 WHERE Table2.Region IN (@p0, @p1) OR Table2.Name IS NULL",
            1,
            2
        );
    }

    #[test]
    fn chained_delete_keeps_the_config() {
        let config = QueryConfig {
            inline_literals: true,
            ..QueryConfig::default()
        };
        let mut query =
            DeleteQuery::from_with_parameters::<T2>(ParameterManager::default(), config).unwrap();
        query.and_where(col::<T2>("Region").eq(3)).unwrap();

        assert_binding!(
            query.build().unwrap().into_sql(),
            "DELETE FROM Table2 WHERE Table2.Region = 3"
        );
    }

    #[test]
    fn other_entities_are_rejected() {
        let mut query = DeleteQuery::from::<T1>().unwrap();
        assert!(matches!(
            query.and_where(col::<T2>("Region").eq(1)),
            Err(QueryError::UnknownEntity(_))
        ));
    }
}
