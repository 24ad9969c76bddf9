// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    config::QueryConfig,
    query_error::QueryError,
    schema::entity_spec::EntitySpec,
    sql::{
        clause::{
            condition::{CompiledSubQuery, ConditionClause, LogicalOp, SubQueryPredicate},
            group_by::GroupByClause,
            selection::SelectClause,
        },
        expr::Expr,
        parameter::ParameterManager,
        registry::TableRegistry,
        translator::{ColumnRendering, ExpressionTranslator},
    },
};

use super::statement::join_clauses;

/// How a sub-query built by [`SelectQuery::where_sub_query`](super::select::SelectQuery::where_sub_query)
/// is tested.
#[derive(Debug, Clone, PartialEq)]
pub enum SubQueryKind {
    /// `expr IN (sub-query)`
    In(Expr),
    NotIn(Expr),
    Exists,
    NotExists,
}

/// A SELECT over a single table, nested in another statement.
///
/// It owns its registry, so its alias doesn't clash with the enclosing statement's, but
/// allocates parameters from the enclosing statement's manager. Without an alias, the table is
/// left unaliased and its columns rendered bare. Columns of the enclosing statement (given as
/// `outer`) can be referenced for correlation and are rendered qualified.
pub struct SubQuery<'p> {
    params: &'p mut ParameterManager,
    outer: Option<&'p TableRegistry>,
    registry: TableRegistry,
    rendering: ColumnRendering,
    inline_literals: bool,
    selection: SelectClause,
    where_clause: ConditionClause,
    group_by: GroupByClause,
    having: ConditionClause,
}

impl<'p> SubQuery<'p> {
    pub fn new(
        spec: &EntitySpec,
        alias: Option<&str>,
        params: &'p mut ParameterManager,
        config: &QueryConfig,
    ) -> Result<Self, QueryError> {
        let mut registry = TableRegistry::new(&config.alias_prefix);
        registry.add_table_spec(spec, alias)?;

        Ok(Self {
            params,
            outer: None,
            registry,
            rendering: if alias.is_some() {
                ColumnRendering::Qualified
            } else {
                ColumnRendering::Bare
            },
            inline_literals: config.inline_literals,
            selection: SelectClause::default(),
            where_clause: ConditionClause::where_clause(),
            group_by: GroupByClause::default(),
            having: ConditionClause::having(),
        })
    }

    pub fn with_outer(mut self, outer: &'p TableRegistry) -> Self {
        self.outer = Some(outer);
        self
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Select the fields of a projection
    pub fn select(&mut self, projection: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(
            &self.registry,
            self.outer,
            &mut *self.params,
            self.rendering,
            self.inline_literals,
        );
        self.selection.add_projection(&projection, &mut translator)?;
        Ok(self)
    }

    pub fn select_expr(&mut self, name: &str, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(
            &self.registry,
            self.outer,
            &mut *self.params,
            self.rendering,
            self.inline_literals,
        );
        self.selection.add(name, &expr, &mut translator)?;
        Ok(self)
    }

    pub fn select_all(&mut self) -> &mut Self {
        match self.rendering {
            ColumnRendering::Qualified => self.selection.add_wildcard(&self.registry),
            _ => self.selection.push("*", "*"),
        }
        self
    }

    pub fn and_where(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.condition(LogicalOp::And, expr)
    }

    pub fn or_where(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.condition(LogicalOp::Or, expr)
    }

    pub fn group_by(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(
            &self.registry,
            self.outer,
            &mut *self.params,
            self.rendering,
            self.inline_literals,
        );
        self.group_by.add(&expr, &mut translator)?;
        Ok(self)
    }

    pub fn and_having(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(
            &self.registry,
            self.outer,
            &mut *self.params,
            self.rendering,
            self.inline_literals,
        );
        self.having.add(LogicalOp::And, &expr, &mut translator)?;
        Ok(self)
    }

    pub fn compile(&self) -> Result<String, QueryError> {
        let from = match self.rendering {
            ColumnRendering::Qualified => self.registry.compile()?,
            _ => self.registry.compile_without_alias()?,
        };

        Ok(join_clauses([
            self.selection.compile(),
            from,
            self.where_clause.compile(),
            self.group_by.compile(),
            self.having.compile(),
        ]))
    }

    pub fn into_compiled(self, predicate: SubQueryPredicate) -> Result<CompiledSubQuery, QueryError> {
        Ok(CompiledSubQuery {
            sql: self.compile()?,
            predicate,
        })
    }

    fn condition(&mut self, op: LogicalOp, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(
            &self.registry,
            self.outer,
            &mut *self.params,
            self.rendering,
            self.inline_literals,
        );
        let fragment = match self.rendering {
            ColumnRendering::Bare => translator.translate_without_alias(&expr)?,
            _ => translator.translate(&expr)?,
        };
        self.where_clause.push(op, fragment.sql);
        Ok(self)
    }
}

fn translator<'t>(
    registry: &'t TableRegistry,
    outer: Option<&'t TableRegistry>,
    params: &'t mut ParameterManager,
    rendering: ColumnRendering,
    inline_literals: bool,
) -> ExpressionTranslator<'t> {
    let translator = ExpressionTranslator::new(registry, params)
        .with_rendering(rendering)
        .with_inline_literals(inline_literals);
    match outer {
        Some(outer) => translator.with_outer(outer),
        None => translator,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        schema::{
            entity_spec::Entity,
            test_helper::{T1, T2},
        },
        sql::{
            expr::{col, projection},
            function::count_all,
        },
    };

    use super::*;

    #[test]
    fn unaliased_sub_query_renders_bare_columns() {
        let mut outer = TableRegistry::default();
        outer.add_table::<T1>(Some("a")).unwrap();
        let mut params = ParameterManager::default();
        params.add(1, "p").unwrap();

        let mut sub = SubQuery::new(&T2::entity_spec(), None, &mut params, &QueryConfig::default())
            .unwrap()
            .with_outer(&outer);
        sub.select(projection([("PropertyID", col::<T2>("PropertyID"))]))
            .unwrap()
            .and_where(col::<T2>("Region").eq(4))
            .unwrap()
            .and_where(col::<T2>("PropertyID").eq(col::<T1>("PropertyID")))
            .unwrap();

        assert_eq!(
            sub.compile().unwrap(),
            "SELECT PropertyID FROM Table2 WHERE Region = @p1 AND PropertyID = a.PropertyID"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn aliased_sub_query_with_grouping() {
        let mut params = ParameterManager::default();
        let mut sub =
            SubQuery::new(&T2::entity_spec(), Some("s"), &mut params, &QueryConfig::default())
                .unwrap();
        sub.select_expr("Region", col::<T2>("Region"))
            .unwrap()
            .select_expr("Owners", count_all())
            .unwrap()
            .group_by(col::<T2>("Region"))
            .unwrap()
            .and_having(count_all().gt(2))
            .unwrap();

        let compiled = sub.into_compiled(SubQueryPredicate::Exists).unwrap();
        assert_eq!(
            compiled.to_condition(),
            "EXISTS (SELECT s.Region, COUNT(*) AS [Owners] FROM Table2 AS s GROUP BY s.Region \
             HAVING COUNT(*) > @p0)"
        );
    }

    #[test]
    fn wildcards() {
        let mut params = ParameterManager::default();
        let config = QueryConfig::default();

        let mut bare = SubQuery::new(&T2::entity_spec(), None, &mut params, &config).unwrap();
        bare.select_all();
        assert_eq!(bare.compile().unwrap(), "SELECT * FROM Table2");

        let mut aliased = SubQuery::new(&T2::entity_spec(), Some("s"), &mut params, &config).unwrap();
        aliased.select_all();
        assert_eq!(aliased.compile().unwrap(), "SELECT s.* FROM Table2 AS s");
    }

    #[test]
    fn unknown_columns_without_outer() {
        let mut params = ParameterManager::default();
        let mut sub =
            SubQuery::new(&T2::entity_spec(), None, &mut params, &QueryConfig::default()).unwrap();

        assert!(matches!(
            sub.and_where(col::<T1>("PropertyID").eq(1)),
            Err(QueryError::UnknownEntity(_))
        ));
    }
}
