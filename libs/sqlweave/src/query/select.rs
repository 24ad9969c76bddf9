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
    query_error::{QueryError, WithContext},
    schema::entity_spec::{Entity, EntitySpec},
    sql::{
        clause::{
            condition::{
                CompiledSubQuery, ConditionClause, EXTERNAL_ALIAS, LogicalOp, SubQueryPredicate,
            },
            group_by::GroupByClause,
            order_by::{OrderByClause, Ordering, Paging},
            selection::{Projection, SelectClause},
        },
        expr::Expr,
        join::{JoinMapper, JoinModel, JoinType},
        parameter::ParameterManager,
        registry::TableRegistry,
        translator::ExpressionTranslator,
    },
};

use super::{
    statement::{Statement, join_clauses},
    sub_query::{SubQuery, SubQueryKind},
};

/// A SELECT statement, assembled clause by clause.
///
/// Clauses are rendered in the fixed order `WITH`, `SELECT`, `FROM`/joins, `WHERE`, `GROUP BY`,
/// `HAVING`, `ORDER BY` (with paging), regardless of the order the builder methods are called
/// in. Parameters are allocated as expressions are added, so their numbering follows the call
/// order.
#[derive(Debug)]
pub struct SelectQuery {
    config: QueryConfig,
    params: ParameterManager,
    registry: TableRegistry,
    ctes: Vec<(String, String)>,
    selection: SelectClause,
    where_clause: ConditionClause,
    group_by: GroupByClause,
    having: ConditionClause,
    order_by: OrderByClause,
}

impl SelectQuery {
    /// Select from `T`, with the default configuration
    pub fn from<T: Entity>(alias: Option<&str>) -> Result<Self, QueryError> {
        Self::with_config::<T>(alias, QueryConfig::default())
    }

    pub fn with_config<T: Entity>(
        alias: Option<&str>,
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        Self::from_spec(&T::entity_spec(), alias, config)
    }

    /// Select from an entity described at runtime (for example, one loaded from an
    /// [`EntityCatalog`](crate::schema::catalog::EntityCatalog))
    pub fn from_spec(
        spec: &EntitySpec,
        alias: Option<&str>,
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        let params = ParameterManager::new(&config.parameter_prefix);
        Self::new(spec, alias, config, params)
    }

    /// Select from `T`, continuing the parameter numbering of a previous statement. Pass the
    /// previous statement's configuration to keep the whole chain consistent.
    pub fn from_with_parameters<T: Entity>(
        alias: Option<&str>,
        params: ParameterManager,
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        Self::new(&T::entity_spec(), alias, config, params)
    }

    fn new(
        spec: &EntitySpec,
        alias: Option<&str>,
        config: QueryConfig,
        params: ParameterManager,
    ) -> Result<Self, QueryError> {
        let mut registry = TableRegistry::new(&config.alias_prefix);
        registry.add_table_spec(spec, alias)?;

        Ok(Self {
            config,
            params,
            registry,
            ctes: vec![],
            selection: SelectClause::default(),
            where_clause: ConditionClause::where_clause(),
            group_by: GroupByClause::default(),
            having: ConditionClause::having(),
            order_by: OrderByClause::default(),
        })
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn parameters(&self) -> &ParameterManager {
        &self.params
    }

    /// Convention join of `T2` onto `T1` (see [`TableRegistry::add_join`])
    pub fn join<T1: Entity, T2: Entity>(
        &mut self,
        join_type: JoinType,
        alias: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        self.registry.add_join::<T1, T2>(join_type, alias)?;
        Ok(self)
    }

    pub fn join_on<T: Entity>(
        &mut self,
        join_type: JoinType,
        alias: Option<&str>,
        on: Expr,
    ) -> Result<&mut Self, QueryError> {
        self.registry
            .add_join_on::<T>(join_type, alias, &on, &mut self.params)?;
        Ok(self)
    }

    pub fn join_with_mapper(
        &mut self,
        configure: impl FnOnce(&mut JoinMapper),
    ) -> Result<&mut Self, QueryError> {
        self.registry.join_with_mapper(configure, &mut self.params)?;
        Ok(self)
    }

    /// Join a CTE on `column`; see [`TableRegistry::add_cte_join`]
    pub fn join_cte(
        &mut self,
        column: Expr,
        join_type: JoinType,
        cte: &str,
    ) -> Result<String, QueryError> {
        self.registry.add_cte_join(&column, join_type, cte)
    }

    pub fn join_cte_on(
        &mut self,
        on: Expr,
        join_type: JoinType,
        cte: &str,
    ) -> Result<JoinModel, QueryError> {
        self.registry.add_cte_join_on(&on, join_type, cte)
    }

    /// Define the common table expression `name` as a sub-query over `T`.
    pub fn with_cte<T: Entity>(
        &mut self,
        name: &str,
        alias: Option<&str>,
        build: impl FnOnce(&mut SubQuery<'_>) -> Result<(), QueryError>,
    ) -> Result<&mut Self, QueryError> {
        if self.ctes.iter().any(|(existing, _)| existing == name) || self.registry.alias_in_use(name)
        {
            return Err(QueryError::DuplicateAlias(name.to_string()));
        }

        let mut sub_query = SubQuery::new(&T::entity_spec(), alias, &mut self.params, &self.config)?;
        build(&mut sub_query)?;
        let sql = sub_query
            .compile()
            .with_context(format!("While compiling CTE `{name}`:"))?;

        self.ctes.push((name.to_string(), sql));
        Ok(self)
    }

    /// Select the fields of a projection, each under its own name
    pub fn select(&mut self, projection: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(&self.registry, &mut self.params, &self.config);
        self.selection.add_projection(&projection, &mut translator)?;
        Ok(self)
    }

    pub fn select_expr(&mut self, name: &str, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(&self.registry, &mut self.params, &self.config);
        self.selection.add(name, &expr, &mut translator)?;
        Ok(self)
    }

    /// Select `alias.*` for every table registered so far
    pub fn select_all(&mut self) -> &mut Self {
        self.selection.add_wildcard(&self.registry);
        self
    }

    /// Select the registered columns named by the fields of `P`
    pub fn select_columns_of<P: Projection>(&mut self) -> &mut Self {
        self.selection.add_columns_of::<P>(&self.registry);
        self
    }

    pub fn and_where(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.condition(LogicalOp::And, expr)
    }

    pub fn or_where(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.condition(LogicalOp::Or, expr)
    }

    /// Require a row of `T` (aliased `ext`) matching `correlation` and, optionally, `condition`.
    /// Both expressions may refer to `T` and to the tables of this statement.
    pub fn where_exists<T: Entity>(
        &mut self,
        op: LogicalOp,
        correlation: Expr,
        condition: Option<Expr>,
    ) -> Result<&mut Self, QueryError> {
        self.exists::<T>(op, false, correlation, condition)
    }

    pub fn where_not_exists<T: Entity>(
        &mut self,
        op: LogicalOp,
        correlation: Expr,
        condition: Option<Expr>,
    ) -> Result<&mut Self, QueryError> {
        self.exists::<T>(op, true, correlation, condition)
    }

    /// Test against a sub-query over `T`, built by `build`.
    pub fn where_sub_query<T: Entity>(
        &mut self,
        op: LogicalOp,
        kind: SubQueryKind,
        alias: Option<&str>,
        build: impl FnOnce(&mut SubQuery<'_>) -> Result<(), QueryError>,
    ) -> Result<&mut Self, QueryError> {
        let predicate = match kind {
            SubQueryKind::In(expr) => SubQueryPredicate::In(self.translate(&expr)?),
            SubQueryKind::NotIn(expr) => SubQueryPredicate::NotIn(self.translate(&expr)?),
            SubQueryKind::Exists => SubQueryPredicate::Exists,
            SubQueryKind::NotExists => SubQueryPredicate::NotExists,
        };

        let mut sub_query = SubQuery::new(&T::entity_spec(), alias, &mut self.params, &self.config)?
            .with_outer(&self.registry);
        build(&mut sub_query)?;
        let compiled = sub_query.into_compiled(predicate)?;

        self.where_clause.add_sub_query(op, &compiled);
        Ok(self)
    }

    /// Embed a sub-query compiled elsewhere
    pub fn where_compiled(&mut self, op: LogicalOp, sub_query: &CompiledSubQuery) -> &mut Self {
        self.where_clause.add_sub_query(op, sub_query);
        self
    }

    pub fn group_by(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(&self.registry, &mut self.params, &self.config);
        self.group_by.add(&expr, &mut translator)?;
        Ok(self)
    }

    pub fn and_having(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.having_condition(LogicalOp::And, expr)
    }

    pub fn or_having(&mut self, expr: Expr) -> Result<&mut Self, QueryError> {
        self.having_condition(LogicalOp::Or, expr)
    }

    pub fn order_by(&mut self, expr: Expr, ordering: Ordering) -> Result<&mut Self, QueryError> {
        let mut translator = translator(&self.registry, &mut self.params, &self.config);
        self.order_by.add(&expr, ordering, &mut translator)?;
        Ok(self)
    }

    /// Return page `page_index` (starting at 1) of `page_size` rows
    pub fn page(&mut self, page_index: i64, page_size: i64) -> Result<&mut Self, QueryError> {
        self.order_by
            .set_paging(Paging::new(page_index, page_size)?);
        Ok(self)
    }

    #[instrument(name = "SelectQuery::compile", skip(self))]
    pub fn compile(&self) -> Result<String, QueryError> {
        let with = if self.ctes.is_empty() {
            String::new()
        } else {
            let ctes: Vec<_> = self
                .ctes
                .iter()
                .map(|(name, sql)| format!("{name} AS ({sql})"))
                .collect();
            format!("WITH {}", ctes.join(", "))
        };

        Ok(join_clauses([
            with,
            self.selection.compile(),
            self.registry.compile()?,
            self.where_clause.compile(),
            self.group_by.compile(),
            self.having.compile(),
            self.order_by.compile(),
        ]))
    }

    /// The SQL text and the parameter manager, to continue numbering in a following statement
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

    fn translate(&mut self, expr: &Expr) -> Result<String, QueryError> {
        let mut translator = translator(&self.registry, &mut self.params, &self.config);
        Ok(translator.translate(expr)?.sql)
    }

    fn condition(&mut self, op: LogicalOp, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(&self.registry, &mut self.params, &self.config);
        self.where_clause.add(op, &expr, &mut translator)?;
        Ok(self)
    }

    fn having_condition(&mut self, op: LogicalOp, expr: Expr) -> Result<&mut Self, QueryError> {
        let mut translator = translator(&self.registry, &mut self.params, &self.config);
        self.having.add(op, &expr, &mut translator)?;
        Ok(self)
    }

    fn exists<T: Entity>(
        &mut self,
        op: LogicalOp,
        negated: bool,
        correlation: Expr,
        condition: Option<Expr>,
    ) -> Result<&mut Self, QueryError> {
        let spec = T::entity_spec();
        let mut external = TableRegistry::new(&self.config.alias_prefix);
        external.add_table_spec(&spec, Some(EXTERNAL_ALIAS))?;

        let mut translator =
            translator(&external, &mut self.params, &self.config).with_outer(&self.registry);
        let correlation = translator.translate(&correlation)?;
        let condition = condition
            .map(|condition| translator.translate(&condition))
            .transpose()?;

        self.where_clause.add_exists(
            op,
            negated,
            external.get_table(&spec.name)?,
            &correlation.sql,
            condition.as_ref().map(|fragment| fragment.sql.as_str()),
        );
        Ok(self)
    }
}

fn translator<'t>(
    registry: &'t TableRegistry,
    params: &'t mut ParameterManager,
    config: &QueryConfig,
) -> ExpressionTranslator<'t> {
    ExpressionTranslator::new(registry, params).with_inline_literals(config.inline_literals)
}
