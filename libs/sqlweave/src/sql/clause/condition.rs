// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    query_error::QueryError,
    sql::{
        expr::Expr,
        table::TableModel,
        translator::ExpressionTranslator,
    },
};

/// The alias of the table an EXISTS sub-query ranges over
pub const EXTERNAL_ALIAS: &str = "ext";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// How a compiled sub-query is embedded in a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubQueryPredicate {
    /// `outer IN (sub-query)`, carrying the translated outer operand
    In(String),
    NotIn(String),
    Exists,
    NotExists,
}

/// The text of a compiled sub-query with the predicate it is to be embedded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSubQuery {
    pub sql: String,
    pub predicate: SubQueryPredicate,
}

impl CompiledSubQuery {
    pub fn to_condition(&self) -> String {
        match &self.predicate {
            SubQueryPredicate::In(outer) => format!("{outer} IN ({})", self.sql),
            SubQueryPredicate::NotIn(outer) => format!("{outer} NOT IN ({})", self.sql),
            SubQueryPredicate::Exists => format!("EXISTS ({})", self.sql),
            SubQueryPredicate::NotExists => format!("NOT EXISTS ({})", self.sql),
        }
    }
}

/// A WHERE or HAVING clause: terms joined by AND/OR in the order they were added, without
/// implicit parentheses.
#[derive(Debug, Clone)]
pub struct ConditionClause {
    keyword: &'static str,
    terms: Vec<(Option<LogicalOp>, String)>,
}

impl ConditionClause {
    pub fn where_clause() -> Self {
        Self {
            keyword: "WHERE",
            terms: vec![],
        }
    }

    pub fn having() -> Self {
        Self {
            keyword: "HAVING",
            terms: vec![],
        }
    }

    pub fn keyword(&self) -> &'static str {
        self.keyword
    }

    /// Append an already translated term. The operator of the first term is dropped.
    pub fn push(&mut self, op: LogicalOp, term: impl Into<String>) {
        let op = if self.terms.is_empty() { None } else { Some(op) };
        self.terms.push((op, term.into()));
    }

    pub fn add(
        &mut self,
        op: LogicalOp,
        expr: &Expr,
        translator: &mut ExpressionTranslator<'_>,
    ) -> Result<(), QueryError> {
        let fragment = translator.translate(expr)?;
        self.push(op, fragment.sql);
        Ok(())
    }

    /// Append `[NOT] EXISTS (SELECT 1 FROM {table} AS ext WHERE {correlation}[ AND {condition}])`.
    /// `table` must be registered under [`EXTERNAL_ALIAS`] and the fragments translated against
    /// it.
    pub fn add_exists(
        &mut self,
        op: LogicalOp,
        negated: bool,
        table: &TableModel,
        correlation: &str,
        condition: Option<&str>,
    ) {
        let mut sql = format!(
            "SELECT 1 FROM {} WHERE {correlation}",
            table.aliased_name()
        );
        if let Some(condition) = condition {
            sql.push_str(" AND ");
            sql.push_str(condition);
        }

        let sub_query = CompiledSubQuery {
            sql,
            predicate: if negated {
                SubQueryPredicate::NotExists
            } else {
                SubQueryPredicate::Exists
            },
        };
        self.add_sub_query(op, &sub_query);
    }

    pub fn add_sub_query(&mut self, op: LogicalOp, sub_query: &CompiledSubQuery) {
        self.push(op, sub_query.to_condition());
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[(Option<LogicalOp>, String)] {
        &self.terms
    }

    /// `WHERE t0 AND t1 OR t2`, or an empty string without terms
    pub fn compile(&self) -> String {
        if self.terms.is_empty() {
            return String::new();
        }

        let mut sql = self.keyword.to_string();
        for (op, term) in &self.terms {
            if let Some(op) = op {
                sql.push(' ');
                sql.push_str(op.keyword());
            }
            sql.push(' ');
            sql.push_str(term);
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        schema::test_helper::{T1, T2},
        sql::{expr::col, parameter::ParameterManager, registry::TableRegistry},
    };

    use super::*;

    #[test]
    fn terms_in_order() {
        let mut registry = TableRegistry::default();
        registry.add_table::<T1>(Some("a")).unwrap();
        let mut params = ParameterManager::default();
        let mut translator = ExpressionTranslator::new(&registry, &mut params);

        let mut clause = ConditionClause::where_clause();
        assert_eq!(clause.compile(), "");

        clause
            .add(LogicalOp::Or, &col::<T1>("PropertyID").eq(99), &mut translator)
            .unwrap();
        clause
            .add(LogicalOp::And, &col::<T1>("Address").eq("hello"), &mut translator)
            .unwrap();
        clause.push(LogicalOp::Or, "a.Price > 0");

        assert_eq!(
            clause.compile(),
            "WHERE a.PropertyID = @p0 AND a.Address = @p1 OR a.Price > 0"
        );
        assert_eq!(clause.terms()[0].0, None);
    }

    #[test]
    fn exists_terms() {
        let mut registry = TableRegistry::default();
        registry.add_table::<T2>(Some(EXTERNAL_ALIAS)).unwrap();
        let table = registry.get_table("T2").unwrap();

        let mut clause = ConditionClause::having();
        clause.add_exists(LogicalOp::And, false, table, "ext.PropertyID = a.PropertyID", None);
        clause.add_exists(
            LogicalOp::And,
            true,
            table,
            "ext.PropertyID = a.PropertyID",
            Some("ext.Region = @p0"),
        );

        assert_eq!(
            clause.compile(),
            "HAVING EXISTS (SELECT 1 FROM Table2 AS ext WHERE ext.PropertyID = a.PropertyID) \
             AND NOT EXISTS (SELECT 1 FROM Table2 AS ext WHERE ext.PropertyID = a.PropertyID \
             AND ext.Region = @p0)"
        );
    }

    #[test]
    fn sub_query_predicates() {
        let sub_query = |predicate| CompiledSubQuery {
            sql: "SELECT OwnerID FROM Table2".to_string(),
            predicate,
        };

        assert_eq!(
            sub_query(SubQueryPredicate::In("a.PropertyID".to_string())).to_condition(),
            "a.PropertyID IN (SELECT OwnerID FROM Table2)"
        );
        assert_eq!(
            sub_query(SubQueryPredicate::NotIn("a.PropertyID".to_string())).to_condition(),
            "a.PropertyID NOT IN (SELECT OwnerID FROM Table2)"
        );
        assert_eq!(
            sub_query(SubQueryPredicate::NotExists).to_condition(),
            "NOT EXISTS (SELECT OwnerID FROM Table2)"
        );
    }
}
