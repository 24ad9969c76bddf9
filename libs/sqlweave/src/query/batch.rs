// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::{debug, instrument};

use crate::sql::{
    parameter::{ParameterManager, ParameterModel},
    sql_type::SqlType,
    value::SqlValue,
};

use super::statement::Statement;

/// Several statements sent as one command text.
///
/// Parameter lists are concatenated in order, so the statements must not reuse each other's bind
/// names: build each one with the manager of the previous one (see
/// [`SelectQuery::from_with_parameters`](super::select::SelectQuery::from_with_parameters)).
#[derive(Debug, Default)]
pub struct StatementBatch {
    statements: Vec<String>,
    params: ParameterManager,
}

impl StatementBatch {
    pub fn push(&mut self, statement: Statement) -> &mut Self {
        self.statements.push(statement.sql);
        self.params.add_many(statement.params);
        self
    }

    /// Append parameterless SQL text
    pub fn push_sql(&mut self, sql: impl Into<String>) -> &mut Self {
        self.statements.push(sql.into());
        self
    }

    /// Append SQL text binding externally named parameters
    pub fn push_raw<'v>(
        &mut self,
        sql: impl Into<String>,
        params: impl IntoIterator<Item = (&'v str, SqlValue, SqlType)>,
    ) -> &mut Self {
        for (name, value, sql_type) in params {
            self.params.add_raw(value, name, sql_type);
        }
        self.statements.push(sql.into());
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn parameters(&self) -> &[ParameterModel] {
        self.params.parameters()
    }

    #[instrument(name = "StatementBatch::build", skip(self))]
    pub fn build(self) -> Statement {
        debug!(
            statements = self.statements.len(),
            parameters = self.params.len(),
            "Built statement batch"
        );
        Statement {
            sql: self.statements.join(";\n"),
            params: self.params.into_parameters(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::QueryConfig,
        query::{delete::DeleteQuery, select::SelectQuery},
        schema::test_helper::{T1, T2},
        sql::expr::col,
    };

    use super::*;

    #[test_log::test]
    fn batch_keeps_numbering_and_order() {
        let mut select = SelectQuery::from::<T1>(Some("a")).unwrap();
        select.and_where(col::<T1>("PropertyID").eq(5)).unwrap();
        let (select_sql, params) = select.into_parts().unwrap();

        let mut delete =
            DeleteQuery::from_with_parameters::<T2>(params, QueryConfig::default()).unwrap();
        delete.and_where(col::<T2>("Region").eq(6)).unwrap();
        let (delete_sql, params) = delete.into_parts().unwrap();

        let mut batch = StatementBatch::default();
        batch
            .push(Statement {
                sql: delete_sql,
                params: params.into_parameters(),
            })
            .push_sql(select_sql)
            .push_raw(
                "UPDATE Table2 SET Name = @name WHERE OwnerID = @owner",
                [
                    ("name", SqlValue::from("Ada"), SqlType::NVarChar),
                    ("owner", SqlValue::from(7), SqlType::Int),
                ],
            );
        assert_eq!(batch.len(), 3);

        assert_binding!(
            batch.build().into_sql(),
            "DELETE FROM Table2 WHERE Table2.Region = @p1;\n\
             SELECT * FROM Table1 AS a WHERE a.PropertyID = @p0;\n\
             UPDATE Table2 SET Name = @name WHERE OwnerID = @owner",
            5,
            6,
            "Ada",
            7
        );
    }

    #[test]
    fn empty_batch() {
        let batch = StatementBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.build().sql, "");
    }
}
