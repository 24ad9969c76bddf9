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
    sql::{expr::Expr, translator::ExpressionTranslator},
};

const GROUP_BY: &str = "GROUP BY";

#[derive(Debug, Clone, Default)]
pub struct GroupByClause {
    columns: Vec<String>,
}

impl GroupByClause {
    /// Group by a member, or by each member of a projection in declaration order.
    pub fn add(
        &mut self,
        expr: &Expr,
        translator: &mut ExpressionTranslator<'_>,
    ) -> Result<(), QueryError> {
        let fragments = translator.translate_members(expr, GROUP_BY)?;
        self.columns
            .extend(fragments.into_iter().map(|fragment| fragment.sql));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn compile(&self) -> String {
        if self.columns.is_empty() {
            String::new()
        } else {
            format!("{GROUP_BY} {}", self.columns.join(", "))
        }
    }
}
