// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::sql::parameter::ParameterModel;

/// A compiled statement: SQL text with `@name` markers and the parameters to bind, in
/// allocation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<ParameterModel>,
}

impl Statement {
    pub fn into_sql(self) -> (String, Vec<ParameterModel>) {
        (self.sql, self.params)
    }
}

/// Join the non-empty clauses of a statement with single spaces.
pub(crate) fn join_clauses(clauses: impl IntoIterator<Item = String>) -> String {
    clauses
        .into_iter()
        .filter(|clause| !clause.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
