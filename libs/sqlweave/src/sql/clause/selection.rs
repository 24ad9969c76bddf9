// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::debug;

use crate::{
    query_error::QueryError,
    sql::{expr::Expr, registry::TableRegistry, translator::ExpressionTranslator},
};

const SELECT: &str = "SELECT";

/// A plain result type whose field names select the columns of the same name.
pub trait Projection {
    const FIELDS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    /// The output name (`*` for wildcards)
    pub name: String,
    pub sql: String,
}

#[derive(Debug, Clone, Default)]
pub struct SelectClause {
    items: Vec<SelectItem>,
}

impl SelectClause {
    /// Select `expr` as `name`. The `AS [name]` suffix is left out when `expr` is a plain column
    /// already called `name`.
    pub fn add(
        &mut self,
        name: &str,
        expr: &Expr,
        translator: &mut ExpressionTranslator<'_>,
    ) -> Result<(), QueryError> {
        let fragment = translator.translate(expr)?;
        let sql = if fragment.is_column_named(name) {
            fragment.sql
        } else {
            format!("{} AS [{name}]", fragment.sql)
        };

        self.items.push(SelectItem {
            name: name.to_string(),
            sql,
        });
        Ok(())
    }

    /// Select each field of a projection under its own name.
    pub fn add_projection(
        &mut self,
        expr: &Expr,
        translator: &mut ExpressionTranslator<'_>,
    ) -> Result<(), QueryError> {
        let Expr::Projection(fields) = expr else {
            return Err(QueryError::TypeMismatch {
                clause: SELECT,
                expected: "a projection",
            });
        };

        for field in fields {
            self.add(&field.name, &field.expr, translator)?;
        }
        Ok(())
    }

    /// Select `alias.*` for every registered table
    pub fn add_wildcard(&mut self, registry: &TableRegistry) {
        for table in registry.tables() {
            self.items.push(SelectItem {
                name: "*".to_string(),
                sql: format!("{}.*", table.alias),
            });
        }
    }

    /// Select the registered columns with the given names. A name mapped by several tables is
    /// taken from the first registered one; unmatched names are skipped.
    pub fn add_columns(&mut self, names: &[&str], registry: &TableRegistry) {
        for name in names {
            match registry.tables().find_map(|table| table.columns.get(*name)) {
                Some(column) => self.items.push(SelectItem {
                    name: name.to_string(),
                    sql: column.to_string(),
                }),
                None => debug!(column = name, "No registered column to select"),
            }
        }
    }

    pub fn add_columns_of<P: Projection>(&mut self, registry: &TableRegistry) {
        self.add_columns(P::FIELDS, registry);
    }

    /// Select pre-rendered SQL
    pub fn push(&mut self, name: impl Into<String>, sql: impl Into<String>) {
        self.items.push(SelectItem {
            name: name.into(),
            sql: sql.into(),
        });
    }

    pub fn items(&self) -> &[SelectItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn compile(&self) -> String {
        if self.items.is_empty() {
            return format!("{SELECT} *");
        }

        let items: Vec<_> = self.items.iter().map(|item| item.sql.as_str()).collect();
        format!("{SELECT} {}", items.join(", "))
    }
}
