// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::{Deserialize, Serialize};

use crate::{
    query_error::QueryError,
    sql::{expr::Expr, translator::ExpressionTranslator},
};

const ORDER_BY: &str = "ORDER BY";

#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize, Deserialize)]
pub enum Ordering {
    Asc,
    Desc,
}

impl Ordering {
    pub fn keyword(&self) -> &'static str {
        match self {
            Ordering::Asc => "ASC",
            Ordering::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement(pub String, pub Ordering);

/// One page of results. Page indexes start at 1; anything lower is treated as 1. The page size
/// is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PagingFields")]
pub struct Paging {
    page_index: i64,
    page_size: i64,
}

#[derive(Deserialize)]
struct PagingFields {
    page_index: i64,
    page_size: i64,
}

impl TryFrom<PagingFields> for Paging {
    type Error = QueryError;

    fn try_from(fields: PagingFields) -> Result<Self, Self::Error> {
        Paging::new(fields.page_index, fields.page_size)
    }
}

impl Paging {
    pub fn new(page_index: i64, page_size: i64) -> Result<Self, QueryError> {
        if page_size <= 0 {
            return Err(QueryError::invalid_arguments(
                "paging",
                format!("the page size must be positive, got {page_size}"),
            ));
        }
        Ok(Self {
            page_index,
            page_size,
        })
    }

    pub fn page_index(&self) -> i64 {
        self.page_index
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page_index.max(1) - 1).saturating_mul(self.page_size)
    }

    /// Build expression of the form `OFFSET <offset> ROWS FETCH NEXT <size> ROWS ONLY`
    pub fn compile(&self) -> String {
        format!(
            "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
            self.offset(),
            self.page_size
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderByClause {
    elements: Vec<OrderByElement>,
    paging: Option<Paging>,
}

impl OrderByClause {
    /// Order by a column or expression, or by each field of a projection with the same ordering.
    pub fn add(
        &mut self,
        expr: &Expr,
        ordering: Ordering,
        translator: &mut ExpressionTranslator<'_>,
    ) -> Result<(), QueryError> {
        match expr {
            Expr::Projection(_) => {
                for fragment in translator.translate_members(expr, ORDER_BY)? {
                    self.elements.push(OrderByElement(fragment.sql, ordering));
                }
            }
            _ => {
                let fragment = translator.translate(expr)?;
                self.elements.push(OrderByElement(fragment.sql, ordering));
            }
        }
        Ok(())
    }

    pub fn set_paging(&mut self, paging: Paging) {
        self.paging = Some(paging);
    }

    pub fn paging(&self) -> Option<&Paging> {
        self.paging.as_ref()
    }

    pub fn elements(&self) -> &[OrderByElement] {
        &self.elements
    }

    /// `ORDER BY a.X ASC, b.Y DESC[ OFFSET .. ROWS FETCH NEXT .. ROWS ONLY]`. Paging needs an
    /// ordering, so without one `ORDER BY (SELECT NULL)` is emitted.
    pub fn compile(&self) -> String {
        let mut sql = if self.elements.is_empty() {
            match self.paging {
                Some(_) => format!("{ORDER_BY} (SELECT NULL)"),
                None => return String::new(),
            }
        } else {
            let elements: Vec<_> = self
                .elements
                .iter()
                .map(|OrderByElement(sql, ordering)| format!("{sql} {}", ordering.keyword()))
                .collect();
            format!("{ORDER_BY} {}", elements.join(", "))
        };

        if let Some(paging) = &self.paging {
            sql.push(' ');
            sql.push_str(&paging.compile());
        }
        sql
    }
}
