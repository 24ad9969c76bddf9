// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// Builds parameterized SQL Server statements from typed expression trees.
///
/// Entities describe how a type maps to a table (through [Entity] or an [EntityCatalog]
/// loaded at runtime). Conditions, selections, orderings and join predicates are written as
/// [Expr] trees over entity members, and a [SelectQuery] (or [DeleteQuery]) resolves them
/// against the tables registered in the statement. The output is a [Statement]: SQL text with
/// `@p0`, `@p1`, ... markers and the typed [ParameterModel]s to bind, in allocation order.
///
/// Nothing here talks to a database; executing the statement is left to the caller's driver.
pub mod config;
pub mod env;
pub mod query_error;
pub mod schema;
#[macro_use]
pub mod sql;
pub mod query;

/// Public types at the root level of this crate
pub use config::{ConfigError, QueryConfig};
pub use env::{ConfigSource, ProcessEnv, StaticSource};
pub use query::{
    batch::StatementBatch,
    delete::DeleteQuery,
    select::SelectQuery,
    statement::Statement,
    sub_query::{SubQuery, SubQueryKind},
};
pub use query_error::{QueryError, WithContext};
pub use schema::{
    catalog::EntityCatalog,
    entity_spec::{Entity, EntitySpec, PropertySpec},
};
pub use sql::{
    clause::{
        condition::{CompiledSubQuery, LogicalOp, SubQueryPredicate},
        order_by::{Ordering, Paging},
        selection::Projection,
    },
    column::ColumnModel,
    expr::{BinaryOp, ColumnRef, Expr, alias_col, col, entity_col, lit, projection},
    function::{self, LikeMode, MarkerFunction},
    join::{JoinMapper, JoinModel, JoinType},
    parameter::{ParameterManager, ParameterModel},
    registry::TableRegistry,
    sql_type::{SqlType, ValueType},
    table::TableModel,
    value::SqlValue,
};
