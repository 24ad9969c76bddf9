// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use super::sql_type::{SqlType, ValueType};

/// A mapped property of a registered entity, bound to the alias of its table in one statement.
///
/// Produced once per property when the owning table is registered and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnModel {
    /// The property (and column) name
    pub name: String,
    /// The kind of value the property holds
    pub value_type: ValueType,
    /// Always resolved: either the explicit annotation or inferred from `value_type`
    pub sql_type: SqlType,
    /// `-1` for an unconstrained (`MAX`) length
    pub size: i32,
    pub precision: u8,
    pub scale: u8,
    pub table_alias: String,
}

impl ColumnModel {
    /// The type declaration, e.g. `NVARCHAR(50)`, as used in `CAST` or table variable definitions
    pub fn declaration(&self) -> String {
        self.sql_type
            .declaration(self.size, self.precision, self.scale)
    }
}

impl Display for ColumnModel {
    /// Render as `alias.Name`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table_alias, self.name)
    }
}
