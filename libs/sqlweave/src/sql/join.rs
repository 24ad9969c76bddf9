// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    query_error::QueryError,
    schema::entity_spec::{Entity, EntitySpec},
};

use super::{
    column::ColumnModel,
    expr::{BinaryOp, Expr},
    parameter::ParameterManager,
    registry::TableRegistry,
    table::TableModel,
    translator::{ExpressionTranslator, Fragment},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    pub fn keyword(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

/// The second equality of a two-part join condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeCondition {
    /// `left=right`, where `right` belongs to the table aliased `target_alias`
    Columns {
        left: String,
        right: String,
        target_alias: String,
    },
    /// `left=value`, where `value` is a bind marker (or an inlined literal)
    Constant { left: String, value: String },
}

/// A resolved join, rendered after the base table of the FROM clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinModel {
    pub join_type: JoinType,
    /// Rendered left side of the first equality, e.g. `a.PropertyID`
    pub left_column: String,
    /// Rendered right side of the first equality, e.g. `b.PropertyID`
    pub right_column: String,
    pub left_table_alias: String,
    /// The alias of the registered table on the right; `None` for CTE joins
    pub right_table_alias: Option<String>,
    /// The table name, or the CTE name for CTE joins
    pub target_table: String,
    pub target_table_alias: String,
    pub is_cte_join: bool,
    pub composite: Option<CompositeCondition>,
}

impl JoinModel {
    pub fn is_composite(&self) -> bool {
        self.composite.is_some()
    }

    pub fn is_composite_constant(&self) -> bool {
        matches!(self.composite, Some(CompositeCondition::Constant { .. }))
    }
}

impl Display for JoinModel {
    /// `INNER JOIN Table2 AS b ON a.X=b.X[ AND l=r]`, or `INNER JOIN cte ON a.X=cte.X` for a
    /// CTE join
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ", self.join_type.keyword())?;
        if self.is_cte_join {
            f.write_str(&self.target_table)?;
        } else {
            write!(f, "{} AS {}", self.target_table, self.target_table_alias)?;
        }
        write!(f, " ON {}={}", self.left_column, self.right_column)?;

        match &self.composite {
            Some(CompositeCondition::Columns { left, right, .. }) => {
                write!(f, " AND {left}={right}")
            }
            Some(CompositeCondition::Constant { left, value }) => {
                write!(f, " AND {left}={value}")
            }
            None => Ok(()),
        }
    }
}

/// An unresolved join request, queued on a [`JoinMapper`].
#[derive(Debug, Clone)]
pub struct JoinMap {
    pub join_type: JoinType,
    pub left: EntitySpec,
    pub right: EntitySpec,
    pub alias: Option<String>,
    pub use_convention_key: bool,
    pub join_expression: Option<Expr>,
}

/// Collects join requests to be resolved together by [`TableRegistry::join_with_mapper`].
#[derive(Debug, Clone, Default)]
pub struct JoinMapper {
    maps: Vec<JoinMap>,
}

impl JoinMapper {
    /// Queue a convention join of `T2` onto `T1`
    pub fn join<T1: Entity, T2: Entity>(
        &mut self,
        join_type: JoinType,
        alias: Option<&str>,
    ) -> &mut Self {
        self.maps.push(JoinMap {
            join_type,
            left: T1::entity_spec(),
            right: T2::entity_spec(),
            alias: alias.map(str::to_string),
            use_convention_key: true,
            join_expression: None,
        });
        self
    }

    /// Queue a join of `T2` onto `T1` on an explicit condition
    pub fn join_on<T1: Entity, T2: Entity>(
        &mut self,
        join_type: JoinType,
        alias: Option<&str>,
        on: Expr,
    ) -> &mut Self {
        self.maps.push(JoinMap {
            join_type,
            left: T1::entity_spec(),
            right: T2::entity_spec(),
            alias: alias.map(str::to_string),
            use_convention_key: false,
            join_expression: Some(on),
        });
        self
    }

    pub fn maps(&self) -> &[JoinMap] {
        &self.maps
    }
}

const JOIN: &str = "JOIN";

impl TableRegistry {
    /// Join `T2` onto the registered `T1` on `T1`'s primary key, which `T2` must also map under
    /// the same property name.
    pub fn add_join<T1: Entity, T2: Entity>(
        &mut self,
        join_type: JoinType,
        alias: Option<&str>,
    ) -> Result<&mut Self, QueryError> {
        self.convention_join(&T1::entity_spec(), &T2::entity_spec(), join_type, alias)?;
        Ok(self)
    }

    /// Join `T` on an explicit condition: one equality between a column of `T` and a registered
    /// column, optionally AND-ed with a second equality against another column or a constant.
    pub fn add_join_on<T: Entity>(
        &mut self,
        join_type: JoinType,
        alias: Option<&str>,
        on: &Expr,
        params: &mut ParameterManager,
    ) -> Result<&mut Self, QueryError> {
        let target = self.prepare_table(&T::entity_spec(), alias)?;
        self.condition_join(target, join_type, on, params)?;
        Ok(self)
    }

    /// Join the CTE `cte` on the column `column`, assumed to exist in the CTE under the same
    /// name. Returns that name.
    pub fn add_cte_join(
        &mut self,
        column: &Expr,
        join_type: JoinType,
        cte: &str,
    ) -> Result<String, QueryError> {
        let member = column.as_member().ok_or_else(|| {
            QueryError::UnsupportedJoinShape("a CTE join needs an entity member".to_string())
        })?;
        let column = self.get_column(&member.entity, &member.property)?.clone();

        let join = self.cte_join(&column, format!("{cte}.{}", column.name), join_type, cte)?;
        self.push_join(join);
        Ok(column.name)
    }

    /// Join the CTE `cte` on an equality between an entity column and a column of the CTE
    /// (an [`Expr::AliasColumn`] aliased `cte`).
    pub fn add_cte_join_on(
        &mut self,
        on: &Expr,
        join_type: JoinType,
        cte: &str,
    ) -> Result<JoinModel, QueryError> {
        let (left, right) = equality(on).ok_or_else(|| {
            QueryError::UnsupportedJoinShape("a CTE join needs one equality".to_string())
        })?;

        let cte_column = |expr: &Expr| match expr {
            Expr::AliasColumn { alias, name } if alias == cte => Some(format!("{alias}.{name}")),
            _ => None,
        };
        let (member, cte_side) = match (left.as_member(), cte_column(right)) {
            (Some(member), Some(cte_side)) => (member, cte_side),
            _ => match (right.as_member(), cte_column(left)) {
                (Some(member), Some(cte_side)) => (member, cte_side),
                _ => {
                    return Err(QueryError::UnsupportedJoinShape(format!(
                        "a CTE join must compare an entity member with a column of `{cte}`"
                    )));
                }
            },
        };
        let column = self.get_column(&member.entity, &member.property)?.clone();

        let join = self.cte_join(&column, cte_side, join_type, cte)?;
        self.push_join(join.clone());
        Ok(join)
    }

    /// Resolve the joins queued by `configure`, in order.
    pub fn join_with_mapper(
        &mut self,
        configure: impl FnOnce(&mut JoinMapper),
        params: &mut ParameterManager,
    ) -> Result<&mut Self, QueryError> {
        let mut mapper = JoinMapper::default();
        configure(&mut mapper);

        for map in mapper.maps {
            self.get_table(&map.left.name)?;

            match (map.use_convention_key, map.join_expression) {
                (true, _) => {
                    self.convention_join(&map.left, &map.right, map.join_type, map.alias.as_deref())?
                }
                (false, Some(on)) => {
                    let target = self.prepare_table(&map.right, map.alias.as_deref())?;
                    self.condition_join(target, map.join_type, &on, params)?;
                }
                (false, None) => {
                    return Err(QueryError::UnsupportedJoinShape(format!(
                        "the join of `{}` has neither a condition nor a convention key",
                        map.right.name
                    )));
                }
            }
        }

        Ok(self)
    }

    fn convention_join(
        &mut self,
        left: &EntitySpec,
        right: &EntitySpec,
        join_type: JoinType,
        alias: Option<&str>,
    ) -> Result<(), QueryError> {
        let key = left
            .primary_key
            .as_deref()
            .ok_or_else(|| QueryError::MissingPrimaryKey(left.name.clone()))?;
        let left_column = self.get_column(&left.name, key)?.clone();

        let target = self.prepare_table(right, alias)?;
        let right_column = target.column(key)?.clone();

        let join = JoinModel {
            join_type,
            left_column: left_column.to_string(),
            right_column: right_column.to_string(),
            left_table_alias: left_column.table_alias,
            right_table_alias: Some(target.alias.clone()),
            target_table: target.table_name.clone(),
            target_table_alias: target.alias.clone(),
            is_cte_join: false,
            composite: None,
        };

        self.insert_table(target);
        self.push_join(join);
        Ok(())
    }

    // The target is registered while the condition is translated, so that its columns resolve,
    // and removed again if the condition is rejected.
    fn condition_join(
        &mut self,
        target: TableModel,
        join_type: JoinType,
        on: &Expr,
        params: &mut ParameterManager,
    ) -> Result<(), QueryError> {
        let entity = target.entity.clone();
        let alias = target.alias.clone();
        self.insert_table(target);

        match self.join_condition(&alias, join_type, on, params) {
            Ok(join) => {
                self.push_join(join);
                Ok(())
            }
            Err(e) => {
                self.tables.shift_remove(&entity);
                Err(e)
            }
        }
    }

    fn join_condition(
        &self,
        target_alias: &str,
        join_type: JoinType,
        on: &Expr,
        params: &mut ParameterManager,
    ) -> Result<JoinModel, QueryError> {
        let (first, second) = split_condition(on)?;
        let mut translator = ExpressionTranslator::new(self, params);

        let (left, right) = first;
        let (left, right) = (translator.translate(left)?, translator.translate(right)?);
        let joined_on_right = match (&left.column, &right.column) {
            (Some(l), Some(r)) if l.table_alias != r.table_alias => {
                if r.table_alias == target_alias {
                    Some(true)
                } else if l.table_alias == target_alias {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        };
        let (existing, joined) = match joined_on_right {
            Some(true) => (left, right),
            Some(false) => (right, left),
            None => {
                return Err(QueryError::UnsupportedJoinShape(
                    "the first equality must compare a column of the joined entity with a \
                     column of a registered one"
                        .to_string(),
                ));
            }
        };

        let composite = second
            .map(|(left, right)| composite_condition(&mut translator, target_alias, left, right))
            .transpose()?;

        let left_table_alias = existing
            .column
            .as_ref()
            .map(|column| column.table_alias.clone())
            .unwrap_or_default();

        Ok(JoinModel {
            join_type,
            left_column: existing.sql,
            right_column: joined.sql,
            left_table_alias,
            right_table_alias: Some(target_alias.to_string()),
            target_table: self.table_by_alias(target_alias)?.table_name.clone(),
            target_table_alias: target_alias.to_string(),
            is_cte_join: false,
            composite,
        })
    }

    fn cte_join(
        &self,
        column: &ColumnModel,
        right_column: String,
        join_type: JoinType,
        cte: &str,
    ) -> Result<JoinModel, QueryError> {
        if self.alias_in_use(cte) {
            return Err(QueryError::DuplicateAlias(cte.to_string()));
        }

        Ok(JoinModel {
            join_type,
            left_column: column.to_string(),
            right_column,
            left_table_alias: column.table_alias.clone(),
            right_table_alias: None,
            target_table: cte.to_string(),
            target_table_alias: cte.to_string(),
            is_cte_join: true,
            composite: None,
        })
    }

    fn table_by_alias(&self, alias: &str) -> Result<&TableModel, QueryError> {
        self.tables()
            .find(|table| table.alias == alias)
            .ok_or_else(|| QueryError::UnknownEntity(alias.to_string()))
    }

    fn push_join(&mut self, join: JoinModel) {
        debug!(join = %join, "Composed join");
        self.joins.push(join);
    }
}

type Equality<'e> = (&'e Expr, &'e Expr);

fn equality(expr: &Expr) -> Option<Equality<'_>> {
    match expr {
        Expr::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } => Some((left, right)),
        Expr::Group(inner) => equality(inner),
        _ => None,
    }
}

// One equality, or two AND-ed ones.
fn split_condition(on: &Expr) -> Result<(Equality<'_>, Option<Equality<'_>>), QueryError> {
    let unsupported = || {
        QueryError::UnsupportedJoinShape(format!(
            "a {JOIN} condition must be one equality or two AND-ed equalities"
        ))
    };

    match on {
        Expr::And(first, second) => Ok((
            equality(first).ok_or_else(unsupported)?,
            Some(equality(second).ok_or_else(unsupported)?),
        )),
        Expr::Group(inner) if matches!(**inner, Expr::And(..)) => split_condition(inner),
        _ => Ok((equality(on).ok_or_else(unsupported)?, None)),
    }
}

fn composite_condition(
    translator: &mut ExpressionTranslator<'_>,
    target_alias: &str,
    left: &Expr,
    right: &Expr,
) -> Result<CompositeCondition, QueryError> {
    let left_fragment = translate_if_member(translator, left)?;
    let right_fragment = translate_if_member(translator, right)?;

    match (left_fragment, right_fragment) {
        (Some(l), Some(r)) => {
            let target_on_left = l
                .column
                .as_ref()
                .is_some_and(|column| column.table_alias == target_alias);
            let (l, r) = if target_on_left { (r, l) } else { (l, r) };
            Ok(CompositeCondition::Columns {
                left: l.sql,
                right: r.sql,
                target_alias: target_alias.to_string(),
            })
        }
        (Some(column), None) => constant_condition(translator, column, right),
        (None, Some(column)) => constant_condition(translator, column, left),
        (None, None) => Err(QueryError::UnsupportedJoinShape(
            "the second equality must involve a column".to_string(),
        )),
    }
}

fn translate_if_member(
    translator: &mut ExpressionTranslator<'_>,
    expr: &Expr,
) -> Result<Option<Fragment>, QueryError> {
    match expr.as_member() {
        Some(_) => translator.translate(expr).map(Some),
        None => Ok(None),
    }
}

fn constant_condition(
    translator: &mut ExpressionTranslator<'_>,
    column: Fragment,
    constant: &Expr,
) -> Result<CompositeCondition, QueryError> {
    if !matches!(constant, Expr::Literal(_)) {
        return Err(QueryError::UnsupportedJoinShape(
            "the second equality must compare a column with a column or a constant".to_string(),
        ));
    }

    let value = match &column.column {
        Some(model) => translator.translate_against(constant, model)?,
        None => translator.translate(constant)?,
    };

    Ok(CompositeCondition::Constant {
        left: column.sql,
        value: value.sql,
    })
}
