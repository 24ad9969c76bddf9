// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::ops::{Add, Div, Mul, Rem, Sub};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::entity_spec::Entity;

use super::value::SqlValue;

/// A reference to a property of an entity, e.g. `T1.Address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub entity: String,
    pub property: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn token(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// Binding strength in T-SQL: multiplicative over additive over comparison
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 2,
            BinaryOp::Add | BinaryOp::Sub => 1,
            _ => 0,
        }
    }

    /// Is `a op (b op2 c)` different from `a op b op2 c` when both have the same precedence?
    pub fn is_left_associative_only(&self) -> bool {
        matches!(self, BinaryOp::Sub | BinaryOp::Div | BinaryOp::Mod)
    }
}

/// The predicate/projection language.
///
/// Filters, projections and join conditions are all expressed with this tree and turned into SQL
/// by the [`ExpressionTranslator`](super::translator::ExpressionTranslator). Use the constructor
/// functions ([`col`], [`lit`], ...) and combinators ([`Expr::eq`], [`Expr::and`], ...) rather
/// than building variants by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A property of a registered entity
    Column(ColumnRef),
    /// A column known only by name under an alias, such as a column of a CTE
    AliasColumn { alias: String, name: String },
    Literal(SqlValue),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Explicit parentheses. `AND`/`OR` are emitted flat, so precedence must be spelled out.
    Group(Box<Expr>),
    /// A conversion wrapping another expression; translates to its operand
    Convert(Box<Expr>),
    /// A marker or SQL function (see [`MarkerFunction`](super::function::MarkerFunction))
    Call { function: String, args: Vec<Expr> },
    /// Named fields, as used by multi-column SELECT, GROUP BY and ORDER BY
    Projection(Vec<ProjectionField>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionField {
    pub name: String,
    pub expr: Expr,
}

/// A property of the entity `T`
pub fn col<T: Entity>(property: impl Into<String>) -> Expr {
    entity_col(T::NAME, property)
}

/// A property of an entity given by name
pub fn entity_col(entity: impl Into<String>, property: impl Into<String>) -> Expr {
    Expr::Column(ColumnRef {
        entity: entity.into(),
        property: property.into(),
    })
}

/// An unvalidated `alias.name` column
pub fn alias_col(alias: impl Into<String>, name: impl Into<String>) -> Expr {
    Expr::AliasColumn {
        alias: alias.into(),
        name: name.into(),
    }
}

pub fn lit(value: impl Into<SqlValue>) -> Expr {
    Expr::Literal(value.into())
}

pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::Call {
        function: function.into(),
        args,
    }
}

/// A projection of named fields, in declaration order.
pub fn projection<N: Into<String>>(fields: impl IntoIterator<Item = (N, Expr)>) -> Expr {
    Expr::Projection(
        fields
            .into_iter()
            .map(|(name, expr)| ProjectionField {
                name: name.into(),
                expr,
            })
            .collect(),
    )
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    fn binary(self, op: BinaryOp, rhs: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs.into()),
        }
    }

    pub fn eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn not_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::NotEq, rhs)
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lt, rhs)
    }

    pub fn lt_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LtEq, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gt, rhs)
    }

    pub fn gt_eq(self, rhs: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GtEq, rhs)
    }

    pub fn and(self, rhs: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(rhs))
    }

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn group(self) -> Expr {
        Expr::Group(Box::new(self))
    }

    pub fn convert(self) -> Expr {
        Expr::Convert(Box::new(self))
    }

    /// The entity member this expression denotes, looking through conversions.
    pub fn as_member(&self) -> Option<&ColumnRef> {
        match self {
            Expr::Column(column) => Some(column),
            Expr::Convert(inner) => inner.as_member(),
            _ => None,
        }
    }
}

macro_rules! impl_arithmetic {
    ($($trait:ident :: $method:ident => $op:ident),* $(,)?) => {
        $(
            impl<R: Into<Expr>> $trait<R> for Expr {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    self.binary(BinaryOp::$op, rhs)
                }
            }
        )*
    };
}

impl_arithmetic!(
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Mod,
);

macro_rules! impl_expr_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Literal(value.into())
                }
            }
        )*
    };
}

impl_expr_from_value!(
    SqlValue,
    bool,
    u8,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    &str,
    String,
    char,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<FixedOffset>,
    Uuid,
);

impl From<ColumnRef> for Expr {
    fn from(column: ColumnRef) -> Self {
        Expr::Column(column)
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::test_helper::T1;

    use super::*;

    #[test]
    fn combinators_build_the_expected_tree() {
        let expr = col::<T1>("PropertyID").eq(99).and(col::<T1>("Address").eq("hello"));

        let Expr::And(left, right) = &expr else {
            panic!("expected an AND, got {expr:?}");
        };
        assert_eq!(
            **left,
            Expr::Binary {
                op: BinaryOp::Eq,
                left: Box::new(entity_col("T1", "PropertyID")),
                right: Box::new(Expr::Literal(SqlValue::Int(99))),
            }
        );
        assert!(matches!(**right, Expr::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn arithmetic_operators() {
        let expr = col::<T1>("Price") * 2 + 1;
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn serializes_as_json() {
        let expr = col::<T1>("PropertyID").gt(5).group();
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn member_through_conversion() {
        let expr = col::<T1>("PropertyID").convert();
        assert_eq!(expr.as_member().unwrap().property, "PropertyID");
        assert!(lit(1).as_member().is_none());
    }
}
