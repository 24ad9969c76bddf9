// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::query_error::QueryError;

use super::{
    expr::{Expr, call, lit},
    sql_type::SqlType,
    value::SqlValue,
};

/// The closed vocabulary of functions an [`Expr::Call`] may name.
///
/// The first group are condition markers that compile to SQL predicates; the rest map to SQL
/// Server functions of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerFunction {
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Like,
    Sql,
    SqlWithValue,
    Count,
    CountAll,
    CountAllOver,
    Sum,
    Avg,
    Min,
    Max,
    Iif,
    DateDiff,
    EoMonth,
    Round,
    Cast,
    Concat,
}

const ALL_FUNCTIONS: [MarkerFunction; 21] = [
    MarkerFunction::Between,
    MarkerFunction::In,
    MarkerFunction::NotIn,
    MarkerFunction::IsNull,
    MarkerFunction::IsNotNull,
    MarkerFunction::Like,
    MarkerFunction::Sql,
    MarkerFunction::SqlWithValue,
    MarkerFunction::Count,
    MarkerFunction::CountAll,
    MarkerFunction::CountAllOver,
    MarkerFunction::Sum,
    MarkerFunction::Avg,
    MarkerFunction::Min,
    MarkerFunction::Max,
    MarkerFunction::Iif,
    MarkerFunction::DateDiff,
    MarkerFunction::EoMonth,
    MarkerFunction::Round,
    MarkerFunction::Cast,
    MarkerFunction::Concat,
];

impl MarkerFunction {
    pub fn name(&self) -> &'static str {
        match self {
            MarkerFunction::Between => "between",
            MarkerFunction::In => "in",
            MarkerFunction::NotIn => "not_in",
            MarkerFunction::IsNull => "is_null",
            MarkerFunction::IsNotNull => "is_not_null",
            MarkerFunction::Like => "like",
            MarkerFunction::Sql => "sql",
            MarkerFunction::SqlWithValue => "sql_with_value",
            MarkerFunction::Count => "count",
            MarkerFunction::CountAll => "count_all",
            MarkerFunction::CountAllOver => "count_all_over",
            MarkerFunction::Sum => "sum",
            MarkerFunction::Avg => "avg",
            MarkerFunction::Min => "min",
            MarkerFunction::Max => "max",
            MarkerFunction::Iif => "iif",
            MarkerFunction::DateDiff => "date_diff",
            MarkerFunction::EoMonth => "eomonth",
            MarkerFunction::Round => "round",
            MarkerFunction::Cast => "cast",
            MarkerFunction::Concat => "concat",
        }
    }

    /// The SQL aggregate a single-argument aggregate marker maps to
    pub(crate) fn aggregate_keyword(&self) -> Option<&'static str> {
        match self {
            MarkerFunction::Count => Some("COUNT"),
            MarkerFunction::Sum => Some("SUM"),
            MarkerFunction::Avg => Some("AVG"),
            MarkerFunction::Min => Some("MIN"),
            MarkerFunction::Max => Some("MAX"),
            _ => None,
        }
    }
}

impl FromStr for MarkerFunction {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_FUNCTIONS
            .into_iter()
            .find(|function| function.name() == s)
            .ok_or_else(|| QueryError::UnsupportedFunction(s.to_string()))
    }
}

impl Display for MarkerFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How a LIKE pattern is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeMode {
    Contains,
    StartsWith,
    EndsWith,
    Exact,
}

impl LikeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeMode::Contains => "contains",
            LikeMode::StartsWith => "starts_with",
            LikeMode::EndsWith => "ends_with",
            LikeMode::Exact => "exact",
        }
    }

    /// Wrap an (already escaped) value in the wildcards of this mode
    pub fn pattern(&self, value: &str) -> String {
        match self {
            LikeMode::Contains => format!("%{value}%"),
            LikeMode::StartsWith => format!("{value}%"),
            LikeMode::EndsWith => format!("%{value}"),
            LikeMode::Exact => value.to_string(),
        }
    }
}

impl FromStr for LikeMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(LikeMode::Contains),
            "starts_with" => Ok(LikeMode::StartsWith),
            "ends_with" => Ok(LikeMode::EndsWith),
            "exact" => Ok(LikeMode::Exact),
            _ => Err(QueryError::invalid_arguments(
                "like",
                format!("unknown match mode `{s}`"),
            )),
        }
    }
}

/// Date parts accepted by DATEDIFF
pub const DATE_PARTS: [&str; 10] = [
    "year",
    "quarter",
    "month",
    "dayofyear",
    "day",
    "week",
    "hour",
    "minute",
    "second",
    "millisecond",
];

fn marker(function: MarkerFunction, args: Vec<Expr>) -> Expr {
    call(function.name(), args)
}

pub fn between(expr: Expr, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
    marker(MarkerFunction::Between, vec![expr, low.into(), high.into()])
}

/// `expr IN (values...)`. An empty `values` renders the degenerate `IN ()`.
pub fn in_list<V: Into<SqlValue>>(expr: Expr, values: impl IntoIterator<Item = V>) -> Expr {
    marker(MarkerFunction::In, vec![expr, lit(SqlValue::list(values))])
}

pub fn not_in_list<V: Into<SqlValue>>(expr: Expr, values: impl IntoIterator<Item = V>) -> Expr {
    marker(MarkerFunction::NotIn, vec![expr, lit(SqlValue::list(values))])
}

pub fn is_null(expr: Expr) -> Expr {
    marker(MarkerFunction::IsNull, vec![expr])
}

pub fn is_not_null(expr: Expr) -> Expr {
    marker(MarkerFunction::IsNotNull, vec![expr])
}

pub fn like(expr: Expr, value: impl Into<String>, mode: LikeMode) -> Expr {
    marker(
        MarkerFunction::Like,
        vec![expr, lit(value.into()), lit(mode.as_str())],
    )
}

/// Verbatim SQL text
pub fn raw_sql(text: impl Into<String>) -> Expr {
    marker(MarkerFunction::Sql, vec![lit(text.into())])
}

/// Verbatim SQL text with one bound value. `{0}` in `text` is replaced by the bind marker;
/// without it, the marker is appended.
pub fn raw_sql_with(text: impl Into<String>, value: impl Into<SqlValue>, sql_type: SqlType) -> Expr {
    marker(
        MarkerFunction::SqlWithValue,
        vec![
            lit(text.into()),
            lit(value.into()),
            lit(sql_type.type_name()),
        ],
    )
}

pub fn count(expr: Expr) -> Expr {
    marker(MarkerFunction::Count, vec![expr])
}

pub fn count_all() -> Expr {
    marker(MarkerFunction::CountAll, vec![])
}

/// `COUNT(*) OVER()`, the total row count alongside each (paged) row
pub fn count_all_over() -> Expr {
    marker(MarkerFunction::CountAllOver, vec![])
}

pub fn sum(expr: Expr) -> Expr {
    marker(MarkerFunction::Sum, vec![expr])
}

pub fn avg(expr: Expr) -> Expr {
    marker(MarkerFunction::Avg, vec![expr])
}

pub fn min(expr: Expr) -> Expr {
    marker(MarkerFunction::Min, vec![expr])
}

pub fn max(expr: Expr) -> Expr {
    marker(MarkerFunction::Max, vec![expr])
}

pub fn iif(condition: Expr, then: impl Into<Expr>, otherwise: impl Into<Expr>) -> Expr {
    marker(
        MarkerFunction::Iif,
        vec![condition, then.into(), otherwise.into()],
    )
}

/// `DATEDIFF(part, start, end)`; `part` must be one of [`DATE_PARTS`].
pub fn date_diff(part: &str, start: impl Into<Expr>, end: impl Into<Expr>) -> Expr {
    marker(
        MarkerFunction::DateDiff,
        vec![lit(part), start.into(), end.into()],
    )
}

pub fn eomonth(expr: Expr) -> Expr {
    marker(MarkerFunction::EoMonth, vec![expr])
}

pub fn round(expr: Expr, digits: i32) -> Expr {
    marker(MarkerFunction::Round, vec![expr, lit(digits)])
}

/// `CAST(expr AS type)`, where `type` is a declaration such as `"DECIMAL(18, 2)"`
pub fn cast(expr: Expr, type_declaration: &str) -> Expr {
    marker(MarkerFunction::Cast, vec![expr, lit(type_declaration)])
}

pub fn concat(args: impl IntoIterator<Item = Expr>) -> Expr {
    marker(MarkerFunction::Concat, args.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for function in ALL_FUNCTIONS {
            assert_eq!(function.name().parse::<MarkerFunction>().unwrap(), function);
        }
    }

    #[test]
    fn unknown_function() {
        assert!(matches!(
            "soundex".parse::<MarkerFunction>(),
            Err(QueryError::UnsupportedFunction(name)) if name == "soundex"
        ));
    }

    #[test]
    fn like_patterns() {
        assert_eq!(LikeMode::Contains.pattern("x"), "%x%");
        assert_eq!(LikeMode::StartsWith.pattern("x"), "x%");
        assert_eq!(LikeMode::EndsWith.pattern("x"), "%x");
        assert_eq!(LikeMode::Exact.pattern("x"), "x");
        assert!("fuzzy".parse::<LikeMode>().is_err());
    }
}
