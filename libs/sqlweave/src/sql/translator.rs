// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::warn;

use crate::query_error::QueryError;

use super::{
    column::ColumnModel,
    expr::{BinaryOp, ColumnRef, Expr},
    function::{DATE_PARTS, LikeMode, MarkerFunction},
    parameter::ParameterManager,
    registry::TableRegistry,
    sql_type::SqlType,
    table::TableModel,
    value::{SqlValue, escape},
};

const EXPRESSION: &str = "expression";

/// How column references are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRendering {
    /// `alias.Column`
    Qualified,
    /// `Column`, for sub-queries over a single unaliased table
    Bare,
    /// `Table.Column`, for statements that can't alias their target (DELETE)
    TableName,
}

/// A translated piece of SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub sql: String,
    /// Set exactly when the fragment is one plain column reference
    pub column: Option<ColumnModel>,
}

impl Fragment {
    fn text(sql: String) -> Self {
        Self { sql, column: None }
    }

    /// Is this a plain reference to a column called `name`? A selected column that is its own
    /// output name needs no `AS`.
    pub fn is_column_named(&self, name: &str) -> bool {
        self.column
            .as_ref()
            .is_some_and(|column| column.name == name)
    }
}

struct Resolved<'a> {
    table: &'a TableModel,
    column: &'a ColumnModel,
    outer: bool,
}

/// Turns [`Expr`] trees into SQL text.
///
/// Columns are resolved against `registry` (falling back to the `outer` registry for correlated
/// sub-queries), and every non-null literal becomes a bind parameter in `params` unless literal
/// inlining is on. A literal compared with a column is bound with that column's type.
pub struct ExpressionTranslator<'a> {
    registry: &'a TableRegistry,
    outer: Option<&'a TableRegistry>,
    params: &'a mut ParameterManager,
    prefix: String,
    rendering: ColumnRendering,
    inline_literals: bool,
}

impl<'a> ExpressionTranslator<'a> {
    pub fn new(registry: &'a TableRegistry, params: &'a mut ParameterManager) -> Self {
        let prefix = params.default_prefix().to_string();
        Self {
            registry,
            outer: None,
            params,
            prefix,
            rendering: ColumnRendering::Qualified,
            inline_literals: false,
        }
    }

    /// Resolve entities missing from the own registry against `outer`. Outer columns are always
    /// rendered qualified.
    pub fn with_outer(mut self, outer: &'a TableRegistry) -> Self {
        self.outer = Some(outer);
        self
    }

    /// Use `prefix` instead of the manager's default for the parameters allocated here.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_rendering(mut self, rendering: ColumnRendering) -> Self {
        self.rendering = rendering;
        self
    }

    pub fn with_inline_literals(mut self, inline_literals: bool) -> Self {
        self.inline_literals = inline_literals;
        self
    }

    pub fn translate(&mut self, expr: &Expr) -> Result<Fragment, QueryError> {
        self.visit(expr, None)
    }

    /// Translate with columns rendered by bare name
    pub fn translate_without_alias(&mut self, expr: &Expr) -> Result<Fragment, QueryError> {
        self.translate_rendered(ColumnRendering::Bare, expr)
    }

    /// Translate with columns rendered as `Table.Column`
    pub fn translate_for_no_alias_context(&mut self, expr: &Expr) -> Result<Fragment, QueryError> {
        self.translate_rendered(ColumnRendering::TableName, expr)
    }

    /// Translate `expr` as if it were compared with `column`: a literal is bound with the
    /// column's type.
    pub fn translate_against(
        &mut self,
        expr: &Expr,
        column: &ColumnModel,
    ) -> Result<Fragment, QueryError> {
        self.visit(expr, Some(column))
    }

    /// Decompose a projection into its named fields, in declaration order.
    pub fn translate_projection(
        &mut self,
        expr: &Expr,
        clause: &'static str,
    ) -> Result<Vec<(String, Fragment)>, QueryError> {
        let Expr::Projection(fields) = expr else {
            return Err(QueryError::TypeMismatch {
                clause,
                expected: "a projection",
            });
        };

        fields
            .iter()
            .map(|field| Ok((field.name.clone(), self.visit(&field.expr, None)?)))
            .collect()
    }

    /// Resolve a member, or each field of a projection of members, to its column.
    pub fn translate_members(
        &mut self,
        expr: &Expr,
        clause: &'static str,
    ) -> Result<Vec<Fragment>, QueryError> {
        match expr {
            Expr::Projection(fields) => fields
                .iter()
                .map(|field| match field.expr.as_member() {
                    Some(member) => self.member(member),
                    None => Err(QueryError::unsupported_shape(
                        clause,
                        format!("field `{}` is not an entity member", field.name),
                    )),
                })
                .collect(),
            _ => match expr.as_member() {
                Some(member) => Ok(vec![self.member(member)?]),
                None => Err(QueryError::TypeMismatch {
                    clause,
                    expected: "a member or a projection of members",
                }),
            },
        }
    }

    fn translate_rendered(
        &mut self,
        rendering: ColumnRendering,
        expr: &Expr,
    ) -> Result<Fragment, QueryError> {
        let previous = std::mem::replace(&mut self.rendering, rendering);
        let result = self.visit(expr, None);
        self.rendering = previous;
        result
    }

    fn visit(&mut self, expr: &Expr, hint: Option<&ColumnModel>) -> Result<Fragment, QueryError> {
        match expr {
            Expr::Column(column) => self.member(column),
            Expr::AliasColumn { alias, name } => Ok(Fragment::text(format!("{alias}.{name}"))),
            Expr::Literal(value) => self.literal(value, hint).map(Fragment::text),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::And(left, right) => self.logical("AND", left, right),
            Expr::Or(left, right) => self.logical("OR", left, right),
            Expr::Not(inner) => {
                let inner_sql = self.visit(inner, None)?.sql;
                let sql = match **inner {
                    Expr::Group(_) => format!("NOT {inner_sql}"),
                    _ => format!("NOT ({inner_sql})"),
                };
                Ok(Fragment::text(sql))
            }
            Expr::Group(inner) => {
                let inner = self.visit(inner, None)?;
                Ok(Fragment::text(format!("({})", inner.sql)))
            }
            Expr::Convert(inner) => self.visit(inner, hint),
            Expr::Call { function, args } => {
                let function: MarkerFunction = function.parse()?;
                self.call(function, args).map(Fragment::text)
            }
            Expr::Projection(_) => Err(QueryError::unsupported_shape(
                EXPRESSION,
                "a projection can't be used as a scalar value",
            )),
        }
    }

    fn resolve(&self, column: &ColumnRef) -> Result<Resolved<'a>, QueryError> {
        if column.entity.is_empty() {
            return Err(QueryError::UnresolvedMember(column.property.clone()));
        }

        let registry = self.registry;
        let (table, outer) = match (registry.get_table(&column.entity), self.outer) {
            (Ok(table), _) => (table, false),
            (Err(_), Some(outer)) if outer.contains_entity(&column.entity) => {
                (outer.get_table(&column.entity)?, true)
            }
            (Err(e), _) => return Err(e),
        };

        Ok(Resolved {
            table,
            column: table.column(&column.property)?,
            outer,
        })
    }

    fn member(&self, column: &ColumnRef) -> Result<Fragment, QueryError> {
        let Resolved {
            table,
            column,
            outer,
        } = self.resolve(column)?;

        let sql = match self.rendering {
            _ if outer => column.to_string(),
            ColumnRendering::Qualified => column.to_string(),
            ColumnRendering::Bare => column.name.clone(),
            ColumnRendering::TableName => format!("{}.{}", table.table_name, column.name),
        };

        Ok(Fragment {
            sql,
            column: Some(column.clone()),
        })
    }

    /// The column `expr` refers to, used to type the literal on the other side of a comparison.
    /// Resolution errors are left for the actual translation to report.
    fn column_hint(&self, expr: &Expr) -> Option<&'a ColumnModel> {
        expr.as_member()
            .and_then(|member| self.resolve(member).ok())
            .map(|resolved| resolved.column)
    }

    fn literal(&mut self, value: &SqlValue, hint: Option<&ColumnModel>) -> Result<String, QueryError> {
        if value.is_null() {
            return Ok("NULL".to_string());
        }
        if self.inline_literals {
            return value.to_literal();
        }

        match hint {
            Some(column) => self.params.add_for_column(value.clone(), column, &self.prefix),
            None => self.params.add(value.clone(), &self.prefix),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Fragment, QueryError> {
        if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
            let tested = if is_null_literal(right) {
                Some(left)
            } else if is_null_literal(left) {
                Some(right)
            } else {
                None
            };

            if let Some(tested) = tested {
                let tested = self.visit(tested, None)?;
                let keyword = if op == BinaryOp::Eq {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                return Ok(Fragment::text(format!("{} {keyword}", tested.sql)));
            }
        }

        let (left_hint, right_hint) = if op.is_comparison() {
            (self.column_hint(right), self.column_hint(left))
        } else {
            (None, None)
        };

        let left_sql = self.visit(left, left_hint)?.sql;
        let right_sql = self.visit(right, right_hint)?.sql;

        Ok(Fragment::text(format!(
            "{} {} {}",
            parenthesize(left_sql, needs_parentheses(op, left, false)),
            op.token(),
            parenthesize(right_sql, needs_parentheses(op, right, true))
        )))
    }

    fn logical(
        &mut self,
        keyword: &str,
        left: &Expr,
        right: &Expr,
    ) -> Result<Fragment, QueryError> {
        let left = self.visit(left, None)?;
        let right = self.visit(right, None)?;
        Ok(Fragment::text(format!("{} {keyword} {}", left.sql, right.sql)))
    }

    fn call(&mut self, function: MarkerFunction, args: &[Expr]) -> Result<String, QueryError> {
        match function {
            MarkerFunction::Between => {
                let [target, low, high] = args else {
                    return Err(arity(function, "3", args));
                };
                let hint = self.column_hint(target);
                let target = self.visit(target, None)?;
                let low = self.visit(low, hint)?;
                let high = self.visit(high, hint)?;
                Ok(format!("{} BETWEEN {} AND {}", target.sql, low.sql, high.sql))
            }
            MarkerFunction::In | MarkerFunction::NotIn => {
                let Some((target, values)) = args.split_first() else {
                    return Err(arity(function, "at least 1", args));
                };
                let hint = self.column_hint(target);
                let target = self.visit(target, None)?;

                let mut rendered = vec![];
                for value in values {
                    match value {
                        Expr::Literal(SqlValue::List(items)) => {
                            for item in items {
                                rendered.push(self.literal(item, hint)?);
                            }
                        }
                        other => rendered.push(self.visit(other, hint)?.sql),
                    }
                }

                if rendered.is_empty() {
                    warn!(column = %target.sql, "Set-membership test against no values");
                }

                let keyword = if function == MarkerFunction::In {
                    "IN"
                } else {
                    "NOT IN"
                };
                Ok(format!("{} {keyword} ({})", target.sql, rendered.join(", ")))
            }
            MarkerFunction::IsNull | MarkerFunction::IsNotNull => {
                let [target] = args else {
                    return Err(arity(function, "1", args));
                };
                let target = self.visit(target, None)?;
                let keyword = if function == MarkerFunction::IsNull {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                Ok(format!("{} {keyword}", target.sql))
            }
            MarkerFunction::Like => {
                let [target, value, mode] = args else {
                    return Err(arity(function, "3", args));
                };
                let mode: LikeMode = string_arg(function, mode)?.parse()?;
                let value = string_arg(function, value)?;
                let target = self.visit(target, None)?;
                Ok(format!(
                    "{} LIKE N'{}'",
                    target.sql,
                    mode.pattern(&escape(value))
                ))
            }
            MarkerFunction::Sql => {
                let [text] = args else {
                    return Err(arity(function, "1", args));
                };
                Ok(string_arg(function, text)?.to_string())
            }
            MarkerFunction::SqlWithValue => {
                let [text, value, sql_type] = args else {
                    return Err(arity(function, "3", args));
                };
                let text = string_arg(function, text)?;
                let Expr::Literal(value) = value else {
                    return Err(QueryError::invalid_arguments(
                        function.name(),
                        "the bound value must be a literal",
                    ));
                };
                let sql_type: SqlType = string_arg(function, sql_type)?.parse()?;

                let marker = if value.is_null() {
                    "NULL".to_string()
                } else if self.inline_literals {
                    value.to_literal()?
                } else {
                    self.params.add_typed(value.clone(), sql_type, &self.prefix)?
                };

                if text.contains("{0}") {
                    Ok(text.replace("{0}", &marker))
                } else {
                    Ok(format!("{text} {marker}"))
                }
            }
            MarkerFunction::Count
            | MarkerFunction::Sum
            | MarkerFunction::Avg
            | MarkerFunction::Min
            | MarkerFunction::Max => {
                let [operand] = args else {
                    return Err(arity(function, "1", args));
                };
                let operand = self.visit(operand, None)?;
                let keyword = function.aggregate_keyword().unwrap_or_default();
                Ok(format!("{keyword}({})", operand.sql))
            }
            MarkerFunction::CountAll | MarkerFunction::CountAllOver => {
                if !args.is_empty() {
                    return Err(arity(function, "0", args));
                }
                Ok(if function == MarkerFunction::CountAll {
                    "COUNT(*)".to_string()
                } else {
                    "COUNT(*) OVER()".to_string()
                })
            }
            MarkerFunction::Iif => {
                let [condition, then, otherwise] = args else {
                    return Err(arity(function, "3", args));
                };
                let condition = self.visit(condition, None)?;
                let then = self.visit(then, None)?;
                let otherwise = self.visit(otherwise, None)?;
                Ok(format!(
                    "IIF({}, {}, {})",
                    condition.sql, then.sql, otherwise.sql
                ))
            }
            MarkerFunction::DateDiff => {
                let [part, start, end] = args else {
                    return Err(arity(function, "3", args));
                };
                let part = string_arg(function, part)?.to_lowercase();
                if !DATE_PARTS.contains(&part.as_str()) {
                    return Err(QueryError::invalid_arguments(
                        function.name(),
                        format!("unknown date part `{part}`"),
                    ));
                }
                let start = self.visit(start, None)?;
                let end = self.visit(end, None)?;
                Ok(format!("DATEDIFF({part}, {}, {})", start.sql, end.sql))
            }
            MarkerFunction::EoMonth => {
                let [date] = args else {
                    return Err(arity(function, "1", args));
                };
                let date = self.visit(date, None)?;
                Ok(format!("EOMONTH({})", date.sql))
            }
            MarkerFunction::Round => {
                let [operand, digits] = args else {
                    return Err(arity(function, "2", args));
                };
                let digits = match digits {
                    Expr::Literal(
                        value @ (SqlValue::TinyInt(_)
                        | SqlValue::SmallInt(_)
                        | SqlValue::Int(_)
                        | SqlValue::BigInt(_)),
                    ) => value.to_literal()?,
                    _ => {
                        return Err(QueryError::invalid_arguments(
                            function.name(),
                            "the number of digits must be an integer literal",
                        ));
                    }
                };
                let operand = self.visit(operand, None)?;
                Ok(format!("ROUND({}, {digits})", operand.sql))
            }
            MarkerFunction::Cast => {
                let [operand, declaration] = args else {
                    return Err(arity(function, "2", args));
                };
                let declaration = string_arg(function, declaration)?;
                let declaration = SqlType::parse_declaration(declaration).map_err(|_| {
                    QueryError::invalid_arguments(
                        function.name(),
                        format!("invalid target type `{declaration}`"),
                    )
                })?;
                let operand = self.visit(operand, None)?;
                Ok(format!("CAST({} AS {declaration})", operand.sql))
            }
            MarkerFunction::Concat => {
                if args.len() < 2 {
                    return Err(arity(function, "at least 2", args));
                }
                // Literal parts are written inline: strings quoted, everything else as is.
                let parts = args
                    .iter()
                    .map(|arg| match arg {
                        Expr::Literal(value) => value.to_literal(),
                        other => self.visit(other, None).map(|fragment| fragment.sql),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("CONCAT({})", parts.join(", ")))
            }
        }
    }
}

// The tree already encodes grouping, so a nested operation that binds more loosely than its
// parent (or equally, on the right of `-`, `/` and `%`) must be wrapped to keep its meaning.
fn needs_parentheses(parent: BinaryOp, operand: &Expr, on_right: bool) -> bool {
    let Some(child) = binary_op(operand) else {
        return false;
    };
    child.precedence() < parent.precedence()
        || (on_right
            && child.precedence() == parent.precedence()
            && parent.is_left_associative_only())
}

fn binary_op(expr: &Expr) -> Option<BinaryOp> {
    match expr {
        Expr::Binary { op, .. } => Some(*op),
        Expr::Convert(inner) => binary_op(inner),
        _ => None,
    }
}

fn parenthesize(sql: String, wrap: bool) -> String {
    if wrap { format!("({sql})") } else { sql }
}

fn is_null_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(value) => value.is_null(),
        Expr::Convert(inner) => is_null_literal(inner),
        _ => false,
    }
}

fn string_arg(function: MarkerFunction, expr: &Expr) -> Result<&str, QueryError> {
    match expr {
        Expr::Literal(SqlValue::String(value)) => Ok(value),
        _ => Err(QueryError::invalid_arguments(
            function.name(),
            "expected a string literal",
        )),
    }
}

fn arity(function: MarkerFunction, expected: &str, args: &[Expr]) -> QueryError {
    QueryError::invalid_arguments(
        function.name(),
        format!("expected {expected} argument(s), got {}", args.len()),
    )
}
