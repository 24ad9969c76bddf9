// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building a statement.
///
/// All of these indicate a malformed query construction (a programming error on the caller's
/// side) rather than a data error, so nothing here is retried or recovered from internally.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Entity `{0}` carries no table metadata")]
    MetadataMissing(String),

    #[error("Entity `{0}` declares no primary key field for a convention join")]
    MissingPrimaryKey(String),

    #[error("Invalid metadata for entity `{entity}`: {message}")]
    InvalidMetadata { entity: String, message: String },

    #[error("Entity `{0}` is not registered in this statement")]
    UnknownEntity(String),

    #[error("Property `{column}` is not mapped on entity `{entity}`")]
    UnknownColumn { entity: String, column: String },

    #[error("No table has been registered in this statement")]
    NoTableRegistered,

    #[error("Entity `{0}` is already registered in this statement")]
    DuplicateEntity(String),

    #[error("Alias `{0}` is already used in this statement")]
    DuplicateAlias(String),

    #[error("Unsupported expression in {clause}: {message}")]
    UnsupportedExpressionShape {
        clause: &'static str,
        message: String,
    },

    #[error("{clause} expects {expected}")]
    TypeMismatch {
        clause: &'static str,
        expected: &'static str,
    },

    #[error("Member `{0}` has no entity to be resolved against")]
    UnresolvedMember(String),

    #[error("Unsupported function `{0}`")]
    UnsupportedFunction(String),

    #[error("Invalid arguments to {function}: {message}")]
    InvalidArguments {
        function: &'static str,
        message: String,
    },

    #[error("No SQL type mapping for a value of type {0}")]
    UnsupportedValueType(String),

    #[error("Unsupported join shape: {0}")]
    UnsupportedJoinShape(String),

    #[error("Configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<QueryError>),
}

impl QueryError {
    pub fn with_context(self, context: String) -> QueryError {
        QueryError::WithContext(context, Box::new(self))
    }

    pub(crate) fn unsupported_shape(clause: &'static str, message: impl Into<String>) -> Self {
        QueryError::UnsupportedExpressionShape {
            clause,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_arguments(function: &'static str, message: impl Into<String>) -> Self {
        QueryError::InvalidArguments {
            function,
            message: message.into(),
        }
    }
}

pub trait WithContext {
    fn with_context(self, context: String) -> Self;
}

impl<T> WithContext for Result<T, QueryError> {
    fn with_context(self, context: String) -> Result<T, QueryError> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prepended() {
        let result: Result<(), QueryError> = Err(QueryError::UnknownEntity("Venue".into()));
        let err = result.with_context("While compiling WHERE:".into()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "While compiling WHERE: Entity `Venue` is not registered in this statement"
        );
    }
}
