// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#[macro_use]
#[cfg(test)]
mod test_util;

pub mod column;
pub mod expr;
pub mod function;
pub mod parameter;
pub mod sql_type;
pub mod table;
pub mod value;

pub mod clause;
pub mod join;
pub mod registry;
pub mod translator;
