// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Statement assemblers. Each owns the registry and parameter manager of one statement and
//! renders its clauses in SQL Server's order.

pub mod batch;
pub mod delete;
pub mod select;
pub mod statement;
pub mod sub_query;
