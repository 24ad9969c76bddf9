// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Builders for the individual clauses of a statement. Each accumulates translated fragments
//! and renders its clause (or nothing) on `compile`.

pub mod condition;
pub mod group_by;
pub mod order_by;
pub mod selection;
