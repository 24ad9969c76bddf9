// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Where [`QueryConfig`](crate::QueryConfig) reads its settings from.

use std::collections::HashMap;

/// Key/value lookup of raw setting values. Interpretation is left to the caller.
pub trait ConfigSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The variables of the running process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A fixed set of settings, mostly useful in tests
#[derive(Debug, Clone, Default)]
pub struct StaticSource(HashMap<String, String>);

impl ConfigSource for StaticSource {
    fn var(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for StaticSource {
    fn from(values: [(&str, &str); N]) -> Self {
        values.into_iter().collect()
    }
}
