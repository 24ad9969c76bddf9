// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::query_error::QueryError;

use super::entity_spec::{Entity, EntitySpec};

/// The description table of all known entities, built once at startup and consulted when
/// registering tables by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<EntitySpec>", into = "Vec<EntitySpec>")]
pub struct EntityCatalog {
    entities: IndexMap<String, EntitySpec>,
}

impl EntityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON array of entity descriptions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, spec: EntitySpec) -> &mut Self {
        self.entities.insert(spec.name.clone(), spec);
        self
    }

    pub fn register<T: Entity>(&mut self) -> &mut Self {
        self.insert(T::entity_spec())
    }

    pub fn get(&self, entity: &str) -> Result<&EntitySpec, QueryError> {
        self.entities
            .get(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySpec> {
        self.entities.values()
    }
}

impl From<Vec<EntitySpec>> for EntityCatalog {
    fn from(specs: Vec<EntitySpec>) -> Self {
        Self {
            entities: specs
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }
}

impl From<EntityCatalog> for Vec<EntitySpec> {
    fn from(catalog: EntityCatalog) -> Self {
        catalog.entities.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::sql::sql_type::{SqlType, ValueType};

    use super::*;

    #[test]
    fn load_from_json() {
        let catalog = EntityCatalog::from_json(
            r#"[
                {
                    "name": "Venue",
                    "table_name": "Venues",
                    "primary_key": "Id",
                    "properties": [
                        { "name": "Id", "value_type": "Int" },
                        { "name": "Name", "value_type": "String", "sql_type": "VarChar", "size": 100 }
                    ]
                },
                { "name": "Draft" }
            ]"#,
        )
        .unwrap();

        let venue = catalog.get("Venue").unwrap();
        assert_eq!(venue.table_name().unwrap(), "Venues");
        assert_eq!(venue.primary_key.as_deref(), Some("Id"));
        assert_eq!(venue.properties[1].sql_type, Some(SqlType::VarChar));
        assert_eq!(venue.properties[0].value_type, ValueType::Int);

        assert!(matches!(
            catalog.get("Draft").unwrap().table_name(),
            Err(QueryError::MetadataMissing(_))
        ));
        assert!(matches!(
            catalog.get("Concert"),
            Err(QueryError::UnknownEntity(_))
        ));
    }
}
