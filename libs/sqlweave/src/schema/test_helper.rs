#![cfg(test)]

//! Entities shared by the unit tests.

use crate::sql::sql_type::{SqlType, ValueType};

use super::entity_spec::{Entity, EntitySpec, PropertySpec};

pub struct T1;
pub struct T2;
pub struct T3;
pub struct Unmapped;

impl Entity for T1 {
    const NAME: &'static str = "T1";

    fn entity_spec() -> EntitySpec {
        EntitySpec::new(Self::NAME)
            .table("Table1")
            .primary_key("PropertyID")
            .property(PropertySpec::new("PropertyID", ValueType::Int))
            .property(PropertySpec::new("Address", ValueType::String))
            .property(PropertySpec::new("Price", ValueType::Decimal).precision(18, 2))
            .property(PropertySpec::new("ListedOn", ValueType::DateTime))
    }
}

impl Entity for T2 {
    const NAME: &'static str = "T2";

    fn entity_spec() -> EntitySpec {
        EntitySpec::new(Self::NAME)
            .table("Table2")
            .primary_key("OwnerID")
            .property(PropertySpec::new("OwnerID", ValueType::Int))
            .property(PropertySpec::new("PropertyID", ValueType::Int))
            .property(
                PropertySpec::new("Name", ValueType::String)
                    .sql_type(SqlType::VarChar)
                    .size(50),
            )
            .property(PropertySpec::new("Region", ValueType::Int))
    }
}

/// Shares no key with `T1`
impl Entity for T3 {
    const NAME: &'static str = "T3";

    fn entity_spec() -> EntitySpec {
        EntitySpec::new(Self::NAME)
            .table("Table3")
            .property(PropertySpec::new("OwnerID", ValueType::Int))
            .property(PropertySpec::new("Address", ValueType::String))
    }
}

impl Entity for Unmapped {
    const NAME: &'static str = "Unmapped";

    fn entity_spec() -> EntitySpec {
        EntitySpec::new(Self::NAME).property(PropertySpec::new("Id", ValueType::Int))
    }
}
