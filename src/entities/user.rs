// ABOUTME: User entity definition for SeaORM with username and hashed password
// ABOUTME: Owns authorized devices, reports and activities through foreign keys

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    /// PHC-format hash produced by the credential verifier.
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::authorized_device::Entity")]
    AuthorizedDevices,
    #[sea_orm(has_many = "super::report::Entity")]
    Reports,
    #[sea_orm(has_many = "super::activity::Entity")]
    Activities,
}

impl Related<super::authorized_device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthorizedDevices.def()
    }
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reports.def()
    }
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
