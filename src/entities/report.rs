// ABOUTME: Sick-leave report entity with bilingual patient, physician and facility fields
// ABOUTME: Rows are soft-deleted through is_deleted and never physically removed

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_code: String,
    pub id_number: String,
    pub name_ar: String,
    pub name_en: String,
    pub days_count: i32,
    pub entry_date_gregorian: Date,
    pub exit_date_gregorian: Date,
    pub entry_date_hijri: String,
    pub exit_date_hijri: String,
    pub report_issue_date: Option<Date>,
    pub nationality_ar: String,
    pub nationality_en: String,
    pub doctor_name_ar: String,
    pub doctor_name_en: String,
    pub job_title_ar: String,
    pub job_title_en: String,
    pub hospital_name_ar: String,
    pub hospital_name_en: String,
    pub print_date: String,
    pub print_time: String,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(has_many = "super::activity::Entity")]
    Activities,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
