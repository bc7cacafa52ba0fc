// ABOUTME: SeaORM database storage layer for users, devices, reports and activities
// ABOUTME: Every report query is scoped to its owner and skips soft-deleted rows

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::entities::{activity, authorized_device, report, report_stats, user};
use crate::error::Result;
use crate::migration::Migrator;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One page of a user's live reports.
#[derive(Debug, Clone)]
pub struct ReportPage {
    pub count: u64,
    pub total_pages: u64,
    pub page: u64,
    pub items: Vec<report::Model>,
}

pub struct Storage {
    pub db: DatabaseConnection,
}

impl Storage {
    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = Database::connect(database_url).await?;
        Migrator::up(&db, None).await?;
        tracing::info!("database ready");
        Ok(Self { db })
    }

    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<user::Model> {
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            password: Set(password_hash.to_string()),
            created_at: Set(now_millis()),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<user::Model>> {
        Ok(user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn find_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> Result<Option<authorized_device::Model>> {
        Ok(authorized_device::Entity::find()
            .filter(authorized_device::Column::UserId.eq(user_id))
            .filter(authorized_device::Column::DeviceId.eq(device_id))
            .one(&self.db)
            .await?)
    }

    /// Inserts a pending (unapproved) device record.
    pub async fn register_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> Result<authorized_device::Model> {
        let model = authorized_device::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            device_id: Set(device_id.to_string()),
            is_approved: Set(false),
            created_at: Set(now_millis()),
        };
        Ok(model.insert(&self.db).await?)
    }

    pub async fn list_devices(
        &self,
    ) -> Result<Vec<(authorized_device::Model, Option<user::Model>)>> {
        Ok(authorized_device::Entity::find()
            .find_also_related(user::Entity)
            .order_by_desc(authorized_device::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn approve_device(&self, id: Uuid) -> Result<Option<authorized_device::Model>> {
        let Some(device) = authorized_device::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let mut active = device.into_active_model();
        active.is_approved = Set(true);
        Ok(Some(active.update(&self.db).await?))
    }

    /// Removes the record so the device must be registered again.
    pub async fn delete_device(&self, id: Uuid) -> Result<Option<authorized_device::Model>> {
        let Some(device) = authorized_device::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        authorized_device::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(Some(device))
    }

    pub async fn insert_report(&self, model: report::ActiveModel) -> Result<report::Model> {
        Ok(model.insert(&self.db).await?)
    }

    pub async fn update_report(&self, model: report::ActiveModel) -> Result<report::Model> {
        Ok(model.update(&self.db).await?)
    }

    pub async fn find_live_report(
        &self,
        user_id: Uuid,
        report_id: Uuid,
    ) -> Result<Option<report::Model>> {
        Ok(report::Entity::find_by_id(report_id)
            .filter(report::Column::UserId.eq(user_id))
            .filter(report::Column::IsDeleted.eq(false))
            .one(&self.db)
            .await?)
    }

    /// AND of the supplied filters over the user's live reports.
    pub async fn search_reports(
        &self,
        user_id: Uuid,
        service_code: Option<&str>,
        id_number: Option<&str>,
    ) -> Result<Vec<report::Model>> {
        let mut query = report::Entity::find()
            .filter(report::Column::UserId.eq(user_id))
            .filter(report::Column::IsDeleted.eq(false));

        if let Some(code) = service_code {
            query = query.filter(report::Column::ServiceCode.eq(code));
        }
        if let Some(number) = id_number {
            query = query.filter(report::Column::IdNumber.eq(number));
        }

        Ok(query
            .order_by_desc(report::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// `page` is 1-based and clamped to the available range.
    pub async fn page_reports(&self, user_id: Uuid, page: u64, page_size: u64) -> Result<ReportPage> {
        let paginator = report::Entity::find()
            .filter(report::Column::UserId.eq(user_id))
            .filter(report::Column::IsDeleted.eq(false))
            .order_by_desc(report::Column::CreatedAt)
            .order_by_desc(report::Column::Id)
            .paginate(&self.db, page_size.max(1));

        let totals = paginator.num_items_and_pages().await?;
        let page = page.clamp(1, totals.number_of_pages.max(1));
        let items = paginator.fetch_page(page - 1).await?;

        Ok(ReportPage {
            count: totals.number_of_items,
            total_pages: totals.number_of_pages,
            page,
            items,
        })
    }

    pub async fn report_stats(&self, user_id: Uuid) -> Result<Option<report_stats::Model>> {
        Ok(report_stats::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    pub async fn insert_activity(&self, model: activity::ActiveModel) -> Result<activity::Model> {
        Ok(model.insert(&self.db).await?)
    }

    pub async fn recent_activities(&self, user_id: Uuid, limit: u64) -> Result<Vec<activity::Model>> {
        Ok(activity::Entity::find()
            .filter(activity::Column::UserId.eq(user_id))
            .order_by_desc(activity::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn unread_activities(&self, user_id: Uuid) -> Result<Vec<activity::Model>> {
        Ok(activity::Entity::find()
            .filter(activity::Column::UserId.eq(user_id))
            .filter(activity::Column::IsRead.eq(false))
            .order_by_desc(activity::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Returns false when no activity with that id belongs to the user.
    pub async fn mark_activity_read(&self, user_id: Uuid, activity_id: Uuid) -> Result<bool> {
        let result = activity::Entity::update_many()
            .col_expr(activity::Column::IsRead, Expr::value(true))
            .filter(activity::Column::Id.eq(activity_id))
            .filter(activity::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn mark_all_activities_read(&self, user_id: Uuid) -> Result<u64> {
        let result = activity::Entity::update_many()
            .col_expr(activity::Column::IsRead, Expr::value(true))
            .filter(activity::Column::UserId.eq(user_id))
            .filter(activity::Column::IsRead.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
