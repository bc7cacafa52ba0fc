// ABOUTME: Creates the report_stats view with per-user report counters
// ABOUTME: View DDL differs between SQLite and PostgreSQL so it is issued per backend

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

const VIEW_BODY: &str = "SELECT user_id, \
     COUNT(*) AS total_reports, \
     SUM(CASE WHEN is_deleted THEN 0 ELSE 1 END) AS active_reports, \
     SUM(CASE WHEN is_deleted THEN 1 ELSE 0 END) AS deleted_reports, \
     MAX(created_at) AS last_report_at \
     FROM reports GROUP BY user_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let ddl = match manager.get_database_backend() {
            DatabaseBackend::Postgres => format!("CREATE OR REPLACE VIEW report_stats AS {VIEW_BODY}"),
            _ => format!("CREATE VIEW IF NOT EXISTS report_stats AS {VIEW_BODY}"),
        };
        manager.get_connection().execute_unprepared(&ddl).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP VIEW IF EXISTS report_stats")
            .await?;
        Ok(())
    }
}
