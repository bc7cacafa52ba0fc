// ABOUTME: SeaORM migration module for database schema management
// ABOUTME: Creates the users, devices, reports and activities tables and the report stats view

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_tables::Migration),
            Box::new(m20250101_000002_create_report_stats_view::Migration),
        ]
    }
}

pub mod m20250101_000001_create_tables;
pub mod m20250101_000002_create_report_stats_view;
