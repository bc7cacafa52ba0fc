// ABOUTME: SeaORM entities module for database models and relationships
// ABOUTME: Exports entity definitions for users, devices, reports, activities and report stats

pub mod activity;
pub mod authorized_device;
pub mod report;
pub mod report_stats;
pub mod user;

pub use activity::Entity as Activity;
pub use authorized_device::Entity as AuthorizedDevice;
pub use report::Entity as Report;
pub use report_stats::Entity as ReportStats;
pub use user::Entity as User;
