// ABOUTME: Initial migration creating users, authorized_devices, reports and activities
// ABOUTME: Enforces one device record per user and token pair through a unique index

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuthorizedDevices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuthorizedDevices::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AuthorizedDevices::UserId).uuid().not_null())
                    .col(ColumnDef::new(AuthorizedDevices::DeviceId).string().not_null())
                    .col(
                        ColumnDef::new(AuthorizedDevices::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AuthorizedDevices::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_authorized_devices_user_id")
                            .from(AuthorizedDevices::Table, AuthorizedDevices::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_authorized_devices_user_device")
                    .table(AuthorizedDevices::Table)
                    .col(AuthorizedDevices::UserId)
                    .col(AuthorizedDevices::DeviceId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reports::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Reports::UserId).uuid().not_null())
                    .col(ColumnDef::new(Reports::ServiceCode).string().not_null())
                    .col(ColumnDef::new(Reports::IdNumber).string().not_null())
                    .col(ColumnDef::new(Reports::NameAr).string().not_null())
                    .col(ColumnDef::new(Reports::NameEn).string().not_null())
                    .col(ColumnDef::new(Reports::DaysCount).integer().not_null())
                    .col(ColumnDef::new(Reports::EntryDateGregorian).date().not_null())
                    .col(ColumnDef::new(Reports::ExitDateGregorian).date().not_null())
                    .col(ColumnDef::new(Reports::EntryDateHijri).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::ExitDateHijri).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::ReportIssueDate).date())
                    .col(ColumnDef::new(Reports::NationalityAr).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::NationalityEn).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::DoctorNameAr).string().not_null())
                    .col(ColumnDef::new(Reports::DoctorNameEn).string().not_null())
                    .col(ColumnDef::new(Reports::JobTitleAr).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::JobTitleEn).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::HospitalNameAr).string().not_null())
                    .col(ColumnDef::new(Reports::HospitalNameEn).string().not_null())
                    .col(ColumnDef::new(Reports::PrintDate).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::PrintTime).string().not_null().default(""))
                    .col(ColumnDef::new(Reports::IsDeleted).boolean().not_null().default(false))
                    .col(ColumnDef::new(Reports::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Reports::UpdatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reports_user_id")
                            .from(Reports::Table, Reports::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reports_user_lookup")
                    .table(Reports::Table)
                    .col(Reports::UserId)
                    .col(Reports::IsDeleted)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Activities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Activities::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Activities::UserId).uuid().not_null())
                    .col(ColumnDef::new(Activities::ReportId).uuid())
                    .col(ColumnDef::new(Activities::ActivityType).string_len(16).not_null())
                    .col(ColumnDef::new(Activities::Title).string().not_null())
                    .col(ColumnDef::new(Activities::Description).string())
                    .col(ColumnDef::new(Activities::IsRead).boolean().not_null().default(false))
                    .col(ColumnDef::new(Activities::CreatedAt).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_user_id")
                            .from(Activities::Table, Activities::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activities_report_id")
                            .from(Activities::Table, Activities::ReportId)
                            .to(Reports::Table, Reports::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Reports::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(AuthorizedDevices::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Password,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuthorizedDevices {
    Table,
    Id,
    UserId,
    DeviceId,
    IsApproved,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    UserId,
    ServiceCode,
    IdNumber,
    NameAr,
    NameEn,
    DaysCount,
    EntryDateGregorian,
    ExitDateGregorian,
    EntryDateHijri,
    ExitDateHijri,
    ReportIssueDate,
    NationalityAr,
    NationalityEn,
    DoctorNameAr,
    DoctorNameEn,
    JobTitleAr,
    JobTitleEn,
    HospitalNameAr,
    HospitalNameEn,
    PrintDate,
    PrintTime,
    IsDeleted,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Activities {
    Table,
    Id,
    UserId,
    ReportId,
    ActivityType,
    Title,
    Description,
    IsRead,
    CreatedAt,
}
