// ABOUTME: Tests for the storage layer and the operations built on it
// ABOUTME: Covers device-gated login, report lifecycle, paging, stats, activities and admin flows

#[cfg(test)]
mod tests {
    use super::super::activity::ActivityLog;
    use super::super::admin::{self, NewUser};
    use super::super::auth::{authorize, reauthenticate};
    use super::super::credentials::{Argon2Verifier, CredentialVerifier};
    use super::super::entities::activity::ActivityKind;
    use super::super::error::{AppError, ValidationReason};
    use super::super::reports::{self, DaysInput, ReportForm, SearchOutcome, SearchQuery};
    use super::super::storage::*;
    use super::super::telemetry::{RecordingTelemetry, TracingTelemetry};
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn create_test_storage() -> (Arc<Storage>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let storage = Storage::connect(&db_url).await.unwrap();

        (Arc::new(storage), temp_dir)
    }

    fn activity_log(storage: &Arc<Storage>) -> ActivityLog {
        ActivityLog::new(storage.clone(), Arc::new(TracingTelemetry))
    }

    fn verifier() -> Argon2Verifier {
        Argon2Verifier::low_cost().unwrap()
    }

    async fn create_user(storage: &Storage, username: &str, password: &str) -> Uuid {
        let hash = verifier().hash(password).unwrap();
        storage.create_user(username, &hash).await.unwrap().id
    }

    async fn approved_user(storage: &Storage, username: &str, device: &str) -> Uuid {
        let user_id = create_user(storage, username, "pw").await;
        let record = storage.register_device(user_id, device).await.unwrap();
        storage.approve_device(record.id).await.unwrap();
        user_id
    }

    fn form(service_code: &str, id_number: &str) -> ReportForm {
        ReportForm {
            service_code: service_code.into(),
            id_number: id_number.into(),
            name_ar: "سارة".into(),
            name_en: "Sara".into(),
            days_count: DaysInput::Number(3),
            entry_date_gregorian: "2025-01-01".into(),
            doctor_name_ar: "د. فهد".into(),
            doctor_name_en: "Dr. Fahad".into(),
            hospital_name_ar: "مستشفى النور".into(),
            hospital_name_en: "Al Noor Hospital".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_user_operations() {
        let (storage, _temp_dir) = create_test_storage().await;

        let id = create_user(&storage, "doctor", "pw").await;
        let found = storage.find_user_by_username("doctor").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(found.password.starts_with("$argon2id$"));

        assert!(storage.find_user_by_username("Doctor").await.unwrap().is_none());
        assert!(storage.find_user_by_id(Uuid::new_v4()).await.unwrap().is_none());

        // Usernames are unique.
        assert!(storage.create_user("doctor", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_user_and_wrong_password_alike() {
        let (storage, _temp_dir) = create_test_storage().await;
        let verifier = verifier();
        create_user(&storage, "doctor", "right").await;

        let unknown = authorize(&storage, &verifier, "nobody", "right", "web_a").await;
        let wrong = authorize(&storage, &verifier, "doctor", "wrong", "web_a").await;

        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
        // No device is registered before the password checks out.
        let user = storage.find_user_by_username("doctor").await.unwrap().unwrap();
        assert!(storage.find_device(user.id, "web_a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_new_device_registers_once_and_waits_for_approval() {
        let (storage, _temp_dir) = create_test_storage().await;
        let verifier = verifier();
        let user_id = create_user(&storage, "doctor", "pw").await;

        let first = authorize(&storage, &verifier, "doctor", "pw", "web_a").await;
        assert!(matches!(
            first,
            Err(AppError::DeviceNotAuthorized {
                newly_registered: true
            })
        ));

        let second = authorize(&storage, &verifier, "doctor", "pw", "web_a").await;
        assert!(matches!(
            second,
            Err(AppError::DeviceNotAuthorized {
                newly_registered: false
            })
        ));

        let devices = storage.list_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        let (device, owner) = &devices[0];
        assert!(!device.is_approved);
        assert_eq!(owner.as_ref().unwrap().id, user_id);

        storage.approve_device(device.id).await.unwrap();
        let identity = authorize(&storage, &verifier, "doctor", "pw", "web_a")
            .await
            .unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.username, "doctor");
        assert_eq!(identity.device_id, "web_a");
    }

    #[tokio::test]
    async fn test_reauthenticate_requires_approved_device() {
        let (storage, _temp_dir) = create_test_storage().await;
        let user_id = approved_user(&storage, "doctor", "web_ok").await;
        storage.register_device(user_id, "web_pending").await.unwrap();

        assert!(reauthenticate(&storage, user_id, "web_ok").await.is_ok());
        assert!(matches!(
            reauthenticate(&storage, user_id, "web_pending").await,
            Err(AppError::DeviceNotAuthorized { .. })
        ));
        assert!(reauthenticate(&storage, user_id, "web_unknown").await.is_err());
        assert!(reauthenticate(&storage, Uuid::new_v4(), "web_ok").await.is_err());
    }

    #[tokio::test]
    async fn test_create_report_derives_dates_and_logs_add() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;

        let id = reports::create(&storage, &log, user_id, &form("SC1", "100"))
            .await
            .unwrap();
        let saved = storage.find_live_report(user_id, id).await.unwrap().unwrap();

        assert!(!saved.is_deleted);
        assert_eq!(saved.exit_date_gregorian.to_string(), "2025-01-03");
        assert_eq!(saved.entry_date_hijri, "01/07/1446");
        assert_eq!(saved.exit_date_hijri, "03/07/1446");

        let recent = log.recent(user_id, 5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].activity_type, ActivityKind::Add);
        assert_eq!(recent[0].report_id, Some(id));
    }

    #[tokio::test]
    async fn test_search_outcomes_and_filters() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;
        let other_id = approved_user(&storage, "other", "web_b").await;

        reports::create(&storage, &log, user_id, &form("SC1", "100")).await.unwrap();
        reports::create(&storage, &log, user_id, &form("SC1", "200")).await.unwrap();
        reports::create(&storage, &log, other_id, &form("SC9", "900")).await.unwrap();

        let blank = SearchQuery {
            service_code: Some("  ".into()),
            id_number: None,
        };
        assert!(matches!(
            reports::search(&storage, user_id, &blank).await,
            Err(AppError::Validation { .. })
        ));

        let by_code = SearchQuery {
            service_code: Some("SC1".into()),
            id_number: None,
        };
        match reports::search(&storage, user_id, &by_code).await.unwrap() {
            SearchOutcome::Multiple(found) => assert_eq!(found.len(), 2),
            other => panic!("expected multiple, got {:?}", other),
        }

        let both = SearchQuery {
            service_code: Some("SC1".into()),
            id_number: Some("200".into()),
        };
        match reports::search(&storage, user_id, &both).await.unwrap() {
            SearchOutcome::Single(found) => assert_eq!(found.id_number, "200"),
            other => panic!("expected single, got {:?}", other),
        }

        let mismatched = SearchQuery {
            service_code: Some("SC1".into()),
            id_number: Some("900".into()),
        };
        assert_eq!(
            reports::search(&storage, user_id, &mismatched).await.unwrap(),
            SearchOutcome::NotFound
        );

        // Another user's report is invisible.
        let foreign = SearchQuery {
            service_code: Some("SC9".into()),
            id_number: None,
        };
        assert_eq!(
            reports::search(&storage, user_id, &foreign).await.unwrap(),
            SearchOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_update_validation_leaves_row_untouched() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;
        let id = reports::create(&storage, &log, user_id, &form("SC1", "100"))
            .await
            .unwrap();
        let before = storage.find_live_report(user_id, id).await.unwrap().unwrap();

        let mut edit = form("SC1", "100");
        edit.entry_date_hijri = "01/07/1446".into();
        edit.name_ar = String::new();
        edit.doctor_name_en = String::new();

        match reports::update(&storage, &log, user_id, id, &edit).await {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "name_ar"),
            other => panic!("expected validation error, got {:?}", other),
        }

        let after = storage.find_live_report(user_id, id).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_update_recomputes_exit_date_and_logs_edit() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;
        let id = reports::create(&storage, &log, user_id, &form("SC1", "100"))
            .await
            .unwrap();
        let before = storage.find_live_report(user_id, id).await.unwrap().unwrap();

        let mut edit = form("SC1", "100");
        edit.entry_date_hijri = "01/07/1446".into();
        edit.days_count = DaysInput::Text("10".into());
        edit.name_en = "Sara Updated".into();

        let saved = reports::update(&storage, &log, user_id, id, &edit).await.unwrap();
        assert_eq!(saved.days_count, 10);
        assert_eq!(saved.exit_date_gregorian.to_string(), "2025-01-10");
        assert_eq!(saved.name_en, "Sara Updated");
        assert!(saved.updated_at >= before.updated_at);
        assert_eq!(saved.created_at, before.created_at);

        let kinds: Vec<ActivityKind> = log
            .recent(user_id, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.activity_type)
            .collect();
        assert!(kinds.contains(&ActivityKind::Edit));
    }

    #[tokio::test]
    async fn test_update_rederives_entry_hijri_when_entry_date_moves() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;
        let id = reports::create(&storage, &log, user_id, &form("SC1", "100"))
            .await
            .unwrap();

        // Same entry date: the Hijri value is kept as sent.
        let mut edit = form("SC1", "100");
        edit.entry_date_hijri = "02/07/1446".into();
        let saved = reports::update(&storage, &log, user_id, id, &edit).await.unwrap();
        assert_eq!(saved.entry_date_hijri, "02/07/1446");

        // Moved entry date with the old Hijri value resent.
        let mut edit = form("SC1", "100");
        edit.entry_date_gregorian = "2025-03-01".into();
        edit.entry_date_hijri = "02/07/1446".into();
        let saved = reports::update(&storage, &log, user_id, id, &edit).await.unwrap();
        assert_eq!(saved.entry_date_hijri, "01/09/1446");
        assert_eq!(saved.exit_date_gregorian.to_string(), "2025-03-03");
    }

    #[tokio::test]
    async fn test_create_rejects_day_count_beyond_calendar() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;

        let mut huge = form("SC1", "100");
        huge.days_count = DaysInput::Number(2_000_000_000);
        assert!(matches!(
            reports::create(&storage, &log, user_id, &huge).await,
            Err(AppError::Validation { ref field, reason: ValidationReason::Invalid })
                if field == "days_count"
        ));
        assert_eq!(reports::list(&storage, user_id, 1).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_report_and_updates_stats() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;
        let other_id = approved_user(&storage, "other", "web_b").await;

        let empty = reports::stats(&storage, user_id).await.unwrap();
        assert_eq!(empty, reports::ReportStats::default());

        let keep = reports::create(&storage, &log, user_id, &form("SC1", "100"))
            .await
            .unwrap();
        let gone = reports::create(&storage, &log, user_id, &form("SC2", "200"))
            .await
            .unwrap();

        // Only the owner may delete.
        assert!(matches!(
            reports::soft_delete(&storage, &log, other_id, gone).await,
            Err(AppError::NotFound(_))
        ));

        reports::soft_delete(&storage, &log, user_id, gone).await.unwrap();
        assert!(storage.find_live_report(user_id, gone).await.unwrap().is_none());
        assert!(storage.find_live_report(user_id, keep).await.unwrap().is_some());

        let query = SearchQuery {
            service_code: Some("SC2".into()),
            id_number: None,
        };
        assert_eq!(
            reports::search(&storage, user_id, &query).await.unwrap(),
            SearchOutcome::NotFound
        );

        let page = reports::list(&storage, user_id, 1).await.unwrap();
        assert_eq!(page.count, 1);

        let stats = reports::stats(&storage, user_id).await.unwrap();
        assert_eq!(stats.total_reports, 2);
        assert_eq!(stats.active_reports, 1);
        assert_eq!(stats.deleted_reports, 1);
        assert!(stats.last_report_at.is_some());

        // A second delete finds nothing live.
        assert!(reports::soft_delete(&storage, &log, user_id, gone).await.is_err());
    }

    #[tokio::test]
    async fn test_pagination_clamps_pages() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;

        let empty = reports::list(&storage, user_id, 4).await.unwrap();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.page, 1);
        assert!(empty.reports.is_empty());

        for n in 0..12 {
            reports::create(&storage, &log, user_id, &form("SC", &n.to_string()))
                .await
                .unwrap();
        }

        let first = reports::list(&storage, user_id, 0).await.unwrap();
        assert_eq!(first.count, 12);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.page, 1);
        assert_eq!(first.reports.len(), 5);
        assert!(first
            .reports
            .windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at));

        let last = reports::list(&storage, user_id, 99).await.unwrap();
        assert_eq!(last.page, 3);
        assert_eq!(last.reports.len(), 2);
    }

    #[tokio::test]
    async fn test_activity_reads_and_marking() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let user_id = approved_user(&storage, "doctor", "web_a").await;
        let other_id = approved_user(&storage, "other", "web_b").await;

        for n in 0..7 {
            log.record(user_id, ActivityKind::View, format!("view {n}"), None, None)
                .await;
        }
        log.record(other_id, ActivityKind::View, "other", None, None).await;

        assert_eq!(log.recent(user_id, 5).await.unwrap().len(), 5);
        let unread = log.unread(user_id).await.unwrap();
        assert_eq!(unread.len(), 7);

        // Marking another user's activity is refused.
        assert!(matches!(
            log.mark_read(other_id, unread[0].id).await,
            Err(AppError::NotFound(_))
        ));

        log.mark_read(user_id, unread[0].id).await.unwrap();
        assert_eq!(log.unread(user_id).await.unwrap().len(), 6);

        assert_eq!(log.mark_all_read(user_id).await.unwrap(), 6);
        assert!(log.unread(user_id).await.unwrap().is_empty());
        assert_eq!(log.unread(other_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_activity_failure_is_swallowed_and_reported() {
        let (storage, _temp_dir) = create_test_storage().await;
        let telemetry = RecordingTelemetry::default();
        let log = ActivityLog::new(storage.clone(), Arc::new(telemetry.clone()));

        // Unknown owner violates the foreign key.
        log.record(Uuid::new_v4(), ActivityKind::System, "orphan", None, None)
            .await;

        let events = telemetry.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "activity.record");
    }

    #[tokio::test]
    async fn test_admin_user_creation_rules() {
        let (storage, _temp_dir) = create_test_storage().await;
        let verifier = verifier();

        let mismatch = NewUser {
            username: "nurse".into(),
            password: "a".into(),
            confirm_password: "b".into(),
        };
        let err = admin::add_user(&storage, &verifier, &mismatch).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation { ref field, reason: ValidationReason::Mismatch }
                if field == "confirm_password"
        ));
        assert_eq!(err.localized(), "كلمة المرور وتأكيد كلمة المرور غير متطابقين");

        let ok = NewUser {
            username: "nurse".into(),
            password: "a".into(),
            confirm_password: "a".into(),
        };
        let created = admin::add_user(&storage, &verifier, &ok).await.unwrap();
        assert_ne!(created.password, "a");
        assert!(verifier.verify("a", &created.password).unwrap());

        let err = admin::add_user(&storage, &verifier, &ok).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation { ref field, reason: ValidationReason::Duplicate }
                if field == "username"
        ));
        assert_eq!(err.localized(), "اسم المستخدم موجود بالفعل");
    }

    #[tokio::test]
    async fn test_admin_approve_notifies_and_reject_forces_reregistration() {
        let (storage, _temp_dir) = create_test_storage().await;
        let log = activity_log(&storage);
        let verifier = verifier();
        let user_id = create_user(&storage, "doctor", "pw").await;

        let _ = authorize(&storage, &verifier, "doctor", "pw", "web_a").await;
        let device = storage.find_device(user_id, "web_a").await.unwrap().unwrap();

        let approved = admin::approve_device(&storage, &log, device.id).await.unwrap();
        assert!(approved.is_approved);
        let notices = log.unread(user_id).await.unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].activity_type, ActivityKind::System);

        let summaries = admin::list_devices(&storage).await.unwrap();
        assert_eq!(summaries[0].username.as_deref(), Some("doctor"));

        admin::reject_device(&storage, device.id).await.unwrap();
        assert!(matches!(
            authorize(&storage, &verifier, "doctor", "pw", "web_a").await,
            Err(AppError::DeviceNotAuthorized {
                newly_registered: true
            })
        ));

        assert!(matches!(
            admin::approve_device(&storage, &log, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
