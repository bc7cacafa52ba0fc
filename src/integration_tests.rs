// ABOUTME: Integration tests for the HTTP API and the front-end client
// ABOUTME: Exercises login gating, report endpoints, exports, activities and admin routes end to end

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::client::{ClientError, SickLeaveClient};
    use crate::credentials::Argon2Verifier;
    use crate::local_store::LocalStore;
    use crate::telemetry::TracingTelemetry;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::{TestResponse, TestServer};
    use serde_json::{Value, json};
    use serial_test::serial;
    use tempfile::TempDir;

    const ADMIN_TOKEN: &str = "test-admin-token";

    async fn create_test_app() -> (TestServer, AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_url = format!("sqlite:{}?mode=rwc", temp_dir.path().join("test.db").display());
        let storage = Storage::connect(&db_url).await.unwrap();

        let mut settings = Settings::defaults().unwrap();
        settings.admin.token = ADMIN_TOKEN.to_string();

        let state = AppState::new(
            storage,
            settings,
            Arc::new(Argon2Verifier::low_cost().unwrap()),
            Arc::new(TracingTelemetry),
        );

        let server = TestServer::new(router(state.clone())).unwrap();
        (server, state, temp_dir)
    }

    fn admin_header() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static("x-admin-token"),
            HeaderValue::from_static(ADMIN_TOKEN),
        )
    }

    async fn admin_create_user(server: &TestServer, username: &str, password: &str) {
        let (name, value) = admin_header();
        server
            .post("/admin/users")
            .add_header(name, value)
            .json(&json!({
                "username": username,
                "password": password,
                "confirm_password": password,
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    async fn login(server: &TestServer, username: &str, password: &str, device: &str) -> TestResponse {
        server
            .post("/auth/login")
            .json(&json!({
                "username": username,
                "password": password,
                "device_id": device,
            }))
            .await
    }

    async fn approve_all_devices(server: &TestServer) {
        let (name, value) = admin_header();
        let devices: Vec<Value> = server
            .get("/admin/devices")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        for device in devices {
            let id = device["id"].as_str().unwrap();
            server
                .post(&format!("/admin/devices/{}/approve", id))
                .add_header(name.clone(), value.clone())
                .await
                .assert_status_ok();
        }
    }

    /// Creates a user, approves its device and returns the successful login response.
    async fn signed_in(server: &TestServer) -> TestResponse {
        admin_create_user(server, "doctor", "pw").await;
        login(server, "doctor", "pw", "web_test").await;
        approve_all_devices(server).await;

        let response = login(server, "doctor", "pw", "web_test").await;
        response.assert_status_ok();
        response
    }

    fn report_body(service_code: &str, id_number: &str) -> Value {
        json!({
            "service_code": service_code,
            "id_number": id_number,
            "name_ar": "ليلى",
            "name_en": "Layla",
            "days_count": "3",
            "entry_date_gregorian": "2025-03-01",
            "doctor_name_ar": "د. عمر",
            "doctor_name_en": "Dr. Omar",
            "hospital_name_ar": "مستشفى الأمل",
            "hospital_name_en": "Al Amal Hospital",
        })
    }

    #[tokio::test]
    #[serial]
    async fn test_protected_routes_require_session() {
        let (server, _state, _dir) = create_test_app().await;

        server.get("/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);
        server.get("/reports").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/activities/unread")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_admin_routes_require_token() {
        let (server, _state, _dir) = create_test_app().await;

        server.get("/admin/users").await.assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/admin/devices")
            .add_header(
                HeaderName::from_static("x-admin-token"),
                HeaderValue::from_static("wrong"),
            )
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_login_registers_device_then_succeeds_after_approval() {
        let (server, _state, _dir) = create_test_app().await;
        admin_create_user(&server, "doctor", "pw").await;

        let wrong = login(&server, "doctor", "nope", "web_1").await;
        wrong.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.json::<Value>()["error"], "invalid_credentials");

        let first = login(&server, "doctor", "pw", "web_1").await;
        first.assert_status(StatusCode::FORBIDDEN);
        let first_body: Value = first.json();
        assert_eq!(first_body["error"], "device_not_authorized");

        let pending = login(&server, "doctor", "pw", "web_1").await;
        pending.assert_status(StatusCode::FORBIDDEN);
        assert_ne!(pending.json::<Value>()["message"], first_body["message"]);

        let (name, value) = admin_header();
        let devices: Vec<Value> = server
            .get("/admin/devices")
            .add_header(name, value)
            .await
            .json();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["username"], "doctor");
        assert_eq!(devices[0]["is_approved"], false);

        approve_all_devices(&server).await;

        let ok = login(&server, "doctor", "pw", "web_1").await;
        ok.assert_status_ok();
        let cookie = ok.cookie(session::SESSION_COOKIE_NAME);
        assert!(cookie.http_only().unwrap_or(false));

        let me: Value = server.get("/auth/me").add_cookie(cookie).await.json();
        assert_eq!(me["username"], "doctor");
        assert_eq!(me["device_id"], "web_1");
    }

    #[tokio::test]
    #[serial]
    async fn test_logout_ends_session() {
        let (server, _state, _dir) = create_test_app().await;
        let cookie = signed_in(&server).await.cookie(session::SESSION_COOKIE_NAME);

        server
            .post("/auth/logout")
            .add_cookie(cookie.clone())
            .await
            .assert_status_ok();
        server
            .get("/auth/me")
            .add_cookie(cookie)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_report_lifecycle_over_http() {
        let (server, _state, _dir) = create_test_app().await;
        let cookie = signed_in(&server).await.cookie(session::SESSION_COOKIE_NAME);

        let created = server
            .post("/reports")
            .add_cookie(cookie.clone())
            .json(&report_body("SC-5", "555"))
            .await;
        created.assert_status(StatusCode::CREATED);
        let id = created.json::<Value>()["id"].as_str().unwrap().to_string();

        let fetched: Value = server
            .get(&format!("/reports/{}", id))
            .add_cookie(cookie.clone())
            .await
            .json();
        assert_eq!(fetched["exit_date_gregorian"], "2025-03-03");
        assert_eq!(fetched["entry_date_hijri"], "01/09/1446");

        let found: Value = server
            .post("/reports/search")
            .add_cookie(cookie.clone())
            .json(&json!({"id_number": "555"}))
            .await
            .json();
        assert_eq!(found["outcome"], "single");
        assert_eq!(found["reports"]["id"], id.as_str());

        server
            .post("/reports/search")
            .add_cookie(cookie.clone())
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let mut invalid = report_body("SC-5", "555");
        invalid["entry_date_hijri"] = json!("01/09/1446");
        invalid["hospital_name_en"] = json!("");
        let rejected = server
            .put(&format!("/reports/{}", id))
            .add_cookie(cookie.clone())
            .json(&invalid)
            .await;
        rejected.assert_status(StatusCode::BAD_REQUEST);
        assert!(rejected.json::<Value>()["message"]
            .as_str()
            .unwrap()
            .contains("hospital_name_en"));

        let unchanged: Value = server
            .get(&format!("/reports/{}", id))
            .add_cookie(cookie.clone())
            .await
            .json();
        assert_eq!(unchanged["hospital_name_en"], "Al Amal Hospital");

        server
            .post(&format!("/reports/{}/delete", id))
            .add_cookie(cookie.clone())
            .await
            .assert_status_ok();
        server
            .get(&format!("/reports/{}", id))
            .add_cookie(cookie.clone())
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let stats: Value = server
            .get("/reports/stats")
            .add_cookie(cookie.clone())
            .await
            .json();
        assert_eq!(stats["total_reports"], 1);
        assert_eq!(stats["deleted_reports"], 1);

        let kinds: Vec<String> = server
            .get("/activities?limit=10")
            .add_cookie(cookie)
            .await
            .json::<Value>()["activities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["activity_type"].as_str().unwrap().to_string())
            .collect();
        for kind in ["add", "view", "delete"] {
            assert!(kinds.iter().any(|k| k == kind), "missing {kind} activity");
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_fetched_report_can_be_sent_back_for_update() {
        let (server, _state, _dir) = create_test_app().await;
        let cookie = signed_in(&server).await.cookie(session::SESSION_COOKIE_NAME);

        let created = server
            .post("/reports")
            .add_cookie(cookie.clone())
            .json(&report_body("SC-7", "777"))
            .await;
        let id = created.json::<Value>()["id"].as_str().unwrap().to_string();

        let mut cleared = report_body("SC-7", "777");
        cleared["entry_date_hijri"] = json!("01/09/1446");
        cleared["report_issue_date"] = json!("");
        server
            .put(&format!("/reports/{}", id))
            .add_cookie(cookie.clone())
            .json(&cleared)
            .await
            .assert_status_ok();

        let mut fetched: Value = server
            .get(&format!("/reports/{}", id))
            .add_cookie(cookie.clone())
            .await
            .json();
        assert!(fetched["report_issue_date"].is_null());

        fetched["name_en"] = json!("Layla Edited");
        let saved: Value = server
            .put(&format!("/reports/{}", id))
            .add_cookie(cookie.clone())
            .json(&fetched)
            .await
            .json();
        assert_eq!(saved["name_en"], "Layla Edited");
        assert_eq!(saved["exit_date_gregorian"], "2025-03-03");
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_bodies_get_localized_errors() {
        let (server, _state, _dir) = create_test_app().await;
        let cookie = signed_in(&server).await.cookie(session::SESSION_COOKIE_NAME);

        let mut bad = report_body("SC-8", "888");
        bad["days_count"] = json!({"value": 3});
        let response = server
            .post("/reports")
            .add_cookie(cookie)
            .json(&bad)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");
        assert_eq!(body["status"], 400);

        let (name, value) = admin_header();
        let duplicate = server
            .post("/admin/users")
            .add_header(name, value)
            .json(&json!({
                "username": "doctor",
                "password": "pw",
                "confirm_password": "pw",
            }))
            .await;
        duplicate.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(duplicate.json::<Value>()["message"], "اسم المستخدم موجود بالفعل");
    }

    #[tokio::test]
    #[serial]
    async fn test_list_pages_of_five() {
        let (server, _state, _dir) = create_test_app().await;
        let cookie = signed_in(&server).await.cookie(session::SESSION_COOKIE_NAME);

        for n in 0..6 {
            server
                .post("/reports")
                .add_cookie(cookie.clone())
                .json(&report_body("SC", &format!("id{n}")))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let page: Value = server
            .get("/reports?page=2")
            .add_cookie(cookie.clone())
            .await
            .json();
        assert_eq!(page["count"], 6);
        assert_eq!(page["total_pages"], 2);
        assert_eq!(page["reports"].as_array().unwrap().len(), 1);

        let clamped: Value = server
            .get("/reports?page=50")
            .add_cookie(cookie)
            .await
            .json();
        assert_eq!(clamped["page"], 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_exports_return_named_files_and_record_downloads() {
        let (server, _state, _dir) = create_test_app().await;
        let cookie = signed_in(&server).await.cookie(session::SESSION_COOKIE_NAME);
        let payload = serde_json::to_value(crate::export::sample_payload()).unwrap();

        let pptx = server
            .post("/generate-pptx")
            .add_cookie(cookie.clone())
            .json(&payload)
            .await;
        pptx.assert_status_ok();
        assert!(pptx.as_bytes().starts_with(b"PK"));
        let disposition = pptx.header("content-disposition");
        let disposition = disposition.to_str().unwrap();
        assert!(disposition.contains("1098765432.pptx"));
        assert!(disposition.contains("filename*=UTF-8''sickLeaves_"));

        let pdf = server.post("/generate-pdf").json(&payload).await;
        pdf.assert_status_ok();
        assert_eq!(pdf.header("content-type"), "application/pdf");
        assert!(pdf.as_bytes().starts_with(b"%PDF"));

        // Only the signed-in download is attributed.
        let unread: Value = server
            .get("/activities/unread")
            .add_cookie(cookie.clone())
            .await
            .json();
        let downloads = unread["activities"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|a| a["activity_type"] == "download")
            .count();
        assert_eq!(downloads, 1);

        server
            .post("/activities/read-all")
            .add_cookie(cookie.clone())
            .await
            .assert_status_ok();
        let unread: Value = server
            .get("/activities/unread")
            .add_cookie(cookie)
            .await
            .json();
        assert!(unread["activities"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_client_login_and_biometric_reentry() {
        let (_server, state, dir) = create_test_app().await;

        admin::add_user(
            &state.storage,
            state.verifier.as_ref(),
            &admin::NewUser {
                username: "doctor".into(),
                password: "pw".into(),
                confirm_password: "pw".into(),
            },
        )
        .await
        .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move { axum::serve(listener, app).await });

        let store = LocalStore::open(dir.path().join("client.json")).unwrap();
        let mut client = SickLeaveClient::new(format!("http://{}", addr), store).unwrap();

        assert!(matches!(
            client.biometric_login().await,
            Err(ClientError::NoCachedIdentity)
        ));
        assert!(matches!(
            client.login("doctor", "bad").await,
            Err(ClientError::InvalidCredentials)
        ));
        assert!(matches!(
            client.login("doctor", "pw").await,
            Err(ClientError::DeviceNotAuthorized(_))
        ));

        let devices = admin::list_devices(&state.storage).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_id, client.device_id().unwrap());
        admin::approve_device(&state.storage, &state.activity, devices[0].id)
            .await
            .unwrap();

        let login = client.login("doctor", "pw").await.unwrap();
        assert_eq!(login.username, "doctor");
        assert!(client.session().identity().is_some());

        assert!(matches!(
            client.biometric_login().await,
            Err(ClientError::BiometricDisabled)
        ));
        client.set_biometric_enabled(true).unwrap();
        client.biometric_login().await.unwrap();

        admin::reject_device(&state.storage, devices[0].id).await.unwrap();
        assert!(matches!(
            client.biometric_login().await,
            Err(ClientError::DeviceNotAuthorized(_))
        ));
        assert!(client.session().identity().is_none());
    }
}
