//! Study activity and absence request tests with mock server

use chrono::NaiveDate;
use classgate::auth::AnonKeyProvider;
use classgate::baas::{AbsenceStatus, BaasClient};
use classgate::config::BackendConfig;
use classgate::error::{AppError, StoreError, ValidationError};
use classgate::records::{AbsenceStore, EventForm, EventStore};
use classgate::report::{Week, aggregate};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(mock_server: &MockServer) -> Arc<BaasClient> {
    let config = BackendConfig {
        url: mock_server.uri(),
        anon_key: Some("anon-key".to_string()),
        timeout_secs: 5,
        max_retries: 0,
        verify_ssl: true,
    };
    let auth = AnonKeyProvider::new("anon-key").unwrap();
    Arc::new(BaasClient::new(&config, Box::new(auth)).unwrap())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =============================================================================
// Study activities
// =============================================================================

mod events {
    use super::*;

    #[tokio::test]
    async fn test_list_week_bounds() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .and(query_param("owner_id", "eq.u-1"))
            .and(query_param("date", "gte.2025-03-03"))
            .and(query_param("order", "date.asc,created_at.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1, "owner_id": "u-1", "title": "Reading",
                    "category": "기초 역량 강화", "date": "2025-03-04", "duration_min": 30
                }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = EventStore::new(create_test_client(&mock_server));
        let events = store
            .list_week("u-1", Week::containing(date(2025, 3, 5)))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "1");
        assert_eq!(events[0].minutes(), 30);
    }

    #[tokio::test]
    async fn test_list_range_feeds_aggregation() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "owner_id": "u-1", "date": "2025-03-03", "category": "기초 역량 강화", "duration_min": 30 },
                { "owner_id": "u-1", "date": "2025-03-04", "category": "진로 탐색", "duration_min": 20 },
                { "owner_id": "u-2", "date": "2025-03-04", "category": "진로 탐색", "duration_min": null }
            ])))
            .mount(&mock_server)
            .await;

        let store = EventStore::new(create_test_client(&mock_server));
        let events = store
            .list_range(date(2025, 3, 3), date(2025, 3, 9))
            .await
            .unwrap();
        let totals = aggregate(&events);

        assert_eq!(totals["u-1"].total, 50);
        assert_eq!(totals["u-1"].basic, 30);
        assert_eq!(totals["u-1"].career, 20);
        assert_eq!(totals["u-2"].total, 0);
    }

    #[tokio::test]
    async fn test_insert_sends_validated_row() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/events"))
            .and(body_json(json!({
                "owner_id": "u-1",
                "title": "Reading",
                "category": "기초 역량 강화",
                "date": "2025-03-04",
                "duration_min": 40
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": 9, "owner_id": "u-1", "title": "Reading",
                "category": "기초 역량 강화", "date": "2025-03-04", "duration_min": 40
            }])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = EventStore::new(create_test_client(&mock_server));
        let form = EventForm {
            title: " Reading ".into(),
            description: String::new(),
            category: "기초 역량 강화".into(),
            date: Some(date(2025, 3, 4)),
            minutes: "40".into(),
        };
        let stored = store.insert("u-1", &form).await.unwrap();

        assert_eq!(stored.id, "9");
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_backend() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let store = EventStore::new(create_test_client(&mock_server));
        let form = EventForm {
            title: "Reading".into(),
            minutes: "-5".into(),
            category: "기초 역량 강화".into(),
            date: Some(date(2025, 3, 4)),
            ..EventForm::default()
        };
        let result = store.insert("u-1", &form).await;

        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::NotPositive { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/events"))
            .and(query_param("id", "eq.9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = EventStore::new(create_test_client(&mock_server));
        store.delete("9").await.unwrap();
    }
}

// =============================================================================
// Absence requests
// =============================================================================

mod absences {
    use super::*;

    #[tokio::test]
    async fn test_submit_is_always_pending() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/absences"))
            .and(body_json(json!({
                "student_id": "u-1",
                "date": "2025-03-07",
                "reason": "Dentist",
                "status": "pending"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
                "id": 3, "student_id": "u-1", "date": "2025-03-07",
                "reason": "Dentist", "status": "pending"
            }])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = AbsenceStore::new(create_test_client(&mock_server));
        let absence = store.submit("u-1", date(2025, 3, 7), "Dentist").await.unwrap();

        assert_eq!(absence.status, AbsenceStatus::Pending);
    }

    #[tokio::test]
    async fn test_list_mine_newest_first() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/absences"))
            .and(query_param("student_id", "eq.u-1"))
            .and(query_param("order", "date.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 5, "student_id": "u-1", "date": "2025-03-10", "reason": "Trip", "status": "pending" },
                { "id": 3, "student_id": "u-1", "date": "2025-03-07", "reason": "Dentist", "status": "approved" }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = AbsenceStore::new(create_test_client(&mock_server));
        let rows = store.list_mine("u-1").await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].status, AbsenceStatus::Approved);
    }

    #[tokio::test]
    async fn test_list_all_joins_student_names() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/absences"))
            .and(query_param("order", "created_at.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": 4, "student_id": "u-2", "date": "2025-03-08", "reason": "Sick", "status": null },
                { "id": 3, "student_id": "u-1", "date": "2025-03-07", "reason": "Dentist", "status": "approved" }
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "u-1", "name": "Kim" }
            ])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = AbsenceStore::new(create_test_client(&mock_server));
        let rows = store.list_all().await.unwrap();

        assert_eq!(rows[0].status, AbsenceStatus::Pending);
        assert_eq!(rows[0].student_name, None);
        assert_eq!(rows[1].student_name.as_deref(), Some("Kim"));
    }

    #[tokio::test]
    async fn test_set_status_writes_status_only() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/absences"))
            .and(query_param("id", "eq.3"))
            .and(body_json(json!({ "status": "rejected" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 3, "student_id": "u-1", "date": "2025-03-07",
                "reason": "Dentist", "status": "rejected"
            }])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = AbsenceStore::new(create_test_client(&mock_server));
        let updated = store.set_status("3", AbsenceStatus::Rejected).await.unwrap();

        assert_eq!(updated.status, AbsenceStatus::Rejected);
    }

    #[tokio::test]
    async fn test_set_status_on_missing_row() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/absences"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let store = AbsenceStore::new(create_test_client(&mock_server));
        let result = store.set_status("99", AbsenceStatus::Approved).await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
