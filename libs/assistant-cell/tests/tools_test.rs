use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assistant_cell::registry::{BOOK_APPOINTMENT, CANCEL_APPOINTMENT, LIST_APPOINTMENTS, CHECK_AVAILABILITY};
use assistant_cell::router::assistant_routes;
use assistant_cell::services::tools::AssistantToolService;
use shared_models::auth::{Actor, Role};
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const TOKEN: &str = "test-token";

fn tool_service(server: &MockServer) -> AssistantToolService {
    let config = TestConfig::with_supabase_url(&server.uri()).to_app_config();
    AssistantToolService::new(&config)
}

#[tokio::test]
async fn booking_tool_defaults_duration_and_room() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    // One hour from the resolved start, in the default room.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({
            "start_time": "2025-12-10T16:00:00",
            "end_time": "2025-12-10T17:00:00",
            "room_id": 1
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                42,
                "2025-12-10T16:00:00",
                "2025-12-10T17:00:00",
                3,
                2,
                1
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = tool_service(&server);
    let admin = Actor::new(1, Role::Admin);

    let result = service
        .execute(
            BOOK_APPOINTMENT,
            json!({ "patient_id": 3, "psychologist_id": 2, "start_time": "2025-12-10T16:00" }),
            &admin,
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(result, json!("ÉXITO: Cita agendada con ID 42"));
}

#[tokio::test]
async fn booking_tool_reports_conflicts_as_tool_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("psychologist_id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                7,
                "2025-12-10T16:00:00",
                "2025-12-10T17:00:00",
                5,
                2,
                1
            )
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = tool_service(&server);
    let admin = Actor::new(1, Role::Admin);

    let result = service
        .execute(
            BOOK_APPOINTMENT,
            json!({ "patient_id": 3, "psychologist_id": 2, "start_time": "2025-12-10T16:30:00" }),
            &admin,
            TOKEN,
        )
        .await
        .unwrap();

    assert_eq!(result, json!("ERROR AL AGENDAR: Psicólogo ocupado."));
}

#[tokio::test]
async fn booking_tool_rejects_unresolved_dates() {
    let server = MockServer::start().await;
    let service = tool_service(&server);
    let admin = Actor::new(1, Role::Admin);

    let result = service
        .execute(
            BOOK_APPOINTMENT,
            json!({ "patient_id": 3, "psychologist_id": 2, "start_time": "próximo lunes" }),
            &admin,
            TOKEN,
        )
        .await
        .unwrap();

    let text = result.as_str().unwrap();
    assert!(text.starts_with("ERROR AL AGENDAR: Error al procesar datos de la IA:"));
}

#[tokio::test]
async fn patients_cannot_invoke_staff_tools() {
    let server = MockServer::start().await;
    let service = tool_service(&server);
    let patient = Actor::new(3, Role::Patient);

    let err = service
        .execute(
            BOOK_APPOINTMENT,
            json!({ "patient_id": 3, "psychologist_id": 2, "start_time": "2025-12-10T16:00:00" }),
            &patient,
            TOKEN,
        )
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));

    let err = service
        .execute(CANCEL_APPOINTMENT, json!({ "appointment_id": 10 }), &patient, TOKEN)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));
}

#[tokio::test]
async fn unknown_tools_are_rejected_by_the_registry() {
    let server = MockServer::start().await;
    let service = tool_service(&server);
    let admin = Actor::new(1, Role::Admin);

    // A name outside the permission matrix never reaches dispatch.
    let err = service
        .execute("format_hard_drive", json!({}), &admin, TOKEN)
        .await
        .unwrap_err();
    assert_matches!(err, AppError::Forbidden(_));
}

#[tokio::test]
async fn cancellation_tool_respects_ownership() {
    let server = MockServer::start().await;
    let row = MockSupabaseResponses::appointment_row(
        10,
        "2025-12-10T10:00:00",
        "2025-12-10T11:00:00",
        3,
        2,
        1,
    );
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&server)
        .await;

    let service = tool_service(&server);
    let other_psychologist = Actor::new(8, Role::Psychologist);

    let result = service
        .execute(CANCEL_APPOINTMENT, json!({ "appointment_id": 10 }), &other_psychologist, TOKEN)
        .await
        .unwrap();
    assert_eq!(result, json!("ERROR: Solo puedes cancelar tus propias citas."));
}

#[tokio::test]
async fn list_tool_pins_patients_to_their_own_appointments() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("patient_id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                10,
                "2099-12-10T10:00:00",
                "2099-12-10T11:00:00",
                3,
                2,
                1
            )
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let service = tool_service(&server);
    let patient = Actor::new(3, Role::Patient);

    // Even asking for someone else's appointments, the scope is forced to
    // the caller.
    let result = service
        .execute(LIST_APPOINTMENTS, json!({ "patient_id": 5 }), &patient, TOKEN)
        .await
        .unwrap();

    let rows = result.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["patient_id"], json!(3));
}

#[tokio::test]
async fn availability_tool_lists_free_hours_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("psychologist_id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(
                10,
                "2025-12-10T10:00:00",
                "2025-12-10T11:00:00",
                3,
                2,
                1
            )
        ])))
        .mount(&server)
        .await;

    let service = tool_service(&server);
    let psychologist = Actor::new(2, Role::Psychologist);

    let result = service
        .execute(
            CHECK_AVAILABILITY,
            json!({ "psychologist_id": 2, "date": "2025-12-10T09:00:00" }),
            &psychologist,
            TOKEN,
        )
        .await
        .unwrap();

    let slots: Vec<String> = serde_json::from_value(result).unwrap();
    assert!(slots.contains(&"09:00".to_string()));
    assert!(!slots.contains(&"10:00".to_string()));
}

// ==============================================================================
// ROUTER SURFACE
// ==============================================================================

#[tokio::test]
async fn tool_listing_is_filtered_by_role() {
    let test_config = TestConfig::default();
    let app = assistant_routes(Arc::new(test_config.to_app_config()));
    let patient = TestUser::patient(3);
    let token = JwtTestUtils::create_test_token(&patient, &test_config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/tools")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let tools: Value = serde_json::from_slice(&bytes).unwrap();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();

    assert_eq!(names, vec!["list_appointments"]);
}

#[tokio::test]
async fn executing_a_forbidden_tool_returns_403() {
    let test_config = TestConfig::default();
    let app = assistant_routes(Arc::new(test_config.to_app_config()));
    let patient = TestUser::patient(3);
    let token = JwtTestUtils::create_test_token(&patient, &test_config.jwt_secret, None);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tools/book_appointment")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "patient_id": 3, "psychologist_id": 2, "start_time": "2025-12-10T16:00:00" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
