// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDateTime;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{Actor, User};
use shared_models::error::AppError;

use crate::models::CreateAppointmentRequest;
use crate::services::booking::BookingService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct RoomCheckQuery {
    pub date: NaiveDateTime,
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

/// Create an appointment. Patients may only book for themselves; validation
/// covers business hours and psychologist/patient/room conflicts.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = auth.token();
    let actor = Actor::from_user(&user)?;

    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .create_appointment(request, &actor, token)
        .await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

/// List "my appointments": everything for admins, the own schedule for
/// psychologists, own visits for patients.
#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = Actor::from_user(&user)?;

    let booking_service = BookingService::new(&state);
    let appointments = booking_service.my_appointments(&actor, token).await?;

    Ok(Json(json!(appointments)))
}

/// Appointments occupying a room on a given date (admin and psychologists).
#[axum::debug_handler]
pub async fn check_room_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(room_id): Path<i64>,
    Query(params): Query<RoomCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = Actor::from_user(&user)?;

    let booking_service = BookingService::new(&state);
    let conflicts = booking_service
        .check_room_availability(room_id, params.date, &actor, token)
        .await?;

    Ok(Json(json!(conflicts)))
}

/// Cancel an appointment. Admin may cancel anything; a psychologist only its
/// own appointments.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let token = auth.token();
    let actor = Actor::from_user(&user)?;

    let booking_service = BookingService::new(&state);
    booking_service
        .cancel_appointment(appointment_id, &actor, token)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
