// libs/scheduling-cell/src/services/booking.rs
use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate, NaiveDateTime, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::Actor;

use crate::models::{
    Appointment, CreateAppointmentRequest, FutureAppointmentsQuery, ResourceKind, SchedulingError,
    TimeWindow, CLOSING_HOUR, OPENING_HOUR,
};
use crate::services::authorization::{AuthorizationGate, ListScope};
use crate::services::conflict::{format_timestamp, ConflictRepository};

/// Room assigned to bookings created through the assistant adapter, which
/// carries no room selection of its own.
pub const DEFAULT_ROOM_ID: i64 = 1;

/// Session length when the caller supplies only a start time.
const DEFAULT_SESSION_HOURS: i64 = 1;

/// Single entry point for creating and cancelling appointments, shared by the
/// REST handlers and the assistant tool adapters.
///
/// The conflict checks here reject the common case early with a friendly
/// message; the database exclusion constraints remain the authoritative
/// serialization point under concurrent bookers (see `db/schema.sql`).
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    conflicts: ConflictRepository,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let conflicts = ConflictRepository::new(Arc::clone(&supabase));
        Self { supabase, conflicts }
    }

    /// REST entry point: a fully-formed appointment, subject to the
    /// authorization gate.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking appointment for patient {} with psychologist {}",
            request.patient_id, request.psychologist_id
        );

        AuthorizationGate::authorize_create(actor, request.patient_id)?;
        self.process_appointment(request, auth_token).await
    }

    /// Assistant entry point: raw primitives with a pre-resolved ISO
    /// timestamp. Shapes inputs only (one-hour default duration, default
    /// room) and funnels into the same gate and core as the REST path.
    pub async fn create_from_assistant(
        &self,
        patient_id: i64,
        psychologist_id: i64,
        start_time: &str,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let start = parse_iso_datetime(start_time).map_err(|e| {
            SchedulingError::Validation(format!("Error al procesar datos de la IA: {}", e))
        })?;

        let request = CreateAppointmentRequest {
            start_time: Some(start),
            end_time: Some(start + ChronoDuration::hours(DEFAULT_SESSION_HOURS)),
            patient_id,
            psychologist_id,
            room_id: DEFAULT_ROOM_ID,
        };

        AuthorizationGate::authorize_create(actor, request.patient_id)?;
        self.process_appointment(request, auth_token).await
    }

    /// Validation, the three conflict checks and persistence. Both entry
    /// points share this path unchanged.
    async fn process_appointment(
        &self,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let window = TimeWindow::validated(request.start_time, request.end_time)?;

        // Sequential checks, first occupied resource wins.
        let checks = [
            (ResourceKind::Psychologist, request.psychologist_id),
            (ResourceKind::Patient, request.patient_id),
            (ResourceKind::Room, request.room_id),
        ];
        for (kind, resource_id) in checks {
            let conflicting = self
                .conflicts
                .find_conflicts(kind, resource_id, &window, auth_token)
                .await?;
            if !conflicting.is_empty() {
                return Err(SchedulingError::Conflict(kind));
            }
        }

        let appointment = self.insert_appointment(&request, &window, auth_token).await?;

        info!(
            "Appointment {:?} booked for patient {} (psychologist {}, room {})",
            appointment.id, appointment.patient_id, appointment.psychologist_id, appointment.room_id
        );
        Ok(appointment)
    }

    /// Listing scoped by role: admins see everything, clinicians their own
    /// schedule, patients their own visits, anyone else nothing.
    pub async fn my_appointments(
        &self,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = match AuthorizationGate::list_scope(actor) {
            ListScope::All => "/rest/v1/appointments?order=start_time.asc".to_string(),
            ListScope::AsPsychologist(id) => format!(
                "/rest/v1/appointments?psychologist_id=eq.{}&order=start_time.asc",
                id
            ),
            ListScope::AsPatient(id) => format!(
                "/rest/v1/appointments?patient_id=eq.{}&order=start_time.asc",
                id
            ),
            ListScope::Nothing => return Ok(vec![]),
        };

        self.fetch_appointments(&path, auth_token).await
    }

    /// Appointments occupying a room on the given date. Admin and
    /// psychologists only.
    pub async fn check_room_availability(
        &self,
        room_id: i64,
        date: NaiveDateTime,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        AuthorizationGate::authorize_room_check(actor)?;

        let day = date.date();
        let day_window = TimeWindow::new(
            day.and_hms_opt(0, 0, 0).unwrap(),
            day.and_hms_opt(23, 59, 59).unwrap(),
        );

        self.conflicts
            .find_conflicts(ResourceKind::Room, room_id, &day_window, auth_token)
            .await
    }

    /// Future appointments with optional filters, defaulting to the caller's
    /// own scope. Patients are always pinned to their own visits.
    pub async fn future_appointments(
        &self,
        actor: &Actor,
        query: FutureAppointmentsQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let now = Local::now().naive_local();

        let mut patient_filter = query.patient_id;
        let mut psychologist_filter = query.psychologist_id;
        match AuthorizationGate::list_scope(actor) {
            ListScope::All => {}
            ListScope::AsPsychologist(id) => {
                if patient_filter.is_none() && psychologist_filter.is_none() {
                    psychologist_filter = Some(id);
                }
            }
            ListScope::AsPatient(id) => patient_filter = Some(id),
            ListScope::Nothing => return Ok(vec![]),
        }

        let mut query_parts = Vec::new();
        if let Some(patient_id) = patient_filter {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(psychologist_id) = psychologist_filter {
            query_parts.push(format!("psychologist_id=eq.{}", psychologist_id));
        }

        let from = query.from.map(|f| f.max(now)).unwrap_or(now);
        query_parts.push(format!(
            "start_time=gte.{}",
            urlencoding::encode(&format_timestamp(from))
        ));
        if let Some(to) = query.to {
            query_parts.push(format!(
                "start_time=lte.{}",
                urlencoding::encode(&format_timestamp(to))
            ));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=start_time.asc",
            query_parts.join("&")
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// Fully-free one-hour slots (`"HH:mm"`) for a psychologist on a date.
    /// Sundays yield no slots.
    pub async fn available_slots(
        &self,
        psychologist_id: i64,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<String>, SchedulingError> {
        if date.weekday() == Weekday::Sun {
            return Ok(vec![]);
        }

        let day_window = TimeWindow::new(
            date.and_hms_opt(OPENING_HOUR, 0, 0).unwrap(),
            date.and_hms_opt(CLOSING_HOUR, 0, 0).unwrap(),
        );
        let booked = self
            .conflicts
            .find_conflicts(ResourceKind::Psychologist, psychologist_id, &day_window, auth_token)
            .await?;

        let mut slots = Vec::new();
        for hour in OPENING_HOUR..CLOSING_HOUR {
            let slot = TimeWindow::new(
                date.and_hms_opt(hour, 0, 0).unwrap(),
                date.and_hms_opt(hour + 1, 0, 0).unwrap(),
            );
            if !booked.iter().any(|apt| apt.window().overlaps(&slot)) {
                slots.push(format!("{:02}:00", hour));
            }
        }

        Ok(slots)
    }

    /// Cancellation flow: load, apply the cancellation rule, hard delete.
    pub async fn cancel_appointment(
        &self,
        appointment_id: i64,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let appointment = self.get_appointment(appointment_id, auth_token).await?;
        AuthorizationGate::authorize_cancel(actor, &appointment)?;

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if deleted.is_empty() {
            // Raced with another cancellation between load and delete.
            return Err(SchedulingError::NotFound(appointment_id));
        }

        info!("Appointment {} cancelled", appointment_id);
        Ok(())
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(SchedulingError::NotFound(appointment_id));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SchedulingError::Database(format!("Failed to parse appointment: {}", e)))
    }

    // ==========================================================================
    // PRIVATE HELPER METHODS
    // ==========================================================================

    async fn insert_appointment(
        &self,
        request: &CreateAppointmentRequest,
        window: &TimeWindow,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment_data = json!({
            "start_time": format_timestamp(window.start),
            "end_time": format_timestamp(window.end),
            "patient_id": request.patient_id,
            "psychologist_id": request.psychologist_id,
            "room_id": request.room_id,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(translate_persistence_error)?;

        if result.is_empty() {
            return Err(SchedulingError::Database(
                "Insert returned no representation".to_string(),
            ));
        }

        serde_json::from_value(result[0].clone()).map_err(|e| {
            SchedulingError::Database(format!("Failed to parse created appointment: {}", e))
        })
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::Database(format!("Failed to parse appointments: {}", e)))
    }
}

/// Translates database constraint violations into the business error
/// taxonomy. This catches race conditions that passed the application-level
/// checks but were rejected by the PostgreSQL EXCLUDE constraints, so callers
/// cannot observe which layer caught the conflict.
fn translate_persistence_error(err: anyhow::Error) -> SchedulingError {
    let message = err.to_string().to_lowercase();

    for kind in [ResourceKind::Psychologist, ResourceKind::Patient, ResourceKind::Room] {
        if message.contains(kind.constraint_name()) {
            warn!("Constraint violation detected: {}", kind.constraint_name());
            return SchedulingError::Conflict(kind);
        }
    }
    if message.contains("chk_time_order") {
        return SchedulingError::Validation(
            "La hora de fin debe ser posterior a la hora de inicio.".to_string(),
        );
    }
    if message.contains("constraint violation (409)") {
        warn!("Unrecognized integrity violation: {}", message);
        return SchedulingError::ConstraintViolation;
    }

    SchedulingError::Database(err.to_string())
}

fn parse_iso_datetime(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    // Accepts both "2025-12-10T16:00:00" and the minute-precision form the
    // date resolver emits.
    value
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
}
