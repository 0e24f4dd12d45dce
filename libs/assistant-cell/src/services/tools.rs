// libs/assistant-cell/src/services/tools.rs
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use tracing::{debug, info};

use scheduling_cell::models::FutureAppointmentsQuery;
use scheduling_cell::services::booking::BookingService;
use shared_config::AppConfig;
use shared_models::auth::Actor;
use shared_models::error::AppError;

use crate::models::{
    BookingToolRequest, CancelToolRequest, CheckAvailabilityToolRequest,
    ListAppointmentsToolRequest,
};
use crate::registry::{
    ToolPermissionRegistry, BOOK_APPOINTMENT, CANCEL_APPOINTMENT, CHECK_AVAILABILITY,
    LIST_APPOINTMENTS,
};

const ERROR_PREFIX: &str = "ERROR: ";

/// Thin adapters between the conversational layer and the scheduling core.
///
/// Each tool only shapes inputs and renders an operator-facing result; every
/// business rule stays in `scheduling_cell`. Failures come back as tool
/// result strings so the assistant can relay them verbatim.
pub struct AssistantToolService {
    booking: BookingService,
}

impl AssistantToolService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            booking: BookingService::new(config),
        }
    }

    /// Dispatches one tool call after checking the role matrix.
    pub async fn execute(
        &self,
        tool_name: &str,
        args: Value,
        actor: &Actor,
        auth_token: &str,
    ) -> Result<Value, AppError> {
        if !ToolPermissionRegistry::can_use(tool_name, actor.role) {
            return Err(AppError::Forbidden(format!(
                "Herramienta no permitida para tu rol: {}",
                tool_name
            )));
        }

        debug!("Executing assistant tool {} for actor {}", tool_name, actor.id);

        match tool_name {
            BOOK_APPOINTMENT => {
                let request: BookingToolRequest = parse_args(args)?;
                Ok(json!(self.book_appointment(request, actor, auth_token).await))
            }
            CANCEL_APPOINTMENT => {
                let request: CancelToolRequest = parse_args(args)?;
                Ok(json!(self.cancel_appointment(request, actor, auth_token).await))
            }
            LIST_APPOINTMENTS => {
                let request: ListAppointmentsToolRequest = parse_args(args)?;
                Ok(json!(self.list_appointments(request, actor, auth_token).await))
            }
            CHECK_AVAILABILITY => {
                let request: CheckAvailabilityToolRequest = parse_args(args)?;
                Ok(json!(self.check_availability(request, auth_token).await))
            }
            _ => Err(AppError::NotFound(format!(
                "Herramienta desconocida: {}",
                tool_name
            ))),
        }
    }

    async fn book_appointment(
        &self,
        request: BookingToolRequest,
        actor: &Actor,
        auth_token: &str,
    ) -> String {
        match self
            .booking
            .create_from_assistant(
                request.patient_id,
                request.psychologist_id,
                &request.start_time,
                actor,
                auth_token,
            )
            .await
        {
            Ok(appointment) => {
                info!("Assistant booked appointment {:?}", appointment.id);
                format!(
                    "ÉXITO: Cita agendada con ID {}",
                    appointment.id.unwrap_or_default()
                )
            }
            Err(e) => format!("ERROR AL AGENDAR: {}", e),
        }
    }

    async fn cancel_appointment(
        &self,
        request: CancelToolRequest,
        actor: &Actor,
        auth_token: &str,
    ) -> String {
        match self
            .booking
            .cancel_appointment(request.appointment_id, actor, auth_token)
            .await
        {
            Ok(()) => format!(
                "ÉXITO: Cita #{} cancelada correctamente.",
                request.appointment_id
            ),
            Err(e) => format!("{}{}", ERROR_PREFIX, e),
        }
    }

    /// Future appointments with optional filters. Malformed filters or a
    /// repository failure yield an empty list, mirroring a tool that has
    /// nothing to report.
    async fn list_appointments(
        &self,
        request: ListAppointmentsToolRequest,
        actor: &Actor,
        auth_token: &str,
    ) -> Vec<Value> {
        let from = request.start_date.as_deref().map(str::parse::<NaiveDateTime>);
        let to = request.end_date.as_deref().map(str::parse::<NaiveDateTime>);
        let (from, to) = match (from.transpose(), to.transpose()) {
            (Ok(from), Ok(to)) => (from, to),
            _ => return vec![],
        };

        let query = FutureAppointmentsQuery {
            patient_id: request.patient_id,
            psychologist_id: request.psychologist_id,
            from,
            to,
        };

        match self.booking.future_appointments(actor, query, auth_token).await {
            Ok(appointments) => appointments.into_iter().map(|a| json!(a)).collect(),
            Err(_) => vec![],
        }
    }

    /// Fully-free hourly slots for a psychologist. The date argument may be a
    /// full timestamp; only the date portion matters.
    async fn check_availability(
        &self,
        request: CheckAvailabilityToolRequest,
        auth_token: &str,
    ) -> Vec<String> {
        let Some(date_part) = request.date.get(0..10) else {
            return vec![];
        };
        let Ok(date) = date_part.parse::<NaiveDate>() else {
            return vec![];
        };

        self.booking
            .available_slots(request.psychologist_id, date, auth_token)
            .await
            .unwrap_or_default()
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, AppError> {
    serde_json::from_value(args)
        .map_err(|e| AppError::BadRequest(format!("Argumentos de herramienta inválidos: {}", e)))
}
