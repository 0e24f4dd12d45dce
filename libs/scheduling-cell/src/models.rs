// libs/scheduling-cell/src/models.rs
use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use shared_models::error::AppError;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// A booked session. `id` is assigned by the database on insert; an
/// appointment without an id has not been persisted yet. Rows are immutable
/// once created: a reschedule is modeled as cancel + create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Option<i64>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub patient_id: i64,
    pub psychologist_id: i64,
    pub room_id: i64,
}

impl Appointment {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Incoming booking payload. Times are optional here so that a missing field
/// surfaces as the domain validation error instead of a deserialization
/// failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub patient_id: i64,
    pub psychologist_id: i64,
    pub room_id: i64,
}

/// Optional filters for the future-appointments listing used by the
/// assistant tooling. Absent filters fall back to the caller's own scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FutureAppointmentsQuery {
    pub patient_id: Option<i64>,
    pub psychologist_id: Option<i64>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

// ==============================================================================
// TIME WINDOW MODEL
// ==============================================================================

/// Clinic opening hours. The clinic is closed on Sundays.
pub const OPENING_HOUR: u32 = 8;
pub const CLOSING_HOUR: u32 = 22;

pub fn opening_time() -> NaiveTime {
    NaiveTime::from_hms_opt(OPENING_HOUR, 0, 0).unwrap()
}

pub fn closing_time() -> NaiveTime {
    NaiveTime::from_hms_opt(CLOSING_HOUR, 0, 0).unwrap()
}

/// Half-open interval `[start, end)` in clinic local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Strict half-open overlap: back-to-back windows do not conflict.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn is_within_business_hours(&self) -> bool {
        self.start.weekday() != Weekday::Sun
            && Self::time_in_opening_hours(self.start.time())
            && Self::time_in_opening_hours(self.end.time())
    }

    fn time_in_opening_hours(t: NaiveTime) -> bool {
        (opening_time()..=closing_time()).contains(&t)
    }

    /// Validates a proposed window. The check order and the messages are part
    /// of the observable contract.
    pub fn validated(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<TimeWindow, SchedulingError> {
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(SchedulingError::Validation(
                    "Horario de inicio/fin es requerido.".to_string(),
                ))
            }
        };
        if end <= start {
            return Err(SchedulingError::Validation(
                "La hora de fin debe ser después de la hora de inicio.".to_string(),
            ));
        }
        if start.weekday() == Weekday::Sun {
            return Err(SchedulingError::Validation(
                "Cerrado los domingos.".to_string(),
            ));
        }
        if !Self::time_in_opening_hours(start.time()) || !Self::time_in_opening_hours(end.time()) {
            return Err(SchedulingError::Validation(
                "Fuera de horario (08:00 - 22:00).".to_string(),
            ));
        }
        Ok(TimeWindow { start, end })
    }
}

// ==============================================================================
// RESOURCE AXES
// ==============================================================================

/// The three independent axes along which double-booking is impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Psychologist,
    Patient,
    Room,
}

impl ResourceKind {
    /// Column holding the resource's foreign key in the appointments table.
    pub fn column(&self) -> &'static str {
        match self {
            ResourceKind::Psychologist => "psychologist_id",
            ResourceKind::Patient => "patient_id",
            ResourceKind::Room => "room_id",
        }
    }

    /// Exclusion constraint guarding this axis in the database.
    pub fn constraint_name(&self) -> &'static str {
        match self {
            ResourceKind::Psychologist => "no_psychologist_overlap",
            ResourceKind::Patient => "no_patient_overlap",
            ResourceKind::Room => "no_room_overlap",
        }
    }

    pub fn occupied_message(&self) -> &'static str {
        match self {
            ResourceKind::Psychologist => "Psicólogo ocupado.",
            ResourceKind::Patient => "Paciente ya tiene cita.",
            ResourceKind::Room => "Sala ocupada.",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Psychologist => write!(f, "psychologist"),
            ResourceKind::Patient => write!(f, "patient"),
            ResourceKind::Room => write!(f, "room"),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("{0}")]
    Validation(String),

    #[error("{}", .0.occupied_message())]
    Conflict(ResourceKind),

    /// Integrity violation not attributable to a single resource axis.
    #[error("Conflicto al crear la cita. Por favor, intente con otro horario.")]
    ConstraintViolation,

    #[error("{0}")]
    Forbidden(String),

    #[error("Cita no encontrada con ID: {0}")]
    NotFound(i64),

    /// Persistence failure not recognized as a known constraint. The detail
    /// stays in the server log; callers get a generic message.
    #[error("Error interno al procesar la cita.")]
    Database(String),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::BadRequest(msg),
            SchedulingError::Conflict(kind) => {
                AppError::Conflict(kind.occupied_message().to_string())
            }
            SchedulingError::ConstraintViolation => AppError::Conflict(
                "Conflicto al crear la cita. Por favor, intente con otro horario.".to_string(),
            ),
            SchedulingError::Forbidden(msg) => AppError::Forbidden(msg),
            SchedulingError::NotFound(id) => {
                AppError::NotFound(format!("Cita no encontrada con ID: {}", id))
            }
            SchedulingError::Database(detail) => {
                tracing::error!("Unrecognized persistence failure: {}", detail);
                AppError::Database("Error interno al procesar la cita.".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn overlap_is_symmetric() {
        let a = TimeWindow::new(dt(2025, 12, 10, 10, 0), dt(2025, 12, 10, 11, 0));
        let b = TimeWindow::new(dt(2025, 12, 10, 10, 30), dt(2025, 12, 10, 11, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = TimeWindow::new(dt(2025, 12, 10, 14, 0), dt(2025, 12, 10, 15, 0));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn adjacency_is_not_conflict() {
        let first = TimeWindow::new(dt(2025, 12, 10, 10, 0), dt(2025, 12, 10, 11, 0));
        let second = TimeWindow::new(dt(2025, 12, 10, 11, 0), dt(2025, 12, 10, 12, 0));
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn containment_is_conflict() {
        let outer = TimeWindow::new(dt(2025, 12, 10, 9, 0), dt(2025, 12, 10, 12, 0));
        let inner = TimeWindow::new(dt(2025, 12, 10, 10, 0), dt(2025, 12, 10, 11, 0));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn missing_times_are_rejected_first() {
        let err = TimeWindow::validated(None, Some(dt(2025, 12, 10, 11, 0))).unwrap_err();
        assert_matches!(err, SchedulingError::Validation(msg) if msg == "Horario de inicio/fin es requerido.");
    }

    #[test]
    fn end_must_be_after_start() {
        let err = TimeWindow::validated(
            Some(dt(2025, 12, 10, 11, 0)),
            Some(dt(2025, 12, 10, 11, 0)),
        )
        .unwrap_err();
        assert_matches!(err, SchedulingError::Validation(msg) if msg == "La hora de fin debe ser después de la hora de inicio.");
    }

    #[test]
    fn sundays_are_rejected_regardless_of_time() {
        // 2025-11-23 is a Sunday
        let err = TimeWindow::validated(
            Some(dt(2025, 11, 23, 10, 0)),
            Some(dt(2025, 11, 23, 11, 0)),
        )
        .unwrap_err();
        assert_matches!(err, SchedulingError::Validation(msg) if msg == "Cerrado los domingos.");
    }

    #[test]
    fn business_hours_boundaries() {
        // Opening slot is valid
        assert!(TimeWindow::validated(
            Some(dt(2025, 12, 10, 8, 0)),
            Some(dt(2025, 12, 10, 9, 0)),
        )
        .is_ok());

        // Before opening
        let early = TimeWindow::validated(
            Some(dt(2025, 12, 10, 7, 0)),
            Some(dt(2025, 12, 10, 8, 0)),
        )
        .unwrap_err();
        assert_matches!(early, SchedulingError::Validation(msg) if msg == "Fuera de horario (08:00 - 22:00).");

        // Runs past closing
        let late = TimeWindow::validated(
            Some(dt(2025, 12, 10, 21, 30)),
            Some(dt(2025, 12, 10, 22, 30)),
        )
        .unwrap_err();
        assert_matches!(late, SchedulingError::Validation(msg) if msg == "Fuera de horario (08:00 - 22:00).");

        // Ending exactly at closing is valid
        assert!(TimeWindow::validated(
            Some(dt(2025, 12, 10, 21, 0)),
            Some(dt(2025, 12, 10, 22, 0)),
        )
        .is_ok());
    }

    #[test]
    fn business_hours_predicate_matches_validation() {
        let open = TimeWindow::new(dt(2025, 12, 10, 8, 0), dt(2025, 12, 10, 9, 0));
        assert!(open.is_within_business_hours());

        let sunday = TimeWindow::new(dt(2025, 11, 23, 10, 0), dt(2025, 11, 23, 11, 0));
        assert!(!sunday.is_within_business_hours());

        let late = TimeWindow::new(dt(2025, 12, 10, 21, 30), dt(2025, 12, 10, 22, 30));
        assert!(!late.is_within_business_hours());
    }

    #[test]
    fn conflict_errors_carry_the_occupied_resource() {
        assert_eq!(
            SchedulingError::Conflict(ResourceKind::Psychologist).to_string(),
            "Psicólogo ocupado."
        );
        assert_eq!(
            SchedulingError::Conflict(ResourceKind::Patient).to_string(),
            "Paciente ya tiene cita."
        );
        assert_eq!(
            SchedulingError::Conflict(ResourceKind::Room).to_string(),
            "Sala ocupada."
        );
    }
}
