// libs/scheduling-cell/src/services/authorization.rs
use shared_models::auth::{Actor, Role};

use crate::models::{Appointment, SchedulingError};

/// Who a role may create bookings for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRule {
    /// Any patient/clinician pair. Clinician-self match is deliberately not
    /// enforced: staff may schedule on behalf of another clinician.
    AnyPatient,
    /// Only bookings where the patient is the actor itself.
    OwnPatientOnly,
    Denied,
}

/// Which appointments a role may cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelRule {
    Any,
    /// Only appointments where the actor is the assigned clinician.
    OwnScheduleOnly,
    Denied,
}

/// Which appointments a role sees when listing "my appointments".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    AsPsychologist(i64),
    AsPatient(i64),
    Nothing,
}

/// Per-role capability row. Keeping the whole authorization matrix in one
/// table makes it auditable independently of the booking algorithm.
#[derive(Debug, Clone, Copy)]
pub struct RolePolicy {
    pub create: CreateRule,
    pub cancel: CancelRule,
    pub can_check_rooms: bool,
}

const ADMIN_POLICY: RolePolicy = RolePolicy {
    create: CreateRule::AnyPatient,
    cancel: CancelRule::Any,
    can_check_rooms: true,
};

const PSYCHOLOGIST_POLICY: RolePolicy = RolePolicy {
    create: CreateRule::AnyPatient,
    cancel: CancelRule::OwnScheduleOnly,
    can_check_rooms: true,
};

const PATIENT_POLICY: RolePolicy = RolePolicy {
    create: CreateRule::OwnPatientOnly,
    cancel: CancelRule::Denied,
    can_check_rooms: false,
};

const UNKNOWN_POLICY: RolePolicy = RolePolicy {
    create: CreateRule::Denied,
    cancel: CancelRule::Denied,
    can_check_rooms: false,
};

pub fn policy_for(role: Option<Role>) -> RolePolicy {
    match role {
        Some(Role::Admin) => ADMIN_POLICY,
        Some(Role::Psychologist) => PSYCHOLOGIST_POLICY,
        Some(Role::Patient) => PATIENT_POLICY,
        None => UNKNOWN_POLICY,
    }
}

/// Role-based gate evaluated before the booking core runs.
pub struct AuthorizationGate;

impl AuthorizationGate {
    pub fn authorize_create(actor: &Actor, patient_id: i64) -> Result<(), SchedulingError> {
        match policy_for(actor.role).create {
            CreateRule::AnyPatient => Ok(()),
            CreateRule::OwnPatientOnly if actor.id == patient_id => Ok(()),
            CreateRule::OwnPatientOnly => Err(SchedulingError::Forbidden(
                "Los pacientes solo pueden agendar sus propias citas.".to_string(),
            )),
            CreateRule::Denied => Err(SchedulingError::Forbidden(
                "No tienes permisos para agendar citas.".to_string(),
            )),
        }
    }

    pub fn authorize_cancel(actor: &Actor, appointment: &Appointment) -> Result<(), SchedulingError> {
        match policy_for(actor.role).cancel {
            CancelRule::Any => Ok(()),
            CancelRule::OwnScheduleOnly if actor.id == appointment.psychologist_id => Ok(()),
            CancelRule::OwnScheduleOnly => Err(SchedulingError::Forbidden(
                "Solo puedes cancelar tus propias citas.".to_string(),
            )),
            CancelRule::Denied => Err(SchedulingError::Forbidden(
                "No tienes permisos para cancelar citas.".to_string(),
            )),
        }
    }

    pub fn authorize_room_check(actor: &Actor) -> Result<(), SchedulingError> {
        if policy_for(actor.role).can_check_rooms {
            Ok(())
        } else {
            Err(SchedulingError::Forbidden(
                "Solo Admin y Psicólogos pueden consultar salas.".to_string(),
            ))
        }
    }

    pub fn list_scope(actor: &Actor) -> ListScope {
        match actor.role {
            Some(Role::Admin) => ListScope::All,
            Some(Role::Psychologist) => ListScope::AsPsychologist(actor.id),
            Some(Role::Patient) => ListScope::AsPatient(actor.id),
            None => ListScope::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    fn appointment_with_psychologist(psychologist_id: i64) -> Appointment {
        let day = NaiveDate::from_ymd_opt(2025, 12, 10).unwrap();
        Appointment {
            id: Some(99),
            start_time: day.and_hms_opt(10, 0, 0).unwrap(),
            end_time: day.and_hms_opt(11, 0, 0).unwrap(),
            patient_id: 3,
            psychologist_id,
            room_id: 1,
        }
    }

    fn unknown_actor(id: i64) -> Actor {
        Actor { id, role: None }
    }

    #[test]
    fn admin_creates_for_anyone_and_cancels_anything() {
        let admin = Actor::new(1, Role::Admin);
        assert!(AuthorizationGate::authorize_create(&admin, 999).is_ok());
        assert!(AuthorizationGate::authorize_cancel(&admin, &appointment_with_psychologist(2)).is_ok());
        assert!(AuthorizationGate::authorize_room_check(&admin).is_ok());
        assert_eq!(AuthorizationGate::list_scope(&admin), ListScope::All);
    }

    #[test]
    fn psychologist_creates_for_any_patient_and_any_clinician() {
        // Role membership is the only creation requirement for clinic staff;
        // scheduling on behalf of another clinician is allowed.
        let psychologist = Actor::new(2, Role::Psychologist);
        assert!(AuthorizationGate::authorize_create(&psychologist, 3).is_ok());
        assert!(AuthorizationGate::authorize_create(&psychologist, 77).is_ok());
    }

    #[test]
    fn psychologist_cancels_only_own_schedule() {
        let psychologist = Actor::new(2, Role::Psychologist);
        assert!(
            AuthorizationGate::authorize_cancel(&psychologist, &appointment_with_psychologist(2))
                .is_ok()
        );

        let err =
            AuthorizationGate::authorize_cancel(&psychologist, &appointment_with_psychologist(8))
                .unwrap_err();
        assert_matches!(err, SchedulingError::Forbidden(msg) if msg == "Solo puedes cancelar tus propias citas.");
    }

    #[test]
    fn patient_creates_only_own_appointments() {
        let patient = Actor::new(3, Role::Patient);
        assert!(AuthorizationGate::authorize_create(&patient, 3).is_ok());

        let err = AuthorizationGate::authorize_create(&patient, 5).unwrap_err();
        assert_matches!(err, SchedulingError::Forbidden(msg) if msg == "Los pacientes solo pueden agendar sus propias citas.");
    }

    #[test]
    fn patient_may_never_cancel() {
        let patient = Actor::new(3, Role::Patient);
        let err = AuthorizationGate::authorize_cancel(&patient, &appointment_with_psychologist(2))
            .unwrap_err();
        assert_matches!(err, SchedulingError::Forbidden(msg) if msg == "No tienes permisos para cancelar citas.");
        assert!(AuthorizationGate::authorize_room_check(&patient).is_err());
    }

    #[test]
    fn unknown_roles_have_no_capabilities() {
        let stranger = unknown_actor(9);
        assert!(AuthorizationGate::authorize_create(&stranger, 9).is_err());
        assert!(AuthorizationGate::authorize_cancel(&stranger, &appointment_with_psychologist(9)).is_err());
        assert!(AuthorizationGate::authorize_room_check(&stranger).is_err());
        assert_eq!(AuthorizationGate::list_scope(&stranger), ListScope::Nothing);
    }

    #[test]
    fn list_scopes_follow_roles() {
        assert_eq!(
            AuthorizationGate::list_scope(&Actor::new(2, Role::Psychologist)),
            ListScope::AsPsychologist(2)
        );
        assert_eq!(
            AuthorizationGate::list_scope(&Actor::new(3, Role::Patient)),
            ListScope::AsPatient(3)
        );
    }
}
