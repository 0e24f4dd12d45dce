// libs/assistant-cell/src/registry.rs
use shared_models::auth::Role;

pub const BOOK_APPOINTMENT: &str = "book_appointment";
pub const CANCEL_APPOINTMENT: &str = "cancel_appointment";
pub const LIST_APPOINTMENTS: &str = "list_appointments";
pub const CHECK_AVAILABILITY: &str = "check_availability";

/// One assistant tool and the roles that may invoke it.
#[derive(Debug, Clone, Copy)]
pub struct ToolPermission {
    pub name: &'static str,
    pub description: &'static str,
    pub allowed_roles: &'static [Role],
}

/// Declarative tool/role matrix. Adding a tool means adding a row here;
/// nothing else filters by role.
pub const TOOL_PERMISSIONS: &[ToolPermission] = &[
    ToolPermission {
        name: BOOK_APPOINTMENT,
        description: "Reservar una cita. Requiere ID de paciente, ID de psicólogo \
                      y fecha ISO ya resuelta por el servicio de fechas.",
        allowed_roles: &[Role::Admin, Role::Psychologist],
    },
    ToolPermission {
        name: CANCEL_APPOINTMENT,
        description: "Cancelar una cita existente. Requiere el ID de la cita. Admin \
                      puede cancelar cualquier cita, psicólogos solo sus propias citas.",
        allowed_roles: &[Role::Admin, Role::Psychologist],
    },
    ToolPermission {
        name: LIST_APPOINTMENTS,
        description: "Listar citas futuras según filtros opcionales (paciente, \
                      psicólogo, rango de fechas). Sin filtros retorna las citas del \
                      usuario actual según su rol.",
        allowed_roles: &[Role::Admin, Role::Psychologist, Role::Patient],
    },
    ToolPermission {
        name: CHECK_AVAILABILITY,
        description: "Verificar horarios 100% libres de un psicólogo en una fecha, \
                      en formato 'HH:mm'.",
        allowed_roles: &[Role::Admin, Role::Psychologist],
    },
];

/// Capability lookup over the tool matrix.
pub struct ToolPermissionRegistry;

impl ToolPermissionRegistry {
    pub fn tools_for_role(role: Option<Role>) -> Vec<&'static ToolPermission> {
        let Some(role) = role else { return vec![] };
        TOOL_PERMISSIONS
            .iter()
            .filter(|tool| tool.allowed_roles.contains(&role))
            .collect()
    }

    pub fn can_use(tool_name: &str, role: Option<Role>) -> bool {
        let Some(role) = role else { return false };
        TOOL_PERMISSIONS
            .iter()
            .any(|tool| tool.name == tool_name && tool.allowed_roles.contains(&role))
    }
}
