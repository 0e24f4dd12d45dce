use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Clinic staff roles as carried in the JWT `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Psychologist,
    Patient,
}

impl Role {
    /// Parses a role claim, tolerating the legacy `ROLE_` prefix and any
    /// casing. Unknown roles yield `None` (an actor with no capabilities).
    pub fn parse(claim: &str) -> Option<Role> {
        let normalized = claim.trim().to_ascii_uppercase();
        let name = normalized.strip_prefix("ROLE_").unwrap_or(&normalized);
        match name {
            "ADMIN" => Some(Role::Admin),
            "PSYCHOLOGIST" => Some(Role::Psychologist),
            "PATIENT" => Some(Role::Patient),
            _ => None,
        }
    }
}

/// The authenticated caller of a scheduling operation.
///
/// `role` is `None` when the token carried a role this system does not know;
/// such actors are denied everywhere and see empty listings.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: i64,
    pub role: Option<Role>,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role: Some(role) }
    }

    /// Builds an actor from the validated request user. The `sub` claim must
    /// be a numeric id; tokens minted by the auth service always satisfy this.
    pub fn from_user(user: &User) -> Result<Actor, AppError> {
        let id = user
            .id
            .parse::<i64>()
            .map_err(|_| AppError::Auth(format!("Identidad de usuario inválida: {}", user.id)))?;
        let role = user.role.as_deref().and_then(Role::parse);
        Ok(Actor { id, role })
    }
}
