use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }

    /// Config pointing at a wiremock server standing in for PostgREST.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl TestUser {
    pub fn new(id: i64, username: &str, role: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            role: role.to_string(),
        }
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, "admin_test", "ROLE_ADMIN")
    }

    pub fn psychologist(id: i64) -> Self {
        Self::new(id, "psychologist_test", "ROLE_PSYCHOLOGIST")
    }

    pub fn patient(id: i64) -> Self {
        Self::new(id, "patient_test", "ROLE_PATIENT")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(format!("{}@test.com", self.username)),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": format!("{}@test.com", user.username),
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// One persisted appointment row as PostgREST returns it (naive
    /// timestamps, integer foreign keys).
    pub fn appointment_row(
        id: i64,
        start_time: &str,
        end_time: &str,
        patient_id: i64,
        psychologist_id: i64,
        room_id: i64,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "start_time": start_time,
            "end_time": end_time,
            "patient_id": patient_id,
            "psychologist_id": psychologist_id,
            "room_id": room_id
        })
    }

    /// PostgREST body for a violated exclusion or check constraint.
    pub fn constraint_violation(constraint: &str) -> serde_json::Value {
        json!({
            "code": "23P01",
            "details": format!("Key conflicts with existing key (constraint {}).", constraint),
            "hint": null,
            "message": format!(
                "conflicting key value violates exclusion constraint \"{}\"",
                constraint
            )
        })
    }
}
