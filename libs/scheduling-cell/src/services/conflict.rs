// libs/scheduling-cell/src/services/conflict.rs
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, ResourceKind, SchedulingError, TimeWindow};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_timestamp(ts: chrono::NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Overlap queries against the appointments table, one per resource axis.
///
/// A slot is only bookable when the clinician, the patient and the room are
/// each simultaneously free, so the booking core issues three independent
/// lookups. Results carry no ordering guarantee; callers only need existence.
pub struct ConflictRepository {
    supabase: Arc<SupabaseClient>,
}

impl ConflictRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Returns every appointment whose `[start_time, end_time)` strictly
    /// overlaps `window` for the given resource. Back-to-back rows are not
    /// returned: the predicate is `start_time < end AND end_time > start`.
    pub async fn find_conflicts(
        &self,
        kind: ResourceKind,
        resource_id: i64,
        window: &TimeWindow,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!(
            "Checking {} {} for conflicts between {} and {}",
            kind, resource_id, window.start, window.end
        );

        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&start_time=lt.{}&end_time=gt.{}",
            kind.column(),
            resource_id,
            urlencoding::encode(&format_timestamp(window.end)),
            urlencoding::encode(&format_timestamp(window.start)),
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let conflicts: Vec<Appointment> = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| SchedulingError::Database(format!("Failed to parse appointments: {}", e)))?;

        if !conflicts.is_empty() {
            warn!(
                "{} conflicting appointment(s) found for {} {}",
                conflicts.len(),
                kind,
                resource_id
            );
        }

        Ok(conflicts)
    }
}
