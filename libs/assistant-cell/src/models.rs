// libs/assistant-cell/src/models.rs
use serde::{Deserialize, Serialize};

// ==============================================================================
// TOOL REQUEST MODELS
// ==============================================================================

/// Arguments for the booking tool. `start_time` arrives pre-resolved to an
/// ISO timestamp by the external date service; this cell never parses natural
/// language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingToolRequest {
    pub patient_id: i64,
    pub psychologist_id: i64,
    pub start_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelToolRequest {
    pub appointment_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAppointmentsToolRequest {
    pub patient_id: Option<i64>,
    pub psychologist_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAvailabilityToolRequest {
    pub psychologist_id: i64,
    pub date: String,
}

// ==============================================================================
// TOOL RESPONSE MODELS
// ==============================================================================

/// Tool listing entry returned to the conversational layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}
