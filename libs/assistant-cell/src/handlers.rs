// libs/assistant-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{Actor, User};
use shared_models::error::AppError;

use crate::models::ToolDescriptor;
use crate::registry::ToolPermissionRegistry;
use crate::services::tools::AssistantToolService;

/// Tools the caller's role is allowed to invoke.
#[axum::debug_handler]
pub async fn list_tools(
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let actor = Actor::from_user(&user)?;

    let tools: Vec<ToolDescriptor> = ToolPermissionRegistry::tools_for_role(actor.role)
        .into_iter()
        .map(|tool| ToolDescriptor {
            name: tool.name.to_string(),
            description: tool.description.to_string(),
        })
        .collect();

    Ok(Json(json!(tools)))
}

/// Execute one assistant tool by name. The body is the tool's argument
/// object.
#[axum::debug_handler]
pub async fn execute_tool(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(tool_name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let actor = Actor::from_user(&user)?;

    let tool_service = AssistantToolService::new(&state);
    let result = tool_service.execute(&tool_name, args, &actor, token).await?;

    Ok(Json(json!({ "tool": tool_name, "result": result })))
}
