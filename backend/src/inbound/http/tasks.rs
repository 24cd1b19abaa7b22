//! Task routes delegating to the driving ports.
//!
//! Payload shapes arrive pre-validated (serde enforces structure and enum
//! membership; field bounds are the outer validation layer's concern). The
//! resolved user's identity — never anything client-supplied — scopes every
//! port call.

use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use serde::Deserialize;

use crate::domain::{
    ApiResult, CreateTaskPayload, Error, TaskFilter, TaskId, UpdateTaskPayload,
};
use crate::inbound::http::auth::require_user;
use crate::inbound::http::state::HttpState;

/// Query-string form of [`TaskFilter`]; the status arrives as a raw string
/// and is converted explicitly.
#[derive(Debug, Deserialize)]
pub struct TaskFilterQuery {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    q: Option<String>,
}

impl TaskFilterQuery {
    fn into_filter(self) -> ApiResult<TaskFilter> {
        let status = self
            .status
            .map(|raw| {
                raw.parse()
                    .map_err(|_| Error::invalid_request(format!("unknown status filter: {raw}")))
            })
            .transpose()?;
        Ok(TaskFilter {
            category: self.category,
            status,
            free_text: self.q,
        })
    }
}

/// Opaque ids that do not parse cannot exist, so they are NotFound — the
/// same signal as a foreign-owned task.
fn parse_task_id(raw: &str) -> ApiResult<TaskId> {
    raw.parse().map_err(|_| Error::not_found("Task not found"))
}

#[get("/tasks")]
pub async fn list_tasks(
    state: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<TaskFilterQuery>,
) -> ApiResult<HttpResponse> {
    let user = require_user(&req, &state.verifier).await?;
    let filter = query.into_inner().into_filter()?;
    let tasks = state.queries.list(&user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

#[post("/tasks")]
pub async fn create_task(
    state: web::Data<HttpState>,
    req: HttpRequest,
    payload: web::Json<CreateTaskPayload>,
) -> ApiResult<HttpResponse> {
    let user = require_user(&req, &state.verifier).await?;
    let task = state.commands.create(&user.id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

#[put("/tasks/{id}")]
pub async fn update_task(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Json<UpdateTaskPayload>,
) -> ApiResult<HttpResponse> {
    let user = require_user(&req, &state.verifier).await?;
    let id = parse_task_id(&path)?;
    let task = state
        .commands
        .update(&user.id, &id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

#[delete("/tasks/{id}")]
pub async fn remove_task(
    state: web::Data<HttpState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let user = require_user(&req, &state.verifier).await?;
    let id = parse_task_id(&path)?;
    state.commands.remove(&user.id, &id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}
