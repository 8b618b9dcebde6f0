use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use models::tenant;
use service::{errors::ServiceError, tenant_service};
use crate::{errors::JsonApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateTenantInput { pub name: String }

#[utoipa::path(
    post, path = "/tenants", tag = "tenants",
    request_body = crate::openapi::CreateTenantDoc,
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"))
)]
pub async fn create(State(state): State<AppState>, Json(input): Json<CreateTenantInput>) -> Result<(StatusCode, Json<tenant::Model>), JsonApiError> {
    let t = tenant_service::create_tenant(&state.db, &input.name).await?;
    info!(tenant_id = %t.id, "tenant created via api");
    Ok((StatusCode::CREATED, Json(t)))
}

#[utoipa::path(
    get, path = "/tenants/{id}", tag = "tenants",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<tenant::Model>, JsonApiError> {
    match tenant_service::get_tenant(&state.db, id).await? {
        Some(t) => Ok(Json(t)),
        None => Err(ServiceError::not_found("tenant").into()),
    }
}
