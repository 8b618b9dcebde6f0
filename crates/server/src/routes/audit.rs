use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::types::Page;
use models::audit_log;
use service::audit_service::{self, AuditFilter};
use crate::{errors::JsonApiError, routes::pagination, state::AppState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    pub tenant_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Audit row with `detail` decoded back into JSON.
#[derive(Debug, Serialize)]
pub struct AuditView {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub detail: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<audit_log::Model> for AuditView {
    fn from(m: audit_log::Model) -> Self {
        let detail = m
            .detail
            .as_deref()
            .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string())));
        Self {
            id: m.id,
            tenant_id: m.tenant_id,
            actor: m.actor,
            action: m.action,
            entity: m.entity,
            entity_id: m.entity_id,
            detail,
            created_at: m.created_at,
        }
    }
}

#[utoipa::path(
    get, path = "/audit", tag = "audit",
    params(AuditQuery),
    responses((status = 200, description = "Audit entries, newest first"))
)]
pub async fn list(State(state): State<AppState>, Query(q): Query<AuditQuery>) -> Result<Json<Page<AuditView>>, JsonApiError> {
    let filter = AuditFilter { tenant_id: q.tenant_id, entity_id: q.entity_id };
    let page = audit_service::list_audit(&state.db, filter, pagination(q.page, q.per_page)).await?;
    Ok(Json(page.map(AuditView::from)))
}
