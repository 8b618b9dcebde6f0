use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use common::types::Page;
use models::enums::PaymentProvider;
use models::renewal_record;
use service::member_service::{self, MemberFilter, MemberView, RegisterMember, UpdateMember};
use service::renewal::{self, PaidRenewal, RenewalPlan};
use service::errors::ServiceError;
use crate::{errors::JsonApiError, routes::pagination, state::{actor, AppState}};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// all | active | expired
    #[param(value_type = Option<String>)]
    pub filter: Option<MemberFilter>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Deserialize)]
pub struct RenewInput {
    pub days: i64,
    #[serde(default)]
    pub amount_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaidRenewalInput {
    pub days: i64,
    pub amount_cents: i64,
    pub provider: PaymentProvider,
}

#[derive(Debug, Serialize)]
pub struct RenewOutput {
    pub member: MemberView,
    pub record: renewal_record::Model,
    pub plan: RenewalPlan,
}

#[derive(Debug, Serialize)]
pub struct IdCardOutput {
    pub member_id: Uuid,
    pub id_card: Option<String>,
}

fn view(state: &AppState, m: &models::member::Model) -> MemberView {
    MemberView::build(m, state.cipher(), Utc::now())
}

#[utoipa::path(
    get, path = "/tenants/{tid}/members", tag = "members",
    params(("tid" = Uuid, Path, description = "Tenant ID"), ListQuery),
    responses((status = 200, description = "Page of members"))
)]
pub async fn list(State(state): State<AppState>, Path(tid): Path<Uuid>, Query(q): Query<ListQuery>) -> Result<Json<Page<MemberView>>, JsonApiError> {
    let page = member_service::list_members(&state.db, tid, q.filter.unwrap_or_default(), pagination(q.page, q.per_page)).await?;
    let now = Utc::now();
    Ok(Json(page.map(|m| MemberView::build(&m, state.cipher(), now))))
}

#[utoipa::path(
    post, path = "/tenants/{tid}/members", tag = "members",
    params(("tid" = Uuid, Path, description = "Tenant ID")),
    request_body = crate::openapi::RegisterMemberDoc,
    responses(
        (status = 201, description = "Registered"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Tenant Not Found"),
        (status = 409, description = "Phone or card already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tid): Path<Uuid>,
    Json(input): Json<RegisterMember>,
) -> Result<(StatusCode, Json<MemberView>), JsonApiError> {
    let max_days = state.policy.max_renewal_days;
    let m = member_service::register_member(&state.db, state.cipher(), tid, input, max_days, &actor(&headers)).await?;
    info!(member_id = %m.id, tenant_id = %tid, "member registered via api");
    Ok((StatusCode::CREATED, Json(view(&state, &m))))
}

#[utoipa::path(
    get, path = "/tenants/{tid}/members/by-phone/{phone}", tag = "members",
    params(("tid" = Uuid, Path, description = "Tenant ID"), ("phone" = String, Path, description = "Phone number")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get_by_phone(State(state): State<AppState>, Path((tid, phone)): Path<(Uuid, String)>) -> Result<Json<MemberView>, JsonApiError> {
    let m = member_service::get_member_by_phone(&state.db, tid, &phone)
        .await?
        .ok_or_else(|| ServiceError::not_found("member"))?;
    Ok(Json(view(&state, &m)))
}

#[utoipa::path(
    get, path = "/members/{id}", tag = "members",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<MemberView>, JsonApiError> {
    let m = member_service::require_member(&state.db, id).await?;
    Ok(Json(view(&state, &m)))
}

#[utoipa::path(
    put, path = "/members/{id}", tag = "members",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = crate::openapi::UpdateMemberDoc,
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Card already in use")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMember>,
) -> Result<Json<MemberView>, JsonApiError> {
    let m = member_service::update_member(&state.db, state.cipher(), id, input, &actor(&headers)).await?;
    Ok(Json(view(&state, &m)))
}

#[utoipa::path(
    delete, path = "/members/{id}", tag = "members",
    params(("id" = Uuid, Path, description = "Member ID"), DeleteQuery),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"))
)]
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(q): Query<DeleteQuery>,
) -> Result<StatusCode, JsonApiError> {
    let who = actor(&headers);
    if q.hard {
        member_service::hard_delete_member(&state.db, id, &who).await?;
    } else {
        member_service::soft_delete_member(&state.db, id, &who).await?;
    }
    info!(member_id = %id, hard = q.hard, "member deleted via api");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get, path = "/members/{id}/id-card", tag = "members",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses((status = 200, description = "Decrypted id card"), (status = 404, description = "Not Found"))
)]
pub async fn reveal_id_card(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Result<Json<IdCardOutput>, JsonApiError> {
    let id_card = member_service::reveal_id_card(&state.db, state.cipher(), id).await?;
    info!(member_id = %id, actor = %actor(&headers), "id card revealed");
    Ok(Json(IdCardOutput { member_id: id, id_card }))
}

#[utoipa::path(
    post, path = "/members/{id}/renew", tag = "renewals",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = crate::openapi::RenewDoc,
    responses(
        (status = 200, description = "Renewed"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn renew(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<RenewInput>,
) -> Result<Json<RenewOutput>, JsonApiError> {
    let out = renewal::renew_member(&state.db, &state.policy, id, input.days, input.amount_cents, &actor(&headers)).await?;
    Ok(Json(RenewOutput { member: view(&state, &out.member), record: out.record, plan: out.plan }))
}

#[utoipa::path(
    post, path = "/members/{id}/renewals", tag = "renewals",
    params(("id" = Uuid, Path, description = "Member ID")),
    request_body = crate::openapi::PaidRenewalDoc,
    responses(
        (status = 201, description = "Payment order opened"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn request_renewal(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<PaidRenewalInput>,
) -> Result<(StatusCode, Json<PaidRenewal>), JsonApiError> {
    let out = renewal::request_paid_renewal(&state.db, &state.policy, id, input.days, input.amount_cents, input.provider, &actor(&headers)).await?;
    Ok((StatusCode::CREATED, Json(out)))
}

#[utoipa::path(
    get, path = "/members/{id}/renewals", tag = "renewals",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses((status = 200, description = "Renewal history"), (status = 404, description = "Not Found"))
)]
pub async fn list_renewals(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<renewal_record::Model>>, JsonApiError> {
    Ok(Json(renewal::list_renewals(&state.db, id).await?))
}
