use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use models::enums::{PaymentProvider, PaymentStatus};
use models::payment_order;
use service::errors::ServiceError;
use service::payment::{SubmitOutcome, TransitionOutcome, WebhookOutcome, SIGNATURE_HEADER};
use crate::{errors::JsonApiError, state::{actor, AppState}};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentInput {
    pub tenant_id: Uuid,
    pub member_id: Uuid,
    pub amount_cents: i64,
    pub provider: PaymentProvider,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelInput {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionInput {
    pub status: PaymentStatus,
    pub reason: Option<String>,
}

#[utoipa::path(
    post, path = "/payments", tag = "payments",
    request_body = crate::openapi::CreatePaymentDoc,
    responses(
        (status = 201, description = "Order created in pending state"),
        (status = 400, description = "Validation Error"),
        (status = 404, description = "Member Not Found"),
        (status = 422, description = "Member belongs to another tenant")
    )
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePaymentInput>,
) -> Result<(StatusCode, Json<payment_order::Model>), JsonApiError> {
    let order = state
        .payments
        .create_order(input.tenant_id, input.member_id, input.amount_cents, input.provider, &actor(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get, path = "/payments/{id}", tag = "payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<payment_order::Model>, JsonApiError> {
    Ok(Json(state.payments.require_order(id).await?))
}

#[utoipa::path(
    get, path = "/payments/by-no/{order_no}", tag = "payments",
    params(("order_no" = String, Path, description = "Order number")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get_by_no(State(state): State<AppState>, Path(order_no): Path<String>) -> Result<Json<payment_order::Model>, JsonApiError> {
    match state.payments.get_order_by_no(&order_no).await? {
        Some(o) => Ok(Json(o)),
        None => Err(ServiceError::not_found("payment order").into()),
    }
}

#[utoipa::path(
    get, path = "/members/{id}/payments", tag = "payments",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses((status = 200, description = "Orders of the member, newest first"))
)]
pub async fn list_for_member(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<payment_order::Model>>, JsonApiError> {
    Ok(Json(state.payments.list_orders(id).await?))
}

#[utoipa::path(
    post, path = "/payments/{id}/submit", tag = "payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Submitted to the gateway (processing), or declined (failed)"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Order not pending or gateway unavailable")
    )
)]
pub async fn submit(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Result<Json<SubmitOutcome>, JsonApiError> {
    Ok(Json(state.payments.submit(id, &actor(&headers)).await?))
}

#[utoipa::path(
    post, path = "/payments/{id}/cancel", tag = "payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body(content = crate::openapi::CancelPaymentDoc, description = "Optional reason"),
    responses((status = 200, description = "Cancelled"), (status = 404, description = "Not Found"), (status = 422, description = "Illegal transition"))
)]
pub async fn cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelInput>>,
) -> Result<Json<TransitionOutcome>, JsonApiError> {
    let reason = body.and_then(|Json(b)| b.reason);
    Ok(Json(state.payments.cancel(id, reason, &actor(&headers)).await?))
}

#[utoipa::path(
    post, path = "/payments/{id}/transition", tag = "payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = crate::openapi::TransitionDoc,
    responses((status = 200, description = "Transition applied or already in target state"), (status = 404, description = "Not Found"), (status = 422, description = "Illegal transition"))
)]
pub async fn transition(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<TransitionInput>,
) -> Result<Json<TransitionOutcome>, JsonApiError> {
    Ok(Json(state.payments.transition(id, input.status, input.reason, &actor(&headers)).await?))
}

#[utoipa::path(
    post, path = "/payments/{id}/sync", tag = "payments",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses((status = 200, description = "Status reported by the gateway applied"), (status = 404, description = "Not Found"), (status = 422, description = "Gateway error"))
)]
pub async fn sync(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Result<Json<TransitionOutcome>, JsonApiError> {
    Ok(Json(state.payments.sync(id, &actor(&headers)).await?))
}

#[utoipa::path(
    post, path = "/payments/webhook/{provider}", tag = "payments",
    params(
        ("provider" = String, Path, description = "wechat | alipay | stripe"),
        ("X-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac-sha256 of \"<t>.<body>\">")
    ),
    request_body = crate::openapi::WebhookEventDoc,
    responses(
        (status = 200, description = "Applied, or acknowledged as duplicate"),
        (status = 400, description = "Bad signature or body"),
        (status = 404, description = "Unknown order"),
        (status = 422, description = "Illegal transition or provider mismatch")
    )
)]
pub async fn webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, JsonApiError> {
    let provider: PaymentProvider = provider.parse().map_err(ServiceError::from)?;
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let out = state.webhooks.handle(&state.payments, provider, signature, &body).await?;
    Ok(Json(out))
}
