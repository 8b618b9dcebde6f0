use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod audit;
pub mod bookings;
pub mod courses;
pub mod members;
pub mod payments;
pub mod tenants;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    let tenant_routes = Router::new()
        .route("/tenants", post(tenants::create))
        .route("/tenants/:id", get(tenants::get))
        .route("/tenants/:tid/members", get(members::list).post(members::register))
        .route("/tenants/:tid/members/by-phone/:phone", get(members::get_by_phone))
        .route("/tenants/:tid/courses", get(courses::list).post(courses::create));

    let member_routes = Router::new()
        .route("/members/:id", get(members::get).put(members::update).delete(members::delete))
        .route("/members/:id/id-card", get(members::reveal_id_card))
        .route("/members/:id/renew", post(members::renew))
        .route("/members/:id/renewals", get(members::list_renewals).post(members::request_renewal))
        .route("/members/:id/bookings", get(bookings::list_for_member))
        .route("/members/:id/payments", get(payments::list_for_member));

    let course_routes = Router::new()
        .route("/courses/:id", get(courses::get).put(courses::update).delete(courses::delete))
        .route("/courses/:id/bookings", get(bookings::list_for_course).post(bookings::book))
        .route("/bookings/:id", delete(bookings::cancel));

    let payment_routes = Router::new()
        .route("/payments", post(payments::create))
        .route("/payments/:id", get(payments::get))
        .route("/payments/by-no/:order_no", get(payments::get_by_no))
        .route("/payments/:id/submit", post(payments::submit))
        .route("/payments/:id/cancel", post(payments::cancel))
        .route("/payments/:id/transition", post(payments::transition))
        .route("/payments/:id/sync", post(payments::sync))
        .route("/payments/webhook/:provider", post(payments::webhook));

    Router::new()
        .route("/health", get(health))
        .route("/audit", get(audit::list))
        .merge(tenant_routes)
        .merge(member_routes)
        .merge(course_routes)
        .merge(payment_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}

/// `page`/`per_page` query pair; absent values fall back to defaults.
pub(crate) fn pagination(page: Option<u32>, per_page: Option<u32>) -> common::pagination::Pagination {
    let d = common::pagination::Pagination::default();
    common::pagination::Pagination { page: page.unwrap_or(d.page), per_page: per_page.unwrap_or(d.per_page) }
}
