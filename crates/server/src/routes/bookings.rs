use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use models::booking;
use service::booking_service;
use crate::{errors::JsonApiError, state::{actor, AppState}};

#[derive(Debug, Deserialize)]
pub struct BookInput {
    pub member_id: Uuid,
}

#[utoipa::path(
    post, path = "/courses/{id}/bookings", tag = "bookings",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = crate::openapi::BookDoc,
    responses(
        (status = 201, description = "Booked"),
        (status = 404, description = "Course or member not found"),
        (status = 409, description = "Already booked, course full or concurrent modification"),
        (status = 422, description = "Member not active in this tenant")
    )
)]
pub async fn book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(course_id): Path<Uuid>,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<booking::Model>), JsonApiError> {
    let b = booking_service::book_course(&state.db, course_id, input.member_id, &actor(&headers)).await?;
    info!(booking_id = %b.id, course_id = %course_id, "booking created via api");
    Ok((StatusCode::CREATED, Json(b)))
}

#[utoipa::path(
    delete, path = "/bookings/{id}", tag = "bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses((status = 200, description = "Cancelled"), (status = 404, description = "Not Found"), (status = 409, description = "Already cancelled"))
)]
pub async fn cancel(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Result<Json<booking::Model>, JsonApiError> {
    Ok(Json(booking_service::cancel_booking(&state.db, id, &actor(&headers)).await?))
}

#[utoipa::path(
    get, path = "/courses/{id}/bookings", tag = "bookings",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Bookings of the course"), (status = 404, description = "Not Found"))
)]
pub async fn list_for_course(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<booking::Model>>, JsonApiError> {
    Ok(Json(booking_service::list_bookings_for_course(&state.db, id).await?))
}

#[utoipa::path(
    get, path = "/members/{id}/bookings", tag = "bookings",
    params(("id" = Uuid, Path, description = "Member ID")),
    responses((status = 200, description = "Bookings of the member"), (status = 404, description = "Not Found"))
)]
pub async fn list_for_member(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<booking::Model>>, JsonApiError> {
    Ok(Json(booking_service::list_bookings_for_member(&state.db, id).await?))
}
