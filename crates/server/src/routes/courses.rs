use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::types::Page;
use models::course;
use service::course_service::{self, CreateCourse, UpdateCourse};
use crate::{errors::JsonApiError, routes::pagination, state::{actor, AppState}};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CourseView {
    #[serde(flatten)]
    pub course: course::Model,
    pub remaining_seats: i32,
}

impl From<course::Model> for CourseView {
    fn from(course: course::Model) -> Self {
        let remaining_seats = course.remaining_seats();
        Self { course, remaining_seats }
    }
}

#[utoipa::path(
    get, path = "/tenants/{tid}/courses", tag = "courses",
    params(("tid" = Uuid, Path, description = "Tenant ID"), ListQuery),
    responses((status = 200, description = "Page of courses"))
)]
pub async fn list(State(state): State<AppState>, Path(tid): Path<Uuid>, Query(q): Query<ListQuery>) -> Result<Json<Page<CourseView>>, JsonApiError> {
    let page = course_service::list_courses(&state.db, tid, pagination(q.page, q.per_page)).await?;
    Ok(Json(page.map(CourseView::from)))
}

#[utoipa::path(
    post, path = "/tenants/{tid}/courses", tag = "courses",
    params(("tid" = Uuid, Path, description = "Tenant ID")),
    request_body = crate::openapi::CreateCourseDoc,
    responses((status = 201, description = "Created"), (status = 400, description = "Validation Error"), (status = 404, description = "Tenant Not Found"))
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tid): Path<Uuid>,
    Json(input): Json<CreateCourse>,
) -> Result<(StatusCode, Json<CourseView>), JsonApiError> {
    let c = course_service::create_course(&state.db, tid, input, &actor(&headers)).await?;
    Ok((StatusCode::CREATED, Json(c.into())))
}

#[utoipa::path(
    get, path = "/courses/{id}", tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<CourseView>, JsonApiError> {
    Ok(Json(course_service::require_course(&state.db, id).await?.into()))
}

#[utoipa::path(
    put, path = "/courses/{id}", tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = crate::openapi::UpdateCourseDoc,
    responses(
        (status = 200, description = "Updated"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Capacity below booked seats")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCourse>,
) -> Result<Json<CourseView>, JsonApiError> {
    Ok(Json(course_service::update_course(&state.db, id, input, &actor(&headers)).await?.into()))
}

#[utoipa::path(
    delete, path = "/courses/{id}", tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 204, description = "Deleted"), (status = 404, description = "Not Found"), (status = 409, description = "Course has bookings"))
)]
pub async fn delete(State(state): State<AppState>, headers: HeaderMap, Path(id): Path<Uuid>) -> Result<StatusCode, JsonApiError> {
    course_service::delete_course(&state.db, id, &actor(&headers)).await?;
    Ok(StatusCode::NO_CONTENT)
}
