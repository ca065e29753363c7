use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;

use common::pagination::{Pagination, Sort};
use models::course::CourseStatus;
use service::course_service::{self, CourseInput};

use crate::errors::ApiError;
use crate::routes::{page_response, PageParams, SearchParams, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/courses", post(create).get(list))
        .route("/api/courses/search", get(search))
        .route("/api/courses/date-range", get(date_range))
        .route("/api/courses/available", get(available))
        .route("/api/courses/upcoming", get(upcoming))
        .route("/api/courses/ongoing", get(ongoing))
        .route("/api/courses/without-trainer", get(without_trainer))
        .route("/api/courses/capacity", get(by_capacity))
        .route("/api/courses/trainer/:trainer_id", get(by_trainer))
        .route("/api/courses/level/:level", get(by_level))
        .route("/api/courses/status/:status", get(by_status))
        .route("/api/courses/:id", get(get_by_id).put(update).delete(remove))
        .route("/api/courses/:id/students/:student_id", post(enroll).delete(withdraw))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DateRangeParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl DateRangeParams {
    fn pagination(&self) -> Pagination {
        Pagination { page: self.page.unwrap_or(1), per_page: self.size.unwrap_or(10) }
    }

    fn sort(&self) -> Option<Sort> {
        self.sort.as_deref().and_then(Sort::parse)
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CapacityParams {
    pub capacity: i32,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl CapacityParams {
    fn pagination(&self) -> Pagination {
        Pagination { page: self.page.unwrap_or(1), per_page: self.size.unwrap_or(10) }
    }

    fn sort(&self) -> Option<Sort> {
        self.sort.as_deref().and_then(Sort::parse)
    }
}

#[utoipa::path(
    post, path = "/api/courses", tag = "courses",
    request_body = crate::openapi::CourseInputDoc,
    responses(
        (status = 201, description = "Course created"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Title already exists or trainer over course load")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<CourseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let course = course_service::create_course(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get, path = "/api/courses/{id}", tag = "courses",
    params(("id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course details"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let course = course_service::get_course(&state.db, id).await?;
    Ok(Json(course))
}

#[utoipa::path(
    get, path = "/api/courses", tag = "courses",
    params(PageParams),
    responses(
        (status = 200, description = "Page of courses"),
        (status = 204, description = "No courses found")
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = course_service::list_courses(&state.db, params.pagination(), params.sort().as_ref()).await?;
    Ok(page_response(page))
}

#[utoipa::path(
    put, path = "/api/courses/{id}", tag = "courses",
    params(("id" = i64, Path, description = "Course ID")),
    request_body = crate::openapi::CourseInputDoc,
    responses(
        (status = 200, description = "Course updated"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Title already exists")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(input): Json<CourseInput>,
) -> Result<impl IntoResponse, ApiError> {
    let course = course_service::update_course(&state.db, id, input).await?;
    Ok(Json(course))
}

#[utoipa::path(
    delete, path = "/api/courses/{id}", tag = "courses",
    params(("id" = i64, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Course still has enrolled students")
    )
)]
pub async fn remove(State(state): State<ServerState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    course_service::delete_course(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get, path = "/api/courses/search", tag = "courses",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching courses"),
        (status = 204, description = "No matches"),
        (status = 400, description = "Keyword shorter than 2 characters")
    )
)]
pub async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let page = course_service::search_courses(
        &state.db,
        &params.keyword,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/date-range", tag = "courses",
    params(DateRangeParams),
    responses(
        (status = 200, description = "Courses inside the window"),
        (status = 204, description = "No matches"),
        (status = 400, description = "Start date after end date")
    )
)]
pub async fn date_range(
    State(state): State<ServerState>,
    Query(params): Query<DateRangeParams>,
) -> Result<Response, ApiError> {
    let page = course_service::find_by_date_range(
        &state.db,
        params.start_date,
        params.end_date,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/trainer/{trainer_id}", tag = "courses",
    params(("trainer_id" = i64, Path, description = "Trainer ID"), PageParams),
    responses(
        (status = 200, description = "Courses assigned to the trainer"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_trainer(
    State(state): State<ServerState>,
    Path(trainer_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = course_service::find_by_trainer(
        &state.db,
        trainer_id,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/level/{level}", tag = "courses",
    params(("level" = String, Path, description = "Course level"), PageParams),
    responses(
        (status = 200, description = "Courses at the level"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_level(
    State(state): State<ServerState>,
    Path(level): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        course_service::find_by_level(&state.db, &level, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/status/{status}", tag = "courses",
    params(("status" = String, Path, description = "PLANNED | IN_PROGRESS | COMPLETED | CANCELLED"), PageParams),
    responses(
        (status = 200, description = "Courses with the status"),
        (status = 204, description = "None found"),
        (status = 400, description = "Unknown status value")
    )
)]
pub async fn by_status(
    State(state): State<ServerState>,
    Path(status): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let status = CourseStatus::parse(&status)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid course status: {status}")))?;
    let page =
        course_service::find_by_status(&state.db, status, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/available", tag = "courses",
    params(PageParams),
    responses(
        (status = 200, description = "Planned courses with open seats"),
        (status = 204, description = "None found")
    )
)]
pub async fn available(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        course_service::find_available_courses(&state.db, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/upcoming", tag = "courses",
    params(PageParams),
    responses(
        (status = 200, description = "Planned courses starting after today"),
        (status = 204, description = "None found")
    )
)]
pub async fn upcoming(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        course_service::find_upcoming_courses(&state.db, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/ongoing", tag = "courses",
    params(PageParams),
    responses(
        (status = 200, description = "Courses in progress"),
        (status = 204, description = "None found")
    )
)]
pub async fn ongoing(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        course_service::find_ongoing_courses(&state.db, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/without-trainer", tag = "courses",
    params(PageParams),
    responses(
        (status = 200, description = "Courses with no trainer assigned"),
        (status = 204, description = "None found")
    )
)]
pub async fn without_trainer(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = course_service::find_courses_without_trainer(
        &state.db,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/courses/capacity", tag = "courses",
    params(CapacityParams),
    responses(
        (status = 200, description = "Courses whose capacity window contains the head count"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_capacity(
    State(state): State<ServerState>,
    Query(params): Query<CapacityParams>,
) -> Result<Response, ApiError> {
    let page = course_service::find_by_capacity(
        &state.db,
        params.capacity,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    post, path = "/api/courses/{id}/students/{student_id}", tag = "courses",
    params(
        ("id" = i64, Path, description = "Course ID"),
        ("student_id" = i64, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student enrolled, updated course returned"),
        (status = 400, description = "Course full or student has no classroom"),
        (status = 404, description = "Course or student not found"),
        (status = 409, description = "Student already enrolled")
    )
)]
pub async fn enroll(
    State(state): State<ServerState>,
    Path((id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let course = course_service::enroll_student(&state.db, id, student_id).await?;
    Ok(Json(course))
}

#[utoipa::path(
    delete, path = "/api/courses/{id}/students/{student_id}", tag = "courses",
    params(
        ("id" = i64, Path, description = "Course ID"),
        ("student_id" = i64, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student withdrawn, updated course returned"),
        (status = 400, description = "Student is not enrolled in this course"),
        (status = 404, description = "Course or student not found")
    )
)]
pub async fn withdraw(
    State(state): State<ServerState>,
    Path((id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let course = course_service::withdraw_student(&state.db, id, student_id).await?;
    Ok(Json(course))
}
