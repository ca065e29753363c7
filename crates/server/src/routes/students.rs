use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use common::pagination::{Pagination, Sort};
use service::student_service::{self, StudentInput};

use crate::errors::ApiError;
use crate::routes::{page_response, PageParams, SearchParams, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/students", post(create).get(list))
        .route("/api/students/search", get(search))
        .route("/api/students/name", get(by_name))
        .route("/api/students/level/:level", get(by_level))
        .route("/api/students/course/:course_id", get(by_course))
        .route("/api/students/classroom/:classroom_id", get(by_classroom))
        .route("/api/students/:id", get(get_by_id).put(update).delete(remove))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct NameParams {
    pub last_name: String,
    pub first_name: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl NameParams {
    fn pagination(&self) -> Pagination {
        Pagination { page: self.page.unwrap_or(1), per_page: self.size.unwrap_or(10) }
    }

    fn sort(&self) -> Option<Sort> {
        self.sort.as_deref().and_then(Sort::parse)
    }
}

#[utoipa::path(
    post, path = "/api/students", tag = "students",
    request_body = crate::openapi::StudentInputDoc,
    responses(
        (status = 201, description = "Student created"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<StudentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let student = student_service::create_student(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[utoipa::path(
    get, path = "/api/students/{id}", tag = "students",
    params(("id" = i64, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let student = student_service::get_student(&state.db, id).await?;
    Ok(Json(student))
}

#[utoipa::path(
    get, path = "/api/students", tag = "students",
    params(PageParams),
    responses(
        (status = 200, description = "Page of students"),
        (status = 204, description = "No students found")
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = student_service::list_students(&state.db, params.pagination(), params.sort().as_ref()).await?;
    Ok(page_response(page))
}

#[utoipa::path(
    put, path = "/api/students/{id}", tag = "students",
    params(("id" = i64, Path, description = "Student ID")),
    request_body = crate::openapi::StudentInputDoc,
    responses(
        (status = 200, description = "Student updated"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(input): Json<StudentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let student = student_service::update_student(&state.db, id, input).await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete, path = "/api/students/{id}", tag = "students",
    params(("id" = i64, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Student still enrolled in a course")
    )
)]
pub async fn remove(State(state): State<ServerState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    student_service::delete_student(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get, path = "/api/students/search", tag = "students",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching students"),
        (status = 204, description = "No matches"),
        (status = 400, description = "Keyword shorter than 2 characters")
    )
)]
pub async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let page = student_service::search_students(
        &state.db,
        &params.keyword,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/students/level/{level}", tag = "students",
    params(("level" = String, Path, description = "Student level"), PageParams),
    responses(
        (status = 200, description = "Students at the level"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_level(
    State(state): State<ServerState>,
    Path(level): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        student_service::find_by_level(&state.db, &level, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/students/course/{course_id}", tag = "students",
    params(("course_id" = i64, Path, description = "Course ID"), PageParams),
    responses(
        (status = 200, description = "Students enrolled in the course"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_course(
    State(state): State<ServerState>,
    Path(course_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        student_service::find_by_course(&state.db, course_id, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/students/classroom/{classroom_id}", tag = "students",
    params(("classroom_id" = i64, Path, description = "Classroom ID"), PageParams),
    responses(
        (status = 200, description = "Students assigned to the room"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_classroom(
    State(state): State<ServerState>,
    Path(classroom_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = student_service::find_by_classroom(
        &state.db,
        classroom_id,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/students/name", tag = "students",
    params(NameParams),
    responses(
        (status = 200, description = "Students matching both name parts"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_name(
    State(state): State<ServerState>,
    Query(params): Query<NameParams>,
) -> Result<Response, ApiError> {
    let page = student_service::find_by_name(
        &state.db,
        &params.last_name,
        &params.first_name,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}
