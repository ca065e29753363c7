use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use common::pagination::{Pagination, Sort};
use service::classroom_service::{self, ClassRoomInput};

use crate::errors::ApiError;
use crate::routes::{page_response, PageParams, SearchParams, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/classrooms", post(create).get(list))
        .route("/api/classrooms/search", get(search))
        .route("/api/classrooms/available", get(available))
        .route("/api/classrooms/empty", get(empty))
        .route("/api/classrooms/without-trainers", get(without_trainers))
        .route("/api/classrooms/:id", get(get_by_id).put(update).delete(remove))
        .route(
            "/api/classrooms/:id/students/:student_id",
            post(add_student).delete(remove_student),
        )
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
    post, path = "/api/classrooms", tag = "classrooms",
    request_body = crate::openapi::ClassRoomInputDoc,
    responses(
        (status = 201, description = "Classroom created"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Room number already exists")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<ClassRoomInput>,
) -> Result<impl IntoResponse, ApiError> {
    let room = classroom_service::create_classroom(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[utoipa::path(
    get, path = "/api/classrooms/{id}", tag = "classrooms",
    params(("id" = i64, Path, description = "Classroom ID")),
    responses(
        (status = 200, description = "Classroom details"),
        (status = 404, description = "Classroom not found")
    )
)]
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let room = classroom_service::get_classroom(&state.db, id).await?;
    Ok(Json(room))
}

#[utoipa::path(
    get, path = "/api/classrooms", tag = "classrooms",
    params(PageParams),
    responses(
        (status = 200, description = "Page of classrooms"),
        (status = 204, description = "No classrooms found")
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        classroom_service::list_classrooms(&state.db, params.pagination(), params.sort().as_ref()).await?;
    Ok(page_response(page))
}

#[utoipa::path(
    put, path = "/api/classrooms/{id}", tag = "classrooms",
    params(("id" = i64, Path, description = "Classroom ID")),
    request_body = crate::openapi::ClassRoomInputDoc,
    responses(
        (status = 200, description = "Classroom updated"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Classroom not found"),
        (status = 409, description = "Room number already exists")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(input): Json<ClassRoomInput>,
) -> Result<impl IntoResponse, ApiError> {
    let room = classroom_service::update_classroom(&state.db, id, input).await?;
    Ok(Json(room))
}

#[utoipa::path(
    delete, path = "/api/classrooms/{id}", tag = "classrooms",
    params(("id" = i64, Path, description = "Classroom ID")),
    responses(
        (status = 204, description = "Classroom deleted"),
        (status = 404, description = "Classroom not found"),
        (status = 409, description = "Classroom still has students or trainers")
    )
)]
pub async fn remove(State(state): State<ServerState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    classroom_service::delete_classroom(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get, path = "/api/classrooms/search", tag = "classrooms",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching classrooms"),
        (status = 204, description = "No matches"),
        (status = 400, description = "Keyword shorter than 2 characters")
    )
)]
pub async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let page = classroom_service::search_classrooms(
        &state.db,
        &params.keyword,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/classrooms/available", tag = "classrooms",
    params(CapacityParams),
    responses(
        (status = 200, description = "Rooms with occupancy below the threshold"),
        (status = 204, description = "No rooms available")
    )
)]
pub async fn available(
    State(state): State<ServerState>,
    Query(params): Query<CapacityParams>,
) -> Result<Response, ApiError> {
    let page = classroom_service::find_available_rooms(
        &state.db,
        params.capacity,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/classrooms/empty", tag = "classrooms",
    params(PageParams),
    responses(
        (status = 200, description = "Rooms with no students and no trainers"),
        (status = 204, description = "No empty rooms")
    )
)]
pub async fn empty(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        classroom_service::find_empty_rooms(&state.db, params.pagination(), params.sort().as_ref()).await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/classrooms/without-trainers", tag = "classrooms",
    params(PageParams),
    responses(
        (status = 200, description = "Rooms with no assigned trainers"),
        (status = 204, description = "None found")
    )
)]
pub async fn without_trainers(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = classroom_service::find_rooms_without_trainers(
        &state.db,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    post, path = "/api/classrooms/{id}/students/{student_id}", tag = "classrooms",
    params(
        ("id" = i64, Path, description = "Classroom ID"),
        ("student_id" = i64, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student assigned, updated room returned"),
        (status = 400, description = "Room full or student already assigned"),
        (status = 404, description = "Classroom or student not found")
    )
)]
pub async fn add_student(
    State(state): State<ServerState>,
    Path((id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let room = classroom_service::add_student(&state.db, id, student_id).await?;
    info!(id, student_id, "classroom assignment via api");
    Ok(Json(room))
}

#[utoipa::path(
    delete, path = "/api/classrooms/{id}/students/{student_id}", tag = "classrooms",
    params(
        ("id" = i64, Path, description = "Classroom ID"),
        ("student_id" = i64, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Student unassigned, updated room returned"),
        (status = 400, description = "Student is not in this room"),
        (status = 404, description = "Classroom or student not found"),
        (status = 409, description = "Student still enrolled in a course")
    )
)]
pub async fn remove_student(
    State(state): State<ServerState>,
    Path((id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let room = classroom_service::remove_student(&state.db, id, student_id).await?;
    Ok(Json(room))
}
