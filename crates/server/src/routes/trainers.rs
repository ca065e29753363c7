use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use common::pagination::{Pagination, Sort};
use service::errors::MAX_COURSES_PER_TRAINER;
use service::trainer_service::{self, TrainerInput};

use crate::errors::ApiError;
use crate::routes::{page_response, PageParams, SearchParams, ServerState};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/trainers", post(create).get(list))
        .route("/api/trainers/search", get(search))
        .route("/api/trainers/name", get(by_name))
        .route("/api/trainers/available", get(available))
        .route("/api/trainers/without-courses", get(without_courses))
        .route("/api/trainers/email/:email", get(by_email))
        .route("/api/trainers/specialty/:specialty", get(by_specialty))
        .route("/api/trainers/classroom/:classroom_id", get(by_classroom))
        .route("/api/trainers/:id", get(get_by_id).put(update).delete(remove))
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

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct AvailableParams {
    pub max_courses: Option<i64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl AvailableParams {
    fn pagination(&self) -> Pagination {
        Pagination { page: self.page.unwrap_or(1), per_page: self.size.unwrap_or(10) }
    }

    fn sort(&self) -> Option<Sort> {
        self.sort.as_deref().and_then(Sort::parse)
    }
}

#[utoipa::path(
    post, path = "/api/trainers", tag = "trainers",
    request_body = crate::openapi::TrainerInputDoc,
    responses(
        (status = 201, description = "Trainer created"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Json(input): Json<TrainerInput>,
) -> Result<impl IntoResponse, ApiError> {
    let trainer = trainer_service::create_trainer(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(trainer)))
}

#[utoipa::path(
    get, path = "/api/trainers/{id}", tag = "trainers",
    params(("id" = i64, Path, description = "Trainer ID")),
    responses(
        (status = 200, description = "Trainer details"),
        (status = 404, description = "Trainer not found")
    )
)]
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let trainer = trainer_service::get_trainer(&state.db, id).await?;
    Ok(Json(trainer))
}

#[utoipa::path(
    get, path = "/api/trainers", tag = "trainers",
    params(PageParams),
    responses(
        (status = 200, description = "Page of trainers"),
        (status = 204, description = "No trainers found")
    )
)]
pub async fn list(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = trainer_service::list_trainers(&state.db, params.pagination(), params.sort().as_ref()).await?;
    Ok(page_response(page))
}

#[utoipa::path(
    put, path = "/api/trainers/{id}", tag = "trainers",
    params(("id" = i64, Path, description = "Trainer ID")),
    request_body = crate::openapi::TrainerInputDoc,
    responses(
        (status = 200, description = "Trainer updated"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Trainer not found"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(input): Json<TrainerInput>,
) -> Result<impl IntoResponse, ApiError> {
    let trainer = trainer_service::update_trainer(&state.db, id, input).await?;
    Ok(Json(trainer))
}

#[utoipa::path(
    delete, path = "/api/trainers/{id}", tag = "trainers",
    params(("id" = i64, Path, description = "Trainer ID")),
    responses(
        (status = 204, description = "Trainer deleted"),
        (status = 404, description = "Trainer not found"),
        (status = 409, description = "Trainer still has assigned courses")
    )
)]
pub async fn remove(State(state): State<ServerState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    trainer_service::delete_trainer(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get, path = "/api/trainers/search", tag = "trainers",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching trainers"),
        (status = 204, description = "No matches"),
        (status = 400, description = "Keyword shorter than 2 characters")
    )
)]
pub async fn search(
    State(state): State<ServerState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, ApiError> {
    let page = trainer_service::search_trainers(
        &state.db,
        &params.keyword,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/trainers/email/{email}", tag = "trainers",
    params(("email" = String, Path, description = "Trainer email"), PageParams),
    responses(
        (status = 200, description = "Trainers with the email"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_email(
    State(state): State<ServerState>,
    Path(email): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page =
        trainer_service::find_by_email(&state.db, &email, params.pagination(), params.sort().as_ref())
            .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/trainers/specialty/{specialty}", tag = "trainers",
    params(("specialty" = String, Path, description = "Trainer specialty"), PageParams),
    responses(
        (status = 200, description = "Trainers with the specialty"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_specialty(
    State(state): State<ServerState>,
    Path(specialty): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = trainer_service::find_by_specialty(
        &state.db,
        &specialty,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/trainers/name", tag = "trainers",
    params(NameParams),
    responses(
        (status = 200, description = "Trainers matching both name parts"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_name(
    State(state): State<ServerState>,
    Query(params): Query<NameParams>,
) -> Result<Response, ApiError> {
    let page = trainer_service::find_by_name(
        &state.db,
        &params.last_name,
        &params.first_name,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/trainers/classroom/{classroom_id}", tag = "trainers",
    params(("classroom_id" = i64, Path, description = "Classroom ID"), PageParams),
    responses(
        (status = 200, description = "Trainers assigned to the room"),
        (status = 204, description = "None found")
    )
)]
pub async fn by_classroom(
    State(state): State<ServerState>,
    Path(classroom_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = trainer_service::find_by_classroom(
        &state.db,
        classroom_id,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/trainers/available", tag = "trainers",
    params(AvailableParams),
    responses(
        (status = 200, description = "Trainers below the course-load threshold"),
        (status = 204, description = "None found")
    )
)]
pub async fn available(
    State(state): State<ServerState>,
    Query(params): Query<AvailableParams>,
) -> Result<Response, ApiError> {
    let max_courses = params.max_courses.unwrap_or(MAX_COURSES_PER_TRAINER as i64);
    let page = trainer_service::find_available_trainers(
        &state.db,
        max_courses,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}

#[utoipa::path(
    get, path = "/api/trainers/without-courses", tag = "trainers",
    params(PageParams),
    responses(
        (status = 200, description = "Trainers with no assigned courses"),
        (status = 204, description = "None found")
    )
)]
pub async fn without_courses(
    State(state): State<ServerState>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = trainer_service::find_trainers_without_courses(
        &state.db,
        params.pagination(),
        params.sort().as_ref(),
    )
    .await?;
    Ok(page_response(page))
}
