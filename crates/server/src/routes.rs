use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::pagination::{Page, Pagination, Sort};
use common::types::Health;

use crate::openapi::ApiDoc;

pub mod classrooms;
pub mod courses;
pub mod students;
pub mod trainers;

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
}

/// Raw paging query parameters; page defaults to 1, size to 10, and the sort
/// field is handed through to the entity service untouched.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl PageParams {
    pub fn pagination(&self) -> Pagination {
        Pagination { page: self.page.unwrap_or(1), per_page: self.size.unwrap_or(10) }
    }

    pub fn sort(&self) -> Option<Sort> {
        self.sort.as_deref().and_then(Sort::parse)
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchParams {
    pub keyword: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

impl SearchParams {
    pub fn pagination(&self) -> Pagination {
        Pagination { page: self.page.unwrap_or(1), per_page: self.size.unwrap_or(10) }
    }

    pub fn sort(&self) -> Option<Sort> {
        self.sort.as_deref().and_then(Sort::parse)
    }
}

/// 200 with the page body, or 204 when nothing matched.
pub fn page_response<T: Serialize>(page: Page<T>) -> Response {
    if page.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(page).into_response()
    }
}

#[utoipa::path(
    get, path = "/health", tag = "health",
    responses((status = 200, description = "Service healthy"))
)]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: health, the four resource collections,
/// and the generated API docs.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(classrooms::router())
        .merge(courses::router())
        .merge(students::router())
        .merge(trainers::router())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
