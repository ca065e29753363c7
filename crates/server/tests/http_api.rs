use std::net::SocketAddr;

use axum::Router;
use migration::MigratorTrait;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use server::routes::{self, ServerState};

struct TestApp {
    base_url: String,
}

/// Spin up the app on an ephemeral port against the DATABASE_URL database.
/// Without a database the tests skip gracefully.
async fn start_server() -> anyhow::Result<Option<TestApp>> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL missing; skipping http api tests");
        return Ok(None);
    }

    let db = models::db::connect().await?;
    migration::Migrator::up(&db, None).await?;

    let state = ServerState { db };
    let app: Router = routes::build_router(state, CorsLayer::very_permissive());

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(Some(TestApp { base_url }))
}

#[tokio::test]
async fn health_endpoint_responds() -> anyhow::Result<()> {
    let Some(app) = start_server().await? else { return Ok(()) };
    let resp = reqwest::get(format!("{}/health", app.base_url)).await?;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn classroom_scenario_over_http() -> anyhow::Result<()> {
    let Some(app) = start_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let room_number = format!("R-{}", Uuid::new_v4());

    // Create a two-seat room.
    let resp = client
        .post(format!("{}/api/classrooms", app.base_url))
        .json(&json!({"name": "Room A", "room_number": room_number, "max_capacity": 2}))
        .send()
        .await?;
    assert_eq!(resp.status(), 201);
    let room: serde_json::Value = resp.json().await?;
    let room_id = room["id"].as_i64().unwrap();

    // Second room with the same number conflicts.
    let resp = client
        .post(format!("{}/api/classrooms", app.base_url))
        .json(&json!({"name": "Room B", "room_number": room_number, "max_capacity": 2}))
        .send()
        .await?;
    assert_eq!(resp.status(), 409);
    let err: serde_json::Value = resp.json().await?;
    assert_eq!(err["code"], "CLS-409");

    // Two students fill the room; delete is then blocked.
    let mut student_ids = Vec::new();
    for name in ["Ada", "Grace"] {
        let resp = client
            .post(format!("{}/api/students", app.base_url))
            .json(&json!({
                "first_name": name,
                "last_name": "Tester",
                "email": format!("{name}_{}@example.com", Uuid::new_v4()),
                "level": "Beginner"
            }))
            .send()
            .await?;
        assert_eq!(resp.status(), 201);
        let student: serde_json::Value = resp.json().await?;
        let student_id = student["id"].as_i64().unwrap();
        let resp = client
            .post(format!("{}/api/classrooms/{room_id}/students/{student_id}", app.base_url))
            .send()
            .await?;
        assert_eq!(resp.status(), 200);
        student_ids.push(student_id);
    }

    let resp = client.get(format!("{}/api/classrooms/{room_id}", app.base_url)).send().await?;
    let room: serde_json::Value = resp.json().await?;
    assert_eq!(room["current_capacity"], 2);

    let resp = client.delete(format!("{}/api/classrooms/{room_id}", app.base_url)).send().await?;
    assert_eq!(resp.status(), 409);

    // Cleanup: unassign and remove everything.
    for student_id in student_ids {
        let resp = client
            .delete(format!("{}/api/classrooms/{room_id}/students/{student_id}", app.base_url))
            .send()
            .await?;
        assert_eq!(resp.status(), 200);
        let resp = client.delete(format!("{}/api/students/{student_id}", app.base_url)).send().await?;
        assert_eq!(resp.status(), 204);
    }
    let resp = client.delete(format!("{}/api/classrooms/{room_id}", app.base_url)).send().await?;
    assert_eq!(resp.status(), 204);
    Ok(())
}

#[tokio::test]
async fn short_keyword_is_rejected_before_querying() -> anyhow::Result<()> {
    let Some(app) = start_server().await? else { return Ok(()) };
    let resp = reqwest::get(format!("{}/api/students/search?keyword=a", app.base_url)).await?;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["code"], "VAL-400");
    Ok(())
}

#[tokio::test]
async fn unknown_course_is_404_with_code() -> anyhow::Result<()> {
    let Some(app) = start_server().await? else { return Ok(()) };
    let resp = reqwest::get(format!("{}/api/courses/999999999", app.base_url)).await?;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["code"], "CRS-404");
    Ok(())
}

#[tokio::test]
async fn invalid_payload_collects_violations() -> anyhow::Result<()> {
    let Some(app) = start_server().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/trainers", app.base_url))
        .json(&json!({
            "first_name": "G",
            "last_name": "H",
            "email": "broken",
            "specialty": "x"
        }))
        .send()
        .await?;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["message"], "Validation Failed");
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(4));
    Ok(())
}
