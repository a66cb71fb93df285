use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use game::progress_api::{ApiState, router};
use game::store::ProgressData;
use game::sync::NodeInteraction;
use game::tree::SkillTreeDef;

fn test_router(tag: &str) -> Router {
    let path = std::env::temp_dir().join(format!(
        "medphys_api_test_{}_{tag}.json",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    router(ApiState::new(SkillTreeDef::default(), path))
}

async fn body_json<T: for<'de> serde::Deserialize<'de>>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let response = test_router("health")
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn progress_defaults_before_any_save() {
    let response = test_router("default")
        .oneshot(
            Request::builder()
                .uri("/api/skill-progress")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let progress: ProgressData = body_json(response.into_body()).await;
    assert_eq!(progress, ProgressData::default());
}

#[tokio::test]
async fn posted_progress_is_returned_on_the_next_get() {
    let app = test_router("roundtrip");
    let progress = ProgressData {
        version: 1,
        reputation: 25,
        skill_points_available: 4,
        unlocked_skills: vec!["core".to_string(), "dosimetry_basics".to_string()],
        active_skills: vec!["core".to_string()],
    };

    let post = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/skill-progress")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&progress).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(post.status(), StatusCode::NO_CONTENT);

    let get = app
        .oneshot(
            Request::builder()
                .uri("/api/skill-progress")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let loaded: ProgressData = body_json(get.into_body()).await;
    assert_eq!(loaded, progress);
}

#[tokio::test]
async fn node_endpoint_serves_known_nodes_and_404s_unknown_ones() {
    let app = test_router("node");

    let known = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/node/core")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(known.status(), StatusCode::OK);
    let payload: NodeInteraction = body_json(known.into_body()).await;
    assert!(matches!(payload, NodeInteraction::Event { .. }));

    let unknown = app
        .oneshot(
            Request::builder()
                .uri("/api/node/not-a-skill")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}
