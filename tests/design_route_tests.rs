mod common;

use axum::http::StatusCode;
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn templates_are_listed() {
    let app = spawn_app().await;
    let (status, body) = app.send("GET", "/design/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["templates"][0]["name"], "Urban Core");
    assert_eq!(body["templates"][1]["name"], "Suburban Development");
}

#[tokio::test]
async fn generation_without_image_service_is_unavailable() {
    let app = spawn_app().await;
    let sections = json!([
        {"name": "Sidewalk", "width": 10, "material": "concrete", "use": "pedestrian"}
    ])
    .to_string();
    let uri = format!(
        "/design/cross-section/generate?units=feet&theme=watercolor&sections={}",
        url::form_urlencoded::byte_serialize(sections.as_bytes()).collect::<String>()
    );
    let (status, body) = app.send("GET", &uri, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn malformed_sections_are_rejected() {
    let app = spawn_app().await;
    let (status, _) = app
        .send(
            "GET",
            "/design/cross-section/generate?theme=sketch&sections=not-json",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn images_are_private_to_their_owner() {
    let app = spawn_app().await;
    let image = app
        .stores
        .images
        .insert(
            7,
            "https://img.example/1.png",
            "2D cross section",
            "watercolor",
            &json!([{"name": "Lane"}]),
        )
        .await
        .unwrap();

    let (status, mine) = app.send_as(Some(7), "GET", "/design/images", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["imageUrl"], "https://img.example/1.png");
    assert_eq!(mine[0]["isSaved"], false);

    let (_, theirs) = app.send_as(Some(8), "GET", "/design/images", None).await;
    assert_eq!(theirs, json!([]));

    let save = format!("/design/cross-section/{}/save", image.id);
    let (status, _) = app.send_as(Some(8), "POST", &save, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send_as(Some(7), "POST", &save, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, mine) = app.send_as(Some(7), "GET", "/design/images", None).await;
    assert_eq!(mine[0]["isSaved"], true);
}
