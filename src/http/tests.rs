use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{build_router, AppState};
use crate::app::App;
use crate::clock::SystemClock;
use crate::db::Repository;
use crate::test_utils::test_config;

const TOKEN: &str = "letmein";

async fn router(admin_token: Option<&str>) -> Router {
    let repository = Repository::in_memory().await.unwrap();
    let config = test_config(admin_token);
    let app = App::with_repository(repository, &config, Arc::new(SystemClock));
    build_router(Arc::new(AppState {
        app,
        admin_token: config.admin_token.clone(),
    }))
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(router, req).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn unit(title: &str, keyword: &str) -> Value {
    json!({
        "subjectId": "BP101T",
        "title": title,
        "blogContent": "<p>Short body</p>",
        "yearSlug": "1st-year",
        "unitNumber": 1,
        "primaryKeyword": keyword,
    })
}

#[tokio::test]
async fn test_health() {
    let router = router(None).await;
    let (status, body) = send_json(&router, request(Method::GET, "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_sitemap_content_type() {
    let router = router(None).await;
    let response = router
        .clone()
        .oneshot(request(Method::GET, "/sitemap-core.xml", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(xml.contains("<urlset"));
    assert!(xml.contains("<loc>https://pharmacy.example/bpharm</loc>"));
}

#[tokio::test]
async fn test_robots_txt() {
    let router = router(None).await;
    let (status, body) = send(&router, request(Method::GET, "/robots.txt", None)).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("Sitemap: https://pharmacy.example/sitemap-index.xml"));
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let router = router(Some(TOKEN)).await;

    let anonymous = Request::builder()
        .uri("/orphan-pages")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&router, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let wrong = Request::builder()
        .uri("/orphan-pages")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_json(&router, request(Method::GET, "/orphan-pages", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "orphanPages": [], "count": 0 }));

    // public routes stay open
    let public = Request::builder().uri("/content").body(Body::empty()).unwrap();
    let (status, _) = send(&router, public).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_content_crud() {
    let router = router(Some(TOKEN)).await;

    let (status, created) = send_json(
        &router,
        request(Method::POST, "/content", Some(unit("Cell Structure", "cell"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "cell-structure");
    assert_eq!(
        created["canonicalUrl"],
        "https://pharmacy.example/bpharm/1st-year/bp101t/cell-structure"
    );
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) =
        send_json(&router, request(Method::GET, &format!("/content/{}", id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Cell Structure");

    let (status, updated) = send_json(
        &router,
        request(
            Method::PUT,
            &format!("/content/{}", id),
            Some(json!({ "unitNumber": 2 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["unitNumber"], 2);
    assert_eq!(updated["slug"], "cell-structure");

    let (status, _) =
        send(&router, request(Method::DELETE, &format!("/content/{}", id), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) =
        send_json(&router, request(Method::GET, &format!("/content/{}", id), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_create_rejects_blank_title() {
    let router = router(None).await;
    let (status, body) = send_json(
        &router,
        request(Method::POST, "/content", Some(unit("  ", "cell"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn test_keyword_map_conflict() {
    let router = router(None).await;
    let (_, first) = send_json(
        &router,
        request(Method::POST, "/content", Some(unit("Cells", "cell"))),
    )
    .await;
    let (_, second) = send_json(
        &router,
        request(Method::POST, "/content", Some(unit("Tissues", "tissue"))),
    )
    .await;

    let mapping = |content: &Value| {
        json!({
            "keyword": "Cell Biology",
            "url": content["canonicalUrl"],
            "contentId": content["id"],
        })
    };

    let (status, saved) = send_json(
        &router,
        request(Method::POST, "/keyword-map", Some(mapping(&first))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["keyword"], "cell biology");

    let (status, body) = send_json(
        &router,
        request(Method::POST, "/keyword-map", Some(mapping(&second))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("cell biology"));

    let (status, rows) =
        send_json(&router, request(Method::GET, "/keyword-mappings", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["contentTitle"], "Cells");
}

#[tokio::test]
async fn test_cannibalization_check() {
    let router = router(None).await;
    for title in ["Cells", "Cell Division"] {
        send(
            &router,
            request(Method::POST, "/content", Some(unit(title, "Cell"))),
        )
        .await;
    }

    let (status, body) =
        send_json(&router, request(Method::GET, "/cannibalization-check", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["hasIssues"], true);
    assert_eq!(body["cannibalizedKeywords"][0]["keyword"], "cell");
}

#[tokio::test]
async fn test_internal_links_missing_content() {
    let router = router(None).await;
    let (status, _) = send(&router, request(Method::GET, "/internal-links/42", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_internal_links_are_public() {
    let router = router(Some(TOKEN)).await;
    let (status, created) = send_json(
        &router,
        request(Method::POST, "/content", Some(unit("Cells", "cell"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let anonymous = Request::builder()
        .uri(format!("/internal-links/{}", created["id"]))
        .body(Body::empty())
        .unwrap();
    let (status, bundle) = send_json(&router, anonymous).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        bundle["parent"]["url"],
        "https://pharmacy.example/bpharm/1st-year/bp101t"
    );

    let anonymous = Request::builder()
        .method(Method::POST)
        .uri("/regenerate-links")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_regenerate_links_summary() {
    let router = router(None).await;
    send(
        &router,
        request(Method::POST, "/content", Some(unit("Cells", "cell"))),
    )
    .await;

    let (status, body) =
        send_json(&router, request(Method::POST, "/regenerate-links", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], 1);
    assert_eq!(body["failed"], 0);
}

#[tokio::test]
async fn test_invalidate_sitemap() {
    let router = router(None).await;
    send(&router, request(Method::GET, "/sitemap-core.xml", None)).await;

    let (status, body) =
        send_json(&router, request(Method::POST, "/invalidate-sitemap", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "all");
    assert_eq!(body["invalidated"], 1);

    let (status, body) = send_json(
        &router,
        request(
            Method::POST,
            "/invalidate-sitemap",
            Some(json!({ "type": "core" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "core");

    let (status, _) = send(
        &router,
        request(
            Method::POST,
            "/invalidate-sitemap",
            Some(json!({ "type": "images" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalidate_sitemap_rejects_malformed_body() {
    let router = router(None).await;
    send(&router, request(Method::GET, "/sitemap-core.xml", None)).await;

    let (status, _) = send(
        &router,
        request(
            Method::POST,
            "/invalidate-sitemap",
            Some(json!({ "type": 5 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let broken = Request::builder()
        .method(Method::POST)
        .uri("/invalidate-sitemap")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send_json(&router, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    // the cached core sitemap survived both rejected requests
    let (status, body) =
        send_json(&router, request(Method::POST, "/invalidate-sitemap", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invalidated"], 1);
}

#[tokio::test]
async fn test_quality_report_on_empty_site() {
    let router = router(None).await;
    let (status, body) = send_json(&router, request(Method::GET, "/quality-report", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 80);
    assert_eq!(body["checklist"].as_array().unwrap().len(), 6);
}
