use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use imoveis_importer::app::import_use_case::{ImportUseCase, MappingErrorPolicy};
use imoveis_importer::common::error::Result;
use imoveis_importer::feed::normalizer::NormalizedListing;
use imoveis_importer::server::router::app_router;
use imoveis_importer::server::state::AppState;
use imoveis_importer::storage::ListingStore;

struct AcceptingStore;

#[async_trait]
impl ListingStore for AcceptingStore {
    async fn replace_all(&self, listings: &[NormalizedListing]) -> Result<u64> {
        Ok(listings.len() as u64)
    }
}

fn test_app() -> axum::Router {
    let importer = ImportUseCase::new(
        Arc::new(AcceptingStore),
        MappingErrorPolicy::Abort,
        Duration::from_secs(5),
    );
    app_router(AppState {
        importer: Arc::new(importer),
        max_upload_bytes: 50 * 1024 * 1024,
    })
}

const BOUNDARY: &str = "feed-test-boundary";

fn multipart_upload(field_name: &str, payload: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field_name}\"; filename=\"feed.xml\"\r\n\
         Content-Type: text/xml\r\n\r\n\
         {payload}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/importar-xml")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

const SAMPLE_FEED: &str = include_str!("resources/feed_sample.xml");

#[tokio::test]
async fn upload_reports_the_imported_count() {
    let response = test_app()
        .oneshot(multipart_upload("xmlFile", SAMPLE_FEED))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["importedCount"], 3);
}

#[tokio::test]
async fn missing_upload_is_a_bad_request() {
    let response = test_app()
        .oneshot(multipart_upload("wrongField", SAMPLE_FEED))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "BadRequest");
}

#[tokio::test]
async fn empty_upload_is_a_bad_request() {
    let response = test_app()
        .oneshot(multipart_upload("xmlFile", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_feed_surfaces_the_parse_error() {
    let response = test_app()
        .oneshot(multipart_upload("xmlFile", "<ListingDataFeed><Listings>"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "ParseError");
    assert!(body["message"].as_str().unwrap().contains("XML"));
}

#[tokio::test]
async fn uploads_over_the_size_cap_are_rejected() {
    let importer = ImportUseCase::new(
        Arc::new(AcceptingStore),
        MappingErrorPolicy::Abort,
        Duration::from_secs(5),
    );
    let app = app_router(AppState {
        importer: Arc::new(importer),
        max_upload_bytes: 256,
    });

    let oversized = "x".repeat(1024);
    let response = app
        .oneshot(multipart_upload("xmlFile", &oversized))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
