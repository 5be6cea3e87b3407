/// HTTP handlers for the image endpoints, health and metrics
pub mod images;

pub use images::{get_image, list_images, upload_image};

use actix_web::{web, HttpResponse};

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

pub async fn metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(crate::metrics::render())
}

/// Register every route on an actix `App`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics)).service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health))
            .service(
                web::scope("/images")
                    .route("", web::post().to(upload_image))
                    .route("", web::get().to(list_images))
                    .route("/{id}", web::get().to(get_image)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryImageRepository;
    use crate::queue::{InMemoryJobQueue, SubjectFilter};
    use crate::services::UploadService;
    use crate::storage::FileSystemBlobStore;
    use actix_web::{http::StatusCode, test, App};
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageOutputFormat::Jpeg(90)).unwrap();
        buf.into_inner()
    }

    fn service(dir: &std::path::Path) -> (Arc<UploadService>, Arc<InMemoryJobQueue>) {
        let queue = Arc::new(InMemoryJobQueue::new(
            SubjectFilter::parse("media.>").unwrap(),
            Duration::from_millis(10),
        ));
        let service = UploadService::new(
            Arc::new(FileSystemBlobStore::new(dir)),
            Arc::new(InMemoryImageRepository::new()),
            queue.clone(),
            "media.picture",
        );
        (Arc::new(service), queue)
    }

    #[actix_web::test]
    async fn test_upload_returns_created_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let (service, queue) = service(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/images?name=cat.jpg&size=100")
            .set_payload(jpeg(640, 480))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["name"], "cat.jpg");
        assert_eq!(body["type"], "jpg");
        assert_eq!(body["width"], 640);
        assert_eq!(body["height"], 480);
        assert!(body["image_id"].is_string());
        assert_eq!(queue.pending().await, 1);
    }

    #[actix_web::test]
    async fn test_upload_rejects_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let (service, queue) = service(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/images?name=notes.txt")
            .set_payload("just text")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/v1/images?name=..%2Fescape.jpg")
            .set_payload(jpeg(10, 10))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(queue.pending().await, 0);
    }

    #[actix_web::test]
    async fn test_listing_without_thumbnails_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _queue) = service(dir.path());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/images/42").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!([]));

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
