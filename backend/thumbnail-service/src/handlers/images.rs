/// Image handlers - upload originals and list them with their thumbnails
use actix_web::{web, HttpResponse};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::services::UploadService;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub name: String,
    pub size: Option<u32>,
}

/// Store an original image and queue its thumbnail
pub async fn upload_image(
    service: web::Data<Arc<UploadService>>,
    query: web::Query<UploadQuery>,
    body: Bytes,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    if query.size == Some(0) {
        return Err(AppError::BadRequest("size must be positive".to_string()));
    }

    let receipt = service.upload_photo(&query.name, body, query.size).await?;
    Ok(HttpResponse::Created().json(receipt))
}

pub async fn list_images(service: web::Data<Arc<UploadService>>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_all().await?))
}

pub async fn get_image(
    service: web::Data<Arc<UploadService>>,
    id: web::Path<i64>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(service.list_by_id(id.into_inner()).await?))
}
