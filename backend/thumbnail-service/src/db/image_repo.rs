/// Image repository - PostgreSQL operations for original and thumbnail records
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::MetadataStore;
use crate::config::DatabaseConfig;
use crate::error::StorageResult;
use crate::models::{ImageMeta, ImageWithThumbnail};

const SELECT_JOINED: &str = r#"
    SELECT ui.id, ui.image_id, ui.name, ui.type, ui.width, ui.height,
           mi.name AS mini_name, mi.width AS mini_width, mi.height AS mini_height
    FROM uploads_info ui
    INNER JOIN mini_info mi ON mi.original_id = ui.image_id
"#;

#[derive(Clone)]
pub struct PgImageRepository {
    pool: PgPool,
}

impl PgImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and apply the embedded migrations
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn joined_from_row(row: &PgRow) -> ImageWithThumbnail {
    ImageWithThumbnail {
        id: row.get("id"),
        image_id: row.get("image_id"),
        name: row.get("name"),
        image_type: row.get("type"),
        width: row.get::<i32, _>("width") as u32,
        height: row.get::<i32, _>("height") as u32,
        thumbnail_name: row.get("mini_name"),
        thumbnail_width: row.get::<i32, _>("mini_width") as u32,
        thumbnail_height: row.get::<i32, _>("mini_height") as u32,
    }
}

#[async_trait]
impl MetadataStore for PgImageRepository {
    async fn insert_original(&self, image_id: Uuid, meta: &ImageMeta) -> StorageResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO uploads_info (image_id, name, type, width, height)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(image_id)
        .bind(&meta.name)
        .bind(&meta.image_type)
        .bind(meta.width as i32)
        .bind(meta.height as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_thumbnail(
        &self,
        original_id: Option<Uuid>,
        meta: &ImageMeta,
    ) -> StorageResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO mini_info (original_id, name, type, width, height)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(original_id)
        .bind(&meta.name)
        .bind(&meta.image_type)
        .bind(meta.width as i32)
        .bind(meta.height as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn list_all(&self) -> StorageResult<Vec<ImageWithThumbnail>> {
        let query = format!("{SELECT_JOINED} ORDER BY ui.id");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        Ok(rows.iter().map(joined_from_row).collect())
    }

    async fn list_by_id(&self, id: i64) -> StorageResult<Vec<ImageWithThumbnail>> {
        let query = format!("{SELECT_JOINED} WHERE ui.id = $1 ORDER BY mi.id");
        let rows = sqlx::query(&query)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(joined_from_row).collect())
    }
}
