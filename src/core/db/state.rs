use std::path::{Path, PathBuf};

use anyhow::Context;
use image::RgbImage;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::fs as async_fs;
use uuid::Uuid;

const DB_FILE_NAME: &str = "reports.db";
const IMAGE_DIR_NAME: &str = "images";

/// Shared store backing: the sqlite pool plus the image directory.
///
/// Image filenames are UUIDv4-based so concurrent writers can never collide;
/// the row id issued by the insert is the report's identifier.
pub(super) struct StoreState {
    data_dir: PathBuf,
    pool: SqlitePool,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl StoreState {
    pub(super) async fn new<P: AsRef<Path>>(data_dir: P) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let images_dir = data_dir.join(IMAGE_DIR_NAME);
        async_fs::create_dir_all(&images_dir)
            .await
            .with_context(|| format!("failed to create image directory {images_dir:?}"))?;

        let db_file = data_dir.join(DB_FILE_NAME);
        let connect_opts = SqliteConnectOptions::new()
            .filename(&db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("failed to open report database {db_file:?}"))?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(data_dir = %data_dir.display(), "report store opened");

        Ok(Self { data_dir, pool })
    }

    pub(super) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(super) fn images_dir(&self) -> PathBuf {
        self.data_dir.join(IMAGE_DIR_NAME)
    }

    pub(super) fn image_path(&self, image_fname: &str) -> PathBuf {
        self.images_dir().join(image_fname)
    }

    /// Encode the annotated image into the store, returning the filename.
    /// PNG encoding is CPU-bound, so it runs on the blocking pool.
    pub(super) async fn store_report_image(&self, image: &RgbImage) -> anyhow::Result<String> {
        let image_fname = format!("{}.png", Uuid::new_v4());
        let dest_path = self.image_path(&image_fname);
        let image = image.clone();
        tokio::task::spawn_blocking(move || {
            image
                .save_with_format(&dest_path, image::ImageFormat::Png)
                .with_context(|| format!("failed to write report image {dest_path:?}"))
        })
        .await
        .context("image write task failed")??;
        Ok(image_fname)
    }

    /// Compensating cleanup when the row insert fails after the image write.
    pub(super) async fn delete_report_image(&self, image_fname: &str) -> anyhow::Result<()> {
        let path = self.image_path(image_fname);
        async_fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete report image {path:?}"))?;
        Ok(())
    }
}
