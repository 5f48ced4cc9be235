mod report;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use state::StoreState;
use time::OffsetDateTime;

pub use report::{DamageReport, NewReport, ReportRepository};

use crate::geo::ProximityQuery;

/// Handle to the report store: a sqlite database plus an image directory
/// under one data directory. Cheap to clone; all clones share the pool.
#[derive(Debug, Clone)]
pub struct ReportDb {
    state: Arc<StoreState>,
}

impl ReportDb {
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::new(data_dir).await?),
        })
    }

    /// Filesystem path of a report's annotated image.
    pub fn image_path(&self, report: &DamageReport) -> PathBuf {
        self.state.image_path(&report.image_fname)
    }

    /// Directory holding all stored report images, for serving them.
    pub fn images_dir(&self) -> PathBuf {
        self.state.images_dir()
    }
}

impl ReportRepository for ReportDb {
    async fn add_report(&self, report: NewReport, image: &RgbImage) -> anyhow::Result<DamageReport> {
        let image_fname = self.state.store_report_image(image).await?;
        let created_at = OffsetDateTime::now_utc();

        let inserted = sqlx::query_as::<_, DamageReport>(
            r#"INSERT INTO report (image_fname, detected_type, latitude, longitude, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, image_fname, detected_type, latitude, longitude, created_at"#,
        )
        .bind(&image_fname)
        .bind(report.detected_type.as_str())
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(created_at)
        .fetch_one(self.state.pool())
        .await;

        match inserted {
            Ok(row) => {
                tracing::info!(id = row.id, class = %row.detected_type, "report stored");
                Ok(row)
            }
            Err(err) => {
                // The image went in first; take it back out so the store
                // never holds a file without a row.
                if let Err(cleanup_err) = self.state.delete_report_image(&image_fname).await {
                    tracing::error!(%cleanup_err, image_fname, "orphan image cleanup failed");
                }
                Err(err.into())
            }
        }
    }

    async fn get_report_by_id(&self, id: i64) -> anyhow::Result<Option<DamageReport>> {
        let report = sqlx::query_as::<_, DamageReport>(
            r#"SELECT id, image_fname, detected_type, latitude, longitude, created_at
            FROM report WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.state.pool())
        .await?;
        Ok(report)
    }

    async fn get_reports(&self) -> anyhow::Result<Vec<DamageReport>> {
        let reports = sqlx::query_as::<_, DamageReport>(
            r#"SELECT id, image_fname, detected_type, latitude, longitude, created_at
            FROM report ORDER BY id ASC"#,
        )
        .fetch_all(self.state.pool())
        .await?;
        Ok(reports)
    }

    async fn nearby_reports(&self, query: &ProximityQuery) -> anyhow::Result<Vec<DamageReport>> {
        let bbox = query.bounding_box();
        let reports = sqlx::query_as::<_, DamageReport>(
            r#"SELECT id, image_fname, detected_type, latitude, longitude, created_at
            FROM report
            WHERE latitude IS NOT NULL AND longitude IS NOT NULL
              AND latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
            ORDER BY created_at DESC, id DESC"#,
        )
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lon)
        .bind(bbox.max_lon)
        .fetch_all(self.state.pool())
        .await?;
        Ok(reports)
    }
}
