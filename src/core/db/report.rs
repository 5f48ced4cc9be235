use sqlx::FromRow;
use time::OffsetDateTime;

use crate::geo::ProximityQuery;
use crate::models::DamageClass;

/// A persisted damage report. Immutable once created; never deleted by this
/// service.
#[derive(Debug, Clone, FromRow)]
pub struct DamageReport {
    pub id: i64,
    pub image_fname: String,
    pub detected_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: OffsetDateTime,
}

impl DamageReport {
    /// Parsed damage class, if the stored string is one of the known forms.
    pub fn damage_class(&self) -> Option<DamageClass> {
        DamageClass::parse(&self.detected_type)
    }
}

/// Input for a new report row. The annotated image travels separately so the
/// repository can link the image write and the insert.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub detected_type: DamageClass,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub trait ReportRepository {
    /// Store the annotated image and insert the report row. The row id is
    /// issued by the store; if the insert fails the stored image is removed
    /// again so no orphan file remains.
    fn add_report(
        &self,
        report: NewReport,
        image: &image::RgbImage,
    ) -> impl Future<Output = anyhow::Result<DamageReport>>;

    fn get_report_by_id(&self, id: i64) -> impl Future<Output = anyhow::Result<Option<DamageReport>>>;

    fn get_reports(&self) -> impl Future<Output = anyhow::Result<Vec<DamageReport>>>;

    /// Reports inside the query's proximity box, most recent first. Reports
    /// without coordinates never match.
    fn nearby_reports(
        &self,
        query: &ProximityQuery,
    ) -> impl Future<Output = anyhow::Result<Vec<DamageReport>>>;
}
