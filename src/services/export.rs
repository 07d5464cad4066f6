//! Single report downloads and background ZIP batches with progress.

use crate::core::report::report_filename;
use crate::models::Property;
use crate::services::gateway::{GatewayClient, GatewayError};
use crate::services::images::ImageResolverChain;
use crate::services::pdf::{ReportError, ReportRenderer};
use crate::services::storage::{ObjectStore, StorageError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Finished jobs older than this are dropped when a new batch starts
const JOB_RETENTION_MINUTES: i64 = 60;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("report template unavailable: {0}")]
    Template(StorageError),

    #[error("report generation failed: {0}")]
    Report(#[from] ReportError),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("archive write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("property not found: {0}")]
    PropertyNotFound(String),

    #[error("no properties requested")]
    EmptyRequest,

    #[error("export job not found: {0}")]
    JobNotFound(Uuid),

    #[error("export job {0} has no archive")]
    ArchiveUnavailable(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl ExportProgress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            percent: progress_percent(completed, total),
        }
    }
}

/// round(100 * completed / total); an empty batch counts as done
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total);
    ((100.0 * completed as f64 / total as f64).round()) as u8
}

/// Public view of a batch job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub progress: ExportProgress,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct JobEntry {
    job: ExportJob,
    archive: Option<Arc<Vec<u8>>>,
}

/// In-memory registry of batch jobs
#[derive(Default)]
pub struct ExportJobs {
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
}

impl ExportJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, total: usize) -> ExportJob {
        let job = ExportJob {
            id: Uuid::new_v4(),
            status: JobStatus::Running,
            progress: ExportProgress::new(0, total),
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };

        let mut jobs = self.jobs.write().await;
        let cutoff = Utc::now() - Duration::minutes(JOB_RETENTION_MINUTES);
        jobs.retain(|_, entry| entry.job.finished_at.map_or(true, |at| at > cutoff));
        jobs.insert(
            job.id,
            JobEntry {
                job: job.clone(),
                archive: None,
            },
        );
        job
    }

    pub async fn get(&self, id: Uuid) -> Option<ExportJob> {
        self.jobs.read().await.get(&id).map(|entry| entry.job.clone())
    }

    pub async fn set_progress(&self, id: Uuid, completed: usize) {
        if let Some(entry) = self.jobs.write().await.get_mut(&id) {
            entry.job.progress = ExportProgress::new(completed, entry.job.progress.total);
        }
    }

    pub async fn complete(&self, id: Uuid, archive: Vec<u8>) {
        if let Some(entry) = self.jobs.write().await.get_mut(&id) {
            entry.job.status = JobStatus::Completed;
            entry.job.progress = ExportProgress::new(entry.job.progress.total, entry.job.progress.total);
            entry.job.finished_at = Some(Utc::now());
            entry.archive = Some(Arc::new(archive));
        }
    }

    pub async fn fail(&self, id: Uuid, message: String) {
        if let Some(entry) = self.jobs.write().await.get_mut(&id) {
            entry.job.status = JobStatus::Failed;
            entry.job.error = Some(message);
            entry.job.finished_at = Some(Utc::now());
            entry.archive = None;
        }
    }

    /// Archive bytes of a completed job
    pub async fn archive(&self, id: Uuid) -> Result<Arc<Vec<u8>>, ExportError> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(&id).ok_or(ExportError::JobNotFound(id))?;
        entry
            .archive
            .clone()
            .ok_or(ExportError::ArchiveUnavailable(id))
    }
}

/// ZIP of report PDFs with unique entry names
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: HashSet<String>,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: HashSet::new(),
        }
    }

    /// Add one report; returns the entry name used
    ///
    /// Ids that sanitize to the same file name get a numeric suffix.
    pub fn add(&mut self, property_id: &str, pdf: &[u8]) -> Result<String, ExportError> {
        let base = report_filename(property_id);
        let mut name = base.clone();
        let mut n = 2;
        while self.names.contains(&name) {
            name = format!("{}_{}.pdf", base.trim_end_matches(".pdf"), n);
            n += 1;
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer.start_file(name.clone(), options)?;
        self.writer.write_all(pdf)?;
        self.names.insert(name.clone());
        Ok(name)
    }

    pub fn finish(self) -> Result<Vec<u8>, ExportError> {
        Ok(self.writer.finish()?.into_inner())
    }
}

/// Report generation for one or many properties
pub struct ExportService {
    gateway: Arc<GatewayClient>,
    store: Arc<ObjectStore>,
    images: Arc<ImageResolverChain>,
    template_bucket: String,
    template_key: String,
    jobs: ExportJobs,
}

impl ExportService {
    pub fn new(
        gateway: Arc<GatewayClient>,
        store: Arc<ObjectStore>,
        images: Arc<ImageResolverChain>,
        template_bucket: impl Into<String>,
        template_key: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            images,
            template_bucket: template_bucket.into(),
            template_key: template_key.into(),
            jobs: ExportJobs::new(),
        }
    }

    pub fn jobs(&self) -> &ExportJobs {
        &self.jobs
    }

    async fn renderer(&self) -> Result<ReportRenderer, ExportError> {
        let template = self
            .store
            .download(&self.template_bucket, &self.template_key)
            .await
            .map_err(ExportError::Template)?;
        Ok(ReportRenderer::new(template))
    }

    /// Rows for the requested ids, in request order, duplicates dropped
    async fn load_properties(&self, ids: &[String]) -> Result<Vec<Property>, ExportError> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect();
        if ids.is_empty() {
            return Err(ExportError::EmptyRequest);
        }

        let mut by_id: HashMap<String, Property> = self
            .gateway
            .properties_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.property_id.clone(), p))
            .collect();

        ids.iter()
            .map(|id| by_id.remove(id).ok_or_else(|| ExportError::PropertyNotFound(id.clone())))
            .collect()
    }

    async fn render(&self, renderer: &ReportRenderer, property: &Property) -> Result<Vec<u8>, ExportError> {
        let image = self.images.resolve(&property.property_id).await;
        Ok(renderer.render(property, image.as_ref())?)
    }

    /// One PDF, returned directly as (file name, bytes)
    pub async fn single_report(&self, property_id: &str) -> Result<(String, Vec<u8>), ExportError> {
        let properties = self.load_properties(&[property_id.to_string()]).await?;
        let renderer = self.renderer().await?;
        let pdf = self.render(&renderer, &properties[0]).await?;

        tracing::info!("Generated report for {}", property_id);
        Ok((report_filename(property_id), pdf))
    }

    /// Register a batch job and generate it in the background
    pub async fn start_batch(self: Arc<Self>, property_ids: Vec<String>) -> Result<ExportJob, ExportError> {
        if property_ids.is_empty() {
            return Err(ExportError::EmptyRequest);
        }

        let total = property_ids.iter().collect::<HashSet<_>>().len();
        let job = self.jobs.create(total).await;
        tracing::info!("Export job {} started for {} properties", job.id, total);

        let service = self.clone();
        let id = job.id;
        tokio::spawn(async move {
            match service.run_batch(id, &property_ids).await {
                Ok(archive) => {
                    tracing::info!("Export job {} completed ({} bytes)", id, archive.len());
                    service.jobs.complete(id, archive).await;
                }
                Err(e) => {
                    tracing::error!("Export job {} failed: {}", id, e);
                    service.jobs.fail(id, e.to_string()).await;
                }
            }
        });

        Ok(job)
    }

    /// Sequential generation; the first failure aborts the rest
    async fn run_batch(&self, id: Uuid, property_ids: &[String]) -> Result<Vec<u8>, ExportError> {
        let properties = self.load_properties(property_ids).await?;
        let renderer = self.renderer().await?;
        let mut archive = ArchiveBuilder::new();

        for (index, property) in properties.iter().enumerate() {
            let pdf = self.render(&renderer, property).await?;
            archive.add(&property.property_id, &pdf)?;
            self.jobs.set_progress(id, index + 1).await;
            tracing::debug!("Export job {}: {}/{}", id, index + 1, properties.len());
        }

        archive.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn test_progress_after_each_of_n() {
        let n = 7;
        for k in 1..=n {
            let progress = ExportProgress::new(k, n);
            assert_eq!(progress.percent as f64, (100.0 * k as f64 / n as f64).round());
        }
    }

    #[test]
    fn test_archive_entries_are_named_per_property() {
        let mut archive = ArchiveBuilder::new();
        archive.add("TX-1", b"%PDF-one").unwrap();
        archive.add("TX/2", b"%PDF-two").unwrap();

        let bytes = archive.finish().unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut names: Vec<String> = zip.file_names().map(|n| n.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["report_TX-1.pdf", "report_TX_2.pdf"]);

        let mut content = Vec::new();
        zip.by_name("report_TX_2.pdf").unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, b"%PDF-two");
    }

    #[test]
    fn test_archive_disambiguates_colliding_names() {
        let mut archive = ArchiveBuilder::new();
        assert_eq!(archive.add("a/b", b"1").unwrap(), "report_a_b.pdf");
        assert_eq!(archive.add("a_b", b"2").unwrap(), "report_a_b_2.pdf");
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let jobs = ExportJobs::new();
        let job = jobs.create(4).await;
        assert_eq!(job.status, JobStatus::Running);
        assert!(matches!(
            jobs.archive(job.id).await,
            Err(ExportError::ArchiveUnavailable(_))
        ));

        jobs.set_progress(job.id, 1).await;
        assert_eq!(jobs.get(job.id).await.unwrap().progress.percent, 25);

        jobs.complete(job.id, vec![1, 2, 3]).await;
        let done = jobs.get(job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress.percent, 100);
        assert_eq!(*jobs.archive(job.id).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_job_has_no_archive() {
        let jobs = ExportJobs::new();
        let job = jobs.create(2).await;
        jobs.set_progress(job.id, 1).await;
        jobs.fail(job.id, "report generation failed".to_string()).await;

        let failed = jobs.get(job.id).await.unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.progress.completed, 1);
        assert!(jobs.archive(job.id).await.is_err());
        assert!(matches!(
            jobs.archive(Uuid::new_v4()).await,
            Err(ExportError::JobNotFound(_))
        ));
    }
}
