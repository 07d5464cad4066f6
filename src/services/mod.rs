// Service exports
pub mod cache;
pub mod crm;
pub mod export;
pub mod gateway;
pub mod images;
pub mod pdf;
pub mod properties;
pub mod storage;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use crm::{CrmError, CrmService, EditLocks, InteractionDraft};
pub use export::{ArchiveBuilder, ExportError, ExportJob, ExportJobs, ExportProgress, ExportService, JobStatus};
pub use gateway::{GatewayClient, GatewayError, GatewayTables};
pub use images::{ImageError, ImageResolver, ImageResolverChain, ImageSource, ResolvedImage};
pub use pdf::{ReportError, ReportRenderer};
pub use properties::PropertyQueries;
pub use storage::{ObjectStore, StorageError};
