// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AccessRequest, CrmInteraction, CrmStatus, GustObservation, LatLng, MapView, NewCrmInteraction, Property,
    PropertySummary, GUST_SLOTS,
};
pub use requests::{
    AccessRequestForm, CreateInteractionRequest, CsvExportRequest, ExportPdfRequest, FilterApplyRequest,
    InteractionListQuery, SelectionRequest, UpdateDetailsRequest, UpdateStatusRequest,
};
pub use responses::{
    AccessRequestResponse, AvatarUploadResponse, CountResponse, CrmStatsResponse, DashboardResponse, ErrorResponse,
    FilterOptionsResponse, HealthResponse, ImageUploadResponse, InteractionListResponse, InteractionView, Notice, NoticeLevel,
};
