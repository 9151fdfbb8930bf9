//! Institutional document repository: classification, project linkage, agreement
//! validity, role-based visibility and listing composition.

pub mod domain;
pub mod export;
pub mod linker;
pub mod listing;
pub mod policy;
pub mod record;
pub mod repository;
pub mod router;
pub mod service;
pub mod stats;
pub mod validity;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    ConvenioDetails, Document, DocumentDetails, DocumentDraft, DocumentId, DocumentType,
    ExtensionDocType, FileReference, MobilityAudience, MobilityDetails, Placement, ProjectCode,
    ProjectCodeError, ProyectoDetails, RecordDetails, UserId,
};
pub use linker::{LinkageFetchError, ProjectLinker, ProjectTimeline, ResolvedContext};
pub use listing::{DocumentCategory, ListingFilters, ValidityFilter};
pub use policy::{AuthorizationError, Caller, CallerRole, MutationKind, RoleGrant};
pub use record::{InvalidDocumentShape, ShapeViolation, StoredRecord};
pub use repository::{DocumentStore, RoleDirectory, StoreError};
pub use router::document_router;
pub use service::{DocumentService, DocumentServiceError, DraftError};
pub use stats::RepositoryStatistics;
pub use validity::ValidityStatus;
pub use views::{DocumentDetailView, DocumentSummaryView, ProjectTimelineView};
