use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{Document, DocumentId, DocumentType, ExtensionDocType};
use super::linker::{ProjectTimeline, ResolvedContext};
use super::validity::{self, ValidityStatus};

/// Row shown in directory listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummaryView {
    pub id: DocumentId,
    pub title: String,
    pub document_type: DocumentType,
    pub type_label: &'static str,
    pub date: Option<NaiveDate>,
    pub uploaded_at: DateTime<Utc>,
    pub reference_code: Option<String>,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_doc_type: Option<ExtensionDocType>,
    /// Only Convenios carry a badge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<ValidityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

impl DocumentSummaryView {
    pub fn from_document(document: &Document, today: NaiveDate) -> Self {
        let validity = match validity::validity_status(document, today) {
            ValidityStatus::NotApplicable => None,
            status => Some(status),
        };

        Self {
            id: document.id.clone(),
            title: document.title.clone(),
            document_type: document.document_type(),
            type_label: document.document_type().label(),
            date: document.date,
            uploaded_at: document.uploaded_at,
            reference_code: document.reference_code().map(str::to_string),
            authors: document.authors.clone(),
            extension_doc_type: document.extension_doc_type(),
            validity,
            expires_on: validity::expiry_date(document),
        }
    }
}

/// One record in a project timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntryView {
    pub id: DocumentId,
    pub title: String,
    pub extension_doc_type: Option<ExtensionDocType>,
    pub stage_label: &'static str,
    pub uploaded_at: DateTime<Utc>,
    pub is_master: bool,
}

impl TimelineEntryView {
    fn from_document(document: &Document) -> Self {
        let extension_doc_type = document.extension_doc_type();
        Self {
            id: document.id.clone(),
            title: document.title.clone(),
            extension_doc_type,
            stage_label: extension_doc_type
                .map(ExtensionDocType::label)
                .unwrap_or_else(|| document.document_type().label()),
            uploaded_at: document.uploaded_at,
            is_master: document.is_master_project(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectTimelineView {
    pub project_code: String,
    pub master_id: Option<DocumentId>,
    pub entries: Vec<TimelineEntryView>,
}

impl From<&ProjectTimeline> for ProjectTimelineView {
    fn from(timeline: &ProjectTimeline) -> Self {
        Self {
            project_code: timeline.project_code.clone(),
            master_id: timeline.master().map(|master| master.id.clone()),
            entries: timeline
                .documents
                .iter()
                .map(TimelineEntryView::from_document)
                .collect(),
        }
    }
}

/// Everything the detail page needs for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentDetailView {
    pub summary: DocumentSummaryView,
    pub document: Document,
    pub can_edit: bool,
    /// Present for records filed under a project code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ResolvedContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<ProjectTimelineView>,
}
