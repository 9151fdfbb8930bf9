use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{info, warn};

use super::domain::{
    Document, DocumentDetails, DocumentDraft, DocumentId, ExtensionDocType, ProjectCode,
    ProjectCodeError, UserId,
};
use super::export::{self, ExportError};
use super::linker::{self, LinkageFetchError, ProjectLinker};
use super::listing::{self, ListingFilters};
use super::policy::{self, AuthorizationError, Caller, CallerRole, MutationKind, RoleGrant};
use super::record::{decode_records, InvalidDocumentShape, StoredRecord};
use super::repository::{DocumentStore, RoleDirectory, StoreError};
use super::stats::{self, RepositoryStatistics};
use super::views::{DocumentDetailView, DocumentSummaryView, ProjectTimelineView};

/// Service composing the store, role directory, policy and linkage rules.
///
/// Every read goes through the visibility policy and every write is authorised before
/// the store is touched.
pub struct DocumentService<S, R> {
    store: Arc<S>,
    roles: Arc<R>,
    linker: ProjectLinker<S>,
}

static DOCUMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_document_id(now: DateTime<Utc>) -> DocumentId {
    let sequence = DOCUMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DocumentId(format!("doc-{}-{sequence:04}", now.timestamp()))
}

impl<S, R> DocumentService<S, R>
where
    S: DocumentStore + 'static,
    R: RoleDirectory + 'static,
{
    pub fn new(store: Arc<S>, roles: Arc<R>) -> Self {
        let linker = ProjectLinker::new(store.clone());
        Self {
            store,
            roles,
            linker,
        }
    }

    /// Resolve who is calling from the identity provider's user id.
    pub fn caller_for(&self, user_id: Option<UserId>) -> Result<Caller, DocumentServiceError> {
        let Some(user_id) = user_id else {
            return Ok(Caller::anonymous());
        };
        let grant = self.roles.role_of(&user_id)?.unwrap_or(RoleGrant::User);
        Ok(Caller::signed_in(user_id, grant))
    }

    /// Directory listing, newest upload first.
    pub fn list(
        &self,
        caller: &Caller,
        filters: &ListingFilters,
        today: NaiveDate,
    ) -> Result<Vec<DocumentSummaryView>, DocumentServiceError> {
        let documents = self.load_all()?;
        Ok(listing::filter_documents(&documents, caller.role, filters, today)
            .into_iter()
            .map(|document| DocumentSummaryView::from_document(document, today))
            .collect())
    }

    /// A single document plus, for project records, its resolved context and timeline.
    ///
    /// Documents the caller may not see are reported as missing.
    pub fn detail(
        &self,
        caller: &Caller,
        id: &DocumentId,
        today: NaiveDate,
    ) -> Result<DocumentDetailView, DocumentServiceError> {
        let record = self
            .store
            .fetch(id)?
            .ok_or_else(|| DocumentServiceError::NotFound(id.clone()))?;
        let document = Document::try_from(record)?;
        if !policy::is_visible(&document, caller.role) {
            return Err(DocumentServiceError::NotFound(id.clone()));
        }

        let (context, timeline) = match document.project_code() {
            Some(code) => {
                let mut timeline = self.linker.resolve_timeline(code.as_str())?;
                let context = timeline.context_for(&document);
                timeline.retain(|entry| policy::is_visible(entry, caller.role));
                (Some(context), Some(ProjectTimelineView::from(&timeline)))
            }
            None => (None, None),
        };

        Ok(DocumentDetailView {
            summary: DocumentSummaryView::from_document(&document, today),
            can_edit: policy::can_mutate(&document, caller.role),
            document,
            context,
            timeline,
        })
    }

    /// The caller's view of a project timeline.
    pub fn timeline(
        &self,
        caller: &Caller,
        project_code: &str,
    ) -> Result<ProjectTimelineView, DocumentServiceError> {
        let mut timeline = self.linker.resolve_timeline(project_code)?;
        timeline.retain(|document| policy::is_visible(document, caller.role));
        Ok(ProjectTimelineView::from(&timeline))
    }

    /// File a new document. Master extension projects receive a fresh project code.
    pub fn create(
        &self,
        caller: &Caller,
        draft: DocumentDraft,
        now: DateTime<Utc>,
    ) -> Result<Document, DocumentServiceError> {
        policy::authorize_mutation(caller, MutationKind::Create, "a new document")?;

        let uploaded_by = caller
            .user_id
            .clone()
            .unwrap_or_else(|| UserId("unknown".to_string()));
        let document = self.prepare(next_document_id(now), draft, None, now, uploaded_by)?;

        self.store.insert(StoredRecord::from(&document))?;
        info!(
            document_id = %document.id,
            document_type = document.document_type().label(),
            project_code = document.project_code().map(ProjectCode::as_str),
            "document created"
        );
        Ok(document)
    }

    /// Replace a document wholesale. Identity, upload metadata and an issued project
    /// code are kept.
    pub fn update(
        &self,
        caller: &Caller,
        id: &DocumentId,
        draft: DocumentDraft,
    ) -> Result<Document, DocumentServiceError> {
        policy::authorize_mutation(caller, MutationKind::Update, &id.0)?;

        let existing = self
            .store
            .fetch(id)?
            .ok_or_else(|| DocumentServiceError::NotFound(id.clone()))?;
        let issued_code = existing
            .extension_doc_type
            .as_deref()
            .and_then(ExtensionDocType::from_label)
            .filter(|sub_type| sub_type.is_master())
            .and(existing.project_code.as_deref())
            .filter(|code| !code.trim().is_empty())
            .map(ProjectCode::verbatim);

        let document = self.prepare(
            id.clone(),
            draft,
            issued_code,
            existing.upload_date,
            UserId(existing.uploaded_by),
        )?;

        match self.store.replace(id, StoredRecord::from(&document)) {
            Err(StoreError::NotFound) => return Err(DocumentServiceError::NotFound(id.clone())),
            other => other?,
        }
        info!(document_id = %id, "document replaced");
        Ok(document)
    }

    /// Permanently remove a document.
    pub fn delete(&self, caller: &Caller, id: &DocumentId) -> Result<(), DocumentServiceError> {
        policy::authorize_mutation(caller, MutationKind::Delete, &id.0)?;

        match self.store.delete(id) {
            Err(StoreError::NotFound) => Err(DocumentServiceError::NotFound(id.clone())),
            other => {
                other?;
                info!(document_id = %id, "document deleted");
                Ok(())
            }
        }
    }

    pub fn change_role(
        &self,
        caller: &Caller,
        target: &UserId,
        grant: RoleGrant,
    ) -> Result<(), DocumentServiceError> {
        policy::authorize_role_change(caller, target, grant)?;
        self.roles.set_role(target, grant)?;
        info!(user_id = %target, ?grant, "role changed");
        Ok(())
    }

    /// Dashboard aggregates over every stored document.
    pub fn statistics(
        &self,
        caller: &Caller,
        today: NaiveDate,
    ) -> Result<RepositoryStatistics, DocumentServiceError> {
        if !policy::can_view_statistics(caller.role) {
            return Err(DocumentServiceError::Forbidden { role: caller.role });
        }
        let documents = self.load_all()?;
        Ok(stats::summarize(&documents, today))
    }

    /// Write the caller's filtered listing as CSV, returning the number of rows.
    pub fn export_csv<W: Write>(
        &self,
        caller: &Caller,
        filters: &ListingFilters,
        today: NaiveDate,
        writer: W,
    ) -> Result<usize, DocumentServiceError> {
        let documents = self.load_all()?;
        let visible = listing::filter_documents(&documents, caller.role, filters, today);
        Ok(export::write_listing_csv(&visible, today, writer)?)
    }

    /// Every well-formed stored document, newest upload first.
    fn load_all(&self) -> Result<Vec<Document>, DocumentServiceError> {
        let (mut documents, rejected) = decode_records(self.store.fetch_all()?);
        for err in rejected {
            warn!(
                document_id = %err.document_id,
                error = %err,
                "excluding malformed record from listing"
            );
        }
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    fn prepare(
        &self,
        id: DocumentId,
        draft: DocumentDraft,
        issued_code: Option<ProjectCode>,
        uploaded_at: DateTime<Utc>,
        uploaded_by: UserId,
    ) -> Result<Document, DocumentServiceError> {
        let DocumentDraft {
            title,
            date,
            description,
            file,
            authors,
            mut details,
        } = draft;

        if title.trim().is_empty() {
            return Err(DraftError::MissingTitle.into());
        }

        if let DocumentDetails::Proyecto(project) = &mut details {
            if project.extension_doc_type.is_master() {
                let code = match issued_code {
                    Some(code) => {
                        if project
                            .project_code
                            .as_ref()
                            .is_some_and(|requested| requested != &code)
                        {
                            return Err(DraftError::ProjectCodeChanged(code).into());
                        }
                        code
                    }
                    None => {
                        if project.project_code.is_some() {
                            return Err(DraftError::MasterCodeSupplied.into());
                        }
                        self.issue_project_code(uploaded_at.year())?
                    }
                };
                project.project_code = Some(code);
            } else {
                let code = project
                    .project_code
                    .as_ref()
                    .ok_or(DraftError::MissingProjectCode)?;
                let group = self.linker.resolve_timeline(code.as_str())?;
                if group.is_empty() {
                    return Err(DraftError::UnknownProjectCode(code.clone()).into());
                }
            }
        }

        let document = Document {
            id,
            title,
            date,
            uploaded_at,
            uploaded_by,
            description,
            file,
            authors,
            details,
        };

        // Run the draft through the same decoder used on reads so a document that would
        // be rejected later is never written.
        Document::try_from(StoredRecord::from(&document))?;
        Ok(document)
    }

    /// Codes are read from raw records so a malformed record still reserves its code.
    fn issue_project_code(&self, year: i32) -> Result<ProjectCode, DocumentServiceError> {
        let reserved: Vec<ProjectCode> = self
            .store
            .fetch_all()?
            .into_iter()
            .filter_map(|record| record.project_code)
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .map(ProjectCode::verbatim)
            .collect();
        Ok(linker::next_project_code(&reserved, year).map_err(DraftError::from)?)
    }
}

/// Reasons a create or edit form is refused before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("document title is required")]
    MissingTitle,
    #[error("master extension projects receive their project code when filed")]
    MasterCodeSupplied,
    #[error("project code {0} was issued to this project and cannot change")]
    ProjectCodeChanged(ProjectCode),
    #[error("dependent extension records must reference a project code")]
    MissingProjectCode,
    #[error("no project is filed under code {0}")]
    UnknownProjectCode(ProjectCode),
    #[error(transparent)]
    CodeIssuance(#[from] ProjectCodeError),
}

/// Error raised by the document service.
#[derive(Debug, thiserror::Error)]
pub enum DocumentServiceError {
    #[error(transparent)]
    Unauthorized(#[from] AuthorizationError),
    #[error("{role} callers may not read repository statistics")]
    Forbidden { role: CallerRole },
    #[error("document {0} not found")]
    NotFound(DocumentId),
    #[error(transparent)]
    InvalidShape(#[from] InvalidDocumentShape),
    #[error(transparent)]
    InvalidDraft(#[from] DraftError),
    #[error(transparent)]
    Linkage(#[from] LinkageFetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
