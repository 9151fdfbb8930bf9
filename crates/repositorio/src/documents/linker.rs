//! Project-code linkage: one master extension project plus the resolutions and reports
//! filed against its code, assembled into a single timeline.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use super::domain::{Document, ProjectCode, ProjectCodeError};
use super::repository::{DocumentStore, StoreError};

/// Store failure while assembling a project timeline.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch documents for project {project_code}")]
pub struct LinkageFetchError {
    pub project_code: String,
    #[source]
    pub source: StoreError,
}

/// All records sharing a project code, oldest upload first.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTimeline {
    pub project_code: String,
    pub documents: Vec<Document>,
    master: Option<usize>,
}

impl ProjectTimeline {
    pub fn empty(project_code: &str) -> Self {
        Self {
            project_code: project_code.to_string(),
            documents: Vec::new(),
            master: None,
        }
    }

    /// Build a timeline from already-fetched documents.
    ///
    /// Documents carrying a different code are dropped. Ties on upload time keep input
    /// order.
    pub fn from_documents(project_code: &str, documents: Vec<Document>) -> Self {
        let mut documents: Vec<Document> = documents
            .into_iter()
            .filter(|document| {
                document
                    .project_code()
                    .map(|code| code.as_str() == project_code)
                    .unwrap_or(false)
            })
            .collect();
        documents.sort_by_key(|document| document.uploaded_at);

        let mut timeline = Self {
            project_code: project_code.to_string(),
            documents,
            master: None,
        };
        timeline.locate_master();
        timeline
    }

    /// The "Proyecto de Extensión" record, absent when it was never filed or was deleted.
    pub fn master(&self) -> Option<&Document> {
        self.master.and_then(|index| self.documents.get(index))
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Display context for `document`, falling back to this timeline's master.
    pub fn context_for(&self, document: &Document) -> ResolvedContext {
        resolve_context(document, self.master())
    }

    /// Drop documents failing `keep`, keeping the master reference consistent.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Document) -> bool,
    {
        self.documents.retain(keep);
        self.locate_master();
    }

    fn locate_master(&mut self) {
        let mut masters = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, document)| document.is_master_project())
            .map(|(index, _)| index);

        self.master = masters.next();
        let extra = masters.count();
        if extra > 0 {
            warn!(
                project_code = %self.project_code,
                extra_masters = extra,
                "project code shared by several master records; using the earliest upload"
            );
        }
    }
}

/// Contextual project fields shown alongside a timeline record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResolvedContext {
    pub objective: Option<String>,
    pub specific_objectives: Vec<String>,
    pub director: Option<String>,
    pub description: Option<String>,
}

/// Resolve display context with the precedence: the record's own value, then the
/// master's, then absent.
pub fn resolve_context(own: &Document, master: Option<&Document>) -> ResolvedContext {
    let own_project = own.proyecto();
    let master_project = master.and_then(Document::proyecto);

    let specific_objectives = [own_project, master_project]
        .into_iter()
        .flatten()
        .map(|project| &project.specific_objectives)
        .find(|objectives| !objectives.is_empty())
        .cloned()
        .unwrap_or_default();

    ResolvedContext {
        objective: first_present([
            own_project.and_then(|project| project.objective.as_deref()),
            master_project.and_then(|project| project.objective.as_deref()),
        ]),
        specific_objectives,
        director: first_present([
            own_project.and_then(|project| project.director.as_deref()),
            master_project.and_then(|project| project.director.as_deref()),
        ]),
        description: first_present([
            own.description.as_deref(),
            master.and_then(|document| document.description.as_deref()),
        ]),
    }
}

fn first_present<'a>(candidates: [Option<&'a str>; 2]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .map(str::to_string)
}

/// Next code for a new master project: highest sequence already used in `year`, plus one.
///
/// Fails once the year's three-digit sequence is used up.
pub fn next_project_code<'a, I>(existing: I, year: i32) -> Result<ProjectCode, ProjectCodeError>
where
    I: IntoIterator<Item = &'a ProjectCode>,
{
    let sequence = existing
        .into_iter()
        .filter(|code| code.year() == Some(year))
        .filter_map(ProjectCode::sequence)
        .max()
        .map_or(1, |highest| highest.saturating_add(1));
    ProjectCode::issue(sequence, year)
}

/// Resolves project timelines against the document store.
pub struct ProjectLinker<S> {
    store: Arc<S>,
}

impl<S> ProjectLinker<S>
where
    S: DocumentStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every record filed under `project_code`, oldest upload first, plus its master.
    ///
    /// A blank code yields an empty timeline without touching the store. Records that
    /// fail shape validation are skipped.
    pub fn resolve_timeline(
        &self,
        project_code: &str,
    ) -> Result<ProjectTimeline, LinkageFetchError> {
        if project_code.trim().is_empty() {
            return Ok(ProjectTimeline::empty(project_code));
        }

        let records = self
            .store
            .fetch_by_project_code(project_code)
            .map_err(|source| LinkageFetchError {
                project_code: project_code.to_string(),
                source,
            })?;

        let documents = records
            .into_iter()
            .filter_map(|record| match Document::try_from(record) {
                Ok(document) => Some(document),
                Err(err) => {
                    warn!(
                        project_code,
                        document_id = %err.document_id,
                        error = %err,
                        "skipping malformed record in project timeline"
                    );
                    None
                }
            })
            .collect();

        Ok(ProjectTimeline::from_documents(project_code, documents))
    }
}
