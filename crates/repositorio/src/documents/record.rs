use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ConvenioDetails, Document, DocumentDetails, DocumentId, DocumentType, ExtensionDocType,
    FileReference, MobilityAudience, MobilityDetails, Placement, ProjectCode, ProyectoDetails,
    RecordDetails, UserId,
};

/// Flat record as the hosted document store keeps it: every type-specific field is
/// optional and the type tag is a display label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub type_label: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub upload_date: DateTime<Utc>,
    pub uploaded_by: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub duration_years: Option<u32>,
    #[serde(default)]
    pub has_automatic_renewal: Option<bool>,
    #[serde(default)]
    pub counterparts: Vec<String>,
    #[serde(default)]
    pub has_institutional_responsible: Option<bool>,

    #[serde(default)]
    pub extension_doc_type: Option<String>,
    #[serde(default)]
    pub project_code: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub specific_objectives: Vec<String>,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub resolution_code: Option<String>,

    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub execution_period: Option<String>,
}

/// A stored record whose type-specific fields contradict its type tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document {document_id} has an invalid shape: {violation}")]
pub struct InvalidDocumentShape {
    pub document_id: DocumentId,
    pub violation: ShapeViolation,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeViolation {
    #[error("unknown type tag '{0}'")]
    UnknownType(String),
    #[error("{} record populates fields of another type: {}", .document_type.label(), .fields.join(", "))]
    ForeignFields {
        document_type: DocumentType,
        fields: Vec<&'static str>,
    },
    #[error("proyecto record has no extension sub-type")]
    MissingExtensionDocType,
    #[error("unknown extension sub-type '{0}'")]
    UnknownExtensionDocType(String),
    #[error("authors listed although no institutional responsible is set")]
    AuthorsWithoutResponsible,
}

impl StoredRecord {
    fn convenio_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.duration_years.is_some() {
            fields.push("durationYears");
        }
        if flag_set(self.has_automatic_renewal) {
            fields.push("hasAutomaticRenewal");
        }
        if any_filled(&self.counterparts) {
            fields.push("counterparts");
        }
        if flag_set(self.has_institutional_responsible) {
            fields.push("hasInstitutionalResponsible");
        }
        fields
    }

    fn proyecto_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if filled(&self.extension_doc_type) {
            fields.push("extensionDocType");
        }
        if filled(&self.project_code) {
            fields.push("projectCode");
        }
        if filled(&self.director) {
            fields.push("director");
        }
        if filled(&self.objective) {
            fields.push("objective");
        }
        if any_filled(&self.specific_objectives) {
            fields.push("specificObjectives");
        }
        fields
    }

    fn placement_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.start_date.is_some() {
            fields.push("startDate");
        }
        if self.end_date.is_some() {
            fields.push("endDate");
        }
        if filled(&self.institution) {
            fields.push("institution");
        }
        if filled(&self.state) {
            fields.push("state");
        }
        if filled(&self.country) {
            fields.push("country");
        }
        if filled(&self.resolution_code) {
            fields.push("resolutionCode");
        }
        fields
    }

    fn record_fields(&self) -> Vec<&'static str> {
        if filled(&self.code) {
            vec!["code"]
        } else {
            Vec::new()
        }
    }

    fn execution_period_fields(&self) -> Vec<&'static str> {
        if filled(&self.execution_period) {
            vec!["executionPeriod"]
        } else {
            Vec::new()
        }
    }

    fn file_reference(&self) -> Option<FileReference> {
        let uri = non_blank(self.file_url.as_deref())?;
        Some(FileReference {
            uri: uri.to_string(),
            media_type: owned_non_blank(self.file_type.clone())
                .unwrap_or_else(|| guess_media_type(uri)),
        })
    }
}

impl TryFrom<StoredRecord> for Document {
    type Error = InvalidDocumentShape;

    fn try_from(record: StoredRecord) -> Result<Self, Self::Error> {
        let document_id = DocumentId(record.id.clone());
        let invalid = |violation| InvalidDocumentShape {
            document_id: document_id.clone(),
            violation,
        };

        let document_type = DocumentType::from_label(&record.type_label)
            .ok_or_else(|| invalid(ShapeViolation::UnknownType(record.type_label.clone())))?;

        let foreign: Vec<&'static str> = match document_type {
            DocumentType::Convenio => [
                record.proyecto_fields(),
                record.placement_fields(),
                record.record_fields(),
                record.execution_period_fields(),
            ]
            .concat(),
            DocumentType::Proyecto => [
                record.convenio_fields(),
                record.placement_fields(),
                record.record_fields(),
            ]
            .concat(),
            DocumentType::MovilidadEstudiantil
            | DocumentType::MovilidadDocente
            | DocumentType::Pasantia => [
                record.convenio_fields(),
                record.proyecto_fields(),
                record.record_fields(),
                record.execution_period_fields(),
            ]
            .concat(),
            DocumentType::Resolucion | DocumentType::Otro => [
                record.convenio_fields(),
                record.proyecto_fields(),
                record.placement_fields(),
            ]
            .concat(),
        };
        if !foreign.is_empty() {
            return Err(invalid(ShapeViolation::ForeignFields {
                document_type,
                fields: foreign,
            }));
        }

        let file = record.file_reference();
        let StoredRecord {
            id,
            title,
            date,
            upload_date,
            uploaded_by,
            description,
            authors,
            duration_years,
            has_automatic_renewal,
            counterparts,
            has_institutional_responsible,
            extension_doc_type,
            project_code,
            director,
            objective,
            specific_objectives,
            start_date,
            end_date,
            institution,
            state,
            country,
            resolution_code,
            code,
            execution_period,
            ..
        } = record;

        let placement = Placement {
            start_date,
            end_date,
            institution: owned_non_blank(institution),
            state: owned_non_blank(state),
            country: owned_non_blank(country),
            resolution_code: owned_non_blank(resolution_code),
        };

        let details = match document_type {
            DocumentType::Convenio => {
                let has_institutional_responsible =
                    has_institutional_responsible.unwrap_or(!authors.is_empty());
                if !has_institutional_responsible && !authors.is_empty() {
                    return Err(invalid(ShapeViolation::AuthorsWithoutResponsible));
                }
                DocumentDetails::Convenio(ConvenioDetails {
                    duration_years,
                    has_automatic_renewal: has_automatic_renewal.unwrap_or(false),
                    counterparts: without_blanks(counterparts),
                    has_institutional_responsible,
                })
            }
            DocumentType::Proyecto => {
                let raw = owned_non_blank(extension_doc_type)
                    .ok_or_else(|| invalid(ShapeViolation::MissingExtensionDocType))?;
                let extension_doc_type = ExtensionDocType::from_label(&raw)
                    .ok_or_else(|| invalid(ShapeViolation::UnknownExtensionDocType(raw.clone())))?;
                DocumentDetails::Proyecto(ProyectoDetails {
                    extension_doc_type,
                    project_code: owned_non_blank(project_code).map(ProjectCode::verbatim),
                    director: owned_non_blank(director),
                    objective: owned_non_blank(objective),
                    specific_objectives: without_blanks(specific_objectives),
                    execution_period: owned_non_blank(execution_period),
                })
            }
            DocumentType::MovilidadEstudiantil => DocumentDetails::Movilidad(MobilityDetails {
                audience: MobilityAudience::Estudiantil,
                placement,
            }),
            DocumentType::MovilidadDocente => DocumentDetails::Movilidad(MobilityDetails {
                audience: MobilityAudience::Docente,
                placement,
            }),
            DocumentType::Pasantia => DocumentDetails::Pasantia(placement),
            DocumentType::Resolucion => DocumentDetails::Resolucion(RecordDetails {
                code: owned_non_blank(code),
                execution_period: owned_non_blank(execution_period),
            }),
            DocumentType::Otro => DocumentDetails::Otro(RecordDetails {
                code: owned_non_blank(code),
                execution_period: owned_non_blank(execution_period),
            }),
        };

        Ok(Document {
            id: DocumentId(id),
            title,
            date,
            uploaded_at: upload_date,
            uploaded_by: UserId(uploaded_by),
            description: owned_non_blank(description),
            file,
            authors,
            details,
        })
    }
}

impl From<&Document> for StoredRecord {
    fn from(document: &Document) -> Self {
        let mut record = StoredRecord {
            id: document.id.0.clone(),
            title: document.title.clone(),
            type_label: document.document_type().label().to_string(),
            date: document.date,
            upload_date: document.uploaded_at,
            uploaded_by: document.uploaded_by.0.clone(),
            description: document.description.clone(),
            file_url: document.file.as_ref().map(|file| file.uri.clone()),
            file_type: document.file.as_ref().map(|file| file.media_type.clone()),
            authors: document.authors.clone(),
            ..StoredRecord::default()
        };

        match &document.details {
            DocumentDetails::Convenio(details) => {
                record.duration_years = details.duration_years;
                record.has_automatic_renewal = Some(details.has_automatic_renewal);
                record.counterparts = details.counterparts.clone();
                record.has_institutional_responsible = Some(details.has_institutional_responsible);
            }
            DocumentDetails::Proyecto(details) => {
                record.extension_doc_type = Some(details.extension_doc_type.label().to_string());
                record.project_code = details
                    .project_code
                    .as_ref()
                    .map(|code| code.as_str().to_string());
                record.director = details.director.clone();
                record.objective = details.objective.clone();
                record.specific_objectives = details.specific_objectives.clone();
                record.execution_period = details.execution_period.clone();
            }
            DocumentDetails::Movilidad(MobilityDetails { placement, .. })
            | DocumentDetails::Pasantia(placement) => {
                record.start_date = placement.start_date;
                record.end_date = placement.end_date;
                record.institution = placement.institution.clone();
                record.state = placement.state.clone();
                record.country = placement.country.clone();
                record.resolution_code = placement.resolution_code.clone();
            }
            DocumentDetails::Resolucion(details) | DocumentDetails::Otro(details) => {
                record.code = details.code.clone();
                record.execution_period = details.execution_period.clone();
            }
        }

        record
    }
}

/// Decode a batch, splitting well-formed documents from rejected records.
pub fn decode_records(
    records: Vec<StoredRecord>,
) -> (Vec<Document>, Vec<InvalidDocumentShape>) {
    let mut documents = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for record in records {
        match Document::try_from(record) {
            Ok(document) => documents.push(document),
            Err(err) => rejected.push(err),
        }
    }
    (documents, rejected)
}

/// Media type from the file name, ignoring any query string or fragment.
fn guess_media_type(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn owned_non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

// Form-backed stores save untouched inputs as "" or false; neither counts as filled.
fn filled(value: &Option<String>) -> bool {
    non_blank(value.as_deref()).is_some()
}

fn any_filled(values: &[String]) -> bool {
    values.iter().any(|value| !value.trim().is_empty())
}

fn flag_set(value: Option<bool>) -> bool {
    value == Some(true)
}

fn without_blanks(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect()
}
