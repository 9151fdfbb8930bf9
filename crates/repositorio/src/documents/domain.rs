use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

const PROJECT_CODE_PREFIX: &str = "FCA-EXT-";

/// Highest sequence a three-digit project code can carry.
pub const MAX_PROJECT_SEQUENCE: u16 = 999;

/// Identifier wrapper for stored documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a signed-in user as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of type tags a document can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Convenio,
    Proyecto,
    MovilidadEstudiantil,
    MovilidadDocente,
    Pasantia,
    Resolucion,
    Otro,
}

impl DocumentType {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Convenio,
            Self::Proyecto,
            Self::MovilidadEstudiantil,
            Self::MovilidadDocente,
            Self::Pasantia,
            Self::Resolucion,
            Self::Otro,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Convenio => "Convenio",
            Self::Proyecto => "Proyecto",
            Self::MovilidadEstudiantil => "Movilidad Estudiantil",
            Self::MovilidadDocente => "Movilidad Docente",
            Self::Pasantia => "Pasantía",
            Self::Resolucion => "Resolución",
            Self::Otro => "Otro",
        }
    }

    /// Parse the label used by the hosted store. Accents are optional.
    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = fold_accents(raw.trim());
        Self::ordered()
            .into_iter()
            .find(|kind| fold_accents(kind.label()) == normalized)
    }
}

/// Sub-tag of a Proyecto document placing it in its project's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionDocType {
    ProyectoDeExtension,
    ResolucionDeAprobacion,
    InformeDeAvance,
    InformeFinal,
}

impl ExtensionDocType {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::ProyectoDeExtension,
            Self::ResolucionDeAprobacion,
            Self::InformeDeAvance,
            Self::InformeFinal,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ProyectoDeExtension => "Proyecto de Extensión",
            Self::ResolucionDeAprobacion => "Resolución de aprobación",
            Self::InformeDeAvance => "Informe de avance",
            Self::InformeFinal => "Informe final",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = fold_accents(raw.trim());
        Self::ordered()
            .into_iter()
            .find(|kind| fold_accents(kind.label()) == normalized)
    }

    pub const fn is_master(self) -> bool {
        matches!(self, Self::ProyectoDeExtension)
    }
}

/// Linkage key shared by a master extension project and its dependent records.
///
/// Codes minted here follow `FCA-EXT-<seq>-<year>`. Codes read back from the store are
/// kept verbatim even when they do not follow that layout, since linkage is an exact
/// string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectCode(String);

impl ProjectCode {
    pub fn issue(sequence: u16, year: i32) -> Result<Self, ProjectCodeError> {
        if sequence == 0 || sequence > MAX_PROJECT_SEQUENCE {
            return Err(ProjectCodeError::SequenceOutOfRange { sequence, year });
        }
        Ok(Self(format!("{PROJECT_CODE_PREFIX}{sequence:03}-{year}")))
    }

    pub fn parse(raw: &str) -> Result<Self, ProjectCodeError> {
        let candidate = Self(raw.trim().to_string());
        match (candidate.sequence(), candidate.year()) {
            (Some(_), Some(_)) => Ok(candidate),
            _ => Err(ProjectCodeError::Malformed(raw.to_string())),
        }
    }

    pub fn verbatim(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sequence(&self) -> Option<u16> {
        let (sequence, _) = self.parts()?;
        if sequence.len() < 3 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        sequence.parse().ok()
    }

    pub fn year(&self) -> Option<i32> {
        let (_, year) = self.parts()?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        year.parse().ok()
    }

    fn parts(&self) -> Option<(&str, &str)> {
        self.0.strip_prefix(PROJECT_CODE_PREFIX)?.split_once('-')
    }
}

impl fmt::Display for ProjectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectCodeError {
    #[error("project code '{0}' does not match FCA-EXT-<seq>-<year>")]
    Malformed(String),
    #[error("sequence {sequence} does not fit a three-digit project code for {year}")]
    SequenceOutOfRange { sequence: u16, year: i32 },
}

/// Pointer to the uploaded file held by the external storage service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub uri: String,
    pub media_type: String,
}

/// A stored repository record: common fields plus exactly one type-specific shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    /// Signature date for Convenios, approval or reference date otherwise.
    pub date: Option<NaiveDate>,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: UserId,
    pub description: Option<String>,
    pub file: Option<FileReference>,
    /// Team order is insertion order. Duplicates are allowed.
    pub authors: Vec<String>,
    pub details: DocumentDetails,
}

impl Document {
    pub fn document_type(&self) -> DocumentType {
        self.details.document_type()
    }

    pub fn convenio(&self) -> Option<&ConvenioDetails> {
        match &self.details {
            DocumentDetails::Convenio(details) => Some(details),
            _ => None,
        }
    }

    pub fn proyecto(&self) -> Option<&ProyectoDetails> {
        match &self.details {
            DocumentDetails::Proyecto(details) => Some(details),
            _ => None,
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        match &self.details {
            DocumentDetails::Movilidad(details) => Some(&details.placement),
            DocumentDetails::Pasantia(placement) => Some(placement),
            _ => None,
        }
    }

    pub fn project_code(&self) -> Option<&ProjectCode> {
        self.proyecto()
            .and_then(|details| details.project_code.as_ref())
    }

    pub fn extension_doc_type(&self) -> Option<ExtensionDocType> {
        self.proyecto().map(|details| details.extension_doc_type)
    }

    /// True for the "Proyecto de Extensión" record heading a project timeline.
    pub fn is_master_project(&self) -> bool {
        self.extension_doc_type()
            .map(ExtensionDocType::is_master)
            .unwrap_or(false)
    }

    pub fn director(&self) -> Option<&str> {
        self.proyecto()
            .and_then(|details| details.director.as_deref())
    }

    /// The code a reader would search by: project code, linked resolution or expediente.
    pub fn reference_code(&self) -> Option<&str> {
        match &self.details {
            DocumentDetails::Proyecto(details) => {
                details.project_code.as_ref().map(ProjectCode::as_str)
            }
            DocumentDetails::Movilidad(details) => details.placement.resolution_code.as_deref(),
            DocumentDetails::Pasantia(placement) => placement.resolution_code.as_deref(),
            DocumentDetails::Resolucion(record) | DocumentDetails::Otro(record) => {
                record.code.as_deref()
            }
            DocumentDetails::Convenio(_) => None,
        }
    }
}

/// Editable part of a document as submitted by the create and edit forms. Identity and
/// upload metadata are assigned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file: Option<FileReference>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub details: DocumentDetails,
}

/// Type-specific payload. The variant is the document's type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentDetails {
    Convenio(ConvenioDetails),
    Proyecto(ProyectoDetails),
    Movilidad(MobilityDetails),
    Pasantia(Placement),
    Resolucion(RecordDetails),
    Otro(RecordDetails),
}

impl DocumentDetails {
    pub fn document_type(&self) -> DocumentType {
        match self {
            Self::Convenio(_) => DocumentType::Convenio,
            Self::Proyecto(_) => DocumentType::Proyecto,
            Self::Movilidad(details) => match details.audience {
                MobilityAudience::Estudiantil => DocumentType::MovilidadEstudiantil,
                MobilityAudience::Docente => DocumentType::MovilidadDocente,
            },
            Self::Pasantia(_) => DocumentType::Pasantia,
            Self::Resolucion(_) => DocumentType::Resolucion,
            Self::Otro(_) => DocumentType::Otro,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConvenioDetails {
    pub duration_years: Option<u32>,
    #[serde(default)]
    pub has_automatic_renewal: bool,
    /// Display order; names are not assumed unique.
    #[serde(default)]
    pub counterparts: Vec<String>,
    /// When false the agreement names no responsible team and `authors` stays empty.
    pub has_institutional_responsible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProyectoDetails {
    pub extension_doc_type: ExtensionDocType,
    pub project_code: Option<ProjectCode>,
    pub director: Option<String>,
    pub objective: Option<String>,
    #[serde(default)]
    pub specific_objectives: Vec<String>,
    pub execution_period: Option<String>,
}

impl ProyectoDetails {
    pub fn new(extension_doc_type: ExtensionDocType) -> Self {
        Self {
            extension_doc_type,
            project_code: None,
            director: None,
            objective: None,
            specific_objectives: Vec::new(),
            execution_period: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilityAudience {
    Estudiantil,
    Docente,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobilityDetails {
    pub audience: MobilityAudience,
    #[serde(flatten)]
    pub placement: Placement,
}

/// Where and when a mobility or internship took place.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub institution: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub resolution_code: Option<String>,
}

/// Payload shared by resolutions and uncategorised records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordDetails {
    /// Resolution number or expediente.
    pub code: Option<String>,
    pub execution_period: Option<String>,
}

pub(crate) fn fold_accents(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
