use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{Document, DocumentType, ExtensionDocType};
use super::policy::{self, CallerRole};
use super::validity;

/// Directory sections shown to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Convenios,
    Extension,
    /// Student and staff mobility share one section.
    Movilidad,
    Pasantias,
    Resoluciones,
    Otros,
}

impl DocumentCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Convenios => "Convenios",
            Self::Extension => "Extensión",
            Self::Movilidad => "Movilidad",
            Self::Pasantias => "Pasantías",
            Self::Resoluciones => "Resoluciones",
            Self::Otros => "Otros",
        }
    }

    pub fn includes(self, document_type: DocumentType) -> bool {
        match self {
            Self::Convenios => document_type == DocumentType::Convenio,
            Self::Extension => document_type == DocumentType::Proyecto,
            Self::Movilidad => matches!(
                document_type,
                DocumentType::MovilidadEstudiantil | DocumentType::MovilidadDocente
            ),
            Self::Pasantias => document_type == DocumentType::Pasantia,
            Self::Resoluciones => document_type == DocumentType::Resolucion,
            Self::Otros => document_type == DocumentType::Otro,
        }
    }

    /// Extension listings are filed by upload date; every other section by the
    /// document's own date.
    fn listing_year(self, document: &Document) -> Option<i32> {
        match self {
            Self::Extension => Some(document.uploaded_at.year()),
            _ => document.date.map(|date| date.year()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityFilter {
    Vigente,
    Vencido,
}

/// Filter selections coming from the directory UI. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFilters {
    #[serde(default)]
    pub category: Option<DocumentCategory>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "q")]
    pub search: Option<String>,
    /// Only honoured in the Convenios section.
    #[serde(default)]
    pub validity: Option<ValidityFilter>,
    /// Only honoured in the Extension section.
    #[serde(default)]
    pub director: Option<String>,
    /// Only honoured in the Extension section, and only for admin or authority callers.
    #[serde(default, rename = "subtype")]
    pub extension_doc_type: Option<ExtensionDocType>,
}

/// Apply the caller's visibility and the UI filters, preserving input order.
///
/// Visibility runs first so no user-supplied filter can bring a hidden record back.
pub fn filter_documents<'a>(
    documents: &'a [Document],
    role: CallerRole,
    filters: &ListingFilters,
    today: NaiveDate,
) -> Vec<&'a Document> {
    let search = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase);
    let director = filters
        .director
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_lowercase);
    let sub_type = filters
        .extension_doc_type
        .filter(|_| policy::can_filter_extension_subtype(role));

    documents
        .iter()
        .filter(|document| policy::is_visible(document, role))
        .filter(|document| {
            filters
                .category
                .map_or(true, |category| category.includes(document.document_type()))
        })
        .filter(|document| {
            search
                .as_deref()
                .map_or(true, |term| search_haystack(document).contains(term))
        })
        .filter(|document| match filters.year {
            None => true,
            Some(year) => {
                let listed = match filters.category {
                    Some(category) => category.listing_year(document),
                    None => document.date.map(|date| date.year()),
                };
                listed == Some(year)
            }
        })
        .filter(|document| match (filters.category, filters.validity) {
            (Some(DocumentCategory::Convenios), Some(wanted)) => {
                let valid = validity::is_currently_valid(document, today);
                match wanted {
                    ValidityFilter::Vigente => valid,
                    ValidityFilter::Vencido => !valid,
                }
            }
            _ => true,
        })
        .filter(|document| {
            if filters.category != Some(DocumentCategory::Extension) {
                return true;
            }
            let director_matches = director.as_deref().map_or(true, |wanted| {
                document
                    .director()
                    .map(|name| name.to_lowercase().contains(wanted))
                    .unwrap_or(false)
            });
            let sub_type_matches =
                sub_type.map_or(true, |wanted| document.extension_doc_type() == Some(wanted));
            director_matches && sub_type_matches
        })
        .collect()
}

/// Lowercased text searched by the free-text box: title, reference code, authors and
/// director.
fn search_haystack(document: &Document) -> String {
    let mut parts: Vec<&str> = vec![document.title.as_str()];
    parts.extend(document.reference_code());
    parts.extend(document.authors.iter().map(String::as_str));
    parts.extend(document.director());
    parts.join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::domain::{
        ConvenioDetails, DocumentDetails, DocumentId, MobilityAudience, MobilityDetails,
        Placement, ProjectCode, ProyectoDetails, UserId,
    };
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn document(id: &str, title: &str, details: DocumentDetails) -> Document {
        Document {
            id: DocumentId(id.to_string()),
            title: title.to_string(),
            date: Some(date(2021, 3, 10)),
            uploaded_at: Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(),
            uploaded_by: UserId("admin".to_string()),
            description: None,
            file: None,
            authors: vec!["María Fernández".to_string()],
            details,
        }
    }

    fn convenio(id: &str, years: u32) -> Document {
        document(
            id,
            "Convenio con INTA",
            DocumentDetails::Convenio(ConvenioDetails {
                duration_years: Some(years),
                has_automatic_renewal: false,
                counterparts: vec!["INTA".to_string()],
                has_institutional_responsible: true,
            }),
        )
    }

    fn proyecto(id: &str, sub_type: ExtensionDocType, director: &str) -> Document {
        let mut details = ProyectoDetails::new(sub_type);
        details.project_code = Some(ProjectCode::issue(1, 2024).expect("sequence in range"));
        details.director = Some(director.to_string());
        document(id, "Huertas comunitarias", DocumentDetails::Proyecto(details))
    }

    fn movilidad(id: &str, audience: MobilityAudience) -> Document {
        document(
            id,
            "Intercambio",
            DocumentDetails::Movilidad(MobilityDetails {
                audience,
                placement: Placement::default(),
            }),
        )
    }

    fn ids(documents: Vec<&Document>) -> Vec<&str> {
        documents.into_iter().map(|doc| doc.id.0.as_str()).collect()
    }

    fn today() -> NaiveDate {
        date(2026, 10, 16)
    }

    #[test]
    fn visibility_runs_before_user_filters() {
        let documents = vec![
            proyecto("master", ExtensionDocType::ProyectoDeExtension, "Paz"),
            proyecto("informe", ExtensionDocType::InformeFinal, "Paz"),
        ];
        let filters = ListingFilters {
            category: Some(DocumentCategory::Extension),
            extension_doc_type: Some(ExtensionDocType::InformeFinal),
            ..ListingFilters::default()
        };

        let as_user = filter_documents(&documents, CallerRole::User, &filters, today());
        assert_eq!(ids(as_user), vec!["master"], "sub-type filter ignored for users");

        let as_admin = filter_documents(&documents, CallerRole::Admin, &filters, today());
        assert_eq!(ids(as_admin), vec!["informe"]);

        let anonymous =
            filter_documents(&documents, CallerRole::Anonymous, &ListingFilters::default(), today());
        assert!(anonymous.is_empty());
    }

    #[test]
    fn movilidad_category_spans_both_audiences() {
        let documents = vec![
            movilidad("est", MobilityAudience::Estudiantil),
            convenio("conv", 5),
            movilidad("doc", MobilityAudience::Docente),
        ];
        let filters = ListingFilters {
            category: Some(DocumentCategory::Movilidad),
            ..ListingFilters::default()
        };
        let result = filter_documents(&documents, CallerRole::User, &filters, today());
        assert_eq!(ids(result), vec!["est", "doc"]);
    }

    #[test]
    fn search_matches_authors_codes_and_director_case_insensitively() {
        let documents = vec![
            convenio("conv", 5),
            proyecto("master", ExtensionDocType::ProyectoDeExtension, "Julián Paz"),
        ];
        let by_author = ListingFilters {
            search: Some("FERNÁNDEZ".to_string()),
            ..ListingFilters::default()
        };
        assert_eq!(
            ids(filter_documents(&documents, CallerRole::User, &by_author, today())),
            vec!["conv", "master"]
        );

        let by_code = ListingFilters {
            search: Some("fca-ext-001".to_string()),
            ..ListingFilters::default()
        };
        assert_eq!(
            ids(filter_documents(&documents, CallerRole::User, &by_code, today())),
            vec!["master"]
        );

        let by_director = ListingFilters {
            search: Some("paz".to_string()),
            ..ListingFilters::default()
        };
        assert_eq!(
            ids(filter_documents(&documents, CallerRole::User, &by_director, today())),
            vec!["master"]
        );
    }

    #[test]
    fn year_uses_upload_date_for_extension_listings() {
        let documents = vec![proyecto("master", ExtensionDocType::ProyectoDeExtension, "Paz")];
        let extension_2024 = ListingFilters {
            category: Some(DocumentCategory::Extension),
            year: Some(2024),
            ..ListingFilters::default()
        };
        let extension_2021 = ListingFilters {
            year: Some(2021),
            ..extension_2024.clone()
        };
        let uncategorised_2021 = ListingFilters {
            year: Some(2021),
            ..ListingFilters::default()
        };

        assert_eq!(
            filter_documents(&documents, CallerRole::User, &extension_2024, today()).len(),
            1
        );
        assert!(filter_documents(&documents, CallerRole::User, &extension_2021, today()).is_empty());
        assert_eq!(
            filter_documents(&documents, CallerRole::User, &uncategorised_2021, today()).len(),
            1
        );
    }

    #[test]
    fn validity_filter_applies_to_convenios_only() {
        let documents = vec![convenio("expired", 2), convenio("current", 10)];
        let vencidos = ListingFilters {
            category: Some(DocumentCategory::Convenios),
            validity: Some(ValidityFilter::Vencido),
            ..ListingFilters::default()
        };
        let vigentes = ListingFilters {
            validity: Some(ValidityFilter::Vigente),
            ..vencidos.clone()
        };
        let without_category = ListingFilters {
            validity: Some(ValidityFilter::Vencido),
            ..ListingFilters::default()
        };

        assert_eq!(
            ids(filter_documents(&documents, CallerRole::User, &vencidos, today())),
            vec!["expired"]
        );
        assert_eq!(
            ids(filter_documents(&documents, CallerRole::User, &vigentes, today())),
            vec!["current"]
        );
        assert_eq!(
            filter_documents(&documents, CallerRole::User, &without_category, today()).len(),
            2
        );
    }

    #[test]
    fn director_filter_is_substring_within_extension() {
        let documents = vec![
            proyecto("a", ExtensionDocType::ProyectoDeExtension, "Julián Paz"),
            proyecto("b", ExtensionDocType::ProyectoDeExtension, "Lucía Gómez"),
        ];
        let filters = ListingFilters {
            category: Some(DocumentCategory::Extension),
            director: Some("gómez".to_string()),
            ..ListingFilters::default()
        };
        assert_eq!(
            ids(filter_documents(&documents, CallerRole::User, &filters, today())),
            vec!["b"]
        );
    }
}
