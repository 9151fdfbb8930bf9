use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::domain::{Document, DocumentType};
use super::validity::{self, ValidityStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCountEntry {
    pub document_type: DocumentType,
    pub type_label: String,
    pub count: usize,
}

/// Aggregates behind the admin and authority dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryStatistics {
    pub total: usize,
    pub by_type: Vec<TypeCountEntry>,
    pub convenios_vigentes: usize,
    pub convenios_vencidos: usize,
    /// Keyed by the year of each document's own date.
    pub by_year: BTreeMap<i32, usize>,
    pub undated: usize,
    pub project_codes: usize,
}

pub fn summarize(documents: &[Document], today: NaiveDate) -> RepositoryStatistics {
    let mut per_type: HashMap<DocumentType, usize> = HashMap::new();
    let mut stats = RepositoryStatistics {
        total: documents.len(),
        ..RepositoryStatistics::default()
    };
    let mut codes = BTreeSet::new();

    for document in documents {
        *per_type.entry(document.document_type()).or_default() += 1;

        match validity::validity_status(document, today) {
            ValidityStatus::Vigente => stats.convenios_vigentes += 1,
            ValidityStatus::Vencido => stats.convenios_vencidos += 1,
            ValidityStatus::NotApplicable => {}
        }

        match document.date {
            Some(date) => *stats.by_year.entry(date.year()).or_default() += 1,
            None => stats.undated += 1,
        }

        if let Some(code) = document.project_code() {
            codes.insert(code.as_str());
        }
    }

    stats.by_type = DocumentType::ordered()
        .into_iter()
        .filter_map(|document_type| {
            per_type.get(&document_type).map(|count| TypeCountEntry {
                document_type,
                type_label: document_type.label().to_string(),
                count: *count,
            })
        })
        .collect();
    stats.project_codes = codes.len();
    stats
}
