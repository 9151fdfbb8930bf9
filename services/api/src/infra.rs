use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use repositorio::documents::{
    CallerRole, DocumentCategory, DocumentId, DocumentStore, ExtensionDocType, RoleDirectory,
    RoleGrant, StoreError, StoredRecord, UserId,
};
use repositorio::error::AppError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

/// Process-local stand-in for the hosted document database.
///
/// Records are kept in insertion order, so records uploaded at the same instant come
/// back first-seen-first.
#[derive(Default, Clone)]
pub(crate) struct InMemoryDocumentStore {
    records: Arc<Mutex<Vec<StoredRecord>>>,
}

impl InMemoryDocumentStore {
    /// Later seed entries replace earlier ones with the same id, in place.
    pub(crate) fn with_records(records: Vec<StoredRecord>) -> Self {
        let mut ordered: Vec<StoredRecord> = Vec::with_capacity(records.len());
        for record in records {
            match ordered.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record,
                None => ordered.push(record),
            }
        }
        Self {
            records: Arc::new(Mutex::new(ordered)),
        }
    }
}

fn position(records: &[StoredRecord], id: &str) -> Option<usize> {
    records.iter().position(|record| record.id == id)
}

impl DocumentStore for InMemoryDocumentStore {
    fn fetch_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }

    fn fetch_by_project_code(&self, project_code: &str) -> Result<Vec<StoredRecord>, StoreError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|record| record.project_code.as_deref() == Some(project_code))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &DocumentId) -> Result<Option<StoredRecord>, StoreError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(position(&guard, &id.0).map(|index| guard[index].clone()))
    }

    fn insert(&self, record: StoredRecord) -> Result<StoredRecord, StoreError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        if position(&guard, &record.id).is_some() {
            return Err(StoreError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn replace(&self, id: &DocumentId, record: StoredRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        let index = position(&guard, &id.0).ok_or(StoreError::NotFound)?;
        guard[index] = record;
        Ok(())
    }

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        let index = position(&guard, &id.0).ok_or(StoreError::NotFound)?;
        guard.remove(index);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRoleDirectory {
    grants: Arc<Mutex<HashMap<UserId, RoleGrant>>>,
}

impl InMemoryRoleDirectory {
    pub(crate) fn with_grant(user: UserId, grant: RoleGrant) -> Self {
        let directory = Self::default();
        if let Ok(mut guard) = directory.grants.lock() {
            guard.insert(user, grant);
        }
        directory
    }
}

impl RoleDirectory for InMemoryRoleDirectory {
    fn role_of(&self, user: &UserId) -> Result<Option<RoleGrant>, StoreError> {
        let guard = self.grants.lock().map_err(poisoned)?;
        Ok(guard.get(user).copied())
    }

    fn set_role(&self, user: &UserId, grant: RoleGrant) -> Result<(), StoreError> {
        let mut guard = self.grants.lock().map_err(poisoned)?;
        guard.insert(user.clone(), grant);
        Ok(())
    }
}

/// Read a JSON array of stored records.
pub(crate) fn load_seed(path: &Path) -> Result<Vec<StoredRecord>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_role(raw: &str) -> Result<CallerRole, String> {
    CallerRole::parse(raw)
        .ok_or_else(|| format!("unknown role '{raw}' (anonymous, user, authority or admin)"))
}

pub(crate) fn parse_category(raw: &str) -> Result<DocumentCategory, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "convenios" => Ok(DocumentCategory::Convenios),
        "extension" | "extensión" => Ok(DocumentCategory::Extension),
        "movilidad" => Ok(DocumentCategory::Movilidad),
        "pasantias" | "pasantías" => Ok(DocumentCategory::Pasantias),
        "resoluciones" => Ok(DocumentCategory::Resoluciones),
        "otros" => Ok(DocumentCategory::Otros),
        _ => Err(format!("unknown category '{raw}'")),
    }
}

pub(crate) fn parse_extension_doc_type(raw: &str) -> Result<ExtensionDocType, String> {
    ExtensionDocType::from_label(raw).ok_or_else(|| {
        format!("unknown extension sub-type '{raw}' (for example \"Informe final\")")
    })
}
