use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::documents::domain::{
    DocumentDetails, DocumentDraft, DocumentId, ExtensionDocType, ProjectCode, ProyectoDetails,
    UserId,
};
use crate::documents::policy::RoleGrant;
use crate::documents::record::StoredRecord;
use crate::documents::repository::{DocumentStore, RoleDirectory, StoreError};
use crate::documents::{document_router, DocumentService};

pub(super) const PROJECT_CODE: &str = "FCA-EXT-001-2024";
pub(super) const ADMIN: &str = "admin-1";
pub(super) const AUTHORITY: &str = "authority-1";
pub(super) const READER: &str = "reader-1";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn stored(id: &str, title: &str, type_label: &str, uploaded_at: DateTime<Utc>) -> StoredRecord {
    StoredRecord {
        id: id.to_string(),
        title: title.to_string(),
        type_label: type_label.to_string(),
        upload_date: uploaded_at,
        uploaded_by: ADMIN.to_string(),
        ..StoredRecord::default()
    }
}

fn extension(
    id: &str,
    title: &str,
    sub_type: &str,
    uploaded_at: DateTime<Utc>,
) -> StoredRecord {
    StoredRecord {
        extension_doc_type: Some(sub_type.to_string()),
        project_code: Some(PROJECT_CODE.to_string()),
        ..stored(id, title, "Proyecto", uploaded_at)
    }
}

/// The "Mejorar suelos" project: a master plus its approval and two reports.
pub(super) fn project_records() -> Vec<StoredRecord> {
    vec![
        StoredRecord {
            objective: Some("Mejorar suelos".to_string()),
            specific_objectives: vec!["Relevar parcelas".to_string()],
            director: Some("Dra. Paz".to_string()),
            description: Some("Trabajo con productores locales".to_string()),
            authors: vec!["Paz".to_string(), "Ríos".to_string()],
            ..extension(
                "master-1",
                "Suelos vivos",
                "Proyecto de Extensión",
                at(2024, 3, 1),
            )
        },
        extension(
            "approval-1",
            "Resolución 120/24",
            "Resolución de aprobación",
            at(2024, 3, 5),
        ),
        extension(
            "progress-1",
            "Primer informe",
            "Informe de avance",
            at(2024, 6, 1),
        ),
        StoredRecord {
            objective: Some("Cerrar el relevamiento".to_string()),
            ..extension("final-1", "Informe final", "Informe final", at(2024, 11, 20))
        },
    ]
}

pub(super) fn catalogue_records() -> Vec<StoredRecord> {
    vec![
        StoredRecord {
            date: NaiveDate::from_ymd_opt(2024, 2, 1),
            duration_years: Some(5),
            has_automatic_renewal: Some(false),
            counterparts: vec!["INTA".to_string()],
            has_institutional_responsible: Some(true),
            authors: vec!["Gómez".to_string()],
            ..stored("conv-current", "Convenio INTA", "Convenio", at(2024, 2, 2))
        },
        StoredRecord {
            date: NaiveDate::from_ymd_opt(2018, 1, 1),
            duration_years: Some(2),
            has_automatic_renewal: Some(false),
            has_institutional_responsible: Some(false),
            ..stored("conv-expired", "Convenio municipal", "Convenio", at(2018, 1, 3))
        },
        StoredRecord {
            date: NaiveDate::from_ymd_opt(2023, 9, 1),
            institution: Some("Universidad de Chile".to_string()),
            country: Some("Chile".to_string()),
            resolution_code: Some("RES-88/23".to_string()),
            ..stored(
                "mobility-1",
                "Estancia de investigación",
                "Movilidad Docente",
                at(2023, 9, 2),
            )
        },
    ]
}

/// A Convenio carrying a project code. Shape validation must reject it.
pub(super) fn malformed_record() -> StoredRecord {
    StoredRecord {
        date: NaiveDate::from_ymd_opt(2022, 5, 1),
        project_code: Some(PROJECT_CODE.to_string()),
        ..stored("broken-1", "Convenio mal cargado", "Convenio", at(2022, 5, 2))
    }
}

pub(super) fn seeded_store() -> MemoryStore {
    let store = MemoryStore::default();
    store.seed(project_records());
    store.seed(catalogue_records());
    store.seed(vec![malformed_record()]);
    store
}

pub(super) fn seeded_roles() -> MemoryRoles {
    let roles = MemoryRoles::default();
    roles.grant(ADMIN, RoleGrant::Admin);
    roles.grant(AUTHORITY, RoleGrant::Authority);
    roles
}

pub(super) fn build_service() -> (
    DocumentService<MemoryStore, MemoryRoles>,
    Arc<MemoryStore>,
    Arc<MemoryRoles>,
) {
    let store = Arc::new(seeded_store());
    let roles = Arc::new(seeded_roles());
    let service = DocumentService::new(store.clone(), roles.clone());
    (service, store, roles)
}

pub(super) fn router_with_service(
    service: DocumentService<MemoryStore, MemoryRoles>,
) -> axum::Router {
    document_router(Arc::new(service))
}

pub(super) fn user(id: &str) -> UserId {
    UserId(id.to_string())
}

pub(super) fn doc(id: &str) -> DocumentId {
    DocumentId(id.to_string())
}

pub(super) fn master_draft(title: &str) -> DocumentDraft {
    DocumentDraft {
        title: title.to_string(),
        date: None,
        description: Some("Huertas escolares".to_string()),
        file: None,
        authors: vec!["Luna".to_string()],
        details: DocumentDetails::Proyecto(ProyectoDetails {
            objective: Some("Promover huertas".to_string()),
            director: Some("Ing. Luna".to_string()),
            ..ProyectoDetails::new(ExtensionDocType::ProyectoDeExtension)
        }),
    }
}

pub(super) fn report_draft(code: &str) -> DocumentDraft {
    DocumentDraft {
        title: "Segundo informe".to_string(),
        date: None,
        description: None,
        file: None,
        authors: Vec::new(),
        details: DocumentDetails::Proyecto(ProyectoDetails {
            project_code: Some(ProjectCode::verbatim(code)),
            ..ProyectoDetails::new(ExtensionDocType::InformeDeAvance)
        }),
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<HashMap<String, StoredRecord>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub(super) fn seed(&self, records: Vec<StoredRecord>) {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        for record in records {
            guard.insert(record.id.clone(), record);
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn get(&self, id: &str) -> Option<StoredRecord> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl DocumentStore for MemoryStore {
    fn fetch_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        self.touch();
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn fetch_by_project_code(&self, project_code: &str) -> Result<Vec<StoredRecord>, StoreError> {
        self.touch();
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.project_code.as_deref() == Some(project_code))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &DocumentId) -> Result<Option<StoredRecord>, StoreError> {
        self.touch();
        Ok(self.get(&id.0))
    }

    fn insert(&self, record: StoredRecord) -> Result<StoredRecord, StoreError> {
        self.touch();
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn replace(&self, id: &DocumentId, record: StoredRecord) -> Result<(), StoreError> {
        self.touch();
        let mut guard = self.records.lock().expect("store mutex poisoned");
        match guard.get_mut(&id.0) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.touch();
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.remove(&id.0).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[derive(Default)]
pub(super) struct MemoryRoles {
    grants: Mutex<HashMap<UserId, RoleGrant>>,
    writes: AtomicUsize,
}

impl MemoryRoles {
    pub(super) fn grant(&self, id: &str, grant: RoleGrant) {
        self.grants
            .lock()
            .expect("roles mutex poisoned")
            .insert(user(id), grant);
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl RoleDirectory for MemoryRoles {
    fn role_of(&self, user: &UserId) -> Result<Option<RoleGrant>, StoreError> {
        Ok(self
            .grants
            .lock()
            .expect("roles mutex poisoned")
            .get(user)
            .copied())
    }

    fn set_role(&self, user: &UserId, grant: RoleGrant) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.grants
            .lock()
            .expect("roles mutex poisoned")
            .insert(user.clone(), grant);
        Ok(())
    }
}

pub(super) struct UnavailableStore;

impl DocumentStore for UnavailableStore {
    fn fetch_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch_by_project_code(&self, _project_code: &str) -> Result<Vec<StoredRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &DocumentId) -> Result<Option<StoredRecord>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _record: StoredRecord) -> Result<StoredRecord, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn replace(&self, _id: &DocumentId, _record: StoredRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &DocumentId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
