use super::domain::{DocumentId, UserId};
use super::policy::RoleGrant;
use super::record::StoredRecord;

/// Boundary to the hosted document database.
///
/// Implementations return records exactly as stored; shape validation happens in the
/// caller so one malformed record never fails a whole listing.
pub trait DocumentStore: Send + Sync {
    fn fetch_all(&self) -> Result<Vec<StoredRecord>, StoreError>;
    /// Exact, case-sensitive match on the stored project code.
    fn fetch_by_project_code(&self, project_code: &str) -> Result<Vec<StoredRecord>, StoreError>;
    fn fetch(&self, id: &DocumentId) -> Result<Option<StoredRecord>, StoreError>;
    fn insert(&self, record: StoredRecord) -> Result<StoredRecord, StoreError>;
    /// Whole-record replacement, last writer wins.
    fn replace(&self, id: &DocumentId, record: StoredRecord) -> Result<(), StoreError>;
    fn delete(&self, id: &DocumentId) -> Result<(), StoreError>;
}

/// Boundary to the identity provider's role grants.
pub trait RoleDirectory: Send + Sync {
    /// `None` for signed-in users holding no explicit grant.
    fn role_of(&self, user: &UserId) -> Result<Option<RoleGrant>, StoreError>;
    fn set_role(&self, user: &UserId, grant: RoleGrant) -> Result<(), StoreError>;
}

/// Error enumeration for collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
