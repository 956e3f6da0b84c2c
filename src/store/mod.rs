mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Profile operations
    fn create_profile(&self, profile: &Profile) -> Result<()>;
    fn get_profile(&self, id: &str) -> Result<Option<Profile>>;
    fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>>;
    fn list_profiles(&self, limit: i32) -> Result<Vec<Profile>>;
    fn list_profiles_by_ids(&self, ids: &[String]) -> Result<Vec<Profile>>;
    fn has_admin_profile(&self) -> Result<bool>;

    // Document operations
    fn create_document(&self, doc: &Document) -> Result<()>;
    fn get_document(&self, id: &str) -> Result<Option<Document>>;
    fn list_documents(&self, limit: i32) -> Result<Vec<Document>>;
    fn list_documents_by_ids(&self, ids: &[String]) -> Result<Vec<Document>>;
    fn delete_document(&self, id: &str) -> Result<bool>;

    // Permission operations
    fn create_permission(&self, perm: &DocumentPermission) -> Result<()>;
    fn get_permission(&self, id: &str) -> Result<Option<DocumentPermission>>;
    fn get_permission_for_pair(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<DocumentPermission>>;
    fn list_permissions(&self) -> Result<Vec<DocumentPermission>>;
    fn list_viewable_document_ids(&self, user_id: &str) -> Result<Vec<String>>;
    fn delete_permission(&self, id: &str) -> Result<bool>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn delete_session(&self, id: &str) -> Result<bool>;
    fn update_session_last_used(&self, id: &str) -> Result<()>;

    fn close(&self) -> Result<()>;
}
