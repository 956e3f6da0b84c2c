use serde::{Deserialize, Serialize};

use crate::types::{Document, DocumentPermission, Profile};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    /// Name of a bucket blob to link. Absent for text-only documents.
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrantPermissionRequest {
    pub document_id: String,
    pub user_id: String,
}

/// Minimal profile projection used when enriching rows with a referenced
/// identity. `None` at the enclosing field means the referenced row is gone.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRef {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl From<&Profile> for ProfileRef {
    fn from(p: &Profile) -> Self {
        Self {
            email: p.email.clone(),
            full_name: p.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentRef {
    pub title: String,
}

/// A permission row enriched with the rows it references. Either reference
/// may be null when the document or grantee was deleted out from under it.
#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    #[serde(flatten)]
    pub permission: DocumentPermission,
    pub document: Option<DocumentRef>,
    pub grantee: Option<ProfileRef>,
}

/// A document enriched with its owner's identity; null when the owner row
/// is gone.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub owner: Option<ProfileRef>,
}
