use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// An account known to the portal. Provisioned by administrative tooling,
/// never created or deleted through the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub role: Role,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A titled record, optionally backed by a blob in the bucket. The file
/// columns are present iff a blob is linked; a document without `file_path`
/// is text-only for export purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// An admin-issued view grant for one (document, user) pair. At most one row
/// per pair; rows are inserted and deleted, never updated. `can_edit` is
/// stored but not read by any operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPermission {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub can_view: bool,
    pub can_edit: bool,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}
