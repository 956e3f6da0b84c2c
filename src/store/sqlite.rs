use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_role(s: &str) -> Role {
    Role::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid role in database: '{}', treating as member", s);
        Role::Member
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: parse_role(&row.get::<_, String>(3)?),
        password_hash: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        file_path: row.get(3)?,
        file_name: row.get(4)?,
        file_size: row.get(5)?,
        file_type: row.get(6)?,
        owner_id: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn permission_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentPermission> {
    Ok(DocumentPermission {
        id: row.get(0)?,
        document_id: row.get(1)?,
        user_id: row.get(2)?,
        can_view: row.get(3)?,
        can_edit: row.get(4)?,
        granted_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const PROFILE_COLUMNS: &str = "id, email, full_name, role, password_hash, created_at";
const DOCUMENT_COLUMNS: &str =
    "id, title, content, file_path, file_name, file_size, file_type, owner_id, created_at";
const PERMISSION_COLUMNS: &str = "id, document_id, user_id, can_view, can_edit, granted_at";

/// Builds a "?,?,?" placeholder list for IN clauses.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Profile operations

    fn create_profile(&self, profile: &Profile) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO profiles (id, email, full_name, role, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                profile.id,
                profile.email,
                profile.full_name,
                profile.role.as_str(),
                profile.password_hash,
                format_datetime(&profile.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
            params![id],
            profile_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = ?1"),
            params![email],
            profile_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_profiles(&self, limit: i32) -> Result<Vec<Profile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at DESC LIMIT ?1"
        ))?;

        let rows = stmt.query_map(params![limit], profile_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_profiles_by_ids(&self, ids: &[String]) -> Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id IN ({})",
            placeholders(ids.len())
        ))?;

        let rows = stmt.query_map(params_from_iter(ids), profile_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin_profile(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM profiles WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Document operations

    fn create_document(&self, doc: &Document) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO documents ({DOCUMENT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                doc.id,
                doc.title,
                doc.content,
                doc.file_path,
                doc.file_name,
                doc.file_size,
                doc.file_type,
                doc.owner_id,
                format_datetime(&doc.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"),
            params![id],
            document_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_documents(&self, limit: i32) -> Result<Vec<Document>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at DESC LIMIT ?1"
        ))?;

        let rows = stmt.query_map(params![limit], document_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_documents_by_ids(&self, ids: &[String]) -> Result<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id IN ({})",
            placeholders(ids.len())
        ))?;

        let rows = stmt.query_map(params_from_iter(ids), document_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_document(&self, id: &str) -> Result<bool> {
        // No cascade: grant rows referencing this document stay behind.
        let rows = self
            .conn()
            .execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Permission operations

    fn create_permission(&self, perm: &DocumentPermission) -> Result<()> {
        let result = self.conn().execute(
            &format!(
                "INSERT INTO document_permissions ({PERMISSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                perm.id,
                perm.document_id,
                perm.user_id,
                perm.can_view,
                perm.can_edit,
                format_datetime(&perm.granted_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyGranted)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_permission(&self, id: &str) -> Result<Option<DocumentPermission>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PERMISSION_COLUMNS} FROM document_permissions WHERE id = ?1"),
            params![id],
            permission_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_permission_for_pair(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<DocumentPermission>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PERMISSION_COLUMNS} FROM document_permissions
                 WHERE document_id = ?1 AND user_id = ?2"
            ),
            params![document_id, user_id],
            permission_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_permissions(&self) -> Result<Vec<DocumentPermission>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM document_permissions ORDER BY granted_at DESC"
        ))?;

        let rows = stmt.query_map([], permission_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_viewable_document_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT document_id FROM document_permissions
             WHERE user_id = ?1 AND can_view = 1",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_permission(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM document_permissions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO sessions (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.token_hash,
                session.token_lookup,
                session.user_id,
                format_datetime(&session.created_at),
                session.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::SessionLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM sessions WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: row
                        .get::<_, Option<String>>(5)?
                        .map(|s| parse_datetime(&s)),
                    last_used_at: row
                        .get::<_, Option<String>>(6)?
                        .map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_session_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (dir, store)
    }

    fn test_profile(email: &str, role: Role) -> Profile {
        Profile {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            full_name: None,
            role,
            password_hash: "$argon2id$fake".to_string(),
            created_at: Utc::now(),
        }
    }

    fn test_document(owner: &Profile, title: &str) -> Document {
        Document {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            content: None,
            file_path: None,
            file_name: None,
            file_size: None,
            file_type: None,
            owner_id: owner.id.clone(),
            created_at: Utc::now(),
        }
    }

    fn test_permission(doc: &Document, grantee: &Profile) -> DocumentPermission {
        DocumentPermission {
            id: Uuid::new_v4().to_string(),
            document_id: doc.id.clone(),
            user_id: grantee.id.clone(),
            can_view: true,
            can_edit: false,
            granted_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_round_trip() {
        let (_dir, store) = test_store();

        let profile = test_profile("admin@example.com", Role::Admin);
        store.create_profile(&profile).unwrap();

        let fetched = store.get_profile(&profile.id).unwrap().unwrap();
        assert_eq!(fetched.email, "admin@example.com");
        assert_eq!(fetched.role, Role::Admin);

        let by_email = store
            .get_profile_by_email("admin@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, profile.id);

        assert!(store.has_admin_profile().unwrap());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (_dir, store) = test_store();

        store
            .create_profile(&test_profile("user@example.com", Role::Member))
            .unwrap();
        let result = store.create_profile(&test_profile("user@example.com", Role::Member));

        assert!(matches!(result, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_duplicate_grant_is_distinct_error() {
        let (_dir, store) = test_store();

        let owner = test_profile("admin@example.com", Role::Admin);
        let member = test_profile("member@example.com", Role::Member);
        store.create_profile(&owner).unwrap();
        store.create_profile(&member).unwrap();

        let doc = test_document(&owner, "Q1 Report");
        store.create_document(&doc).unwrap();

        store
            .create_permission(&test_permission(&doc, &member))
            .unwrap();
        let result = store.create_permission(&test_permission(&doc, &member));

        assert!(matches!(result, Err(Error::AlreadyGranted)));
        // The failed insert must leave exactly one row behind.
        assert_eq!(store.list_permissions().unwrap().len(), 1);
    }

    #[test]
    fn test_document_delete_leaves_grants_dangling() {
        let (_dir, store) = test_store();

        let owner = test_profile("admin@example.com", Role::Admin);
        let member = test_profile("member@example.com", Role::Member);
        store.create_profile(&owner).unwrap();
        store.create_profile(&member).unwrap();

        let doc = test_document(&owner, "Doomed");
        store.create_document(&doc).unwrap();
        store
            .create_permission(&test_permission(&doc, &member))
            .unwrap();

        assert!(store.delete_document(&doc.id).unwrap());

        let perms = store.list_permissions().unwrap();
        assert_eq!(perms.len(), 1);
        assert_eq!(perms[0].document_id, doc.id);
        assert!(store.get_document(&doc.id).unwrap().is_none());
    }

    #[test]
    fn test_viewable_ids_filter_can_view() {
        let (_dir, store) = test_store();

        let owner = test_profile("admin@example.com", Role::Admin);
        let member = test_profile("member@example.com", Role::Member);
        store.create_profile(&owner).unwrap();
        store.create_profile(&member).unwrap();

        let visible = test_document(&owner, "visible");
        let hidden = test_document(&owner, "hidden");
        store.create_document(&visible).unwrap();
        store.create_document(&hidden).unwrap();

        store
            .create_permission(&test_permission(&visible, &member))
            .unwrap();
        let mut revoked_view = test_permission(&hidden, &member);
        revoked_view.can_view = false;
        store.create_permission(&revoked_view).unwrap();

        let ids = store.list_viewable_document_ids(&member.id).unwrap();
        assert_eq!(ids, vec![visible.id.clone()]);
    }

    #[test]
    fn test_list_by_ids_empty_input() {
        let (_dir, store) = test_store();
        assert!(store.list_documents_by_ids(&[]).unwrap().is_empty());
        assert!(store.list_profiles_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_list_by_ids_tolerates_dangling() {
        let (_dir, store) = test_store();

        let owner = test_profile("admin@example.com", Role::Admin);
        store.create_profile(&owner).unwrap();
        let doc = test_document(&owner, "kept");
        store.create_document(&doc).unwrap();

        let docs = store
            .list_documents_by_ids(&[doc.id.clone(), "no-such-id".to_string()])
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, doc.id);
    }

    #[test]
    fn test_session_lookup_collision() {
        let (_dir, store) = test_store();

        let user = test_profile("member@example.com", Role::Member);
        store.create_profile(&user).unwrap();

        let session1 = Session {
            id: "session-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup12".to_string(),
            user_id: user.id.clone(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_session(&session1).unwrap();

        let session2 = Session {
            id: "session-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup12".to_string(), // Same lookup
            user_id: user.id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        let result = store.create_session(&session2);
        assert!(matches!(result, Err(Error::SessionLookupCollision)));
    }
}
