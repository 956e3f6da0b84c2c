pub const SCHEMA: &str = r#"
-- Accounts; password_hash is an argon2id PHC string
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT,
    role TEXT NOT NULL DEFAULT 'member',  -- 'admin' or 'member'
    password_hash TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Document records; file columns are set iff a bucket blob is linked.
-- Deleting a record never touches the blob itself.
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT,

    -- Blob link (all NULL for text-only documents)
    file_path TEXT,
    file_name TEXT,
    file_size INTEGER,
    file_type TEXT,

    owner_id TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- View grants. Deliberately no foreign keys: deleting a document leaves its
-- grant rows dangling and readers tolerate the absent reference.
CREATE TABLE IF NOT EXISTS document_permissions (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    can_view INTEGER NOT NULL DEFAULT 1,
    can_edit INTEGER NOT NULL DEFAULT 0,  -- stored, not read by any operation
    granted_at TEXT DEFAULT (datetime('now')),

    UNIQUE(document_id, user_id)
);

-- Sessions are auth credentials issued at sign-in
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of the token for fast lookup
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_id);
CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at);
CREATE INDEX IF NOT EXISTS idx_permissions_user ON document_permissions(user_id);
CREATE INDEX IF NOT EXISTS idx_permissions_document ON document_permissions(document_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_lookup ON sessions(token_lookup);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
"#;
