//! SQL schema definitions

pub const SCHEMA: &str = r#"
-- Projects table
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    preview_html TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Saved project files, one row per path within a workspace
CREATE TABLE IF NOT EXISTS project_files (
    id TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    content TEXT NOT NULL,
    file_type TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (workspace_id, file_path)
);

-- Immutable version snapshots
CREATE TABLE IF NOT EXISTS file_versions (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    version_number INTEGER NOT NULL,
    files TEXT NOT NULL,
    preview_html TEXT,
    label TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (project_id, version_number)
);

-- Generation sessions
CREATE TABLE IF NOT EXISTS generation_sessions (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    prompt TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    files_generated INTEGER NOT NULL DEFAULT 0,
    model_used TEXT,
    error TEXT,
    started_at TEXT NOT NULL,
    completed_at TEXT
);

-- Messages table
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_project_files_workspace ON project_files(workspace_id);
CREATE INDEX IF NOT EXISTS idx_file_versions_project ON file_versions(project_id);
CREATE INDEX IF NOT EXISTS idx_sessions_project_id ON generation_sessions(project_id);
CREATE INDEX IF NOT EXISTS idx_sessions_status ON generation_sessions(status);
CREATE INDEX IF NOT EXISTS idx_messages_project_id ON messages(project_id);
"#;
