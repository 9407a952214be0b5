use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use float_core::{AstStorage, Conversation, FloatAST, StorageError, export_json, import_json};

use crate::error::{Result, StoreError};
use crate::schema;

/// Default on-disk location for the database.
pub fn default_base_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("floatctl")
}

/// SQLite-backed persistence for raw conversations and assembled
/// FloatAST documents. Documents are stored as their wire-format JSON;
/// loading runs back through the version gate.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Conversations ---

    pub fn put_conversation(&self, id: &str, title: &str, body: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO conversations (id, title, body) VALUES (?1, ?2, ?3)",
            params![id, title, body],
        )?;
        Ok(())
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title, body FROM conversations WHERE id = ?1")?;
        let row = stmt
            .query_row([id], |row| {
                Ok(Conversation {
                    title: row.get(0)?,
                    text: row.get(1)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    // --- Documents ---

    pub fn put_document(&self, ast: &FloatAST) -> Result<()> {
        let json = export_json(ast)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (id, version, ast_type, source, json, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
            params![
                ast.id.to_string(),
                ast.version,
                serde_json::to_value(ast.ast_type)?
                    .as_str()
                    .unwrap_or("conversation")
                    .to_string(),
                ast.metadata.source,
                json,
            ],
        )?;
        tracing::debug!(id = %ast.id, nodes = ast.nodes.len(), "document saved");
        Ok(())
    }

    pub fn get_document(&self, id: Uuid) -> Result<Option<FloatAST>> {
        let mut stmt = self
            .conn
            .prepare("SELECT json FROM documents WHERE id = ?1")?;
        let json: Option<String> = stmt
            .query_row([id.to_string()], |row| row.get(0))
            .optional()?;
        match json {
            Some(json) => Ok(Some(import_json(&json)?)),
            None => Ok(None),
        }
    }

    /// (id, source title) pairs for every stored document, newest first.
    pub fn list_documents(&self) -> Result<Vec<(Uuid, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, source FROM documents ORDER BY updated_at DESC, id ASC")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let source: String = row.get(1)?;
            Ok((id, source))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, source) = row?;
            let id = Uuid::parse_str(&id)
                .map_err(|_| StoreError::InvalidData(format!("bad document id {id:?}")))?;
            out.push((id, source));
        }
        Ok(out)
    }

    pub fn document_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT count(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl AstStorage for Store {
    fn fetch_conversation(&self, id: &str) -> std::result::Result<Option<Conversation>, StorageError> {
        self.get_conversation(id)
            .map_err(|e| StorageError::new(e.to_string()))
    }

    fn save_document(&mut self, ast: &FloatAST) -> std::result::Result<(), StorageError> {
        self.put_document(ast)
            .map_err(|e| StorageError::new(e.to_string()))
    }
}
