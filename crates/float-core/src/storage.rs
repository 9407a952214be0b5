//! Storage seam: the parsing/query core consumes exactly two
//! operations from its persistence collaborator, expressed here as an
//! injected trait so the core stays decoupled from the backend.

use std::collections::HashMap;

use uuid::Uuid;

use crate::ast::FloatAST;
use crate::error::StorageError;

/// A stored conversation awaiting parsing.
#[derive(Clone, Debug)]
pub struct Conversation {
    pub title: String,
    pub text: String,
}

/// The two operations the core needs from persistence.
pub trait AstStorage {
    /// Fetch conversation text and title by id.
    fn fetch_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError>;

    /// Persist or update an assembled document keyed by its id.
    fn save_document(&mut self, ast: &FloatAST) -> Result<(), StorageError>;
}

/// In-process storage for tests and ephemeral pipelines.
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: HashMap<String, Conversation>,
    documents: HashMap<Uuid, FloatAST>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_conversation(&mut self, id: &str, title: &str, text: &str) {
        self.conversations.insert(
            id.to_string(),
            Conversation {
                title: title.to_string(),
                text: text.to_string(),
            },
        );
    }

    pub fn document(&self, id: Uuid) -> Option<&FloatAST> {
        self.documents.get(&id)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

impl AstStorage for MemoryStore {
    fn fetch_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        Ok(self.conversations.get(id).cloned())
    }

    fn save_document(&mut self, ast: &FloatAST) -> Result<(), StorageError> {
        self.documents.insert(ast.id, ast.clone());
        Ok(())
    }
}

/// Fetch a conversation, parse it, and persist the assembled document.
/// Returns the document id, or None when the conversation is missing.
pub fn parse_and_store(
    storage: &mut impl AstStorage,
    conversation_id: &str,
) -> Result<Option<Uuid>, StorageError> {
    let Some(conversation) = storage.fetch_conversation(conversation_id)? else {
        return Ok(None);
    };
    let ast = FloatAST::parse_conversation(&conversation.text, &conversation.title);
    ast.validate()
        .map_err(|e| StorageError::new(format!("assembled document invalid: {e}")))?;
    storage.save_document(&ast)?;
    Ok(Some(ast.id))
}
