//! Public and private notes kept in the `notes` collection.
//!
//! A private note carries a password. Its content is only handed out by
//! [`NoteBook::unlock`] once the password matches.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::document::{Document, DocumentId, Fields};
use crate::store::{RemoteStore, StoreError};

pub const NOTES_COLLECTION: &str = "notes";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("a note needs both a title and content")]
    Blank,

    #[error("a private note needs a password")]
    MissingPassword,

    #[error("note {0} not found")]
    NotFound(DocumentId),

    #[error("incorrect password")]
    WrongPassword,

    #[error("error {action} note: {source}")]
    Remote {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

/// What the user typed into the note editor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub kind: NoteKind,
    pub password: Option<String>,
}

impl NoteDraft {
    pub fn public(title: &str, content: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            kind: NoteKind::Public,
            password: None,
        }
    }

    pub fn private(title: &str, content: &str, password: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            kind: NoteKind::Private,
            password: Some(password.to_string()),
        }
    }

    fn validate(self) -> Result<Self, NoteError> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(NoteError::Blank);
        }
        match self.kind {
            NoteKind::Public => Ok(Self {
                password: None,
                ..self
            }),
            NoteKind::Private if self.password.as_deref().map_or(true, str::is_empty) => {
                Err(NoteError::MissingPassword)
            }
            NoteKind::Private => Ok(self),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(default)]
struct NoteFields {
    title: String,
    content: String,
    #[serde(rename = "type")]
    kind: NoteKind,
    password: Option<String>,
    timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct Note {
    pub id: DocumentId,
    pub title: String,
    #[serde(skip_serializing)]
    content: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    #[serde(skip_serializing)]
    password: Option<String>,
    pub timestamp: String,
}

impl Note {
    fn new(id: DocumentId, fields: NoteFields) -> Self {
        Self {
            id,
            title: fields.title,
            content: fields.content,
            kind: fields.kind,
            password: fields.password,
            timestamp: fields.timestamp,
        }
    }

    fn from_document(document: Document) -> Result<Self, StoreError> {
        let fields: NoteFields = serde_json::from_value(Value::Object(document.fields))
            .map_err(|err| StoreError::Malformed(format!("note {}: {err}", document.id)))?;
        Ok(Self::new(document.id, fields))
    }

    /// Content readable without a password: `None` for private notes.
    pub fn visible_content(&self) -> Option<&str> {
        match self.kind {
            NoteKind::Public => Some(&self.content),
            NoteKind::Private => None,
        }
    }

    fn opens_with(&self, password: &str) -> bool {
        match self.kind {
            NoteKind::Public => true,
            NoteKind::Private => self.password.as_deref() == Some(password),
        }
    }
}

pub struct NoteBook<S> {
    store: S,
    clock: Box<dyn Clock>,
    notes: Mutex<Vec<Note>>,
}

impl<S: RemoteStore> NoteBook<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }

    pub fn with_clock(store: S, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            clock: Box::new(clock),
            notes: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Note>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notes(&self) -> Vec<Note> {
        self.lock().clone()
    }

    pub fn of_kind(&self, kind: NoteKind) -> Vec<Note> {
        self.lock()
            .iter()
            .filter(|note| note.kind == kind)
            .cloned()
            .collect()
    }

    /// Notes whose title contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<Note> {
        let query = query.to_lowercase();
        self.lock()
            .iter()
            .filter(|note| note.title.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    /// Reloads every note. On failure the error is logged and the current
    /// notes are kept.
    pub async fn load_all(&self) -> Vec<Note> {
        match self.store.list_documents(NOTES_COLLECTION).await {
            Ok(documents) => {
                let notes: Vec<Note> = documents
                    .into_iter()
                    .filter_map(|document| match Note::from_document(document) {
                        Ok(note) => Some(note),
                        Err(err) => {
                            log::warn!("skipping note: {err}");
                            None
                        }
                    })
                    .collect();
                *self.lock() = notes.clone();
                notes
            }
            Err(err) => {
                log::error!("error fetching notes: {err}");
                self.notes()
            }
        }
    }

    fn fields(&self, draft: NoteDraft) -> Fields {
        let fields = NoteFields {
            title: draft.title,
            content: draft.content,
            kind: draft.kind,
            password: draft.password,
            timestamp: self.clock.stamp(),
        };
        match serde_json::to_value(fields) {
            Ok(Value::Object(fields)) => fields,
            _ => Fields::new(),
        }
    }

    pub async fn add_note(&self, draft: NoteDraft) -> Result<Note, NoteError> {
        let fields = self.fields(draft.validate()?);
        let id = self
            .store
            .add_document(NOTES_COLLECTION, fields.clone())
            .await
            .map_err(|source| note_failure("adding", source))?;

        let note = Note::from_document(Document { id, fields })
            .map_err(|source| note_failure("adding", source))?;
        self.lock().push(note.clone());
        Ok(note)
    }

    /// Overwrites title, content, kind and password of an existing note.
    pub async fn update_note(&self, id: &DocumentId, draft: NoteDraft) -> Result<Note, NoteError> {
        let fields = self.fields(draft.validate()?);
        self.store
            .update_document(NOTES_COLLECTION, id, fields.clone())
            .await
            .map_err(|source| note_failure("updating", source))?;

        let note = Note::from_document(Document {
            id: id.clone(),
            fields,
        })
        .map_err(|source| note_failure("updating", source))?;
        if let Some(slot) = self.lock().iter_mut().find(|n| &n.id == id) {
            *slot = note.clone();
        }
        Ok(note)
    }

    pub async fn delete_note(&self, id: &DocumentId) -> Result<(), NoteError> {
        self.store
            .delete_document(NOTES_COLLECTION, id)
            .await
            .map_err(|source| note_failure("deleting", source))?;
        self.lock().retain(|note| &note.id != id);
        Ok(())
    }

    /// Returns the note's content if `password` opens it. Public notes open
    /// with anything.
    pub fn unlock(&self, id: &DocumentId, password: &str) -> Result<String, NoteError> {
        let notes = self.lock();
        let note = notes
            .iter()
            .find(|note| &note.id == id)
            .ok_or_else(|| NoteError::NotFound(id.clone()))?;
        if note.opens_with(password) {
            Ok(note.content.clone())
        } else {
            log::info!("wrong password for note {id}");
            Err(NoteError::WrongPassword)
        }
    }
}

fn note_failure(action: &'static str, source: StoreError) -> NoteError {
    let err = NoteError::Remote { action, source };
    log::error!("{err}");
    err
}
