use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, DocumentId, Fields};
use crate::store::StoreError;

/// Column of the board. Also names the remote collection the task lives in.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Todo,
    InProgress,
    Done,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Todo, Category::InProgress, Category::Done];

    pub fn collection(self) -> &'static str {
        match self {
            Category::Todo => "todo",
            Category::InProgress => "inProgress",
            Category::Done => "done",
        }
    }

    /// The only column a task in `self` may be moved to.
    pub fn next(self) -> Option<Category> {
        match self {
            Category::Todo => Some(Category::InProgress),
            Category::InProgress => Some(Category::Done),
            Category::Done => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Todo => "To Do",
            Category::InProgress => "In Progress",
            Category::Done => "Done",
        }
    }

    fn caption_prefix(self) -> &'static str {
        match self {
            Category::Todo => "Created",
            Category::InProgress => "Last Updated",
            Category::Done => "Done",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.collection() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Document body of a task as written to the store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(default)]
pub struct TaskFields {
    pub text: String,
    pub editable: bool,
    pub timestamp: String,
}

impl TaskFields {
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("text".to_string(), Value::String(self.text));
        fields.insert("editable".to_string(), Value::Bool(self.editable));
        fields.insert("timestamp".to_string(), Value::String(self.timestamp));
        fields
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Task {
    pub id: DocumentId,
    pub text: String,
    pub editable: bool,
    pub timestamp: String,
}

impl Task {
    pub fn new(id: DocumentId, fields: TaskFields) -> Self {
        Self {
            id,
            text: fields.text,
            editable: fields.editable,
            timestamp: fields.timestamp,
        }
    }

    pub fn from_document(document: Document) -> Result<Self, StoreError> {
        let fields: TaskFields = serde_json::from_value(Value::Object(document.fields))
            .map_err(|err| StoreError::Malformed(format!("task {}: {err}", document.id)))?;
        Ok(Self::new(document.id, fields))
    }

    /// Line shown under a card, e.g. `Created: 5/1/2024, 9:03:12 AM`.
    pub fn caption(&self, category: Category) -> Option<String> {
        if self.timestamp.is_empty() {
            return None;
        }
        Some(format!("{}: {}", category.caption_prefix(), self.timestamp))
    }
}
