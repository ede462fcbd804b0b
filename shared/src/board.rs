//! Task board controller.
//!
//! Owns the in-memory projection of the three columns and keeps it in step
//! with a [`RemoteStore`]. Every operation issues its remote write first and
//! only touches the projection once that write succeeded, so a failed call
//! leaves the board exactly as it was.
//!
//! The projection lock is never held across an `.await`. Two operations in
//! flight at once are applied in the order their remote calls complete.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::document::DocumentId;
use crate::store::{RemoteStore, StoreError};
use crate::task::{Category, Task, TaskFields};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("error {action} task: {source}")]
    Remote {
        action: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("cannot move a task from {from} to {to}")]
    InvalidMove { from: Category, to: Category },

    /// The source document is gone but the destination copy was never
    /// written. `text` is all that is left of the task.
    #[error("task removed from {from} but not recreated in {to}: {source}")]
    MoveInterrupted {
        from: Category,
        to: Category,
        text: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Saved(Task),
    /// The committed text was blank, so the task was removed.
    Deleted,
}

/// Ordered tasks per column, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub todo: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub done: Vec<Task>,
}

impl Projection {
    pub fn column(&self, category: Category) -> &[Task] {
        match category {
            Category::Todo => &self.todo,
            Category::InProgress => &self.in_progress,
            Category::Done => &self.done,
        }
    }

    fn column_mut(&mut self, category: Category) -> &mut Vec<Task> {
        match category {
            Category::Todo => &mut self.todo,
            Category::InProgress => &mut self.in_progress,
            Category::Done => &mut self.done,
        }
    }

    pub fn find(&self, id: &DocumentId, category: Category) -> Option<&Task> {
        self.column(category).iter().find(|task| &task.id == id)
    }

    fn find_mut(&mut self, id: &DocumentId, category: Category) -> Option<&mut Task> {
        self.column_mut(category)
            .iter_mut()
            .find(|task| &task.id == id)
    }

    fn remove(&mut self, id: &DocumentId, category: Category) {
        self.column_mut(category).retain(|task| &task.id != id);
    }

    pub fn len(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.column(category).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct TaskBoard<S> {
    store: S,
    clock: Box<dyn Clock>,
    projection: Mutex<Projection>,
    moving: Mutex<HashSet<DocumentId>>,
}

/// Marks a task as being moved until dropped.
struct MoveClaim<'a> {
    moving: &'a Mutex<HashSet<DocumentId>>,
    id: DocumentId,
}

impl<'a> MoveClaim<'a> {
    fn acquire(moving: &'a Mutex<HashSet<DocumentId>>, id: &DocumentId) -> Option<Self> {
        let fresh = moving
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone());
        fresh.then(|| Self {
            moving,
            id: id.clone(),
        })
    }
}

impl Drop for MoveClaim<'_> {
    fn drop(&mut self) {
        self.moving
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl<S: RemoteStore> TaskBoard<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }

    pub fn with_clock(store: S, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            clock: Box::new(clock),
            projection: Mutex::new(Projection::default()),
            moving: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of the current projection.
    pub fn projection(&self) -> Projection {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Projection> {
        self.projection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the projection with the contents of all three collections.
    ///
    /// Never fails: if any collection cannot be read the error is logged and
    /// the projection stays as it was.
    pub async fn load_all(&self) -> Projection {
        let fetched = futures::try_join!(
            self.fetch_column(Category::Todo),
            self.fetch_column(Category::InProgress),
            self.fetch_column(Category::Done),
        );

        match fetched {
            Ok((todo, in_progress, done)) => {
                let projection = Projection {
                    todo,
                    in_progress,
                    done,
                };
                *self.lock() = projection.clone();
                log::info!("loaded {} tasks", projection.len());
                projection
            }
            Err(err) => {
                log::error!("error fetching tasks: {err}");
                self.projection()
            }
        }
    }

    async fn fetch_column(&self, category: Category) -> Result<Vec<Task>, StoreError> {
        let documents = self.store.list_documents(category.collection()).await?;
        Ok(documents
            .into_iter()
            .filter_map(|document| match Task::from_document(document) {
                Ok(task) => Some(task),
                Err(err) => {
                    log::warn!("skipping document in {category}: {err}");
                    None
                }
            })
            .collect())
    }

    /// Writes an empty, editable placeholder and appends it to `category`.
    pub async fn create_task(&self, category: Category) -> Result<Task, BoardError> {
        let fields = TaskFields {
            text: String::new(),
            editable: true,
            timestamp: self.clock.stamp(),
        };
        let id = self
            .store
            .add_document(category.collection(), fields.clone().into_fields())
            .await
            .map_err(|source| remote_failure("adding", source))?;

        let task = Task::new(id, fields);
        self.lock().column_mut(category).push(task.clone());
        log::debug!("created task {} in {category}", task.id);
        Ok(task)
    }

    /// Saves the edited text and leaves edit mode. Blank text deletes the task.
    pub async fn commit_task_text(
        &self,
        id: &DocumentId,
        category: Category,
        text: &str,
    ) -> Result<CommitOutcome, BoardError> {
        let text = text.trim();
        if text.is_empty() {
            self.store
                .delete_document(category.collection(), id)
                .await
                .map_err(|source| remote_failure("updating", source))?;
            self.lock().remove(id, category);
            log::debug!("blank commit removed task {id} from {category}");
            return Ok(CommitOutcome::Deleted);
        }

        let fields = TaskFields {
            text: text.to_string(),
            editable: false,
            timestamp: self.clock.stamp(),
        };
        self.store
            .update_document(category.collection(), id, fields.clone().into_fields())
            .await
            .map_err(|source| remote_failure("updating", source))?;

        let saved = Task::new(id.clone(), fields);
        if let Some(task) = self.lock().find_mut(id, category) {
            *task = saved.clone();
        }
        Ok(CommitOutcome::Saved(saved))
    }

    /// Removes the task remotely, then locally. Unknown ids are not an error.
    pub async fn delete_task(&self, id: &DocumentId, category: Category) -> Result<(), BoardError> {
        self.store
            .delete_document(category.collection(), id)
            .await
            .map_err(|source| remote_failure("deleting", source))?;
        self.lock().remove(id, category);
        Ok(())
    }

    /// Relocates a task to the next column.
    ///
    /// The store has no cross-collection transaction, so this deletes the
    /// source document and then adds a fresh one in `to`; the moved task gets
    /// a new id. If the add fails after the delete went through, the task
    /// exists nowhere remotely and [`BoardError::MoveInterrupted`] hands back
    /// its text. Returns `Ok(None)` when `id` is not in `from` or is already
    /// being moved by another call.
    pub async fn move_task(
        &self,
        id: &DocumentId,
        from: Category,
        to: Category,
    ) -> Result<Option<Task>, BoardError> {
        if from.next() != Some(to) {
            log::warn!("refusing to move task {id} from {from} to {to}");
            return Err(BoardError::InvalidMove { from, to });
        }

        let Some(_claim) = MoveClaim::acquire(&self.moving, id) else {
            log::debug!("task {id} is already being moved");
            return Ok(None);
        };
        let moving = self.lock().find(id, from).map(|task| task.text.clone());
        let Some(text) = moving else {
            return Ok(None);
        };

        let fields = TaskFields {
            text,
            editable: false,
            timestamp: self.clock.stamp(),
        };

        self.store
            .delete_document(from.collection(), id)
            .await
            .map_err(|source| remote_failure("moving", source))?;

        let new_id = match self
            .store
            .add_document(to.collection(), fields.clone().into_fields())
            .await
        {
            Ok(new_id) => new_id,
            Err(source) => {
                log::error!(
                    "task {id} deleted from {from} but not recreated in {to}: {source}"
                );
                return Err(BoardError::MoveInterrupted {
                    from,
                    to,
                    text: fields.text,
                    source,
                });
            }
        };

        let moved = Task::new(new_id, fields);
        {
            let mut projection = self.lock();
            projection.remove(id, from);
            projection.column_mut(to).push(moved.clone());
        }
        log::debug!("moved task {id} from {from} to {to} as {}", moved.id);
        Ok(Some(moved))
    }

    /// Puts a committed task back into inline editing. Local only.
    pub fn begin_edit(&self, id: &DocumentId, category: Category) -> bool {
        match self.lock().find_mut(id, category) {
            Some(task) => {
                task.editable = true;
                true
            }
            None => false,
        }
    }

    /// Replaces the text of a task being edited. Local only; nothing is
    /// written until [`TaskBoard::commit_task_text`].
    pub fn set_draft_text(&self, id: &DocumentId, category: Category, text: &str) -> bool {
        match self.lock().find_mut(id, category) {
            Some(task) => {
                task.text = text.to_string();
                true
            }
            None => false,
        }
    }
}

fn remote_failure(action: &'static str, source: StoreError) -> BoardError {
    let err = BoardError::Remote { action, source };
    log::error!("{err}");
    err
}
