pub mod board;
pub mod clock;
pub mod document;
pub mod identity;
pub mod notes;
pub mod store;
pub mod task;

pub use board::{BoardError, CommitOutcome, Projection, TaskBoard};
pub use clock::{Clock, SystemClock};
pub use document::{Document, DocumentId, Fields, NewDocument};
pub use identity::{IdentityProvider, LocalIdentity, Subscription, User};
pub use notes::{Note, NoteBook, NoteDraft, NoteError, NoteKind};
pub use store::{MemoryStore, RemoteStore, StoreError};
pub use task::{Category, Task, TaskFields};
