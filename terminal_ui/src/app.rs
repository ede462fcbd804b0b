use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use sahabat_shared::{Category, DocumentId, Note, NoteDraft, NoteKind, Projection, Task, User};

/// What the user asked for. The board or notebook applies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Quit,
    Reload,
    Create,
    BeginEdit(DocumentId, Category),
    Draft(DocumentId, Category, String),
    Commit(DocumentId, Category, String),
    Delete(DocumentId, Category),
    Move(DocumentId, Category, Category),
    SaveNote(NoteDraft),
    DeleteNote(DocumentId),
    Unlock(DocumentId, String),
}

/// Result of a remote operation, delivered back to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Created(Task),
    Done,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Board,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    Title,
    Content,
    Password,
}

/// New-note editor. A non-empty password makes the note private.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteForm {
    pub title: String,
    pub content: String,
    pub password: String,
    pub field: NoteField,
}

impl NoteForm {
    fn new() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            password: String::new(),
            field: NoteField::Title,
        }
    }

    fn focused(&mut self) -> &mut String {
        match self.field {
            NoteField::Title => &mut self.title,
            NoteField::Content => &mut self.content,
            NoteField::Password => &mut self.password,
        }
    }

    fn draft(&self) -> NoteDraft {
        if self.password.is_empty() {
            NoteDraft::public(&self.title, &self.content)
        } else {
            NoteDraft::private(&self.title, &self.content, &self.password)
        }
    }
}

/// Selection and inline-editor state. Tasks and notes live elsewhere.
#[derive(Debug)]
pub struct App {
    pub screen: Screen,
    pub column: Category,
    pub row: usize,
    pub editing: Option<DocumentId>,
    pub status: Option<String>,
    pub user: Option<User>,
    pub note_row: usize,
    pub note_form: Option<NoteForm>,
    /// Note being unlocked and the password typed so far.
    pub password_prompt: Option<(DocumentId, String)>,
    /// Content of the private note opened last.
    pub unlocked: Option<(DocumentId, String)>,
    pub filter: String,
    pub filtering: bool,
}

impl Default for App {
    fn default() -> Self {
        Self {
            screen: Screen::Board,
            column: Category::Todo,
            row: 0,
            editing: None,
            status: None,
            user: None,
            note_row: 0,
            note_form: None,
            password_prompt: None,
            unlocked: None,
            filter: String::new(),
            filtering: false,
        }
    }
}

impl App {
    pub fn selected<'a>(&self, projection: &'a Projection) -> Option<&'a Task> {
        projection.column(self.column).get(self.row)
    }

    pub fn selected_note<'a>(&self, notes: &'a [Note]) -> Option<&'a Note> {
        notes.get(self.note_row)
    }

    /// Keeps both cursors on existing entries after the data changed.
    pub fn clamp(&mut self, projection: &Projection, notes: &[Note]) {
        let len = projection.column(self.column).len();
        self.row = self.row.min(len.saturating_sub(1));
        if let Some(id) = &self.editing {
            if projection.find(id, self.column).is_none() {
                self.editing = None;
            }
        }
        self.note_row = self.note_row.min(notes.len().saturating_sub(1));
    }

    /// Selects a freshly created card and opens it for typing.
    pub fn focus_new(&mut self, category: Category, task: &Task, projection: &Projection) {
        self.column = category;
        self.row = projection
            .column(category)
            .iter()
            .position(|t| t.id == task.id)
            .unwrap_or(0);
        self.editing = Some(task.id.clone());
    }

    pub fn report(&mut self, err: impl std::fmt::Display) {
        self.status = Some(err.to_string());
    }

    pub fn complete(&mut self, completion: Completion, projection: &Projection) {
        match completion {
            Completion::Created(task) => {
                self.status = None;
                if self.editing.is_none() && self.screen == Screen::Board {
                    self.focus_new(Category::Todo, &task, projection);
                }
            }
            Completion::Done => self.status = None,
            Completion::Failed(message) => self.status = Some(message),
        }
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        projection: &Projection,
        notes: &[Note],
    ) -> Option<Intent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Intent::Quit);
        }
        match self.screen {
            Screen::Board => match self.editing.clone() {
                Some(id) => self.handle_edit_key(key, id, projection),
                None => self.handle_board_key(key, projection),
            },
            Screen::Notes => {
                if self.note_form.is_some() {
                    self.handle_form_key(key)
                } else if self.password_prompt.is_some() {
                    self.handle_prompt_key(key)
                } else if self.filtering {
                    self.handle_filter_key(key);
                    None
                } else {
                    self.handle_notes_key(key, notes)
                }
            }
        }
    }

    fn handle_edit_key(
        &mut self,
        key: KeyEvent,
        id: DocumentId,
        projection: &Projection,
    ) -> Option<Intent> {
        let mut text = projection.find(&id, self.column)?.text.clone();
        match key.code {
            KeyCode::Char(c) => {
                text.push(c);
                Some(Intent::Draft(id, self.column, text))
            }
            KeyCode::Backspace => {
                text.pop();
                Some(Intent::Draft(id, self.column, text))
            }
            // Esc behaves like leaving the field: whatever is typed is kept.
            KeyCode::Enter | KeyCode::Esc => {
                self.editing = None;
                Some(Intent::Commit(id, self.column, text))
            }
            _ => None,
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent, projection: &Projection) -> Option<Intent> {
        match key.code {
            KeyCode::Char('q') => Some(Intent::Quit),
            KeyCode::Char('r') => Some(Intent::Reload),
            KeyCode::Char('a') => Some(Intent::Create),
            KeyCode::Tab => {
                self.screen = Screen::Notes;
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.shift_column(-1, projection);
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.shift_column(1, projection);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.row = self.row.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.row + 1 < projection.column(self.column).len() {
                    self.row += 1;
                }
                None
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                let id = self.selected(projection)?.id.clone();
                self.editing = Some(id.clone());
                Some(Intent::BeginEdit(id, self.column))
            }
            KeyCode::Char('d') => {
                let id = self.selected(projection)?.id.clone();
                Some(Intent::Delete(id, self.column))
            }
            KeyCode::Char('m') => {
                let to = self.column.next()?;
                let id = self.selected(projection)?.id.clone();
                Some(Intent::Move(id, self.column, to))
            }
            _ => None,
        }
    }

    fn handle_notes_key(&mut self, key: KeyEvent, notes: &[Note]) -> Option<Intent> {
        match key.code {
            KeyCode::Char('q') => Some(Intent::Quit),
            KeyCode::Char('r') => Some(Intent::Reload),
            KeyCode::Tab => {
                self.screen = Screen::Board;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.note_row = self.note_row.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.note_row + 1 < notes.len() {
                    self.note_row += 1;
                }
                None
            }
            KeyCode::Char('/') => {
                self.filtering = true;
                None
            }
            KeyCode::Char('n') => {
                self.note_form = Some(NoteForm::new());
                None
            }
            KeyCode::Char('u') | KeyCode::Enter => {
                let note = self.selected_note(notes)?;
                if note.kind == NoteKind::Private {
                    self.password_prompt = Some((note.id.clone(), String::new()));
                }
                None
            }
            KeyCode::Char('d') => {
                let id = self.selected_note(notes)?.id.clone();
                if self.unlocked.as_ref().map(|(open, _)| open) == Some(&id) {
                    self.unlocked = None;
                }
                Some(Intent::DeleteNote(id))
            }
            _ => None,
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(c) => self.filter.push(c),
            KeyCode::Backspace => {
                self.filter.pop();
            }
            KeyCode::Enter | KeyCode::Esc => self.filtering = false,
            _ => {}
        }
        self.note_row = 0;
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> Option<Intent> {
        let (_, typed) = self.password_prompt.as_mut()?;
        match key.code {
            KeyCode::Char(c) => typed.push(c),
            KeyCode::Backspace => {
                typed.pop();
            }
            KeyCode::Esc => self.password_prompt = None,
            KeyCode::Enter => {
                let (id, password) = self.password_prompt.take()?;
                return Some(Intent::Unlock(id, password));
            }
            _ => {}
        }
        None
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Option<Intent> {
        let form = self.note_form.as_mut()?;
        match key.code {
            KeyCode::Char(c) => form.focused().push(c),
            KeyCode::Backspace => {
                form.focused().pop();
            }
            KeyCode::Esc => self.note_form = None,
            KeyCode::Enter => match form.field {
                NoteField::Title => form.field = NoteField::Content,
                NoteField::Content => form.field = NoteField::Password,
                NoteField::Password => {
                    let draft = form.draft();
                    self.note_form = None;
                    return Some(Intent::SaveNote(draft));
                }
            },
            _ => {}
        }
        None
    }

    fn shift_column(&mut self, step: isize, projection: &Projection) {
        let current = Category::ALL
            .iter()
            .position(|c| *c == self.column)
            .unwrap_or(0) as isize;
        let last = Category::ALL.len() as isize - 1;
        self.column = Category::ALL[(current + step).clamp(0, last) as usize];
        let len = projection.column(self.column).len();
        self.row = self.row.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sahabat_shared::{MemoryStore, NoteBook};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, projection: &Projection, codes: &[KeyCode]) -> Option<Intent> {
        let mut last = None;
        for code in codes {
            last = app.handle_key(key(*code), projection, &[]);
        }
        last
    }

    fn typed(text: &str) -> Vec<KeyCode> {
        text.chars().map(KeyCode::Char).collect()
    }

    fn task(id: &str, text: &str) -> Task {
        Task {
            id: DocumentId::from(id),
            text: text.to_string(),
            editable: false,
            timestamp: "t0".to_string(),
        }
    }

    fn board() -> Projection {
        Projection {
            todo: vec![task("a", "first"), task("b", "second")],
            in_progress: vec![task("c", "doing")],
            done: vec![task("d", "over")],
        }
    }

    async fn notes() -> Vec<Note> {
        let book = NoteBook::new(MemoryStore::new());
        book.add_note(NoteDraft::public("Groceries", "eggs"))
            .await
            .unwrap();
        book.add_note(NoteDraft::private("Diary", "dear diary", "pw"))
            .await
            .unwrap();
        book.notes()
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let projection = board();
        let mut app = App::default();

        press(&mut app, &projection, &[KeyCode::Down, KeyCode::Down]);
        assert_eq!(app.row, 1);

        press(&mut app, &projection, &[KeyCode::Right]);
        assert_eq!(app.column, Category::InProgress);
        assert_eq!(app.row, 0);

        press(&mut app, &projection, &[KeyCode::Right, KeyCode::Right]);
        assert_eq!(app.column, Category::Done);

        press(&mut app, &projection, &[KeyCode::Up]);
        assert_eq!(app.row, 0);
    }

    #[test]
    fn move_targets_next_column_and_not_past_done() {
        let projection = board();
        let mut app = App::default();

        assert_eq!(
            press(&mut app, &projection, &[KeyCode::Char('m')]),
            Some(Intent::Move(
                DocumentId::from("a"),
                Category::Todo,
                Category::InProgress
            ))
        );

        app.column = Category::Done;
        assert_eq!(press(&mut app, &projection, &[KeyCode::Char('m')]), None);
    }

    #[test]
    fn typing_drafts_and_enter_commits() {
        let mut projection = board();
        let mut app = App::default();

        assert_eq!(
            press(&mut app, &projection, &[KeyCode::Char('e')]),
            Some(Intent::BeginEdit(DocumentId::from("a"), Category::Todo))
        );
        assert_eq!(
            press(&mut app, &projection, &[KeyCode::Char('!')]),
            Some(Intent::Draft(
                DocumentId::from("a"),
                Category::Todo,
                "first!".to_string()
            ))
        );

        projection.todo[0].text = "first!".to_string();
        assert_eq!(
            press(&mut app, &projection, &[KeyCode::Char('q')]),
            Some(Intent::Draft(
                DocumentId::from("a"),
                Category::Todo,
                "first!q".to_string()
            )),
            "q is text while editing"
        );
        assert_eq!(
            press(&mut app, &projection, &[KeyCode::Enter]),
            Some(Intent::Commit(
                DocumentId::from("a"),
                Category::Todo,
                "first!".to_string()
            ))
        );
        assert_eq!(app.editing, None);
    }

    #[test]
    fn empty_column_offers_nothing_to_act_on() {
        let projection = Projection::default();
        let mut app = App::default();

        assert_eq!(press(&mut app, &projection, &[KeyCode::Char('d')]), None);
        assert_eq!(press(&mut app, &projection, &[KeyCode::Enter]), None);
        assert_eq!(
            press(&mut app, &projection, &[KeyCode::Char('a')]),
            Some(Intent::Create)
        );
    }

    #[test]
    fn created_task_gets_focus_when_it_arrives() {
        let mut projection = board();
        let fresh = task("z", "");
        projection.todo.push(fresh.clone());
        let mut app = App::default();

        app.complete(Completion::Created(fresh), &projection);

        assert_eq!(app.row, 2);
        assert_eq!(app.editing, Some(DocumentId::from("z")));
    }

    #[test]
    fn created_task_does_not_steal_an_open_editor() {
        let mut projection = board();
        let fresh = task("z", "");
        projection.todo.push(fresh.clone());
        let mut app = App {
            editing: Some(DocumentId::from("a")),
            ..App::default()
        };

        app.complete(Completion::Created(fresh), &projection);

        assert_eq!(app.editing, Some(DocumentId::from("a")));
    }

    #[test]
    fn failures_show_until_the_next_success() {
        let projection = board();
        let mut app = App::default();

        app.complete(
            Completion::Failed("error deleting task: timeout".to_string()),
            &projection,
        );
        assert_eq!(
            app.status.as_deref(),
            Some("error deleting task: timeout")
        );

        app.complete(Completion::Done, &projection);
        assert_eq!(app.status, None);
    }

    #[test]
    fn clamp_drops_editor_for_vanished_card() {
        let mut projection = board();
        let mut app = App {
            row: 1,
            editing: Some(DocumentId::from("b")),
            note_row: 4,
            ..App::default()
        };

        projection.todo.pop();
        app.clamp(&projection, &[]);

        assert_eq!(app.row, 0);
        assert_eq!(app.editing, None);
        assert_eq!(app.note_row, 0);
    }

    #[test]
    fn ctrl_c_quits_even_while_editing() {
        let projection = board();
        let mut app = App {
            editing: Some(DocumentId::from("a")),
            ..App::default()
        };

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_c, &projection, &[]), Some(Intent::Quit));
    }

    #[test]
    fn note_form_walks_fields_and_saves() {
        let projection = Projection::default();
        let mut app = App::default();
        press(&mut app, &projection, &[KeyCode::Tab, KeyCode::Char('n')]);
        assert_eq!(app.screen, Screen::Notes);

        press(&mut app, &projection, &typed("Diary"));
        press(&mut app, &projection, &[KeyCode::Enter]);
        press(&mut app, &projection, &typed("dear diary"));
        press(&mut app, &projection, &[KeyCode::Enter]);
        press(&mut app, &projection, &typed("pw"));
        let saved = press(&mut app, &projection, &[KeyCode::Enter]);

        assert_eq!(
            saved,
            Some(Intent::SaveNote(NoteDraft::private("Diary", "dear diary", "pw")))
        );
        assert_eq!(app.note_form, None);
    }

    #[test]
    fn note_without_password_is_public() {
        let projection = Projection::default();
        let mut app = App {
            screen: Screen::Notes,
            ..App::default()
        };
        press(&mut app, &projection, &[KeyCode::Char('n')]);
        press(&mut app, &projection, &typed("List"));
        press(&mut app, &projection, &[KeyCode::Enter]);
        press(&mut app, &projection, &typed("eggs"));
        let saved = press(&mut app, &projection, &[KeyCode::Enter, KeyCode::Enter]);

        assert_eq!(
            saved,
            Some(Intent::SaveNote(NoteDraft::public("List", "eggs")))
        );
    }

    #[tokio::test]
    async fn private_note_prompts_for_password() {
        let notes = notes().await;
        let projection = Projection::default();
        let mut app = App {
            screen: Screen::Notes,
            ..App::default()
        };

        app.handle_key(key(KeyCode::Char('u')), &projection, &notes);
        assert_eq!(app.password_prompt, None, "public notes need no password");

        app.handle_key(key(KeyCode::Down), &projection, &notes);
        app.handle_key(key(KeyCode::Char('u')), &projection, &notes);
        for c in "pw".chars() {
            app.handle_key(key(KeyCode::Char(c)), &projection, &notes);
        }
        let intent = app.handle_key(key(KeyCode::Enter), &projection, &notes);

        assert_eq!(intent, Some(Intent::Unlock(notes[1].id.clone(), "pw".to_string())));
        assert_eq!(app.password_prompt, None);
    }

    #[tokio::test]
    async fn slash_edits_filter_and_resets_selection() {
        let notes = notes().await;
        let projection = Projection::default();
        let mut app = App {
            screen: Screen::Notes,
            note_row: 1,
            ..App::default()
        };

        for code in [KeyCode::Char('/'), KeyCode::Char('d'), KeyCode::Char('i')] {
            app.handle_key(key(code), &projection, &notes);
        }
        app.handle_key(key(KeyCode::Enter), &projection, &notes);

        assert_eq!(app.filter, "di");
        assert!(!app.filtering);
        assert_eq!(app.note_row, 0);
        let matching = &notes[1..];
        assert_eq!(matching[0].title, "Diary");
        assert_eq!(
            app.handle_key(key(KeyCode::Char('d')), &projection, matching),
            Some(Intent::DeleteNote(notes[1].id.clone()))
        );
    }
}
