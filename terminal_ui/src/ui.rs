use sahabat_shared::{Category, Note, NoteKind, Projection, Task, User};
use tui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, NoteField, NoteForm, Screen};

const BOARD_HELP: &str = "a add  e edit  d delete  m move  tab notes  r reload  q quit";
const NOTES_HELP: &str = "n new  u unlock  d delete  / search  tab board  r reload  q quit";
const MASK: &str = "************";

/// `note_counts` is (public, private) over all notes, not just `notes`.
pub fn draw<B: Backend>(
    f: &mut Frame<B>,
    app: &App,
    projection: &Projection,
    notes: &[Note],
    note_counts: (usize, usize),
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(f.size());

    draw_header(f, app.user.as_ref(), app.screen, chunks[0]);
    match app.screen {
        Screen::Board => draw_board(f, app, projection, chunks[1]),
        Screen::Notes => draw_notes(f, app, notes, note_counts, chunks[1]),
    }

    let footer = match (&app.status, app.screen) {
        (Some(status), _) => Span::styled(status.clone(), Style::default().fg(Color::Red)),
        (None, Screen::Board) if app.editing.is_some() => Span::raw("Enter save  Esc done"),
        (None, Screen::Board) => Span::raw(BOARD_HELP),
        (None, Screen::Notes) if app.note_form.is_some() => {
            Span::raw("Enter next field / save  Esc cancel")
        }
        (None, Screen::Notes) => Span::raw(NOTES_HELP),
    };
    f.render_widget(
        Paragraph::new(Spans::from(footer)).block(Block::default().borders(Borders::ALL)),
        chunks[2],
    );
}

fn draw_board<B: Backend>(f: &mut Frame<B>, app: &App, projection: &Projection, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(33),
                Constraint::Percentage(34),
                Constraint::Percentage(33),
            ]
            .as_ref(),
        )
        .split(area);
    for (category, area) in Category::ALL.into_iter().zip(columns) {
        draw_column(f, app, projection, category, area);
    }
}

fn badge(user: Option<&User>) -> String {
    match user {
        Some(user) => {
            let name = user
                .display_name
                .as_deref()
                .or(user.email.as_deref())
                .unwrap_or_default();
            format!("({}) {name}", user.initial())
        }
        None => "(U)".to_string(),
    }
}

fn draw_header<B: Backend>(f: &mut Frame<B>, user: Option<&User>, screen: Screen, area: Rect) {
    let heading = match screen {
        Screen::Board => "Reminder Your Task",
        Screen::Notes => "Daily Note",
    };
    let title = Paragraph::new(Spans::from(vec![
        Span::styled(
            heading,
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(badge(user), Style::default().fg(Color::White)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("SahabatDiri"))
    .alignment(Alignment::Left);
    f.render_widget(title, area);
}

fn card<'a>(task: &'a Task, category: Category, editing: bool) -> ListItem<'a> {
    let body = if editing {
        Span::styled(
            format!("{}_", task.text),
            Style::default().fg(Color::Yellow),
        )
    } else if task.text.is_empty() {
        Span::styled(
            "Enter task details",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::raw(task.text.as_str())
    };

    let mut lines = vec![Spans::from(body)];
    if let Some(caption) = task.caption(category) {
        lines.push(Spans::from(Span::styled(
            caption,
            Style::default().fg(Color::Gray),
        )));
    }
    lines.push(Spans::from(""));
    ListItem::new(lines)
}

fn draw_column<B: Backend>(
    f: &mut Frame<B>,
    app: &App,
    projection: &Projection,
    category: Category,
    area: Rect,
) {
    let focused = app.column == category;
    let items: Vec<ListItem> = projection
        .column(category)
        .iter()
        .map(|task| {
            let editing = focused && app.editing.as_ref() == Some(&task.id);
            card(task, category, editing)
        })
        .collect();

    let border = if focused {
        Style::default().fg(Color::LightBlue)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(category.title()),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if focused && !projection.column(category).is_empty() {
        state.select(Some(app.row));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn note_item<'a>(note: &'a Note) -> ListItem<'a> {
    let marker = match note.kind {
        NoteKind::Public => Span::styled("public ", Style::default().fg(Color::Green)),
        NoteKind::Private => Span::styled("private", Style::default().fg(Color::Magenta)),
    };
    ListItem::new(Spans::from(vec![
        marker,
        Span::raw(" "),
        Span::raw(note.title.as_str()),
    ]))
}

fn note_body(app: &App, note: &Note) -> Vec<Spans<'static>> {
    let mut lines = vec![
        Spans::from(Span::styled(
            note.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Spans::from(""),
    ];
    let opened = app
        .unlocked
        .as_ref()
        .filter(|(id, _)| id == &note.id)
        .map(|(_, content)| content.clone());
    match (note.visible_content(), opened) {
        (Some(content), _) => lines.push(Spans::from(content.to_string())),
        (None, Some(content)) => lines.push(Spans::from(content)),
        (None, None) => {
            lines.push(Spans::from(Span::styled(
                MASK,
                Style::default().fg(Color::DarkGray),
            )));
            match &app.password_prompt {
                Some((id, typed)) if id == &note.id => lines.push(Spans::from(format!(
                    "Password: {}_",
                    "*".repeat(typed.chars().count())
                ))),
                _ => lines.push(Spans::from("press u to unlock")),
            }
        }
    }
    lines
}

fn form_body(form: &NoteForm) -> Vec<Spans<'static>> {
    let field = |label: &str, value: String, which: NoteField| {
        let style = if form.field == which {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Spans::from(vec![
            Span::raw(format!("{label:<9}")),
            Span::styled(value, style),
        ])
    };
    vec![
        field("Title", form.title.clone(), NoteField::Title),
        field("Content", form.content.clone(), NoteField::Content),
        field(
            "Password",
            "*".repeat(form.password.chars().count()),
            NoteField::Password,
        ),
        Spans::from(""),
        Spans::from("leave the password empty for a public note"),
    ]
}

fn draw_notes<B: Backend>(
    f: &mut Frame<B>,
    app: &App,
    notes: &[Note],
    (public, private): (usize, usize),
    area: Rect,
) {
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(area);

    let mut title = format!("Notes ({public} public, {private} private)");
    if !app.filter.is_empty() || app.filtering {
        title = format!("{title} /{}", app.filter);
    }
    let list = List::new(notes.iter().map(note_item).collect::<Vec<_>>())
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default();
    if !notes.is_empty() {
        state.select(Some(app.note_row));
    }
    f.render_stateful_widget(list, panes[0], &mut state);

    let (heading, body) = match (&app.note_form, app.selected_note(notes)) {
        (Some(form), _) => ("New note", form_body(form)),
        (None, Some(note)) => ("Note", note_body(app, note)),
        (None, None) => ("Note", vec![Spans::from("no notes yet, press n")]),
    };
    f.render_widget(
        Paragraph::new(body)
            .block(Block::default().borders(Borders::ALL).title(heading))
            .wrap(Wrap { trim: false }),
        panes[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use sahabat_shared::{DocumentId, MemoryStore, NoteBook, NoteDraft};
    use tui::{backend::TestBackend, Terminal};

    fn rendered(app: &App, projection: &Projection) -> String {
        rendered_notes(app, projection, &[])
    }

    fn rendered_notes(app: &App, projection: &Projection, notes: &[Note]) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 20)).unwrap();
        let counts = (
            notes.iter().filter(|n| n.kind == NoteKind::Public).count(),
            notes.iter().filter(|n| n.kind == NoteKind::Private).count(),
        );
        terminal
            .draw(|f| draw(f, app, projection, notes, counts))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[test]
    fn badge_uses_initial() {
        let user = User {
            display_name: Some("Sari".to_string()),
            email: None,
            photo_url: None,
        };
        assert_eq!(badge(Some(&user)), "(S) Sari");
        assert_eq!(badge(None), "(U)");
    }

    #[test]
    fn renders_columns_and_captions() {
        let projection = Projection {
            todo: vec![Task {
                id: DocumentId::from("a"),
                text: "Write report".to_string(),
                editable: false,
                timestamp: "1/2/2024".to_string(),
            }],
            in_progress: Vec::new(),
            done: Vec::new(),
        };

        let screen = rendered(&App::default(), &projection);

        assert!(screen.contains("Reminder Your Task"));
        assert!(screen.contains("In Progress"));
        assert!(screen.contains("Write report"));
        assert!(screen.contains("Created: 1/2/2024"));
    }

    #[test]
    fn status_replaces_help() {
        let app = App {
            status: Some("error adding task: transport error".to_string()),
            ..App::default()
        };

        let screen = rendered(&app, &Projection::default());

        assert!(screen.contains("error adding task"));
        assert!(!screen.contains("q quit"));
    }

    async fn notes() -> Vec<Note> {
        let book = NoteBook::new(MemoryStore::new());
        book.add_note(NoteDraft::private("Diary", "dear diary", "pw"))
            .await
            .unwrap();
        book.notes()
    }

    #[tokio::test]
    async fn private_note_is_masked_until_unlocked() {
        let notes = notes().await;
        let mut app = App {
            screen: Screen::Notes,
            ..App::default()
        };

        let screen = rendered_notes(&app, &Projection::default(), &notes);
        assert!(screen.contains("Daily Note"));
        assert!(screen.contains("0 public, 1 private"));
        assert!(screen.contains("Diary"));
        assert!(screen.contains(MASK));
        assert!(!screen.contains("dear diary"));

        app.unlocked = Some((notes[0].id.clone(), "dear diary".to_string()));
        let screen = rendered_notes(&app, &Projection::default(), &notes);
        assert!(screen.contains("dear diary"));
    }

    #[tokio::test]
    async fn password_prompt_is_masked() {
        let notes = notes().await;
        let app = App {
            screen: Screen::Notes,
            password_prompt: Some((notes[0].id.clone(), "secret".to_string())),
            ..App::default()
        };

        let screen = rendered_notes(&app, &Projection::default(), &notes);

        assert!(screen.contains("Password: ******_"));
        assert!(!screen.contains("secret"));
    }

    #[test]
    fn empty_notes_screen_invites_a_first_note() {
        let app = App {
            screen: Screen::Notes,
            ..App::default()
        };

        let screen = rendered(&app, &Projection::default());

        assert!(screen.contains("no notes yet"));
        assert!(screen.contains("/ search"));
        assert!(!screen.contains("In Progress"));
    }
}
