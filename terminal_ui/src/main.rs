mod app;
mod config;
mod http_store;
mod ui;

use std::fmt::Display;
use std::fs::File;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use sahabat_shared::{
    Category, IdentityProvider, LocalIdentity, NoteBook, NoteKind, TaskBoard, User,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::app::{App, Completion, Intent};
use crate::config::Config;
use crate::http_store::HttpStore;

type Badge = Arc<Mutex<Option<User>>>;

fn init_logging(config: &Config) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match &config.log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
    Ok(())
}

/// Runs remote operations off the UI thread and reports back over a channel.
struct Worker {
    runtime: Runtime,
    board: Arc<TaskBoard<HttpStore>>,
    notes: Arc<NoteBook<HttpStore>>,
    done: UnboundedSender<Completion>,
}

impl Worker {
    fn spawn<F>(&self, job: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let done = self.done.clone();
        self.runtime.spawn(async move {
            // The receiver only goes away when the UI is shutting down.
            let _ = done.send(job.await);
        });
    }

    fn reload(&self) {
        let board = Arc::clone(&self.board);
        let notes = Arc::clone(&self.notes);
        self.spawn(async move {
            board.load_all().await;
            notes.load_all().await;
            Completion::Done
        });
    }
}

fn finished<T, E: Display>(result: Result<T, E>) -> Completion {
    match result {
        Ok(_) => Completion::Done,
        Err(err) => Completion::Failed(err.to_string()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_logging(&config)?;

    let store = HttpStore::new(config.store_url.clone());
    let (done, mut completions) = mpsc::unbounded_channel();
    let worker = Worker {
        runtime: Runtime::new()?,
        board: Arc::new(TaskBoard::new(store.clone())),
        notes: Arc::new(NoteBook::new(store)),
        done,
    };

    let identity = LocalIdentity::new();
    if let Some(user) = config.user.clone() {
        identity.sign_in(user);
    }
    let badge = Badge::default();
    let subscription = {
        let badge = Arc::clone(&badge);
        identity.on_auth_state_changed(Box::new(move |user| {
            *badge.lock().unwrap_or_else(PoisonError::into_inner) = user.cloned();
        }))
    };

    worker.reload();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run(&mut terminal, &worker, &mut completions, &badge);

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    subscription.unsubscribe();
    // Requests still in flight are abandoned rather than awaited.
    worker.runtime.shutdown_background();

    result
}

fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    worker: &Worker,
    completions: &mut UnboundedReceiver<Completion>,
    badge: &Badge,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::default();
    loop {
        app.user = badge
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let projection = worker.board.projection();
        while let Ok(completion) = completions.try_recv() {
            app.complete(completion, &projection);
        }
        let notes = worker.notes.search(&app.filter);
        app.clamp(&projection, &notes);

        let counts = (
            worker.notes.of_kind(NoteKind::Public).len(),
            worker.notes.of_kind(NoteKind::Private).len(),
        );
        terminal.draw(|f| ui::draw(f, &app, &projection, &notes, counts))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(intent) = app.handle_key(key, &projection, &notes) else {
            continue;
        };
        if intent == Intent::Quit {
            return Ok(());
        }
        dispatch(intent, &mut app, worker);
    }
}

/// Local edits apply at once; remote operations are spawned and their
/// outcome arrives later as a [`Completion`].
fn dispatch(intent: Intent, app: &mut App, worker: &Worker) {
    let board = Arc::clone(&worker.board);
    let notes = Arc::clone(&worker.notes);
    match intent {
        Intent::Quit => {}
        Intent::Reload => worker.reload(),
        Intent::BeginEdit(id, category) => {
            board.begin_edit(&id, category);
        }
        Intent::Draft(id, category, text) => {
            board.set_draft_text(&id, category, &text);
        }
        Intent::Unlock(id, password) => match notes.unlock(&id, &password) {
            Ok(content) => {
                app.status = None;
                app.unlocked = Some((id, content));
            }
            Err(err) => app.report(err),
        },
        Intent::Create => worker.spawn(async move {
            match board.create_task(Category::Todo).await {
                Ok(task) => Completion::Created(task),
                Err(err) => Completion::Failed(err.to_string()),
            }
        }),
        Intent::Commit(id, category, text) => worker.spawn(async move {
            finished(board.commit_task_text(&id, category, &text).await)
        }),
        Intent::Delete(id, category) => {
            worker.spawn(async move { finished(board.delete_task(&id, category).await) })
        }
        Intent::Move(id, from, to) => {
            worker.spawn(async move { finished(board.move_task(&id, from, to).await) })
        }
        Intent::SaveNote(draft) => {
            worker.spawn(async move { finished(notes.add_note(draft).await) })
        }
        Intent::DeleteNote(id) => {
            worker.spawn(async move { finished(notes.delete_note(&id).await) })
        }
    }
}
