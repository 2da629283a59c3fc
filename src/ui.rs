use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::future::Future;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tarefas::error::ServiceError;
use tarefas::filtering::FilterCriterion;
use tarefas::form::{FieldHandle, TaskForm};
use tarefas::sorting::{SortCriteria, SortSpec};
use tarefas::task::{Priority, Task, TaskId, TaskPatch};
use tarefas::TaskStore;
use tokio::runtime::Handle;

const TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModalStatus {
    Create,
    Edit(TaskId),
}

struct TaskModal {
    status: ModalStatus,
    form: TaskForm,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Page-level state. Task data lives only in the store; this holds the
/// controls, the selection and whatever modal is open.
pub struct Dashboard {
    store: TaskStore,
    runtime: Handle,
    sort: SortSpec,
    filter: FilterCriterion,
    selected: usize,
    modal: Option<TaskModal>,
    banner: Option<String>,
    alerts_tx: Sender<String>,
    alerts_rx: Receiver<String>,
}

impl Dashboard {
    pub fn new(store: TaskStore, runtime: Handle) -> Self {
        let (alerts_tx, alerts_rx) = mpsc::channel();
        let sort = store.sort_spec();
        let filter = store.filter_criterion();
        Self {
            store,
            runtime,
            sort,
            filter,
            selected: 0,
            modal: None,
            banner: None,
            alerts_tx,
            alerts_rx,
        }
    }

    /// Runs a store operation in the background; a failure ends up in the
    /// alert banner.
    fn spawn<F>(&self, operation: F)
    where
        F: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let alerts = self.alerts_tx.clone();
        self.runtime.spawn(async move {
            if let Err(err) = operation.await {
                let _ = alerts.send(err.feedback_message().to_string());
            }
        });
    }

    pub fn reload(&self) {
        let store = self.store.clone();
        self.spawn(async move { store.load().await });
    }

    fn drain_alerts(&mut self) {
        while let Ok(message) = self.alerts_rx.try_recv() {
            self.banner = Some(message);
        }
    }

    fn visible_tasks(&self) -> Vec<Task> {
        self.store.filtered_tasks()
    }

    fn selected_task(&self) -> Option<Task> {
        self.visible_tasks().get(self.selected).cloned()
    }

    pub fn handle_key(&mut self, key: KeyCode) -> Action {
        if self.modal.is_some() {
            self.handle_modal_key(key);
            return Action::Continue;
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Char('a') | KeyCode::Char('n') => {
                self.banner = None;
                self.modal = Some(TaskModal {
                    status: ModalStatus::Create,
                    form: TaskForm::empty(),
                });
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(task) = self.selected_task() {
                    self.banner = None;
                    self.modal = Some(TaskModal {
                        status: ModalStatus::Edit(task.id),
                        form: TaskForm::new(&task.name, task.priority),
                    });
                }
            }
            KeyCode::Char(' ') => {
                if let Some(task) = self.selected_task() {
                    let store = self.store.clone();
                    let sort = self.sort;
                    let patch = TaskPatch::completed(!task.is_completed);
                    self.spawn(async move { store.edit(task.id, patch, sort).await });
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(task) = self.selected_task() {
                    self.remove(task.id);
                }
            }
            KeyCode::Char('s') => {
                self.sort.criteria = self.sort.criteria.toggled();
                self.store.sort_tasks(self.sort);
            }
            KeyCode::Char('o') => {
                self.sort.order = self.sort.order.toggled();
                self.store.sort_tasks(self.sort);
            }
            KeyCode::Char('f') => {
                self.filter = self.filter.cycled();
                self.store.filter_tasks(self.filter);
                self.selected = 0;
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let count = self.visible_tasks().len();
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            _ => {}
        }
        Action::Continue
    }

    fn handle_modal_key(&mut self, key: KeyCode) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        match key {
            KeyCode::Esc => self.modal = None,
            KeyCode::Tab => modal.form.toggle_priority(),
            KeyCode::Backspace => modal.form.name.pop(),
            KeyCode::Char(ch) => modal.form.name.push(ch),
            KeyCode::Delete => {
                if let ModalStatus::Edit(task_id) = modal.status {
                    self.modal = None;
                    self.remove(task_id);
                }
            }
            KeyCode::Enter => {
                let Some(draft) = modal.form.submit() else {
                    return;
                };
                let status = modal.status;
                self.modal = None;
                let store = self.store.clone();
                let sort = self.sort;
                match status {
                    ModalStatus::Create => {
                        self.spawn(async move { store.create(draft, sort).await });
                    }
                    ModalStatus::Edit(task_id) => {
                        let patch = TaskPatch::from(draft);
                        self.spawn(async move { store.edit(task_id, patch, sort).await });
                    }
                }
            }
            _ => {}
        }
    }

    fn remove(&self, task_id: TaskId) {
        let store = self.store.clone();
        self.spawn(async move { store.remove(task_id).await });
    }

    fn draw(&mut self, f: &mut Frame) {
        let tasks = self.visible_tasks();
        if self.selected >= tasks.len() {
            self.selected = tasks.len().saturating_sub(1);
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(f.area());

        f.render_widget(self.header(), chunks[0]);

        let items: Vec<ListItem> = tasks.iter().map(task_item).collect();
        let list = List::new(items)
            .block(Block::default().title("Tasks").borders(Borders::ALL))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected((!tasks.is_empty()).then_some(self.selected));
        f.render_stateful_widget(list, chunks[1], &mut state);

        let banner = self.banner.as_deref().unwrap_or("");
        f.render_widget(
            Paragraph::new(banner).style(Style::default().fg(Color::Red)),
            chunks[2],
        );
        f.render_widget(
            Paragraph::new(
                "a new  e edit  space check  d remove  s sort  o order  f filter  r reload  q quit",
            )
            .style(Style::default().fg(Color::DarkGray)),
            chunks[3],
        );

        if let Some(modal) = &self.modal {
            render_modal(f, modal);
        }
    }

    fn header(&self) -> Paragraph<'static> {
        let order = match (self.sort.criteria, self.sort.is_ascending()) {
            (SortCriteria::Priority, false) => "high first",
            (SortCriteria::Priority, true) => "low first",
            (SortCriteria::Name, true) => "A-Z",
            (SortCriteria::Name, false) => "Z-A",
        };
        let mut spans = vec![
            Span::styled("Tarefas", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "  sort: {} ({})  filter: {}",
                self.sort.criteria, order, self.filter
            )),
        ];
        if self.store.is_loading() {
            spans.push(Span::styled("  loading...", Style::default().fg(Color::Yellow)));
        }
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
    }
}

fn task_item(task: &Task) -> ListItem<'static> {
    let check = if task.is_completed { "[x] " } else { "[ ] " };
    let priority_style = match task.priority {
        Priority::High => Style::default().fg(Color::Red),
        Priority::Low => Style::default().fg(Color::Green),
    };
    let name_style = if task.is_completed {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };
    ListItem::new(Line::from(vec![
        Span::raw(check),
        Span::styled(format!("{:<5}", task.priority.as_str()), priority_style),
        Span::raw(" "),
        Span::styled(task.name.clone(), name_style),
    ]))
}

fn render_modal(f: &mut Frame, modal: &TaskModal) {
    let title = match modal.status {
        ModalStatus::Create => "Create Task",
        ModalStatus::Edit(_) => "Edit Task",
    };
    let area = centered_rect(60, 9, f.area());
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Name: "),
            Span::styled(
                format!("{}_", modal.form.name.value()),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(format!("Priority: {}", modal.form.priority)),
        Line::from(""),
    ];
    if let Some(alert) = modal.form.name.alert() {
        lines.push(Line::from(Span::styled(
            alert.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    let help = match modal.status {
        ModalStatus::Create => "enter save  tab priority  esc cancel",
        ModalStatus::Edit(_) => "enter save  tab priority  del remove  esc cancel",
    };
    lines.push(Line::from(Span::styled(help, Style::default().fg(Color::DarkGray))));

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().title(title).borders(Borders::ALL)),
        area,
    );
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub fn run(store: TaskStore, runtime: Handle) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut dashboard = Dashboard::new(store, runtime);
    dashboard.reload();
    let result = run_app(&mut terminal, &mut dashboard);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, dashboard: &mut Dashboard) -> io::Result<()> {
    loop {
        dashboard.drain_alerts();
        terminal.draw(|f| dashboard.draw(f))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            if dashboard.handle_key(code) == Action::Quit {
                return Ok(());
            }
        }
    }
}
