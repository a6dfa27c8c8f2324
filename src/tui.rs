use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use apptrack::db::format_timestamp;
use apptrack::views::follow_up_message;
use apptrack::{Application, ApplicationFilter, ApplicationPatch, Database};

use crate::truncate;

/// Status hot-keys in the browser.
const STATUS_KEYS: [(char, &str); 7] = [
    ('w', "Wishlist"),
    ('a', "Applied"),
    ('p', "Phone Screen"),
    ('i', "Interview"),
    ('o', "Offer"),
    ('x', "Rejected"),
    ('g', "Ghosted"),
];

struct AppState {
    apps: Vec<Application>,
    selected: usize,
    scroll_offset: u16,
    show_message: bool,
    flash: Option<String>,
}

impl AppState {
    fn new(apps: Vec<Application>) -> Self {
        Self {
            apps,
            selected: 0,
            scroll_offset: 0,
            show_message: false,
            flash: None,
        }
    }

    fn current(&self) -> Option<&Application> {
        self.apps.get(self.selected)
    }

    fn next(&mut self) {
        if !self.apps.is_empty() && self.selected < self.apps.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Stores a new status for the selected application and refreshes the
    /// in-memory copy. The list keeps its order until the next launch.
    fn set_status(&mut self, db: &Database, status: &str) {
        let Some(id) = self.current().map(|a| a.id) else { return };

        let result = db
            .update(id, &ApplicationPatch::status(status))
            .and_then(|()| db.get(id));
        match result {
            Ok(Some(fresh)) => {
                self.apps[self.selected] = fresh;
                self.flash = Some(format!("#{} marked {}", id, status));
            }
            Ok(None) => self.flash = Some(format!("#{} no longer exists", id)),
            Err(e) => self.flash = Some(format!("Update failed: {}", e)),
        }
    }
}

pub fn run_browse(db: &Database, filter: &ApplicationFilter) -> Result<()> {
    let apps = db.read(filter)?;
    if apps.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = AppState::new(apps);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let prev_selected = state.selected;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('m') => {
                    state.show_message = !state.show_message;
                    state.scroll_offset = 0;
                }
                KeyCode::Char(c) => {
                    if let Some((_, status)) = STATUS_KEYS.iter().find(|(k, _)| *k == c) {
                        state.set_status(db, status);
                    }
                }
                _ => {}
            }
            if state.selected != prev_selected {
                list_state.select(Some(state.selected));
                state.flash = None;
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: application list
    let items: Vec<ListItem> = state
        .apps
        .iter()
        .map(|app| {
            let status = app.status.as_deref().unwrap_or("");
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<3}", status_icon(status)), status_style(status)),
                Span::raw(format!(
                    "#{:<4} {} | {}",
                    app.id,
                    truncate(&app.company, 20),
                    truncate(&app.role_title, 24)
                )),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Applications ({}) ", state.apps.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail or follow-up preview
    let (title, body) = if state.show_message {
        (" Follow-up ", build_message(state))
    } else {
        (" Detail ", build_detail(state))
    };
    let detail_widget = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer: last action or key help
    let footer = match &state.flash {
        Some(msg) => Paragraph::new(format!(" {}", msg)).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(
            " j/k:navigate  J/K:scroll  w/a/p/i/o/x/g:set status  m:follow-up  q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[1]);
}

fn status_icon(status: &str) -> &'static str {
    match status {
        "Wishlist" | "Draft" => ".",
        "Applied" => "+",
        "Online Assessment" | "Phone Screen" | "Interview" | "Onsite/Final" => "*",
        "Offer" => "$",
        "Rejected" => "x",
        "Ghosted" | "Paused" => "-",
        _ => "?",
    }
}

fn status_style(status: &str) -> Style {
    match status {
        "Applied" => Style::default().fg(Color::Cyan),
        "Online Assessment" | "Phone Screen" | "Interview" | "Onsite/Final" => {
            Style::default().fg(Color::Yellow)
        }
        "Offer" => Style::default().fg(Color::Green),
        "Rejected" => Style::default().fg(Color::Red),
        "Ghosted" | "Paused" => Style::default().fg(Color::DarkGray),
        _ => Style::default(),
    }
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(app) = state.current() else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        app.role_title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", app.company)));

    let status = app.status.as_deref().unwrap_or("(none)");
    lines.push(Line::from(Span::styled(
        format!("Status: {}", status),
        status_style(status),
    )));
    lines.push(Line::from(""));

    let fields = [
        ("Location", app.location.clone()),
        ("Link", app.job_link.clone()),
        ("Source", app.source.clone()),
        ("Priority", app.priority.clone()),
        ("Deadline", app.deadline.map(|d| d.to_string())),
        ("Applied", app.date_applied.map(|d| d.to_string())),
        ("Follow up", app.follow_up_date.map(|d| d.to_string())),
        ("Recruiter", app.recruiter_name.clone()),
        ("Email", app.recruiter_email.clone()),
        ("Updated", app.last_updated.map(format_timestamp)),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<10}", label), Style::default().fg(Color::Cyan)),
                Span::raw(value),
            ]));
        }
    }

    lines.push(Line::from(""));
    match &app.notes {
        Some(notes) => {
            lines.push(Line::from(Span::styled(
                "NOTES",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for line in textwrap::fill(notes, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No notes)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    Text::from(lines)
}

fn build_message(state: &AppState) -> Text<'static> {
    match state.current() {
        Some(app) => Text::from(follow_up_message(app, None)),
        None => Text::raw("No application selected"),
    }
}
