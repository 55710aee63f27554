// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use mprsummary_app::{
    COUNT_COLUMN_LABEL, FetchKind, FetchRequest, STATUS_COLUMN_LABEL, Selection, TOTAL_ROW_LABEL,
    Theme, Viewport, WIDGET_NAME, WidgetCommand, WidgetEvent, WidgetState,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::collections::VecDeque;
use std::io;
use std::ops::Range;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const NO_RESULTS: &str = "No results available";
const SELECTOR_HEIGHT: u16 = 8;

/// Source of backend data for the widget. `fetch` blocks; the event loop only
/// ever calls `spawn_fetch`, which implementations override to run off the UI
/// thread.
pub trait WidgetRuntime {
    fn fetch(&mut self, request: &FetchRequest) -> WidgetCommand;

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let completion = self.fetch(&request);
        tx.send(InternalEvent::FetchCompleted(completion))
            .map_err(|_| anyhow::anyhow!("fetch event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    FetchCompleted(WidgetCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Focus {
    #[default]
    Products,
    Versions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    text: Color,
    accent: Color,
    muted: Color,
    warn: Color,
    background: Color,
}

impl Palette {
    const fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                text: Color::White,
                accent: Color::Cyan,
                muted: Color::DarkGray,
                warn: Color::Yellow,
                background: Color::Reset,
            },
            Theme::Light => Self {
                text: Color::Black,
                accent: Color::Blue,
                muted: Color::Gray,
                warn: Color::Red,
                background: Color::White,
            },
        }
    }

    fn base(self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    focus: Focus,
    product_cursor: usize,
    version_cursor: usize,
    theme: Theme,
    viewport: Viewport,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: WidgetRuntime>(
    state: &mut WidgetState,
    runtime: &mut R,
    theme: Theme,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        theme,
        ..ViewData::default()
    };
    if let Ok(size) = terminal.size() {
        view_data.viewport = Viewport {
            width: size.width,
            height: size.height,
        };
    }
    let (internal_tx, internal_rx) = mpsc::channel();

    tracing::info!(widget = WIDGET_NAME, theme = theme.as_str(), "widget mounted");
    let events = state.dispatch(WidgetCommand::LoadProducts);
    apply_events(state, runtime, &mut view_data, &internal_tx, events);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let next = event::poll(Duration::from_millis(120))
            .context("poll event")
            .and_then(|ready| {
                if ready {
                    event::read().map(Some).context("read event")
                } else {
                    Ok(None)
                }
            });
        match next {
            Ok(Some(Event::Key(key))) => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(Some(Event::Resize(width, height))) => {
                view_data.viewport = Viewport { width, height };
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Dispatch `command` and run every fetch it triggers to completion on the
/// calling thread, including chained ones. Returns all events in order.
pub fn settle<R: WidgetRuntime>(
    state: &mut WidgetState,
    runtime: &mut R,
    command: WidgetCommand,
) -> Vec<WidgetEvent> {
    let mut queue: VecDeque<WidgetEvent> = state.dispatch(command).into();
    let mut seen = Vec::new();
    while let Some(event) = queue.pop_front() {
        if let WidgetEvent::Fetch(request) = &event {
            let completion = runtime.fetch(request);
            queue.extend(state.dispatch(completion));
        }
        seen.push(event);
    }
    seen
}

fn process_internal_events<R: WidgetRuntime>(
    state: &mut WidgetState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(WidgetCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::FetchCompleted(command) => {
                let events = state.dispatch(command);
                apply_events(state, runtime, view_data, tx, events);
            }
        }
    }
}

fn apply_events<R: WidgetRuntime>(
    state: &mut WidgetState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    events: Vec<WidgetEvent>,
) {
    let mut queue: VecDeque<WidgetEvent> = events.into();
    while let Some(event) = queue.pop_front() {
        match event {
            WidgetEvent::Fetch(request) => {
                let kind = request.kind();
                let token = request.token();
                if let Err(error) = runtime.spawn_fetch(request, tx.clone()) {
                    queue.extend(state.dispatch(WidgetCommand::ProviderFault {
                        kind,
                        token,
                        message: format!("{error:#}"),
                    }));
                }
            }
            WidgetEvent::ProductsReplaced(count) => {
                view_data.product_cursor = view_data.product_cursor.min(count.saturating_sub(1));
            }
            WidgetEvent::VersionsReplaced(_) => {
                view_data.version_cursor = 0;
            }
            WidgetEvent::SelectionRejected(reason) => {
                emit_status(state, view_data, tx, reason);
            }
            WidgetEvent::InvalidStatusDropped(count) => {
                tracing::warn!(dropped = count, "ignored records with an invalid doc status");
            }
            WidgetEvent::StaleResponseDropped { kind, token } => {
                tracing::debug!(endpoint = kind.as_str(), token = token.get(), "stale response");
            }
            WidgetEvent::ProviderDegraded(message) => {
                tracing::warn!("provider degraded: {message}");
            }
            WidgetEvent::SelectionChanged(Selection::NoProduct) => {
                view_data.focus = Focus::Products;
                view_data.version_cursor = 0;
            }
            WidgetEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(tx, view_data.status_token);
            }
            WidgetEvent::SelectionChanged(_)
            | WidgetEvent::TableCleared
            | WidgetEvent::RowsUpdated
            | WidgetEvent::TotalUpdated(_)
            | WidgetEvent::StatusCleared => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut WidgetState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(WidgetCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: WidgetRuntime>(
    state: &mut WidgetState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if view_data.help_visible {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            view_data.help_visible = false;
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Tab
        | KeyCode::BackTab
        | KeyCode::Left
        | KeyCode::Right
        | KeyCode::Char('h')
        | KeyCode::Char('l') => {
            view_data.focus = match view_data.focus {
                Focus::Products => Focus::Versions,
                Focus::Versions => Focus::Products,
            };
        }
        KeyCode::Down | KeyCode::Char('j') => move_cursor(state, view_data, 1),
        KeyCode::Up | KeyCode::Char('k') => move_cursor(state, view_data, -1),
        KeyCode::Home | KeyCode::Char('g') => move_cursor(state, view_data, isize::MIN),
        KeyCode::End | KeyCode::Char('G') => move_cursor(state, view_data, isize::MAX),
        KeyCode::Enter => activate_selection(state, runtime, view_data, internal_tx),
        KeyCode::Char('r') => {
            let events = state.dispatch(WidgetCommand::LoadProducts);
            apply_events(state, runtime, view_data, internal_tx, events);
            emit_status(state, view_data, internal_tx, "reloading products");
        }
        KeyCode::Char('R') => {
            let events = state.dispatch(WidgetCommand::RefreshCounts);
            apply_events(state, runtime, view_data, internal_tx, events);
        }
        KeyCode::Char('c') => {
            let events = state.dispatch(WidgetCommand::ClearTable);
            apply_events(state, runtime, view_data, internal_tx, events);
            emit_status(state, view_data, internal_tx, "table cleared");
        }
        _ => {}
    }
    false
}

fn move_cursor(state: &WidgetState, view_data: &mut ViewData, delta: isize) {
    let (cursor, len) = match view_data.focus {
        Focus::Products => (&mut view_data.product_cursor, state.products.len()),
        Focus::Versions => (&mut view_data.version_cursor, state.versions.len()),
    };
    if len == 0 {
        *cursor = 0;
        return;
    }
    let last = len - 1;
    *cursor = cursor.saturating_add_signed(delta).min(last);
}

fn activate_selection<R: WidgetRuntime>(
    state: &mut WidgetState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let command = match view_data.focus {
        Focus::Products => state
            .products
            .get(view_data.product_cursor)
            .cloned()
            .map(WidgetCommand::SelectProduct),
        Focus::Versions => state
            .versions
            .get(view_data.version_cursor)
            .cloned()
            .map(WidgetCommand::SelectVersion),
    };

    let Some(command) = command else {
        let hint = match view_data.focus {
            Focus::Products => "no products loaded; press r to reload",
            Focus::Versions => "no versions loaded; pick a product first",
        };
        emit_status(state, view_data, internal_tx, hint);
        return;
    };

    let selecting_product = matches!(command, WidgetCommand::SelectProduct(_));
    let events = state.dispatch(command);
    let accepted = events
        .iter()
        .any(|event| matches!(event, WidgetEvent::SelectionChanged(_)));
    apply_events(state, runtime, view_data, internal_tx, events);

    if accepted && selecting_product {
        view_data.focus = Focus::Versions;
        view_data.version_cursor = 0;
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &WidgetState, view_data: &ViewData) {
    let palette = Palette::for_theme(view_data.theme);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(SELECTOR_HEIGHT),
            Constraint::Min(9),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state, view_data)).block(
        Block::default()
            .title(WIDGET_NAME)
            .borders(Borders::ALL)
            .style(palette.base()),
    );
    frame.render_widget(header, layout[0]);

    let selectors = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[1]);
    let visible_rows = usize::from(SELECTOR_HEIGHT.saturating_sub(2));

    let product_labels = state
        .products
        .iter()
        .map(|product| product.as_str())
        .collect::<Vec<_>>();
    render_selector(
        frame,
        selectors[0],
        palette,
        "product",
        &selector_lines(
            &product_labels,
            view_data.product_cursor,
            state.selection.product().map(|product| product.as_str()),
            view_data.focus == Focus::Products,
            visible_rows,
        ),
        view_data.focus == Focus::Products,
    );

    let version_labels = state
        .versions
        .iter()
        .map(|version| version.as_str())
        .collect::<Vec<_>>();
    render_selector(
        frame,
        selectors[1],
        palette,
        "version",
        &selector_lines(
            &version_labels,
            view_data.version_cursor,
            state.selection.version().map(|version| version.as_str()),
            view_data.focus == Focus::Versions,
            visible_rows,
        ),
        view_data.focus == Focus::Versions,
    );

    render_table(frame, layout[2], palette, state);

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(palette.warn).bg(palette.background))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if view_data.help_visible {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text()).block(
            Block::default()
                .title("help")
                .borders(Borders::ALL)
                .style(palette.base()),
        );
        frame.render_widget(help, area);
    }
}

fn render_selector(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    palette: Palette,
    title: &str,
    lines: &[String],
    focused: bool,
) {
    let border = if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.muted)
    };
    let text = lines
        .iter()
        .map(|line| {
            if focused && line.starts_with('>') {
                Line::from(Span::styled(
                    line.clone(),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(line.clone())
            }
        })
        .collect::<Vec<_>>();

    let widget = Paragraph::new(text).block(
        Block::default()
            .title(title.to_owned())
            .borders(Borders::ALL)
            .border_style(border)
            .style(palette.base()),
    );
    frame.render_widget(widget, area);
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, palette: Palette, state: &WidgetState) {
    let rows = summary_rows(state)
        .into_iter()
        .map(|(label, count)| {
            let style = if label == TOTAL_ROW_LABEL {
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            Row::new(vec![Cell::from(label), Cell::from(count)]).style(style)
        })
        .collect::<Vec<_>>();

    let header = Row::new(vec![
        Cell::from(STATUS_COLUMN_LABEL),
        Cell::from(COUNT_COLUMN_LABEL),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let table = Table::new(rows, [Constraint::Percentage(75), Constraint::Percentage(25)])
        .header(header)
        .block(
            Block::default()
                .title(table_title(state))
                .borders(Borders::ALL)
                .style(palette.base()),
        );
    frame.render_widget(table, area);
}

fn header_text(state: &WidgetState, view_data: &ViewData) -> String {
    let provider = if state.provider_fault {
        "degraded"
    } else {
        "ok"
    };
    let mut parts = vec![
        format!("provider: {provider}"),
        format!("theme: {}", view_data.theme.as_str()),
        format!(
            "{}x{}",
            view_data.viewport.width, view_data.viewport.height
        ),
    ];
    if state.has_pending_fetch() {
        parts.push("loading".to_owned());
    }
    parts.join(" | ")
}

/// Lines for one selector pane. `>` marks the cursor in the focused pane and
/// `*` the current selection; the window scrolls to keep the cursor visible.
fn selector_lines(
    items: &[&str],
    cursor: usize,
    selected: Option<&str>,
    focused: bool,
    visible_rows: usize,
) -> Vec<String> {
    if items.is_empty() {
        return vec![NO_RESULTS.to_owned()];
    }

    visible_window(items.len(), cursor, visible_rows)
        .map(|index| {
            let item = items[index];
            let pointer = if focused && index == cursor { '>' } else { ' ' };
            let mark = if selected == Some(item) { '*' } else { ' ' };
            format!("{pointer}{mark} {item}")
        })
        .collect()
}

fn visible_window(len: usize, cursor: usize, height: usize) -> Range<usize> {
    if height == 0 || len <= height {
        return 0..len;
    }
    let cursor = cursor.min(len - 1);
    let start = cursor.saturating_sub(height - 1).min(len - height);
    start..start + height
}

fn table_title(state: &WidgetState) -> String {
    match &state.selection {
        Selection::NoProduct => format!("MPR table: {NO_RESULTS}"),
        Selection::ProductSelected { product } => format!("MPR table: {product} (pick a version)"),
        Selection::ProductAndVersionSelected { product, version } => {
            let loading =
                state.is_loading(FetchKind::Counts) || state.is_loading(FetchKind::Total);
            if loading {
                format!("MPR table: {product} {version} (loading)")
            } else {
                format!("MPR table: {product} {version}")
            }
        }
    }
}

/// Display rows: the five statuses in fixed order, then the total row when it
/// is enabled.
pub fn summary_rows(state: &WidgetState) -> Vec<(String, String)> {
    let mut rows = state
        .table
        .as_pairs()
        .into_iter()
        .map(|(label, count)| (label.to_owned(), count.to_string()))
        .collect::<Vec<_>>();
    if state.show_total {
        rows.push((TOTAL_ROW_LABEL.to_owned(), state.table.total().to_string()));
    }
    rows
}

/// Plain-text rendering of the table for non-interactive output.
pub fn render_summary_text(state: &WidgetState) -> String {
    let rows = summary_rows(state);
    let width = rows
        .iter()
        .map(|(label, _)| label.len())
        .chain([STATUS_COLUMN_LABEL.len()])
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    if let Selection::ProductAndVersionSelected { product, version } = &state.selection {
        out.push_str(&format!("{product} {version}\n"));
    }
    out.push_str(&format!(
        "{STATUS_COLUMN_LABEL:<width$}  {COUNT_COLUMN_LABEL}\n"
    ));
    for (label, count) in rows {
        out.push_str(&format!("{label:<width$}  {count}\n"));
    }
    out
}

fn status_text(state: &WidgetState) -> String {
    if let Some(line) = &state.status_line {
        return line.clone();
    }
    "j/k move | tab switch | enter select | r reload | R refresh | c clear | ? help | q quit"
        .to_owned()
}

fn help_overlay_text() -> String {
    [
        "j / k, up / down   move cursor",
        "g / G              first / last option",
        "tab, h / l         switch product / version pane",
        "enter              select option under cursor",
        "r                  reload product list",
        "R                  refresh counts for the selection",
        "c                  clear the table",
        "?                  toggle help",
        "q, esc, ctrl+q     quit",
    ]
    .join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
