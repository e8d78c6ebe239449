use std::fs::OpenOptions;
use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use once_cell::sync::{Lazy, OnceCell};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};
use regex::Regex;
use textwrap::wrap;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::bsky::{self, PostRecord};
use crate::data::{self, FilterOptions, SearchService};
use crate::media::Thumbnail;
use crate::table::{ResultRow, ResultTable, SortColumn, SortDirection, COLUMN_TITLES};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_STATUS_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SELECTED_BG: Color = Color::Rgb(69, 71, 90);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const DEBUG_LOG_ENV: &str = "SKYSEARCH_DEBUG_LOG";

/// Appends a line to the debug log file named by `SKYSEARCH_DEBUG_LOG`.
/// Silently does nothing when the variable is unset; stderr is off
/// limits while the alternate screen is active.
pub fn debug_log(message: impl AsRef<str>) {
    static WRITER: OnceCell<Option<Mutex<std::fs::File>>> = OnceCell::new();
    let writer = WRITER.get_or_init(|| {
        std::env::var(DEBUG_LOG_ENV).ok().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(Mutex::new)
                .ok()
        })
    });
    if let Some(writer) = writer {
        if let Ok(mut file) = writer.lock() {
            let _ = writeln!(file, "{}", message.as_ref());
        }
    }
}

/// Input focus cycle, top-left to bottom-right, ending on the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Query,
    Limit,
    MinLikes,
    MaxLikes,
    RequireImage,
    RequireVideo,
    Results,
}

const FOCUS_ORDER: [Focus; 7] = [
    Focus::Query,
    Focus::Limit,
    Focus::MinLikes,
    Focus::MaxLikes,
    Focus::RequireImage,
    Focus::RequireVideo,
    Focus::Results,
];

impl Focus {
    fn next(self) -> Focus {
        let index = FOCUS_ORDER.iter().position(|f| *f == self).unwrap_or(0);
        FOCUS_ORDER[(index + 1) % FOCUS_ORDER.len()]
    }

    fn prev(self) -> Focus {
        let index = FOCUS_ORDER.iter().position(|f| *f == self).unwrap_or(0);
        FOCUS_ORDER[(index + FOCUS_ORDER.len() - 1) % FOCUS_ORDER.len()]
    }
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

enum AsyncResponse {
    Search {
        query: String,
        result: Result<Vec<PostRecord>>,
    },
}

pub struct Options {
    pub status_message: String,
    pub search_service: Option<Arc<dyn SearchService>>,
    pub default_limit: u32,
    pub config_path: String,
}

pub struct Model {
    query: String,
    limit_input: String,
    min_likes_input: String,
    max_likes_input: String,
    require_image: bool,
    require_video: bool,
    focus: Focus,
    table: Option<ResultTable>,
    table_state: TableState,
    status_message: String,
    config_path: String,
    default_limit: u32,
    search_service: Option<Arc<dyn SearchService>>,
    searches_in_flight: usize,
    needs_redraw: bool,
    spinner: Spinner,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    likes_header_area: Option<Rect>,
    reposts_header_area: Option<Rect>,
    results_area: Option<Rect>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Model {
            query: String::new(),
            limit_input: opts.default_limit.to_string(),
            min_likes_input: String::new(),
            max_likes_input: String::new(),
            require_image: false,
            require_video: false,
            focus: Focus::Query,
            table: None,
            table_state: TableState::default(),
            status_message: opts.status_message,
            config_path: opts.config_path,
            default_limit: opts.default_limit,
            search_service: opts.search_service,
            searches_in_flight: 0,
            needs_redraw: true,
            spinner: Spinner::new(),
            response_tx,
            response_rx,
            likes_header_area: None,
            reposts_header_area: None,
            results_area: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {err}");
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.status_message = format!("Error: {err}");
                            self.mark_dirty();
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.searches_in_flight > 0
    }

    // -----------------------------------------------------------------
    // Input handling
    // -----------------------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            return Ok(true);
        }

        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                self.mark_dirty();
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                self.mark_dirty();
            }
            KeyCode::Enter => match self.focus {
                Focus::Results => self.open_selected_post()?,
                _ => self.start_search(),
            },
            code => match self.focus {
                Focus::Query => self.edit_text_input(code, |model| &mut model.query),
                Focus::Limit => self.edit_numeric_input(code, |model| &mut model.limit_input),
                Focus::MinLikes => {
                    self.edit_numeric_input(code, |model| &mut model.min_likes_input)
                }
                Focus::MaxLikes => {
                    self.edit_numeric_input(code, |model| &mut model.max_likes_input)
                }
                Focus::RequireImage => {
                    if code == KeyCode::Char(' ') {
                        self.require_image = !self.require_image;
                        self.mark_dirty();
                    }
                }
                Focus::RequireVideo => {
                    if code == KeyCode::Char(' ') {
                        self.require_video = !self.require_video;
                        self.mark_dirty();
                    }
                }
                Focus::Results => return self.handle_results_key(code),
            },
        }

        Ok(false)
    }

    fn edit_text_input(&mut self, code: KeyCode, field: fn(&mut Model) -> &mut String) {
        match code {
            KeyCode::Char(c) => {
                field(self).push(c);
                self.mark_dirty();
            }
            KeyCode::Backspace => {
                field(self).pop();
                self.mark_dirty();
            }
            _ => {}
        }
    }

    fn edit_numeric_input(&mut self, code: KeyCode, field: fn(&mut Model) -> &mut String) {
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                field(self).push(c);
                self.mark_dirty();
            }
            KeyCode::Backspace => {
                field(self).pop();
                self.mark_dirty();
            }
            _ => {}
        }
    }

    fn handle_results_key(&mut self, code: KeyCode) -> Result<bool> {
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('l') => self.toggle_column(SortColumn::Likes),
            KeyCode::Char('r') => self.toggle_column(SortColumn::Reposts),
            KeyCode::Char('o') => self.open_selected_post()?,
            KeyCode::Char('p') => self.open_selected_profile()?,
            _ => {}
        }
        Ok(false)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return Ok(());
        }
        let (col, row) = (mouse.column, mouse.row);

        if self
            .likes_header_area
            .is_some_and(|area| rect_contains(area, col, row))
        {
            self.toggle_column(SortColumn::Likes);
            return Ok(());
        }
        if self
            .reposts_header_area
            .is_some_and(|area| rect_contains(area, col, row))
        {
            self.toggle_column(SortColumn::Reposts);
            return Ok(());
        }

        if let Some(area) = self.results_area {
            if rect_contains(area, col, row) {
                self.focus = Focus::Results;
                // Header occupies the first inner row; body rows are two
                // lines tall.
                let body_top = area.y.saturating_add(2);
                if row >= body_top {
                    let index = usize::from(row - body_top) / 2;
                    let len = self.table.as_ref().map(ResultTable::len).unwrap_or(0);
                    if index < len {
                        self.table_state.select(Some(index));
                    }
                }
                self.mark_dirty();
            }
        }
        Ok(())
    }

    fn move_selection(&mut self, delta: i64) {
        let Some(table) = &self.table else {
            return;
        };
        if table.is_empty() {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as i64;
        let last = table.len() as i64 - 1;
        let next = (current + delta).clamp(0, last);
        self.table_state.select(Some(next as usize));
        self.mark_dirty();
    }

    fn toggle_column(&mut self, column: SortColumn) {
        let Some(table) = &mut self.table else {
            return;
        };
        table.toggle_sort(column);
        self.status_message = match table.sort_state() {
            Some((active, SortDirection::Descending)) => {
                format!("Sorted by {} (descending)", active.title().to_lowercase())
            }
            Some((active, SortDirection::Ascending)) => {
                format!("Sorted by {} (ascending)", active.title().to_lowercase())
            }
            None => "Restored search order".to_string(),
        };
        self.mark_dirty();
    }

    fn selected_row(&self) -> Option<&ResultRow> {
        let table = self.table.as_ref()?;
        table.rows().get(self.table_state.selected()?)
    }

    fn open_selected_post(&mut self) -> Result<()> {
        if let Some(row) = self.selected_row() {
            let url = row.post_url.clone();
            webbrowser::open(&url)?;
            self.status_message = format!("Opened {url}");
            self.mark_dirty();
        }
        Ok(())
    }

    fn open_selected_profile(&mut self) -> Result<()> {
        if let Some(row) = self.selected_row() {
            let url = row.profile_url.clone();
            webbrowser::open(&url)?;
            self.status_message = format!("Opened {url}");
            self.mark_dirty();
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------

    fn start_search(&mut self) {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            self.status_message = "Enter a search query first.".to_string();
            self.mark_dirty();
            return;
        }
        let Some(service) = self.search_service.clone() else {
            self.status_message = "Search is unavailable: no client configured.".to_string();
            self.mark_dirty();
            return;
        };

        let limit = parse_limit(&self.limit_input, self.default_limit);
        self.limit_input = limit.to_string();
        self.searches_in_flight += 1;
        self.status_message = format!("Searching for \"{query}\"…");
        self.mark_dirty();

        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.search(&query, limit);
            let _ = tx.send(AsyncResponse::Search { query, result });
        });
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn current_filters(&self) -> FilterOptions {
        FilterOptions {
            min_likes: parse_count_input(&self.min_likes_input),
            max_likes: parse_count_input(&self.max_likes_input),
            require_image: self.require_image,
            require_video: self.require_video,
        }
    }

    // Responses apply in arrival order; a stale search that resolves
    // after a newer one simply overwrites the table. One in-flight
    // search at a time is the expected case, not an enforced one.
    fn handle_async_response(&mut self, message: AsyncResponse) {
        let AsyncResponse::Search { query, result } = message;
        self.searches_in_flight = self.searches_in_flight.saturating_sub(1);

        match result {
            Err(err) => {
                debug_log(format!("search \"{query}\" failed: {err:#}"));
                self.table = None;
                self.table_state.select(None);
                self.status_message = "Search failed.".to_string();
            }
            Ok(posts) if posts.is_empty() => {
                self.table = None;
                self.table_state.select(None);
                self.status_message = format!("No results for \"{query}\".");
            }
            Ok(posts) => {
                let fetched = posts.len();
                let filters = self.current_filters();
                let limit = parse_limit(&self.limit_input, self.default_limit);
                let kept = data::classify_and_filter(posts, &filters, limit);

                if kept.is_empty() {
                    self.table = None;
                    self.table_state.select(None);
                    self.status_message =
                        format!("No results for \"{query}\" match the current filters.");
                } else {
                    let shown = kept.len();
                    let rows: Vec<ResultRow> = kept
                        .iter()
                        .map(|(post, info)| ResultRow::new(post, info.clone()))
                        .collect();
                    self.table = Some(ResultTable::new(rows));
                    self.table_state.select(Some(0));
                    self.focus = Focus::Results;
                    self.status_message = if shown < fetched && filters.is_active() {
                        format!("{shown} of {fetched} results for \"{query}\" after filters.")
                    } else {
                        format!("{shown} results for \"{query}\".")
                    };
                }
            }
        }
        self.mark_dirty();
    }

    // -----------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(8),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_status(frame, layout[0]);
        self.draw_query(frame, layout[1]);
        self.draw_filters(frame, layout[2]);
        self.draw_results(frame, layout[3]);
        self.draw_detail(frame, layout[4]);
        self.draw_footer(frame, layout[5]);
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let status_text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_STATUS_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status, area);
    }

    fn draw_query(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.focus == Focus::Query;
        let inner_width = usize::from(area.width.saturating_sub(3));
        let mut value = visible_tail(&self.query, inner_width).to_string();
        if focused {
            value.push('▏');
        }
        let input = Paragraph::new(value)
            .style(Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_BG))
            .block(pane_block("Search", focused));
        frame.render_widget(input, area);
    }

    fn draw_filters(&self, frame: &mut Frame<'_>, area: Rect) {
        let field = |label: &str, value: &str, focus: Focus| -> Vec<Span<'static>> {
            let focused = self.focus == focus;
            let value_style = if focused {
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            let shown = if value.is_empty() && !focused {
                "·".to_string()
            } else if focused {
                format!("{value}▏")
            } else {
                value.to_string()
            };
            vec![
                Span::styled(
                    format!("{label} "),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
                Span::styled(shown, value_style),
                Span::raw("   "),
            ]
        };
        let checkbox = |label: &str, checked: bool, focus: Focus| -> Vec<Span<'static>> {
            let focused = self.focus == focus;
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if focused {
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            vec![
                Span::styled(format!("{mark} "), style),
                Span::styled(
                    format!("{label}   "),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
            ]
        };

        let mut spans = Vec::new();
        spans.extend(field("Limit", &self.limit_input, Focus::Limit));
        spans.extend(field("Min likes", &self.min_likes_input, Focus::MinLikes));
        spans.extend(field("Max likes", &self.max_likes_input, Focus::MaxLikes));
        spans.extend(checkbox("Images", self.require_image, Focus::RequireImage));
        spans.extend(checkbox("Video", self.require_video, Focus::RequireVideo));

        let focused = matches!(
            self.focus,
            Focus::Limit | Focus::MinLikes | Focus::MaxLikes | Focus::RequireImage | Focus::RequireVideo
        );
        let filters = Paragraph::new(Line::from(spans))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .block(pane_block("Filters", focused));
        frame.render_widget(filters, area);
    }

    fn draw_results(&mut self, frame: &mut Frame<'_>, area: Rect) {
        self.results_area = Some(area);
        let focused = self.focus == Focus::Results;
        let block = pane_block("Results", focused);

        // Collect owned rows and indicator glyphs first so the borrow of
        // self.table ends before the header areas are recorded.
        let Some((likes_mark, reposts_mark, rows)) = self.table.as_ref().map(|table| {
            (
                table.sort_indicator(SortColumn::Likes),
                table.sort_indicator(SortColumn::Reposts),
                table
                    .rows()
                    .iter()
                    .map(result_table_row)
                    .collect::<Vec<Row<'static>>>(),
            )
        }) else {
            self.likes_header_area = None;
            self.reposts_header_area = None;
            let placeholder = Paragraph::new(
                "Type a query and press Enter to search Bluesky.\n\
                 Tab moves between fields; Esc quits.",
            )
            .style(Style::default().fg(COLOR_TEXT_SECONDARY).bg(COLOR_PANEL_BG))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block);
            frame.render_widget(placeholder, area);
            return;
        };

        let inner_width = area.width.saturating_sub(2);
        let widths = column_widths(inner_width);
        self.record_header_areas(area, &widths);

        let header = Row::new(vec![
            Cell::from(COLUMN_TITLES[0]),
            Cell::from(COLUMN_TITLES[1]),
            Cell::from(format!("{} {}", COLUMN_TITLES[2], likes_mark)),
            Cell::from(format!("{} {}", COLUMN_TITLES[3], reposts_mark)),
        ])
        .style(
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        );

        let constraints: Vec<Constraint> =
            widths.iter().map(|w| Constraint::Length(*w)).collect();
        let widget = Table::new(rows, constraints)
            .header(header)
            .block(block)
            .style(Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_BG))
            .highlight_style(Style::default().bg(COLOR_SELECTED_BG));
        frame.render_stateful_widget(widget, area, &mut self.table_state);
    }

    fn record_header_areas(&mut self, area: Rect, widths: &[u16; 4]) {
        // Mirrors the fixed-length column layout: border, then columns
        // separated by single spacing cells.
        let header_y = area.y.saturating_add(1);
        let mut x = area.x.saturating_add(1);
        let mut areas = [Rect::default(); 4];
        for (index, width) in widths.iter().enumerate() {
            areas[index] = Rect::new(x, header_y, *width, 1);
            x = x.saturating_add(*width).saturating_add(1);
        }
        self.likes_header_area = Some(areas[2]);
        self.reposts_header_area = Some(areas[3]);
    }

    fn draw_detail(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = pane_block("Post", false);
        let Some(row) = self.selected_row() else {
            frame.render_widget(
                Paragraph::new("")
                    .style(Style::default().bg(COLOR_PANEL_BG))
                    .block(block),
                area,
            );
            return;
        };

        let width = usize::from(area.width.saturating_sub(2)).max(20);
        let mut lines: Vec<Line<'_>> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled(
                row.author_name.clone(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  @{}", row.author_handle),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
            Span::styled(
                format!("  ❤️ {}  🔄 {}", row.likes, row.reposts),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]));
        for wrapped in wrap(&row.full_text, width) {
            lines.push(Line::from(Span::styled(
                wrapped.into_owned(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )));
        }
        for line in media_detail_lines(row) {
            lines.push(line);
        }

        let detail = Paragraph::new(Text::from(lines))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .block(block);
        frame.render_widget(detail, area);
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let hints = match self.focus {
            Focus::Results => {
                "j/k select · l/r sort likes/reposts · Enter/o open post · p profile · q quit"
            }
            Focus::RequireImage | Focus::RequireVideo => {
                "Space toggle · Tab next field · Enter search · Esc quit"
            }
            _ => "Type to edit · Tab next field · Enter search · Esc quit",
        };
        let footer = Paragraph::new(format!("{hints}  ·  config: {}", self.config_path))
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, area);
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        COLOR_BORDER_FOCUSED
    } else {
        COLOR_BORDER_IDLE
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
        .style(Style::default().bg(COLOR_PANEL_BG))
}

/// Profile 25%, post 45%, counts 15% each, computed in cells so mouse
/// hit testing can reuse the exact widths.
fn column_widths(inner_width: u16) -> [u16; 4] {
    let spacing = 3; // three gaps between four columns
    let usable = inner_width.saturating_sub(spacing);
    let profile = usable / 4;
    let likes = usable * 3 / 20;
    let reposts = likes;
    let post = usable
        .saturating_sub(profile)
        .saturating_sub(likes)
        .saturating_sub(reposts);
    [profile, post, likes, reposts]
}

fn result_table_row(row: &ResultRow) -> Row<'static> {
    let profile = Text::from(vec![
        Line::from(Span::styled(
            row.author_name.clone(),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )),
        Line::from(Span::styled(
            format!("@{}", row.author_handle),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
    ]);
    let content = Text::from(vec![
        Line::from(Span::raw(row.text.clone())),
        Line::from(Span::styled(
            media_summary(row),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )),
    ]);
    Row::new(vec![
        Cell::from(profile),
        Cell::from(content),
        Cell::from(format!("❤️ {}", row.likes)),
        Cell::from(format!("🔄 {}", row.reposts)),
    ])
    .height(2)
}

/// One-line media marker strip for a table cell: an image count and a
/// video icon when present.
fn media_summary(row: &ResultRow) -> String {
    let mut parts = Vec::new();
    if !row.media.images.is_empty() {
        parts.push(format!("🖼 ×{}", row.media.images.len()));
    }
    match &row.media.thumbnail {
        Thumbnail::None if row.media.is_video => parts.push("🎬".to_string()),
        Thumbnail::Url(_) => parts.push("▶️".to_string()),
        Thumbnail::Generated(thumb) => parts.push(thumb.icon.to_string()),
        Thumbnail::None => {}
    }
    parts.join("  ")
}

fn media_detail_lines(row: &ResultRow) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for image in row.media.images.iter().take(3) {
        lines.push(Line::from(Span::styled(
            format!("🖼 {image}"),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));
    }
    if row.media.images.len() > 3 {
        lines.push(Line::from(Span::styled(
            format!("   (+{} more)", row.media.images.len() - 3),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));
    }
    if row.media.is_video {
        let signal = row.video_signal.unwrap_or("unknown");
        match &row.media.thumbnail {
            Thumbnail::Url(url) => lines.push(Line::from(Span::styled(
                format!("▶️ video ({signal}) · thumbnail: {url}"),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))),
            Thumbnail::Generated(thumb) => {
                let swatch_style = match first_gradient_color(&thumb.background) {
                    Some(color) => Style::default().fg(color),
                    None => Style::default().fg(COLOR_TEXT_SECONDARY),
                };
                lines.push(Line::from(vec![
                    Span::styled("███ ", swatch_style),
                    Span::styled(
                        format!("{} video ({signal}) · generated placeholder", thumb.icon),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    ),
                ]));
            }
            Thumbnail::None => lines.push(Line::from(Span::styled(
                format!("🎬 video ({signal})"),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))),
        }
    }
    lines.push(Line::from(Span::styled(
        format!("🔗 {}", row.post_url),
        Style::default().fg(COLOR_ACCENT),
    )));
    lines
}

static RGB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"rgb\((\d{1,3}),(\d{1,3}),(\d{1,3})\)").expect("rgb regex"));

/// First `rgb(r,g,b)` stop of a gradient descriptor, as a terminal
/// color for the placeholder swatch.
fn first_gradient_color(background: &str) -> Option<Color> {
    let caps = RGB_RE.captures(background)?;
    let channel = |i: usize| caps.get(i)?.as_str().parse::<u8>().ok();
    Some(Color::Rgb(channel(1)?, channel(2)?, channel(3)?))
}

fn parse_count_input(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

fn parse_limit(value: &str, default: u32) -> u32 {
    value
        .trim()
        .parse::<u32>()
        .unwrap_or(default)
        .clamp(1, bsky::MAX_LIMIT)
}

fn rect_contains(rect: Rect, col: u16, row: u16) -> bool {
    col >= rect.x
        && col < rect.x.saturating_add(rect.width)
        && row >= rect.y
        && row < rect.y.saturating_add(rect.height)
}

/// Suffix of `value` that fits in `width` terminal cells, so long input
/// keeps its tail (and the cursor) visible.
fn visible_tail(value: &str, width: usize) -> &str {
    if UnicodeWidthStr::width(value) <= width {
        return value;
    }
    let mut start = value.len();
    let mut used = 0;
    for (index, ch) in value.char_indices().rev() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        start = index;
    }
    &value[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsky::{Author, PostRecord};
    use serde_json::json;

    fn model() -> Model {
        Model::new(Options {
            status_message: "ready".into(),
            search_service: None,
            default_limit: 20,
            config_path: "~/.config/skysearch/config.yaml".into(),
        })
    }

    fn post(id: &str, likes: i64) -> PostRecord {
        PostRecord {
            uri: format!("at://did:plc:abc/app.bsky.feed.post/{id}"),
            author: Author {
                handle: "tester.bsky.social".into(),
                ..Author::default()
            },
            text: format!("post {id}"),
            like_count: likes,
            ..PostRecord::default()
        }
    }

    fn search_ok(model: &mut Model, query: &str, posts: Vec<PostRecord>) {
        model.handle_async_response(AsyncResponse::Search {
            query: query.into(),
            result: Ok(posts),
        });
    }

    #[test]
    fn focus_cycles_through_every_field() {
        let mut focus = Focus::Query;
        for _ in 0..FOCUS_ORDER.len() {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::Query);
        assert_eq!(Focus::Query.prev(), Focus::Results);
        assert_eq!(Focus::Results.next(), Focus::Query);
    }

    #[test]
    fn successful_search_builds_table_and_moves_focus() {
        let mut model = model();
        search_ok(&mut model, "rust", vec![post("a", 1), post("b", 2)]);
        let table = model.table.as_ref().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(model.table_state.selected(), Some(0));
        assert_eq!(model.focus, Focus::Results);
        assert_eq!(model.status_message, "2 results for \"rust\".");
    }

    #[test]
    fn empty_and_filtered_empty_messages_differ() {
        let mut model = model();
        search_ok(&mut model, "nothing", vec![]);
        assert!(model.table.is_none());
        assert_eq!(model.status_message, "No results for \"nothing\".");

        model.min_likes_input = "100".into();
        search_ok(&mut model, "quiet", vec![post("a", 1)]);
        assert!(model.table.is_none());
        assert_eq!(
            model.status_message,
            "No results for \"quiet\" match the current filters."
        );
    }

    #[test]
    fn failed_search_clears_table() {
        let mut model = model();
        search_ok(&mut model, "rust", vec![post("a", 1)]);
        model.handle_async_response(AsyncResponse::Search {
            query: "rust".into(),
            result: Err(anyhow::anyhow!("boom")),
        });
        assert!(model.table.is_none());
        assert_eq!(model.status_message, "Search failed.");
    }

    #[test]
    fn later_response_overwrites_earlier_table() {
        let mut model = model();
        search_ok(&mut model, "first", vec![post("a", 1)]);
        search_ok(&mut model, "second", vec![post("b", 2), post("c", 3)]);
        let table = model.table.as_ref().unwrap();
        assert_eq!(table.len(), 2);
        assert!(model.status_message.contains("second"));
    }

    #[test]
    fn filters_drop_posts_before_the_table_is_built() {
        let mut model = model();
        model.require_video = true;
        let video = PostRecord {
            embed: Some(json!({ "media": { "type": "video" } })),
            ..post("vid", 5)
        };
        search_ok(&mut model, "clips", vec![post("plain", 9), video]);
        let table = model.table.as_ref().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].post_id, "vid");
        assert!(model.status_message.contains("1 of 2"));
    }

    #[test]
    fn sort_toggle_updates_status() {
        let mut model = model();
        search_ok(&mut model, "rust", vec![post("a", 1), post("b", 2)]);
        model.toggle_column(SortColumn::Likes);
        assert_eq!(model.status_message, "Sorted by likes (descending)");
        model.toggle_column(SortColumn::Likes);
        model.toggle_column(SortColumn::Likes);
        assert_eq!(model.status_message, "Restored search order");
    }

    #[test]
    fn parse_limit_clamps_and_defaults() {
        assert_eq!(parse_limit("", 20), 20);
        assert_eq!(parse_limit("abc", 20), 20);
        assert_eq!(parse_limit("0", 20), 1);
        assert_eq!(parse_limit("500", 20), 100);
        assert_eq!(parse_limit("33", 20), 33);
    }

    #[test]
    fn parse_count_input_handles_blank_and_junk() {
        assert_eq!(parse_count_input(""), None);
        assert_eq!(parse_count_input("  "), None);
        assert_eq!(parse_count_input("12"), Some(12));
        assert_eq!(parse_count_input("x"), None);
    }

    #[test]
    fn first_gradient_color_parses_the_leading_stop() {
        let background = crate::thumb::gradient("abc");
        assert_eq!(
            first_gradient_color(&background),
            Some(Color::Rgb(199, 166, 101))
        );
        assert_eq!(first_gradient_color("no colors here"), None);
    }

    #[test]
    fn visible_tail_keeps_the_end_of_long_input() {
        assert_eq!(visible_tail("hello", 10), "hello");
        assert_eq!(visible_tail("hello world", 5), "world");
        // Wide glyphs count double.
        assert_eq!(visible_tail("ab🦀", 2), "🦀");
        assert_eq!(visible_tail("ab🦀", 3), "b🦀");
    }

    #[test]
    fn media_summary_reflects_classification() {
        let mut row = ResultRow::new(&post("a", 0), crate::media::MediaInfo::default());
        assert_eq!(media_summary(&row), "");

        row.media.images = vec!["u1".into(), "u2".into()];
        assert_eq!(media_summary(&row), "🖼 ×2");

        row.media.is_video = true;
        row.media.thumbnail = Thumbnail::Url("t".into());
        assert_eq!(media_summary(&row), "🖼 ×2  ▶️");
    }

    #[test]
    fn rect_hit_testing_is_exclusive_of_the_far_edge() {
        let rect = Rect::new(2, 3, 4, 1);
        assert!(rect_contains(rect, 2, 3));
        assert!(rect_contains(rect, 5, 3));
        assert!(!rect_contains(rect, 6, 3));
        assert!(!rect_contains(rect, 2, 4));
    }
}
