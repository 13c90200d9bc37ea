use std::cell::Cell;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEvent,
    MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::api::Comment;
use crate::controller::Controller;
use crate::debounce::Debouncer;
use crate::feed::Direction;
use crate::player::{Button, Panel, PanelIntent, PanelProps, PlaybackState, SurfaceFactory};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const NICKNAME_COLORS: [Color; 4] = [
    Color::Rgb(250, 179, 135),
    Color::Rgb(166, 227, 161),
    Color::Rgb(203, 166, 247),
    Color::Rgb(137, 220, 235),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum CommentField {
    #[default]
    Nickname,
    Text,
}

impl CommentField {
    fn next(self) -> Self {
        match self {
            CommentField::Nickname => CommentField::Text,
            CommentField::Text => CommentField::Nickname,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    Comments,
    Confirm,
}

pub struct Options {
    pub controller: Controller,
    pub surfaces: Box<dyn SurfaceFactory>,
    pub scroll_debounce: Duration,
    pub api_base: String,
}

pub struct Model {
    controller: Controller,
    panel: Panel,
    surfaces: Box<dyn SurfaceFactory>,
    wheel: Debouncer<Direction>,
    searching: bool,
    search_input: String,
    comment_field: CommentField,
    comment_scroll: u16,
    comment_line_count: Cell<u16>,
    password: String,
    api_base: String,
    status_message: String,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let mut model = Self {
            controller: opts.controller,
            panel: Panel::new(),
            surfaces: opts.surfaces,
            wheel: Debouncer::new(opts.scroll_debounce),
            searching: false,
            search_input: String::new(),
            comment_field: CommentField::default(),
            comment_scroll: 0,
            comment_line_count: Cell::new(0),
            password: String::new(),
            status_message: format!("Loading challenges from {}…", opts.api_base),
            api_base: opts.api_base,
            needs_redraw: true,
        };
        model.controller.load_feed();
        model
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
            self.pump();

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let now = Instant::now();
            let mut timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));
            if let Some(remaining) = self.wheel.remaining(now) {
                timeout = timeout.min(remaining);
            }

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.panel.sync() || self.controller.is_loading() {
                    self.mark_dirty();
                }
            }
        }

        Ok(())
    }

    fn pump(&mut self) {
        if self.controller.poll() {
            self.after_feed_change();
        }
        if let Some(direction) = self.wheel.poll(Instant::now()) {
            self.navigate(direction);
        }
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn mode(&self) -> Mode {
        let interaction = self.controller.feed().interaction();
        if interaction.show_confirmation {
            Mode::Confirm
        } else if interaction.comment_open {
            Mode::Comments
        } else if self.searching {
            Mode::Search
        } else {
            Mode::Browse
        }
    }

    fn after_feed_change(&mut self) {
        let feed = self.controller.feed();
        self.panel.focus(feed.focused_id());
        self.status_message = match feed.cursor() {
            Some(index) => format!("Video {} of {}", index + 1, feed.visible_len()),
            None if feed.items().is_empty() => format!("No videos at {}.", self.api_base),
            None => format!("No videos match \"{}\".", feed.search()),
        };
        if !feed.interaction().show_confirmation {
            self.password.clear();
        }
        self.mark_dirty();
    }

    fn navigate(&mut self, direction: Direction) {
        if self.controller.advance(direction) {
            debug!(?direction, cursor = ?self.controller.feed().cursor(), "navigated");
            self.comment_scroll = 0;
            self.after_feed_change();
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        let direction = match event.kind {
            MouseEventKind::ScrollDown => Direction::Forward,
            MouseEventKind::ScrollUp => Direction::Backward,
            _ => return,
        };
        match self.mode() {
            Mode::Comments => {
                self.scroll_comments(direction);
                self.mark_dirty();
            }
            Mode::Confirm => {}
            Mode::Browse | Mode::Search => self.wheel.push(direction, Instant::now()),
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        let quit = match self.mode() {
            Mode::Browse => self.handle_browse_key(code),
            Mode::Search => {
                self.handle_search_key(code);
                false
            }
            Mode::Comments => {
                self.handle_comment_key(code);
                false
            }
            Mode::Confirm => {
                self.handle_confirm_key(code);
                false
            }
        };
        self.mark_dirty();
        quit
    }

    fn handle_browse_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('j') | KeyCode::Down => self.wheel.push(Direction::Forward, Instant::now()),
            KeyCode::Char('k') | KeyCode::Up => self.wheel.push(Direction::Backward, Instant::now()),
            KeyCode::Char(' ') | KeyCode::Char('p') => self.press(Button::PlayPause),
            KeyCode::Char('l') => self.press(Button::Like),
            KeyCode::Char('c') => self.press(Button::Comment),
            KeyCode::Char('x') | KeyCode::Delete => self.press(Button::Trash),
            KeyCode::Char('/') => {
                self.searching = true;
                self.search_input = self.controller.feed().search().to_string();
            }
            KeyCode::Char('r') => {
                self.status_message = "Refreshing challenges…".to_string();
                self.controller.load_feed();
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter | KeyCode::Esc => self.searching = false,
            KeyCode::Backspace => {
                self.search_input.pop();
                self.apply_search();
            }
            KeyCode::Char(ch) => {
                self.search_input.push(ch);
                self.apply_search();
            }
            _ => {}
        }
    }

    fn apply_search(&mut self) {
        self.controller.filter(self.search_input.clone());
        self.after_feed_change();
    }

    fn handle_comment_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.controller.toggle_comments();
                self.comment_field = CommentField::default();
            }
            KeyCode::Tab | KeyCode::BackTab => self.comment_field = self.comment_field.next(),
            KeyCode::Up => self.scroll_comments(Direction::Backward),
            KeyCode::Down => self.scroll_comments(Direction::Forward),
            KeyCode::Enter => {
                if self.controller.submit_draft() {
                    self.status_message = "Posting comment…".to_string();
                }
            }
            KeyCode::Backspace => {
                self.active_field_mut().pop();
            }
            KeyCode::Char(ch) => self.active_field_mut().push(ch),
            _ => {}
        }
    }

    fn active_field_mut(&mut self) -> &mut String {
        let draft = self.controller.draft_mut();
        match self.comment_field {
            CommentField::Nickname => &mut draft.nickname,
            CommentField::Text => &mut draft.text,
        }
    }

    fn scroll_comments(&mut self, direction: Direction) {
        self.comment_scroll =
            step_scroll(self.comment_scroll, direction, self.comment_line_count.get());
    }

    fn handle_confirm_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.controller.toggle_confirmation();
                self.password.clear();
            }
            KeyCode::Enter => {
                let password = std::mem::take(&mut self.password);
                if self.controller.delete_item(&password) {
                    self.status_message = "Deleting video…".to_string();
                }
            }
            KeyCode::Backspace => {
                self.password.pop();
            }
            KeyCode::Char(ch) => self.password.push(ch),
            _ => {}
        }
    }

    fn press(&mut self, button: Button) {
        let Some(item) = self.controller.feed().focused().cloned() else {
            return;
        };
        let intent = self.panel.press(button, &item, self.surfaces.as_ref());
        match intent {
            Some(PanelIntent::Like) => {
                self.controller.like();
            }
            Some(PanelIntent::ToggleComments) => {
                self.controller.toggle_comments();
                self.comment_scroll = 0;
                self.comment_field = CommentField::default();
            }
            Some(PanelIntent::RequestDelete) => {
                self.controller.toggle_confirmation();
                self.password.clear();
            }
            None => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.controller.is_loading() {
            format!("… {}", self.status_message)
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.draw_search(frame, layout[1]);

        let main = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(layout[2]);
        self.draw_panel(frame, main[0]);
        if self.mode() == Mode::Comments {
            self.draw_comments(frame, main[1]);
        } else {
            self.draw_sidebar(frame, main[1]);
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[3]);

        if self.mode() == Mode::Confirm {
            self.draw_confirmation(frame, layout[2]);
        }
    }

    fn draw_search(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.mode() == Mode::Search;
        let text = if focused {
            format!("{}▏", self.search_input)
        } else if self.controller.feed().search().is_empty() {
            "Press / to search titles".to_string()
        } else {
            self.controller.feed().search().to_string()
        };
        let style = if focused {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        frame.render_widget(
            Paragraph::new(text).style(style).block(pane_block("Search", focused)),
            area,
        );
    }

    fn draw_panel(&self, frame: &mut Frame<'_>, area: Rect) {
        let feed = self.controller.feed();
        match feed.focused() {
            Some(item) => {
                let props = PanelProps {
                    item,
                    liked: feed.interaction().liked,
                    comment_count: feed.comment_count(),
                };
                self.panel.render(frame, area, &props);
            }
            None => {
                let message = if self.controller.is_loading() {
                    "Loading videos…"
                } else {
                    "No videos."
                };
                frame.render_widget(
                    Paragraph::new(message)
                        .alignment(Alignment::Center)
                        .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                        .block(pane_block("Video", false)),
                    area,
                );
            }
        }
    }

    fn draw_sidebar(&self, frame: &mut Frame<'_>, area: Rect) {
        let feed = self.controller.feed();
        let mut lines = Vec::new();
        if let Some(item) = feed.focused() {
            lines.push(Line::from(Span::styled(
                item.title.clone(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )));
            let playback = match self.panel.state() {
                PlaybackState::Idle => "paused",
                PlaybackState::Playing => "playing",
            };
            lines.push(Line::from(Span::styled(
                format!("#{} · {}", item.id, playback),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
            lines.push(Line::default());
        }
        if let Some(next) = self.controller.up_next() {
            lines.push(Line::from(Span::styled(
                "Up next",
                Style::default().fg(COLOR_ACCENT),
            )));
            lines.push(Line::from(next.title.clone()));
            lines.push(Line::from(Span::styled(
                next.video_url.clone(),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .wrap(Wrap { trim: true })
                .block(pane_block("Details", false)),
            area,
        );
    }

    fn draw_comments(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = pane_block("Comments", true);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let sections = Layout::default()
            .direction(LayoutDirection::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(4)])
            .split(inner);

        let feed = self.controller.feed();
        let width = usize::from(sections[0].width.max(1));
        let lines = if self.controller.is_loading_comments() && feed.comments().is_empty() {
            vec![Line::from("Loading comments…")]
        } else if feed.comments().is_empty() {
            vec![Line::from(Span::styled(
                "No comments yet.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))]
        } else {
            comment_lines(feed.comments(), width)
        };
        self.comment_line_count
            .set(u16::try_from(lines.len()).unwrap_or(u16::MAX));
        frame.render_widget(
            Paragraph::new(Text::from(lines)).scroll((self.comment_scroll, 0)),
            sections[0],
        );

        let draft = self.controller.draft();
        let form = Text::from(vec![
            form_line("Nickname", &draft.nickname, self.comment_field == CommentField::Nickname),
            form_line("Comment", &draft.text, self.comment_field == CommentField::Text),
        ]);
        frame.render_widget(
            Paragraph::new(form).block(Block::default().borders(Borders::TOP)),
            sections[1],
        );
    }

    fn draw_confirmation(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup);
        let masked = "•".repeat(self.password.chars().count());
        let text = Text::from(vec![
            Line::from("Delete this video?"),
            Line::default(),
            Line::from(vec![
                Span::styled("Password: ", Style::default().fg(COLOR_TEXT_SECONDARY)),
                Span::raw(masked),
            ]),
            Line::default(),
            Line::from(Span::styled(
                "Enter delete · Esc cancel",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ]);
        frame.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .style(Style::default().bg(COLOR_PANEL_BG).fg(COLOR_TEXT_PRIMARY))
                .block(
                    Block::default()
                        .title(" Confirm ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(COLOR_ERROR)),
                ),
            popup,
        );
    }

    fn footer_text(&self) -> String {
        let parts: &[&str] = match self.mode() {
            Mode::Browse => &[
                "j/k or wheel: next/previous",
                "space play/pause",
                "l like",
                "c comments",
                "x delete",
                "/ search",
                "r refresh",
                "q quit",
            ],
            Mode::Search => &["type to filter titles", "Enter/Esc done"],
            Mode::Comments => &[
                "Tab switch field",
                "Enter post",
                "↑/↓ or wheel scroll",
                "Esc close",
            ],
            Mode::Confirm => &["type password", "Enter delete", "Esc cancel"],
        };
        parts.join(" · ")
    }
}

fn pane_block(title: &'static str, focused: bool) -> Block<'static> {
    let border = if focused {
        COLOR_BORDER_FOCUSED
    } else {
        COLOR_BORDER_IDLE
    };
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(COLOR_PANEL_BG))
}

fn nickname_color(nickname: &str) -> Color {
    let sum: usize = nickname.bytes().map(usize::from).sum();
    NICKNAME_COLORS[sum % NICKNAME_COLORS.len()]
}

fn comment_lines(comments: &[Comment], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for comment in comments {
        lines.push(Line::from(Span::styled(
            comment.nickname.clone(),
            Style::default()
                .fg(nickname_color(&comment.nickname))
                .add_modifier(Modifier::BOLD),
        )));
        for row in wrap(&comment.text, width.max(1)) {
            lines.push(Line::from(Span::styled(
                row.into_owned(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )));
        }
        lines.push(Line::default());
    }
    lines
}

fn form_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let label_style = if active {
        Style::default()
            .fg(COLOR_ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT_SECONDARY)
    };
    let cursor = if active { "▏" } else { "" };
    let pad = " ".repeat(9usize.saturating_sub(UnicodeWidthStr::width(label)));
    Line::from(vec![
        Span::styled(format!("{label}{pad}"), label_style),
        Span::raw(format!("{value}{cursor}")),
    ])
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn step_scroll(current: u16, direction: Direction, line_count: u16) -> u16 {
    let next = match direction {
        Direction::Forward => current.saturating_add(1),
        Direction::Backward => current.saturating_sub(1),
    };
    next.min(line_count.saturating_sub(1))
}
