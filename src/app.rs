//! Interactive tree viewer/editor.
//!
//! Each key press is one synchronous state transition followed by a redraw.
//! The tree is owned here and lent to navigation or editing per event.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::block::Padding;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tracing::{debug, warn};

use crate::edit::{EditSession, SaveError};
use crate::nav::NavState;
use crate::parse::Format;
use crate::render::{RenderOptions, TreeRenderer};
use crate::tree::{NodeId, Tree};

pub const UNSAVED_WARNING: &str = "Unsaved changes! Press q again to quit, or Ctrl+S to save";

const CURSOR_BG: Color = Color::Rgb(48, 54, 61);
const DIRTY_BG: Color = Color::Rgb(61, 46, 0);
const MATCH_BG: Color = Color::Rgb(40, 40, 40);
const CHROME_BG: Color = Color::Rgb(33, 38, 45);

/// A full-screen view driven by the terminal loop.
pub trait Screen {
    fn draw(&mut self, frame: &mut Frame<'_>);

    /// Handles one key press. Returns `true` when the session should end.
    fn handle_key(&mut self, key: KeyEvent) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Search,
    Edit,
}

pub struct App {
    tree: Tree,
    path: Option<PathBuf>,
    name: String,
    format: Format,
    nav: NavState,
    session: EditSession,
    renderer: TreeRenderer,
    mode: Mode,
    search_query: String,
    edit_buffer: String,
    status: String,
    show_help: bool,
    quit_armed: bool,
}

impl App {
    /// Input without a backing file (stdin) opens read-only.
    pub fn new(tree: Tree, path: Option<PathBuf>, format: Format, options: RenderOptions) -> Self {
        let name = path
            .as_ref()
            .map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
        let nav = NavState::new(&tree);
        let session = EditSession::new(path.is_none());
        Self {
            tree,
            path,
            name,
            format,
            nav,
            session,
            renderer: TreeRenderer::new(RenderOptions {
                interactive: true,
                ..options
            }),
            mode: Mode::Normal,
            search_query: String::new(),
            edit_buffer: String::new(),
            status: String::new(),
            show_help: false,
            quit_armed: false,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn edit_buffer(&self) -> &str {
        &self.edit_buffer
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.nav.set_viewport_height(height);
    }

    /// Starts the session on `id`, e.g. the target of a path query.
    pub fn focus(&mut self, id: NodeId) {
        self.nav.reveal(&mut self.tree, id);
    }

    fn handle_search_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                self.nav.jump_to_first_match();
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.search_query.clear();
                self.nav.clear_search();
            }
            KeyCode::Backspace => {
                self.search_query.pop();
                self.nav.search(&mut self.tree, &self.search_query);
            }
            KeyCode::Char(c) if !has_command_modifier(key) => {
                self.search_query.push(c);
                self.nav.search(&mut self.tree, &self.search_query);
            }
            _ => {}
        }
    }

    fn handle_edit_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                if let Err(err) = self.session.confirm_edit(&mut self.tree, &self.edit_buffer) {
                    self.status = err.to_string();
                }
                self.edit_buffer.clear();
            }
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.session.cancel_edit();
                self.edit_buffer.clear();
            }
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            KeyCode::Char(c) if !has_command_modifier(key) => {
                self.edit_buffer.push(c);
            }
            _ => {}
        }
    }

    fn start_edit(&mut self) {
        let Some(id) = self.nav.current() else {
            return;
        };
        match self.session.start_edit(&self.tree, id) {
            Ok(value) => {
                self.edit_buffer = value;
                self.mode = Mode::Edit;
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn save(&mut self) {
        let result = match &self.path {
            Some(path) => self.session.save(&self.tree, path, self.format),
            None => Err(SaveError::ReadOnly),
        };
        match result {
            Ok(()) => self.status = "Saved!".to_string(),
            Err(SaveError::Io { path, source }) => {
                warn!(target: "io", file = %path.display(), error = %source, "save_failed");
                self.status = format!("Error: {source}");
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        let quit_armed = std::mem::take(&mut self.quit_armed);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('q') => {
                if self.session.is_modified() && !quit_armed {
                    self.status = UNSAVED_WARNING.to_string();
                    self.quit_armed = true;
                    return false;
                }
                return true;
            }
            KeyCode::Char('s') if ctrl => self.save(),
            KeyCode::Char('r') if ctrl => {
                self.status = if self.session.redo(&mut self.tree) {
                    "Redo: re-applied value".to_string()
                } else {
                    "Nothing to redo".to_string()
                };
            }
            KeyCode::Char('d') if ctrl => self.nav.half_page_down(),
            KeyCode::Char('u') if ctrl => self.nav.half_page_up(),
            KeyCode::Char('u') => {
                self.status = if self.session.undo(&mut self.tree) {
                    "Undo: restored value".to_string()
                } else {
                    "Nothing to undo".to_string()
                };
            }
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Char('e') => self.start_edit(),
            KeyCode::Char('/') => {
                self.mode = Mode::Search;
                self.search_query.clear();
                self.nav.clear_search();
            }
            KeyCode::Char('n') => self.nav.next_match(),
            KeyCode::Char('N') => self.nav.prev_match(),
            KeyCode::Char('j') | KeyCode::Down => self.nav.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.nav.move_cursor(-1),
            KeyCode::Char('f' | ' ') | KeyCode::PageDown => self.nav.page_down(),
            KeyCode::Char('b') | KeyCode::PageUp => self.nav.page_up(),
            KeyCode::Char('g') | KeyCode::Home => self.nav.top(),
            KeyCode::Char('G') | KeyCode::End => self.nav.bottom(),
            KeyCode::Char('o') | KeyCode::Enter => {
                self.nav.toggle_current(&mut self.tree);
            }
            KeyCode::Char('O') => self.nav.expand_all(&mut self.tree),
            KeyCode::Char('C') => self.nav.collapse_all(&mut self.tree),
            _ => {}
        }
        false
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut spans = vec![Span::styled(
            format!(" yam: {} ", self.name),
            Style::default()
                .fg(Color::Rgb(121, 192, 255))
                .add_modifier(Modifier::BOLD),
        )];
        if self.session.is_modified() {
            spans.push(Span::styled("[modified] ", Style::default().fg(Color::Yellow)));
        }
        if self.session.is_read_only() {
            spans.push(Span::styled("[read-only] ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(
            format!("({})", self.format),
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(CHROME_BG)),
            area,
        );
    }

    fn draw_body(&self, frame: &mut Frame<'_>, area: Rect) {
        let cursor = self.nav.cursor();
        let lines: Vec<Line> = self
            .nav
            .window()
            .map(|(row, id)| {
                let rendered = self.renderer.render_line(&self.tree, id, 0);
                let background = if row == cursor {
                    Some(CURSOR_BG)
                } else if self.session.is_dirty(id) {
                    Some(DIRTY_BG)
                } else if self.nav.is_match(row) {
                    Some(MATCH_BG)
                } else {
                    None
                };

                let spans: Vec<Span> = rendered
                    .segments
                    .into_iter()
                    .map(|segment| {
                        let style = match background {
                            Some(bg) => segment.style.bg(bg),
                            None => segment.style,
                        };
                        Span::styled(segment.text, style)
                    })
                    .collect();
                let mut line = Line::from(spans);
                if row == cursor {
                    line.style = Style::default().bg(CURSOR_BG);
                }
                line
            })
            .collect();

        frame.render_widget(Paragraph::new(Text::from(lines)), area);
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let path = self
            .nav
            .current()
            .map(|id| self.tree.get(id).path_string())
            .unwrap_or_default();
        let mut text = format!(
            " {}/{} | {path}",
            (self.nav.cursor() + 1).min(self.nav.len()),
            self.nav.len()
        );

        let matches = self.nav.matches();
        if !matches.is_empty() {
            text.push_str(&format!(
                " | [{}/{}]",
                self.nav.match_index() + 1,
                matches.len()
            ));
        } else if !self.search_query.is_empty() {
            text.push_str(" | [0/0]");
        }

        match self.mode {
            Mode::Search => text.push_str(&format!(" | /{}", self.search_query)),
            Mode::Edit => text.push_str(&format!(" | Edit: {}", self.edit_buffer)),
            Mode::Normal if !self.status.is_empty() => {
                text.push_str(&format!(" | {}", self.status));
            }
            Mode::Normal => {}
        }

        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::Gray).bg(CHROME_BG)),
            area,
        );
    }

    fn draw_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let lines: Vec<Line> = HELP
            .iter()
            .map(|(keys, action)| {
                Line::from(vec![
                    Span::styled(format!("{keys:<18}"), Style::default().fg(Color::Yellow)),
                    Span::raw(*action),
                ])
            })
            .collect();
        let help = Paragraph::new(Text::from(lines)).block(
            Block::default()
                .title(" Keys ")
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .padding(Padding::new(1, 1, 0, 0)),
        );
        frame.render_widget(help, area);
    }
}

const HELP: &[(&str, &str)] = &[
    ("j/k ↓/↑", "move"),
    ("f/b PgDn/PgUp", "page down/up"),
    ("Ctrl-d/Ctrl-u", "half page down/up"),
    ("g/G Home/End", "top/bottom"),
    ("Enter/o", "toggle fold"),
    ("O / C", "expand all / collapse all"),
    ("/", "search"),
    ("n/N", "next/previous match"),
    ("e", "edit value"),
    ("u / Ctrl-r", "undo / redo"),
    ("Ctrl-s", "save"),
    ("?", "toggle help"),
    ("q", "quit"),
];

const SHORT_HELP: &str = " j/k move  o fold  / search  e edit  u undo  ^s save  ? help  q quit";

impl Screen for App {
    fn draw(&mut self, frame: &mut Frame<'_>) {
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.size());
        let body = chunks[1];

        self.draw_header(frame, chunks[0]);
        if self.show_help {
            self.draw_help(frame, body);
        } else {
            self.nav.set_viewport_height(usize::from(body.height));
            self.draw_body(frame, body);
        }
        self.draw_footer(frame, chunks[2]);
        frame.render_widget(Paragraph::new(SHORT_HELP).dark_gray(), chunks[3]);
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.status.clear();

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        debug!(target: "runtime", mode = ?self.mode, code = ?key.code, "key");
        match self.mode {
            Mode::Edit => {
                self.handle_edit_input(key);
                false
            }
            Mode::Search => {
                self.handle_search_input(key);
                false
            }
            Mode::Normal => self.handle_normal_key(key),
        }
    }
}

fn has_command_modifier(key: KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}
