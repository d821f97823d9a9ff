//! Split-pane interactive diff.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::Screen;
use crate::diff::{DiffNode, DiffResult, DiffSummary, DiffType};
use crate::diff_render::render_summary;
use crate::tree::{Node, NodeKind};

const CURSOR_BG: Color = Color::Rgb(48, 54, 61);
const CHROME_BG: Color = Color::Rgb(33, 38, 45);

/// One flattened diff position with both sides pre-formatted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffRow {
    pub diff_type: DiffType,
    pub path: String,
    pub left: Option<String>,
    pub right: Option<String>,
}

impl DiffRow {
    fn from_node(node: &DiffNode<'_>) -> Self {
        Self {
            diff_type: node.diff_type,
            path: node.path.clone(),
            left: node.left.map(side_text),
            right: node.right.map(side_text),
        }
    }

    /// Markers shown in front of the left and right panes.
    pub fn markers(&self) -> (&'static str, &'static str) {
        match self.diff_type {
            DiffType::Added => ("  ", "+ "),
            DiffType::Removed => ("- ", "  "),
            DiffType::Modified => ("~ ", "~ "),
            DiffType::Unchanged => ("  ", "  "),
        }
    }
}

fn side_text(node: &Node) -> String {
    let indent = "  ".repeat(node.depth());
    let label = node.label();
    match (node.kind(), label.is_empty()) {
        (NodeKind::Mapping | NodeKind::Sequence, false) => format!("{indent}{label}:"),
        (NodeKind::Mapping, true) => format!("{indent}{{...}}"),
        (NodeKind::Sequence, true) => format!("{indent}[...]"),
        (NodeKind::Alias, false) => format!("{indent}{label}: *{}", node.value()),
        (NodeKind::Alias, true) => format!("{indent}*{}", node.value()),
        (_, false) => format!("{indent}{label}: {}", node.value()),
        (_, true) => format!("{indent}{}", node.value()),
    }
}

/// Pre-order rows of a diff tree, document level excluded.
pub fn flatten(result: &DiffResult<'_>) -> Vec<DiffRow> {
    let mut rows = Vec::new();
    if let Some(root) = &result.root {
        root.walk(&mut |node| {
            if !node.is_document() {
                rows.push(DiffRow::from_node(node));
            }
        });
    }
    rows
}

pub struct DiffApp {
    rows: Vec<DiffRow>,
    left_name: String,
    right_name: String,
    summary: DiffSummary,
    cursor: usize,
    offset: usize,
    viewport_height: usize,
    show_help: bool,
}

impl DiffApp {
    pub fn new(result: &DiffResult<'_>, left_name: &str, right_name: &str) -> Self {
        Self {
            rows: flatten(result),
            left_name: left_name.to_string(),
            right_name: right_name.to_string(),
            summary: result.summary,
            cursor: 0,
            offset: 0,
            viewport_height: 1,
            show_help: false,
        }
    }

    pub fn rows(&self) -> &[DiffRow] {
        &self.rows
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        self.adjust_offset();
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.rows.len().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        self.adjust_offset();
    }

    pub fn next_change(&mut self) {
        if let Some(row) = (self.cursor + 1..self.rows.len()).find(|i| self.is_changed(*i)) {
            self.cursor = row;
            self.adjust_offset();
        }
    }

    pub fn prev_change(&mut self) {
        if let Some(row) = (0..self.cursor).rev().find(|i| self.is_changed(*i)) {
            self.cursor = row;
            self.adjust_offset();
        }
    }

    fn is_changed(&self, row: usize) -> bool {
        self.rows[row].diff_type != DiffType::Unchanged
    }

    fn page(&self) -> isize {
        isize::try_from(self.viewport_height).unwrap_or(isize::MAX)
    }

    fn adjust_offset(&mut self) {
        if self.cursor < self.offset {
            self.offset = self.cursor;
        }
        if self.cursor >= self.offset + self.viewport_height {
            self.offset = self.cursor + 1 - self.viewport_height;
        }
    }

    fn draw_panes(&self, frame: &mut Frame<'_>, area: Rect) {
        let cols = Layout::horizontal([
            Constraint::Percentage(50),
            Constraint::Length(3),
            Constraint::Percentage(50),
        ])
        .split(area);
        let width = usize::from(cols[0].width);

        let mut left_lines = Vec::new();
        let mut right_lines = Vec::new();
        for (row_index, row) in self
            .rows
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.viewport_height)
        {
            let mut style = Style::default().fg(row_color(row.diff_type));
            if row_index == self.cursor {
                style = style.bg(CURSOR_BG);
            }
            let (left_marker, right_marker) = row.markers();
            let left = truncate(
                &format!("{left_marker}{}", row.left.as_deref().unwrap_or_default()),
                width,
            );
            let right = truncate(
                &format!("{right_marker}{}", row.right.as_deref().unwrap_or_default()),
                width,
            );
            left_lines.push(Line::from(Span::styled(format!("{left:<width$}"), style)));
            right_lines.push(Line::from(Span::styled(format!("{right:<width$}"), style)));
        }

        frame.render_widget(Paragraph::new(Text::from(left_lines)), cols[0]);
        frame.render_widget(
            Block::default()
                .borders(Borders::LEFT)
                .border_style(Style::default().fg(Color::Rgb(48, 54, 61))),
            Rect {
                x: cols[1].x + 1,
                width: 1,
                ..cols[1]
            },
        );
        frame.render_widget(Paragraph::new(Text::from(right_lines)), cols[2]);
    }

    fn draw_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let lines: Vec<Line> = [
            ("j/k ↓/↑", "move"),
            ("f/b PgDn/PgUp", "page down/up"),
            ("g/G Home/End", "top/bottom"),
            ("n or ]", "next change"),
            ("N or [", "previous change"),
            ("?", "toggle help"),
            ("q/Esc", "quit"),
        ]
        .iter()
        .map(|(keys, action)| {
            Line::from(vec![
                Span::styled(format!("{keys:<18}"), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        })
        .collect();
        frame.render_widget(Paragraph::new(Text::from(lines)), area);
    }
}

fn row_color(diff_type: DiffType) -> Color {
    match diff_type {
        DiffType::Added => Color::Rgb(166, 227, 161),
        DiffType::Removed => Color::Rgb(243, 139, 168),
        DiffType::Modified => Color::Rgb(249, 226, 175),
        DiffType::Unchanged => Color::Rgb(139, 148, 158),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

impl Screen for DiffApp {
    fn draw(&mut self, frame: &mut Frame<'_>) {
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

        let left = if self.left_name.is_empty() {
            "(left)"
        } else {
            self.left_name.as_str()
        };
        let right = if self.right_name.is_empty() {
            "(right)"
        } else {
            self.right_name.as_str()
        };
        frame.render_widget(
            Paragraph::new(format!(" yam diff: {left} ↔ {right}")).style(
                Style::default()
                    .fg(Color::Rgb(121, 192, 255))
                    .bg(CHROME_BG)
                    .add_modifier(Modifier::BOLD),
            ),
            chunks[0],
        );

        self.set_viewport_height(usize::from(chunks[1].height));
        if self.show_help {
            self.draw_help(frame, chunks[1]);
        } else {
            self.draw_panes(frame, chunks[1]);
        }

        let position = format!(
            " {}/{}  |  {}",
            (self.cursor + 1).min(self.rows.len()),
            self.rows.len(),
            render_summary(&self.summary, false)
        );
        frame.render_widget(
            Paragraph::new(position).style(Style::default().fg(Color::Gray).bg(CHROME_BG)),
            chunks[2],
        );
        frame.render_widget(
            Paragraph::new(" j/k move  n/N next/prev change  ? help  q quit").dark_gray(),
            chunks[3],
        );
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('d') if ctrl => self.move_cursor(self.page() / 2),
            KeyCode::Char('u') if ctrl => self.move_cursor(-(self.page() / 2)),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Char('f' | ' ') | KeyCode::PageDown => self.move_cursor(self.page()),
            KeyCode::Char('b') | KeyCode::PageUp => self.move_cursor(-self.page()),
            KeyCode::Char('g') | KeyCode::Home => {
                self.cursor = 0;
                self.offset = 0;
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.cursor = self.rows.len().saturating_sub(1);
                self.adjust_offset();
            }
            KeyCode::Char('n' | ']') => self.next_change(),
            KeyCode::Char('N' | '[') => self.prev_change(),
            KeyCode::Char('?') => self.show_help = !self.show_help,
            _ => {}
        }
        false
    }
}
