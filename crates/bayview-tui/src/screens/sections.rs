//! Sections screen: machines grouped by section, one filter per section.

use std::cell::Cell;
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use bayview_core::grouping::select_groups;
use bayview_core::{
    Endpoint, Machine, SectionFilters, SectionGroup, SectionRoute, Snapshot, group_by_section,
    overall_color,
};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::status_dot::status_span;

const NAME_WIDTH: usize = 22;
const ADDR_WIDTH: usize = 17;

/// One rendered line, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Header { group: usize },
    Filter { group: usize },
    Machine { group: usize, index: usize },
    NoMatches,
    Blank,
}

pub struct SectionsScreen {
    focused: bool,
    machines: Snapshot,
    route: SectionRoute,
    groups: Vec<SectionGroup>,
    filters: SectionFilters,
    /// Focused group, as an index into the visible groups.
    focus: usize,
    /// 0 is the section header, `n` the n-th filtered machine.
    row: usize,
    editing: bool,
    viewport: Cell<Rect>,
}

impl SectionsScreen {
    pub fn new(route: SectionRoute) -> Self {
        Self {
            focused: false,
            machines: Arc::new(Vec::new()),
            route,
            groups: Vec::new(),
            filters: SectionFilters::new(),
            focus: 0,
            row: 0,
            editing: false,
            viewport: Cell::new(Rect::default()),
        }
    }

    fn visible(&self) -> Vec<&SectionGroup> {
        select_groups(&self.groups, self.route.selected()).collect()
    }

    fn focused_group(&self) -> Option<&SectionGroup> {
        self.visible().get(self.focus).copied()
    }

    fn focused_section(&self) -> Option<String> {
        self.focused_group().map(|g| g.section.clone())
    }

    fn filtered_len(&self) -> usize {
        self.focused_group()
            .map_or(0, |g| self.filters.apply(g).len())
    }

    /// Keep focus and row inside the current data.
    fn clamp(&mut self) {
        let groups = self.visible().len();
        self.focus = self.focus.min(groups.saturating_sub(1));
        self.row = self.row.min(self.filtered_len());
    }

    fn rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        for (gi, group) in self.visible().into_iter().enumerate() {
            if gi > 0 {
                rows.push(Row::Blank);
            }
            rows.push(Row::Header { group: gi });
            if !self.filters.query(&group.section).is_empty() || (self.editing && gi == self.focus)
            {
                rows.push(Row::Filter { group: gi });
            }
            let matched = self.filters.apply(group).len();
            if matched == 0 {
                rows.push(Row::NoMatches);
            }
            rows.extend((0..matched).map(|index| Row::Machine { group: gi, index }));
        }
        rows
    }

    fn selected_row(&self) -> Row {
        if self.row == 0 {
            Row::Header { group: self.focus }
        } else {
            Row::Machine {
                group: self.focus,
                index: self.row - 1,
            }
        }
    }

    /// First line to draw so the selected line stays on screen.
    fn scroll_for(rows: &[Row], selected: Row, height: usize) -> usize {
        let line = rows.iter().position(|r| *r == selected).unwrap_or(0);
        if height == 0 {
            0
        } else {
            (line + 1).saturating_sub(height)
        }
    }

    fn machine(&self, group: usize, index: usize) -> Option<Arc<Machine>> {
        let visible = self.visible();
        let group = visible.get(group)?;
        self.filters.apply(group).get(index).map(|&m| Arc::clone(m))
    }

    fn activate(&self) -> Option<Action> {
        match self.selected_row() {
            Row::Header { group } => self
                .visible()
                .get(group)
                .map(|g| Action::SelectSection(SectionRoute::section(g.section.clone()))),
            Row::Machine { group, index } => self.machine(group, index).map(Action::OpenDetail),
            _ => None,
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        self.focus = if forward {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
        self.row = 0;
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        let Some(section) = self.focused_section() else {
            self.editing = false;
            return;
        };
        match key.code {
            KeyCode::Char(c) => self.filters.push(&section, c),
            KeyCode::Backspace => self.filters.pop(&section),
            KeyCode::Esc => {
                self.filters.clear(&section);
                self.editing = false;
            }
            KeyCode::Enter => self.editing = false,
            _ => {}
        }
        self.row = 0;
        self.clamp();
    }

    fn row_line(&self, row: Row, selected: bool, width: usize) -> Line<'static> {
        let visible = self.visible();
        let line = match row {
            Row::Header { group } => {
                let Some(g) = visible.get(group) else {
                    return Line::from("");
                };
                let shown = self.filters.apply(g).len();
                let marker = if group == self.focus { "▸ " } else { "  " };
                let count = if shown == g.machines.len() {
                    format!("  ({})", g.machines.len())
                } else {
                    format!("  ({shown} of {})", g.machines.len())
                };
                Line::from(vec![
                    Span::styled(marker, theme::border_focused()),
                    Span::styled(g.section.clone(), theme::section_header()),
                    Span::styled(count, theme::key_hint()),
                ])
            }
            Row::Filter { group } => {
                let query = visible
                    .get(group)
                    .map(|g| self.filters.query(&g.section).to_owned())
                    .unwrap_or_default();
                let mut spans = vec![
                    Span::styled("    / ", Style::default().fg(theme::ELECTRIC_PURPLE)),
                    Span::styled(query, Style::default().fg(theme::NEON_CYAN)),
                ];
                if self.editing && group == self.focus {
                    spans.push(Span::styled("█", Style::default().fg(theme::NEON_CYAN)));
                }
                Line::from(spans)
            }
            Row::Machine { group, index } => {
                let Some(m) = self.machine(group, index) else {
                    return Line::from("");
                };
                let address = |e: Endpoint| {
                    let value = m.declared(e).or(m.probes.ip_of(e)).unwrap_or("-");
                    Span::styled(format!("{value:<ADDR_WIDTH$}"), theme::table_row())
                };
                Line::from(vec![
                    Span::raw("    "),
                    status_span(overall_color(&m)),
                    Span::styled(format!(" {:<NAME_WIDTH$}", m.name), theme::table_row()),
                    address(Endpoint::Ip),
                    address(Endpoint::Gateway),
                    address(Endpoint::KioskPc),
                ])
            }
            Row::NoMatches => Line::from(Span::styled("    no matching machines", theme::key_hint())),
            Row::Blank => Line::from(""),
        };

        if selected {
            let pad = width.saturating_sub(line.width());
            let mut line = line.patch_style(theme::table_selected());
            line.spans.push(Span::styled(" ".repeat(pad), theme::table_selected()));
            line
        } else {
            line
        }
    }
}

impl Component for SectionsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.editing {
            self.handle_edit_key(key);
            return Ok(None);
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.row = (self.row + 1).min(self.filtered_len());
            }
            KeyCode::Char('k') | KeyCode::Up => self.row = self.row.saturating_sub(1),
            KeyCode::Char(']') => self.move_focus(true),
            KeyCode::Char('[') => self.move_focus(false),
            KeyCode::Char('g') | KeyCode::Home => self.row = 0,
            KeyCode::Char('G') | KeyCode::End => self.row = self.filtered_len(),
            KeyCode::Char('/') => {
                if self.focused_group().is_some() {
                    self.editing = true;
                }
            }
            KeyCode::Esc => {
                if let Some(section) = self.focused_section() {
                    self.filters.clear(&section);
                    self.clamp();
                }
            }
            KeyCode::Char('a') => return Ok(Some(Action::SelectSection(SectionRoute::all()))),
            KeyCode::Enter => return Ok(self.activate()),
            _ => {}
        }
        Ok(None)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        let vp = self.viewport.get();
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if vp.contains(Position::new(mouse.column, mouse.row)) => {
                // The first line is the column heading.
                let Some(offset) = (mouse.row - vp.y).checked_sub(1) else {
                    return Ok(None);
                };
                let rows = self.rows();
                let height = usize::from(vp.height.saturating_sub(1));
                let scroll = Self::scroll_for(&rows, self.selected_row(), height);
                match rows.get(scroll + usize::from(offset)).copied() {
                    Some(Row::Header { group }) => {
                        self.focus = group;
                        self.row = 0;
                    }
                    Some(Row::Machine { group, index }) => {
                        self.focus = group;
                        self.row = index + 1;
                        return Ok(self.machine(group, index).map(Action::OpenDetail));
                    }
                    _ => {}
                }
            }
            MouseEventKind::ScrollDown => self.row = (self.row + 1).min(self.filtered_len()),
            MouseEventKind::ScrollUp => self.row = self.row.saturating_sub(1),
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::MachinesUpdated(machines) => {
                self.machines = Arc::clone(machines);
                self.groups = group_by_section(&self.machines);
                self.clamp();
            }
            Action::SelectSection(route) => {
                self.route = route.clone();
                self.focus = 0;
                self.row = 0;
                self.editing = false;
                self.clamp();
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " Sections  ·  {} sections  ·  {} machines ",
            self.groups.len(),
            self.machines.len()
        );
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let content_area = Rect {
            height: inner.height.saturating_sub(1),
            ..inner
        };
        let hints_area = Rect {
            y: inner.y + inner.height.saturating_sub(1),
            height: 1.min(inner.height),
            ..inner
        };
        self.viewport.set(content_area);

        if self.groups.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(" Waiting for machine status…", theme::key_hint())),
                content_area,
            );
        } else if self.visible().is_empty() {
            let name = self.route.selected().unwrap_or_default();
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" No machines in section '{name}'  (a shows all)"),
                    theme::key_hint(),
                )),
                content_area,
            );
        } else {
            let rows = self.rows();
            let selected = self.selected_row();
            let height = usize::from(content_area.height.saturating_sub(1));
            let width = usize::from(content_area.width);
            let scroll = Self::scroll_for(&rows, selected, height);

            let mut lines = vec![
                Line::from(vec![
                    Span::raw(format!("      {:<NAME_WIDTH$}", "Machine")),
                    Span::raw(format!("{:<ADDR_WIDTH$}", Endpoint::Ip.to_string())),
                    Span::raw(format!("{:<ADDR_WIDTH$}", Endpoint::Gateway.to_string())),
                    Span::raw(Endpoint::KioskPc.to_string()),
                ])
                .style(Style::default().fg(theme::BORDER_GRAY).add_modifier(Modifier::ITALIC)),
            ];
            lines.extend(
                rows.iter()
                    .skip(scroll)
                    .take(height)
                    .map(|&row| self.row_line(row, row == selected, width)),
            );
            frame.render_widget(Paragraph::new(lines), content_area);
        }

        let hints = if self.editing {
            Line::from(vec![
                Span::styled("  type ", theme::key_hint_key()),
                Span::styled("to filter  ", theme::key_hint()),
                Span::styled("Enter ", theme::key_hint_key()),
                Span::styled("keep  ", theme::key_hint()),
                Span::styled("Esc ", theme::key_hint_key()),
                Span::styled("clear", theme::key_hint()),
            ])
        } else {
            Line::from(vec![
                Span::styled("  j/k ", theme::key_hint_key()),
                Span::styled("move  ", theme::key_hint()),
                Span::styled("[ ] ", theme::key_hint_key()),
                Span::styled("section  ", theme::key_hint()),
                Span::styled("/ ", theme::key_hint_key()),
                Span::styled("filter  ", theme::key_hint()),
                Span::styled("Enter ", theme::key_hint_key()),
                Span::styled("open  ", theme::key_hint()),
                Span::styled("a ", theme::key_hint_key()),
                Span::styled("all", theme::key_hint()),
            ])
        };
        frame.render_widget(Paragraph::new(hints), hints_area);
    }

    fn captures_input(&self) -> bool {
        self.editing
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &'static str {
        "Sections"
    }
}
