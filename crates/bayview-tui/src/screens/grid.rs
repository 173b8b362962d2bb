//! Grid screen: every visible section as a bay × column canvas.
//!
//! Sections are stacked vertically, each under a one-line header. The
//! canvas maps one layout unit to one terminal cell, so layout rectangles
//! double as mouse hit boxes.

use std::cell::Cell;
use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine, Rectangle};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use bayview_core::geometry::{self, MachineBox};
use bayview_core::{
    Grid, GridMetrics, MAX_COLUMNS, Machine, SectionLayout, SectionRoute, Snapshot,
    infer_switches,
};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

const SECTION_GAP: u32 = 1;
const PAN_STEP_X: u32 = 4;
const PAN_STEP_Y: u32 = 2;

struct PlacedSection {
    layout: SectionLayout,
    /// Row of the section header.
    top: u32,
    machine_count: usize,
    off_grid: usize,
}

impl PlacedSection {
    /// First row of the layout, just below the header.
    fn origin(&self) -> u32 {
        self.top + 1
    }
}

pub struct GridScreen {
    focused: bool,
    machines: Snapshot,
    route: SectionRoute,
    metrics: GridMetrics,
    /// Every section name in the snapshot, in grid order.
    sections: Vec<String>,
    placed: Vec<PlacedSection>,
    content_width: u32,
    content_height: u32,
    /// Index into the machine boxes of `placed`, in layout order.
    cursor: Option<usize>,
    pan_x: u32,
    pan_y: u32,
    show_connectors: bool,
    /// Canvas area of the last frame, for hit-testing and scrolling.
    viewport: Cell<Rect>,
}

impl GridScreen {
    pub fn new(route: SectionRoute) -> Self {
        Self {
            focused: false,
            machines: Arc::new(Vec::new()),
            route,
            metrics: GridMetrics::default(),
            sections: Vec::new(),
            placed: Vec::new(),
            content_width: 0,
            content_height: 0,
            cursor: None,
            pan_x: 0,
            pan_y: 0,
            show_connectors: true,
            viewport: Cell::new(Rect::default()),
        }
    }

    /// Recompute grid, switches and geometry from the current snapshot.
    fn rebuild(&mut self) {
        let previous = self.cursor_box().map(|(_, b)| b.machine.name.clone());

        let grid = Grid::build(&self.machines);
        let switches = infer_switches(&self.machines);
        self.sections = grid.sections().map(|s| s.name().to_owned()).collect();

        self.placed.clear();
        let mut top = 0;
        let mut width = 0;
        for section in grid.visible(self.route.selected()) {
            let layout = SectionLayout::compute(section, &switches, &self.metrics);
            let height = layout.height;
            width = width.max(layout.width);
            self.placed.push(PlacedSection {
                layout,
                top,
                machine_count: section.machine_count(),
                off_grid: section.off_grid().len(),
            });
            top += 1 + height + SECTION_GAP;
        }
        self.content_width = width;
        self.content_height = top;

        self.cursor = previous.and_then(|name| self.boxes().position(|b| b.machine.name == name));
        self.clamp_pan();
    }

    fn boxes(&self) -> impl Iterator<Item = &MachineBox> {
        self.placed.iter().flat_map(|p| p.layout.machines.iter())
    }

    fn cursor_box(&self) -> Option<(&PlacedSection, &MachineBox)> {
        let mut index = self.cursor?;
        for placed in &self.placed {
            match placed.layout.machines.get(index) {
                Some(b) => return Some((placed, b)),
                None => index -= placed.layout.machines.len(),
            }
        }
        None
    }

    fn move_cursor(&mut self, forward: bool) {
        let len = self.boxes().count();
        if len == 0 {
            return;
        }
        self.cursor = Some(match self.cursor {
            None if forward => 0,
            None => len - 1,
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
        });
        self.scroll_to_cursor();
    }

    fn viewport_size(&self) -> (u32, u32) {
        let vp = self.viewport.get();
        (u32::from(vp.width), u32::from(vp.height))
    }

    fn clamp_pan(&mut self) {
        let (w, h) = self.viewport_size();
        self.pan_x = self.pan_x.min(self.content_width.saturating_sub(w));
        self.pan_y = self.pan_y.min(self.content_height.saturating_sub(h));
    }

    fn pan(&mut self, dx: i64, dy: i64) {
        let shift = |v: u32, d: i64| u32::try_from(i64::from(v) + d).unwrap_or(0);
        self.pan_x = shift(self.pan_x, dx);
        self.pan_y = shift(self.pan_y, dy);
        self.clamp_pan();
    }

    /// Pan just enough to bring the cursor box into view.
    fn scroll_to_cursor(&mut self) {
        let (w, h) = self.viewport_size();
        if w == 0 || h == 0 {
            return;
        }
        let Some((header, left, right, top, bottom)) = self.cursor_box().map(|(placed, b)| {
            let top = placed.origin() + b.rect.y;
            (
                placed.top,
                b.rect.x,
                b.rect.x + b.rect.width,
                top,
                top + b.rect.height,
            )
        }) else {
            return;
        };
        let label_width = self.metrics.label_width;

        if left < self.pan_x + label_width {
            self.pan_x = left.saturating_sub(label_width);
        } else if right > self.pan_x + w {
            self.pan_x = right - w;
        }
        if top < self.pan_y {
            // Keep the section header visible when it fits.
            self.pan_y = if bottom - header <= h { header } else { top };
        } else if bottom > self.pan_y + h {
            self.pan_y = bottom - h;
        }
    }

    /// Index of the machine box under a terminal position.
    fn hit(&self, column: u16, row: u16) -> Option<usize> {
        let vp = self.viewport.get();
        if !vp.contains(Position::new(column, row)) {
            return None;
        }
        let x = u32::from(column - vp.x) + self.pan_x;
        let y = u32::from(row - vp.y) + self.pan_y;

        let mut offset = 0;
        for placed in &self.placed {
            let origin = placed.origin();
            if (origin..origin + placed.layout.height).contains(&y) {
                return placed
                    .layout
                    .machines
                    .iter()
                    .position(|b| b.rect.contains(x, y - origin))
                    .map(|i| offset + i);
            }
            offset += placed.layout.machines.len();
        }
        None
    }

    fn machine_at_index(&self, index: usize) -> Option<Arc<Machine>> {
        self.boxes().nth(index).map(|b| Arc::clone(&b.machine))
    }

    /// Route to the neighbouring section, wrapping through "all".
    fn cycle_section(&self, forward: bool) -> Option<Action> {
        if self.sections.is_empty() {
            return None;
        }
        let len = self.sections.len();
        let current = self
            .route
            .selected()
            .and_then(|s| self.sections.iter().position(|name| name == s));
        let next = match current {
            None if forward => Some(0),
            None => Some(len - 1),
            Some(i) if forward => (i + 1 < len).then_some(i + 1),
            Some(i) => i.checked_sub(1),
        };
        Some(Action::SelectSection(next.map_or_else(SectionRoute::all, |i| {
            SectionRoute::section(self.sections[i].clone())
        })))
    }

    fn paint(&self, ctx: &mut Context<'_>) {
        if self.show_connectors {
            for placed in &self.placed {
                let base = f64::from(placed.origin());
                for c in &placed.layout.connectors {
                    ctx.draw(&CanvasLine {
                        x1: c.from.x,
                        y1: -(base + c.from.y),
                        x2: c.to.x,
                        y2: -(base + c.to.y),
                        color: theme::connector_color(c.kind),
                    });
                }
            }
            ctx.layer();
        }

        let cell = self.metrics.cell_width;
        let label_width = self.metrics.label_width;
        let mut index = 0;

        for placed in &self.placed {
            let base = placed.origin();
            let layout = &placed.layout;

            let mut header = vec![
                Span::styled(format!(" {} ", layout.section), theme::section_header()),
                Span::styled(format!("  {} machines", placed.machine_count), theme::key_hint()),
            ];
            if placed.off_grid > 0 {
                header.push(Span::styled(
                    format!("  {} off-grid", placed.off_grid),
                    Style::default().fg(theme::ELECTRIC_YELLOW),
                ));
            }
            ctx.print(0.0, -f64::from(placed.top), Line::from(header));

            for column in 1..=MAX_COLUMNS {
                let x = label_width + (column - 1) * cell + cell / 2 - 1;
                ctx.print(
                    f64::from(x),
                    -f64::from(base),
                    Span::styled(column.to_string(), theme::key_hint()),
                );
            }

            for row in &layout.rows {
                ctx.print(
                    1.0,
                    -f64::from(base + row.y + 1),
                    Span::styled(row.bay.clone(), theme::title_style()),
                );
            }

            for sw in &layout.switches {
                let color = if sw.is_main() {
                    theme::CORAL
                } else {
                    theme::NEON_CYAN
                };
                draw_box(ctx, base, sw.rect, color);
                label_box(
                    ctx,
                    base,
                    sw.rect,
                    &format!("{} {}", sw.id, sw.ports),
                    Style::default().fg(color),
                );
            }

            for b in &layout.machines {
                let selected = self.cursor == Some(index);
                let color = theme::status_color(b.color);
                draw_box(
                    ctx,
                    base,
                    b.rect,
                    if selected { theme::ELECTRIC_PURPLE } else { color },
                );
                let style = if selected {
                    theme::table_selected()
                } else {
                    Style::default().fg(color)
                };
                label_box(ctx, base, b.rect, &b.machine.name, style);
                index += 1;
            }
        }
    }
}

fn draw_box(ctx: &mut Context<'_>, base: u32, rect: geometry::Rect, color: ratatui::style::Color) {
    ctx.draw(&Rectangle {
        x: f64::from(rect.x),
        y: -f64::from(base + rect.y + rect.height.saturating_sub(1)),
        width: f64::from(rect.width.saturating_sub(1)),
        height: f64::from(rect.height.saturating_sub(1)),
        color,
    });
}

fn label_box(ctx: &mut Context<'_>, base: u32, rect: geometry::Rect, text: &str, style: Style) {
    let room = usize::try_from(rect.width.saturating_sub(2)).unwrap_or(0);
    ctx.print(
        f64::from(rect.x + 1),
        -f64::from(base + rect.y + rect.height / 2),
        Span::styled(truncate(text, room), style),
    );
}

/// Cut to `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

impl Component for GridScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let step_x = i64::from(PAN_STEP_X);
        let step_y = i64::from(PAN_STEP_Y);
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.pan(-step_x, 0),
            KeyCode::Right | KeyCode::Char('l') => self.pan(step_x, 0),
            KeyCode::Up | KeyCode::Char('k') => self.pan(0, -step_y),
            KeyCode::Down | KeyCode::Char('j') => self.pan(0, step_y),
            KeyCode::Home | KeyCode::Char('g') => {
                self.pan_x = 0;
                self.pan_y = 0;
            }
            KeyCode::Char('n') => self.move_cursor(true),
            KeyCode::Char('p') => self.move_cursor(false),
            KeyCode::Char('c') => self.show_connectors = !self.show_connectors,
            KeyCode::Char(']') => return Ok(self.cycle_section(true)),
            KeyCode::Char('[') => return Ok(self.cycle_section(false)),
            KeyCode::Char('a') => return Ok(Some(Action::SelectSection(SectionRoute::all()))),
            KeyCode::Enter => {
                return Ok(self
                    .cursor
                    .and_then(|i| self.machine_at_index(i))
                    .map(Action::OpenDetail));
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        match mouse.kind {
            MouseEventKind::Moved => {
                if let Some(i) = self.hit(mouse.column, mouse.row) {
                    self.cursor = Some(i);
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(i) = self.hit(mouse.column, mouse.row) {
                    self.cursor = Some(i);
                    return Ok(self.machine_at_index(i).map(Action::OpenDetail));
                }
            }
            MouseEventKind::ScrollDown => self.pan(0, i64::from(PAN_STEP_Y)),
            MouseEventKind::ScrollUp => self.pan(0, -i64::from(PAN_STEP_Y)),
            MouseEventKind::ScrollRight => self.pan(i64::from(PAN_STEP_X), 0),
            MouseEventKind::ScrollLeft => self.pan(-i64::from(PAN_STEP_X), 0),
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::MachinesUpdated(machines) => {
                self.machines = Arc::clone(machines);
                self.rebuild();
            }
            Action::SelectSection(route) => {
                if *route != self.route {
                    self.route = route.clone();
                    self.pan_x = 0;
                    self.pan_y = 0;
                    self.cursor = None;
                    self.rebuild();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = format!(
            " Grid  ·  {}  ·  {} machines ",
            self.route.selected().unwrap_or("all sections"),
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

        if self.machines.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(" Waiting for machine status…", theme::key_hint())),
                content_area,
            );
        } else if self.placed.is_empty() {
            let name = self.route.selected().unwrap_or_default();
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!(" No machines in section '{name}'  (a shows all)"),
                    theme::key_hint(),
                )),
                content_area,
            );
        } else if content_area.width >= 2 && content_area.height >= 2 {
            let left = f64::from(self.pan_x);
            let top = f64::from(self.pan_y);
            let canvas = Canvas::default()
                .x_bounds([left, left + f64::from(content_area.width - 1)])
                .y_bounds([-(top + f64::from(content_area.height - 1)), -top])
                .paint(|ctx| self.paint(ctx));
            frame.render_widget(canvas, content_area);
        }

        let hints = Line::from(vec![
            Span::styled("  ←↑↓→ ", theme::key_hint_key()),
            Span::styled("pan  ", theme::key_hint()),
            Span::styled("n/p ", theme::key_hint_key()),
            Span::styled("machine  ", theme::key_hint()),
            Span::styled("Enter ", theme::key_hint_key()),
            Span::styled("details  ", theme::key_hint()),
            Span::styled("c ", theme::key_hint_key()),
            Span::styled(
                if self.show_connectors {
                    "hide lines  "
                } else {
                    "show lines  "
                },
                theme::key_hint(),
            ),
            Span::styled("[ ] ", theme::key_hint_key()),
            Span::styled("section  ", theme::key_hint()),
            Span::styled("a ", theme::key_hint_key()),
            Span::styled("all", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), hints_area);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &'static str {
        "Grid"
    }
}
