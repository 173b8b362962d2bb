//! Machine detail overlay: a centered dialog over a dimmed backdrop.
//!
//! Geometry is a pure function of the frame area so the app can hit-test
//! mouse clicks (close control, dialog body, backdrop) without keeping
//! render state around.

use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};

use bayview_core::{DetailField, MachineDetail};

use crate::theme;
use crate::widgets::status_dot::{probe_span, status_span};

const WIDTH: u16 = 64;
const HEIGHT: u16 = 24;
const LABEL_WIDTH: usize = 15;
const CLOSE_LABEL: &str = "[x]";

/// Where a click landed relative to the dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalHit {
    Close,
    Dialog,
    Backdrop,
}

/// The dialog rectangle, centered in `area`.
pub fn modal_area(area: Rect) -> Rect {
    let width = WIDTH.min(area.width.saturating_sub(4));
    let height = HEIGHT.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    )
}

/// The close control in the dialog's top border.
pub fn close_button(modal: Rect) -> Rect {
    let width = 3;
    Rect::new(
        modal.right().saturating_sub(width + 2).max(modal.x),
        modal.y,
        width,
        1,
    )
}

pub fn hit_test(area: Rect, column: u16, row: u16) -> ModalHit {
    let modal = modal_area(area);
    let pos = Position::new(column, row);
    if close_button(modal).contains(pos) {
        ModalHit::Close
    } else if modal.contains(pos) {
        ModalHit::Dialog
    } else {
        ModalHit::Backdrop
    }
}

fn field_line(field: &DetailField) -> Line<'_> {
    Line::from(vec![
        Span::styled(format!("  {:<LABEL_WIDTH$}", field.label), theme::field_label()),
        Span::styled(field.value.as_str(), theme::field_value()),
    ])
}

fn heading(text: &str) -> Line<'_> {
    Line::from(Span::styled(
        format!(" {text}"),
        Style::default()
            .fg(theme::ELECTRIC_PURPLE)
            .add_modifier(Modifier::BOLD),
    ))
}

pub fn render(frame: &mut Frame, area: Rect, detail: &MachineDetail) {
    let modal = modal_area(area);
    if modal.width < 20 || modal.height < 5 {
        return;
    }

    frame.render_widget(Clear, modal);

    let block = Block::default()
        .title(format!(" {} ", detail.title))
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused())
        .style(Style::default().bg(theme::BG_DARK));
    let inner = block.inner(modal);
    frame.render_widget(block, modal);
    frame.render_widget(
        Paragraph::new(Span::styled(CLOSE_LABEL, theme::key_hint_key())),
        close_button(modal),
    );

    let mut lines = vec![
        Line::from(vec![
            Span::raw(" "),
            status_span(detail.color),
            Span::raw(" "),
            Span::styled(
                detail.status,
                Style::default()
                    .fg(theme::status_color(detail.color))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        heading("Network"),
    ];
    lines.extend(detail.network.iter().map(field_line));
    lines.push(Line::from(""));
    lines.push(heading("Location & Uplink"));
    lines.extend(detail.location.iter().map(field_line));
    lines.push(Line::from(""));
    lines.push(heading("Probes"));
    for card in &detail.probes {
        lines.push(Line::from(vec![
            Span::raw("  "),
            probe_span(card.color),
            Span::styled(
                format!(" {:<13}", card.endpoint.to_string()),
                theme::field_label(),
            ),
            Span::styled(format!("{:<17}", card.ip), theme::field_value()),
            Span::styled(card.latency.as_str(), theme::table_row()),
        ]));
    }

    let body = Rect {
        height: inner.height.saturating_sub(1),
        ..inner
    };
    frame.render_widget(Paragraph::new(lines), body);

    let hints = Line::from(vec![
        Span::styled(" Esc", theme::key_hint_key()),
        Span::styled(" close  ", theme::key_hint()),
        Span::styled("click outside", theme::key_hint_key()),
        Span::styled(" dismiss", theme::key_hint()),
    ]);
    frame.render_widget(
        Paragraph::new(hints),
        Rect {
            y: inner.bottom().saturating_sub(1),
            height: 1.min(inner.height),
            ..inner
        },
    );
}
