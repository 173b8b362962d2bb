//! Machine status dot: ● colored by status, ○ for a missing probe.

use ratatui::style::Style;
use ratatui::text::Span;

use bayview_core::StatusColor;

use crate::theme;

/// Dot for a known status.
pub fn status_span(color: StatusColor) -> Span<'static> {
    Span::styled("●", Style::default().fg(theme::status_color(color)))
}

/// Dot for a probe that may not have been reported.
pub fn probe_span(color: Option<StatusColor>) -> Span<'static> {
    match color {
        Some(color) => status_span(color),
        None => Span::styled("○", Style::default().fg(theme::BORDER_GRAY)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_follow_status() {
        assert_eq!(status_span(StatusColor::Orange).style.fg, Some(theme::WARNING_ORANGE));
        assert_eq!(probe_span(None).content, "○");
        assert_eq!(probe_span(Some(StatusColor::Red)).content, "●");
    }
}
