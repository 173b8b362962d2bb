//! Application core: event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bayview_core::{Controller, DismissReason, MachineDetail, SectionRoute, Selection};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::detail_modal::{self, ModalHit};

const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Connection status as seen by the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting(u32),
}

/// Top-level application state and event loop.
pub struct App {
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    connection_status: ConnectionStatus,
    help_visible: bool,
    /// Machine shown in the detail overlay.
    selection: Selection,
    machine_count: usize,
    last_snapshot: Option<DateTime<Utc>>,
    route: SectionRoute,
    notification: Option<(Notification, Instant)>,
    throbber_state: throbber_widgets_tui::ThrobberState,
    terminal_size: (u16, u16),
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Live data source. Without one the dashboard stays empty.
    controller: Option<Controller>,
    data_cancel: CancellationToken,
}

impl App {
    pub fn new(controller: Option<Controller>, start: ScreenId, route: SectionRoute) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let mut screens: HashMap<ScreenId, Box<dyn Component>> =
            create_screens(&route).into_iter().collect();
        if let Some(screen) = screens.get_mut(&start) {
            screen.set_focused(true);
        }

        Self {
            active_screen: start,
            screens,
            running: true,
            connection_status: ConnectionStatus::default(),
            help_visible: false,
            selection: Selection::default(),
            machine_count: 0,
            last_snapshot: None,
            route,
            notification: None,
            throbber_state: throbber_widgets_tui::ThrobberState::default(),
            terminal_size: (0, 0),
            action_tx,
            action_rx,
            controller,
            data_cancel: CancellationToken::new(),
        }
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.terminal_size = tui.size().unwrap_or((80, 24));

        if let Some(controller) = self.controller.clone() {
            let cancel = self.data_cancel.clone();
            let tx = self.action_tx.clone();
            tokio::spawn(async move {
                crate::data_bridge::spawn_data_bridge(controller, tx, cancel).await;
            });
        } else {
            self.action_tx
                .send(Action::Notify(Notification::warning("No status server configured")))?;
        }

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!(route = %self.route, screen = %self.active_screen, "TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(action) = self.handle_mouse_event(mouse)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.data_cancel.cancel();
        events.stop();
        tui.exit();
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. The detail overlay and text entry take
    /// keys first, then global shortcuts, then the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.selection.is_showing() {
            return Ok(match key.code {
                KeyCode::Esc if self.selection.handles_escape() => {
                    Some(Action::DismissDetail(DismissReason::Escape))
                }
                KeyCode::Char('x') | KeyCode::Enter => {
                    Some(Action::DismissDetail(DismissReason::Close))
                }
                KeyCode::Char('q') => Some(Action::Quit),
                _ => None,
            });
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            if screen.captures_input() {
                return screen.handle_key_event(key);
            }
        }

        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Char('r')) => return Ok(Some(Action::Refresh)),

            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='9')) => {
                if let Some(screen) = c
                    .to_digit(10)
                    .and_then(|n| u8::try_from(n).ok())
                    .and_then(ScreenId::from_number)
                {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }

            _ => {}
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }
        Ok(None)
    }

    /// While the overlay is up, clicks close it or fall on the dialog.
    /// Otherwise mouse input goes to the active screen.
    fn handle_mouse_event(&mut self, mouse: MouseEvent) -> Result<Option<Action>> {
        if self.selection.is_showing() {
            if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                let (w, h) = self.terminal_size;
                return Ok(match detail_modal::hit_test(Rect::new(0, 0, w, h), mouse.column, mouse.row) {
                    ModalHit::Close => Some(Action::DismissDetail(DismissReason::Close)),
                    ModalHit::Backdrop => Some(Action::DismissDetail(DismissReason::Backdrop)),
                    ModalHit::Dialog => None,
                });
            }
            return Ok(None);
        }
        if self.help_visible {
            return Ok(None);
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_mouse_event(mouse);
        }
        Ok(None)
    }

    /// Process a single action: update app state and propagate to components.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Resize(w, h) => self.terminal_size = (*w, *h),

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {} → {}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                }
            }

            Action::SelectSection(route) => {
                info!(route = %route, "section selected");
                self.route = route.clone();
                self.broadcast(action)?;
            }

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::MachinesUpdated(snapshot) => {
                self.machine_count = snapshot.len();
                if self.selection.refresh(snapshot) {
                    debug!("detail overlay refreshed from new snapshot");
                }
                self.broadcast(action)?;
            }

            Action::SnapshotReceived(at) => self.last_snapshot = Some(*at),

            Action::Refresh => self.refresh(),

            Action::Connecting => self.connection_status = ConnectionStatus::Connecting,
            Action::Connected => self.connection_status = ConnectionStatus::Connected,
            Action::Reconnecting(attempt) => {
                self.connection_status = ConnectionStatus::Reconnecting(*attempt);
            }
            Action::Disconnected(reason) => {
                self.connection_status = ConnectionStatus::Disconnected;
                self.notify(Notification::error(reason.clone()));
            }

            Action::OpenDetail(machine) => {
                debug!(machine = %machine.name, "detail opened");
                self.selection.select(machine.clone());
            }
            Action::DismissDetail(reason) => {
                self.selection.dismiss(*reason);
            }

            Action::Notify(notification) => self.notify(notification.clone()),

            Action::Tick => {
                self.throbber_state.calc_next();
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, created)| created.elapsed() > NOTIFICATION_TTL)
                {
                    self.notification = None;
                }
            }

            Action::Render => {}
        }
        Ok(())
    }

    /// Data and route changes go to every screen so they stay in sync.
    fn broadcast(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    fn notify(&mut self, notification: Notification) {
        self.notification = Some((notification, Instant::now()));
    }

    /// Re-fetch the snapshot in the background.
    fn refresh(&self) {
        let Some(controller) = self.controller.clone() else {
            let _ = self
                .action_tx
                .send(Action::Notify(Notification::error("Not connected")));
            return;
        };
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            match controller.refresh().await {
                Ok(count) => {
                    let _ = tx.send(Action::Notify(Notification::success(format!(
                        "Refreshed {count} machines"
                    ))));
                }
                Err(e) => {
                    warn!(error = %e, "refresh failed");
                    let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                }
            }
        });
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // [screen content] [tab bar] [status bar]
        let layout = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[0]);
        }
        self.render_tab_bar(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        // Overlays, last is topmost.
        if let Some((ref notif, _)) = self.notification {
            render_notification(frame, area, notif);
        }
        if let Some(machine) = self.selection.machine() {
            detail_modal::render(frame, area, &MachineDetail::from_machine(machine));
        }
        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(
                    format!(" {} {} ", id.number(), id.label()),
                    style,
                ))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::ALL
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );
        frame.render_widget(tabs, area);
    }

    /// Connection, machine count, snapshot age, route and key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let [conn_area, rest] =
            Layout::horizontal([Constraint::Length(22), Constraint::Min(0)]).areas(area);

        match self.connection_status {
            ConnectionStatus::Connecting | ConnectionStatus::Reconnecting(_) => {
                let label = match self.connection_status {
                    ConnectionStatus::Reconnecting(attempt) => format!("reconnecting ({attempt})"),
                    _ => "connecting".to_owned(),
                };
                let throbber = throbber_widgets_tui::Throbber::default()
                    .label(label)
                    .style(Style::default().fg(theme::ELECTRIC_YELLOW))
                    .throbber_style(Style::default().fg(theme::ELECTRIC_PURPLE));
                frame.render_stateful_widget(
                    throbber,
                    Rect {
                        x: conn_area.x + 1,
                        width: conn_area.width.saturating_sub(1),
                        ..conn_area
                    },
                    &mut self.throbber_state.clone(),
                );
            }
            ConnectionStatus::Connected => frame.render_widget(
                Paragraph::new(Span::styled(
                    " ● connected",
                    Style::default().fg(theme::SUCCESS_GREEN),
                )),
                conn_area,
            ),
            ConnectionStatus::Disconnected => frame.render_widget(
                Paragraph::new(Span::styled(
                    " ○ disconnected",
                    Style::default().fg(theme::ERROR_RED),
                )),
                conn_area,
            ),
        }

        let updated = self.last_snapshot.map_or_else(
            || "no snapshot yet".to_owned(),
            |at| format!("updated {} ago", snapshot_age(at, Utc::now())),
        );
        let line = Line::from(vec![
            Span::styled("│ ", theme::key_hint()),
            Span::styled(
                format!("{} machines", self.machine_count),
                Style::default().fg(theme::NEON_CYAN),
            ),
            Span::styled(format!("  {updated}"), theme::key_hint()),
            Span::styled(
                format!("  {}", self.route.to_path()),
                Style::default().fg(theme::CORAL),
            ),
            Span::styled(" │ ? help  r refresh  q quit", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), rest);
    }
}

/// Whole-second age of a snapshot, e.g. `1m 5s`.
fn snapshot_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).to_std().map_or(0, |d| d.as_secs());
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_width = 60u16.min(area.width.saturating_sub(4));
    let help_height = 24u16.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG_DARK)),
        help_area,
    );

    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused());
    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(text, Style::default().fg(theme::NEON_CYAN)))
    };
    let entry = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
            Span::styled(what, theme::key_hint()),
        ])
    };

    let help_text = vec![
        Line::from(""),
        heading("  Navigation"),
        Line::from(Span::styled("  ─────────", theme::key_hint())),
        entry("1-2", "Jump to screen"),
        entry("Tab", "Next screen"),
        entry("[ ]", "Previous / next section"),
        entry("a", "Show all sections"),
        entry("Enter", "Open machine / select section"),
        Line::from(""),
        heading("  Grid"),
        Line::from(Span::styled("  ────", theme::key_hint())),
        entry("h/j/k/l", "Pan"),
        entry("n/p", "Next / previous machine"),
        entry("c", "Toggle connectors"),
        Line::from(""),
        heading("  Sections"),
        Line::from(Span::styled("  ────────", theme::key_hint())),
        entry("j/k", "Move"),
        entry("/", "Filter focused section"),
        Line::from(""),
        heading("  Global"),
        Line::from(Span::styled("  ──────", theme::key_hint())),
        entry("r", "Refresh snapshot"),
        entry("?", "This help"),
        entry("q", "Quit"),
    ];
    frame.render_widget(Paragraph::new(help_text), inner);
}

/// Toast in the bottom-right corner, above the status bar.
fn render_notification(frame: &mut Frame, area: Rect, notif: &Notification) {
    let msg_len = u16::try_from(notif.message.chars().count()).unwrap_or(u16::MAX);
    let width = msg_len.saturating_add(6).clamp(20, 60).min(area.width);
    let height = 3u16;

    let x = area.width.saturating_sub(width + 1);
    let y = area.height.saturating_sub(height + 2);
    let toast_area = Rect::new(area.x + x, area.y + y, width, height.min(area.height));

    let (border_color, icon) = match notif.level {
        NotificationLevel::Success => (theme::SUCCESS_GREEN, "✓"),
        NotificationLevel::Error => (theme::ERROR_RED, "✗"),
        NotificationLevel::Warning => (theme::ELECTRIC_YELLOW, "!"),
        NotificationLevel::Info => (theme::NEON_CYAN, "·"),
    };

    frame.render_widget(
        Block::default().style(Style::default().bg(theme::BG_DARK)),
        toast_area,
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(toast_area);
    frame.render_widget(block, toast_area);

    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
        Span::styled(notif.message.as_str(), Style::default().fg(theme::DIM_WHITE)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bayview_core::Machine;
    use ratatui::{Terminal, backend::TestBackend};

    fn app() -> App {
        let mut app = App::new(None, ScreenId::Grid, SectionRoute::all());
        app.process_action(&Action::Resize(100, 40)).unwrap();
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn press(app: &mut App, code: KeyCode) {
        if let Some(action) = app.handle_key_event(key(code)).unwrap() {
            app.process_action(&action).unwrap();
        }
    }

    fn machine(name: &str, section: &str) -> Arc<Machine> {
        let mut m = Machine::named(name);
        m.section = Some(section.into());
        Arc::new(m)
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn escape_only_dismisses_while_showing() {
        let mut app = app();
        assert!(!matches!(
            app.handle_key_event(key(KeyCode::Esc)).unwrap(),
            Some(Action::DismissDetail(_))
        ));

        app.process_action(&Action::OpenDetail(machine("PRESS-01", "North")))
            .unwrap();
        assert!(matches!(
            app.handle_key_event(key(KeyCode::Esc)).unwrap(),
            Some(Action::DismissDetail(DismissReason::Escape))
        ));
        press(&mut app, KeyCode::Esc);
        assert!(!app.selection.is_showing());
    }

    #[test]
    fn clicks_outside_the_dialog_dismiss_it() {
        let mut app = app();
        app.process_action(&Action::OpenDetail(machine("PRESS-01", "North")))
            .unwrap();

        // Inside the dialog body: nothing happens.
        assert!(app.handle_mouse_event(click(30, 15)).unwrap().is_none());
        assert!(matches!(
            app.handle_mouse_event(click(78, 8)).unwrap(),
            Some(Action::DismissDetail(DismissReason::Close))
        ));
        assert!(matches!(
            app.handle_mouse_event(click(1, 1)).unwrap(),
            Some(Action::DismissDetail(DismissReason::Backdrop))
        ));
    }

    #[test]
    fn global_keys_are_blocked_while_typing_a_filter() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.active_screen, ScreenId::Sections);

        app.process_action(&Action::MachinesUpdated(Arc::new(vec![machine(
            "PRESS-01", "North",
        )])))
        .unwrap();
        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Char('q'));
        assert!(app.running);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[test]
    fn snapshot_refreshes_the_open_detail() {
        let mut app = app();
        app.process_action(&Action::OpenDetail(machine("PRESS-01", "North")))
            .unwrap();
        app.process_action(&Action::MachinesUpdated(Arc::new(vec![machine(
            "PRESS-01", "South",
        )])))
        .unwrap();
        assert_eq!(
            app.selection.machine().unwrap().section.as_deref(),
            Some("South")
        );
        assert_eq!(app.machine_count, 1);
    }

    #[test]
    fn status_bar_shows_connection_count_and_route() {
        let mut app = app();
        app.process_action(&Action::Connected).unwrap();
        app.process_action(&Action::MachinesUpdated(Arc::new(vec![
            machine("PRESS-01", "North"),
            machine("LATHE-02", "North"),
        ])))
        .unwrap();
        app.process_action(&Action::SelectSection(SectionRoute::section("North")))
            .unwrap();

        let text = draw(&app);
        assert!(text.contains("● connected"));
        assert!(text.contains("2 machines"));
        assert!(text.contains("/sections/North"));
        assert!(text.contains("no snapshot yet"));
        assert!(text.contains("1 Grid"));
    }

    #[test]
    fn detail_overlay_renders_over_the_screen() {
        let mut app = app();
        app.process_action(&Action::OpenDetail(machine("PRESS-01", "North")))
            .unwrap();
        assert!(draw(&app).contains("PRESS-01 Details"));
    }

    #[test]
    fn refresh_without_controller_reports_an_error() {
        let mut app = app();
        press(&mut app, KeyCode::Char('r'));
        let Ok(Action::Notify(notification)) = app.action_rx.try_recv() else {
            panic!("expected a notification");
        };
        assert_eq!(notification.level, NotificationLevel::Error);
    }

    #[test]
    fn snapshot_age_is_whole_seconds() {
        let at = Utc::now();
        let later = at + chrono::Duration::milliseconds(65_400);
        assert_eq!(snapshot_age(at, later), "1m 5s");
        assert_eq!(snapshot_age(later, at), "0s");
    }
}
