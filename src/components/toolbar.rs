// ABOUTME: Toolbar with the connection status indicator and the session start/stop control

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::AppState;
use crate::relay::ConnectionStatus;

pub struct ToolbarComponent;

impl ToolbarComponent {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        let line = Line::from(Self::spans(state));

        let toolbar = Paragraph::new(line).block(
            Block::default()
                .title(format!(" Web Relay - {} ", state.endpoint))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );

        frame.render_widget(toolbar, area);
    }

    /// Indicator color for a connection status
    pub const fn indicator_color(status: ConnectionStatus) -> Color {
        match status {
            ConnectionStatus::Connected => Color::Green,
            ConnectionStatus::Disconnected => Color::DarkGray,
            ConnectionStatus::Error => Color::Red,
        }
    }

    fn spans(state: &AppState) -> Vec<Span<'static>> {
        let button_style = if state.session_button_enabled() {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM)
        };

        let mut spans = vec![
            Span::styled(
                " ● ",
                Style::default().fg(Self::indicator_color(state.connection)),
            ),
            Span::raw(state.connection.as_str()),
            Span::raw("  "),
            Span::styled(
                format!("[F2] {}", state.session_button_label()),
                button_style,
            ),
            Span::styled(
                "  [F5] reconnect  [F10] quit",
                Style::default().fg(Color::Gray),
            ),
        ];

        if let Some(notice) = &state.notice {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                notice.clone(),
                Style::default().fg(Color::LightBlue),
            ));
        }

        spans
    }
}

impl Default for ToolbarComponent {
    fn default() -> Self {
        Self::new()
    }
}
