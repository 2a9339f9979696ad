// ABOUTME: Main layout component stacking the toolbar above the relayed terminal

use ratatui::prelude::*;

use super::ToolbarComponent;
use crate::app::App;
use crate::surface::TOOLBAR_HEIGHT;

pub struct LayoutComponent {
    toolbar: ToolbarComponent,
}

impl LayoutComponent {
    pub fn new() -> Self {
        Self {
            toolbar: ToolbarComponent::new(),
        }
    }

    pub fn render(&self, frame: &mut Frame, app: &App) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(TOOLBAR_HEIGHT), // Toolbar
                Constraint::Min(0),                 // Terminal
            ])
            .split(frame.size());

        self.toolbar.render(frame, chunks[0], &app.state);
        frame.render_widget(app.adapter().surface().view(), chunks[1]);
    }
}

impl Default for LayoutComponent {
    fn default() -> Self {
        Self::new()
    }
}
