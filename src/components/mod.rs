// ABOUTME: UI components for the relay client: status toolbar and terminal layout

pub mod layout;
pub mod toolbar;

pub use layout::LayoutComponent;
pub use toolbar::ToolbarComponent;
