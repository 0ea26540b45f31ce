pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::TableState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let title = app.title();
  let view = app.view_mut();
  let location = view.location();
  let shortcuts = view.shortcuts();
  let breadcrumb = vec![view.breadcrumb_label()];
  let status = view.status_message();

  renderfns::draw_header(frame, chunks[0], &title, &location, &shortcuts);
  view.render(frame, chunks[1]);

  let status = app.notice().map(str::to_string).or(status);
  renderfns::draw_footer(frame, chunks[2], &breadcrumb, status.as_deref());

  app.command_input().render_overlay(frame, chunks[1]);
}

/// Keep the selection inside `0..len`, selecting the first row when rows appear
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
