use super::rows::TableRow;
use crate::config::ListsConfig;
use crate::controller::{ListController, ListSnapshot};
use crate::search::ViewState;
use crate::sync::MemoryLocation;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};

/// Paginated, filterable table of one endpoint's entities
pub struct ListView<E: TableRow> {
  controller: ListController<E, MemoryLocation>,
  lists: ListsConfig,
  table_state: TableState,
  search: SearchInput,
}

impl<E: TableRow> ListView<E> {
  pub fn new(controller: ListController<E, MemoryLocation>, lists: ListsConfig) -> Self {
    let mut view = Self {
      controller,
      lists,
      table_state: TableState::default(),
      search: SearchInput::new(),
    };
    // Start fetching immediately
    view.controller.refresh();
    view
  }

  fn state(&self) -> &ViewState {
    self.controller.state()
  }

  fn title(&self, snapshot: &ListSnapshot<'_, E>) -> String {
    let label = E::ENDPOINT.label();
    let counts = match (snapshot.current_count, snapshot.total_count) {
      (Some(current), Some(total)) if self.state().filter_text.is_some() => {
        format!("{} of {}", current, total)
      }
      (_, Some(total)) => total.to_string(),
      _ => "…".to_string(),
    };
    let suffix = if snapshot.is_loading { " loading..." } else { "" };
    format!(" {} ({}){} ", label, counts, suffix)
  }

  /// "rows 11-20 of 42 · page 2/5 · sort · filter"
  fn pagination_line(&self, snapshot: &ListSnapshot<'_, E>) -> Line<'static> {
    let state = self.state();
    let first = state.offset.saturating_add(1);
    let last = state.offset.saturating_add(snapshot.row_count as u64);
    let mut parts = Vec::new();

    // Placeholder rows belong to the previous page, so no range is shown
    parts.push(match snapshot.current_count {
      _ if snapshot.is_placeholder => format!("loading rows from offset {}", state.offset),
      Some(count) if snapshot.row_count > 0 => format!("rows {}-{} of {}", first, last, count),
      Some(count) => format!("no rows at offset {} of {}", state.offset, count),
      None => format!("offset {}", state.offset),
    });

    let page = state.page_index().saturating_add(1);
    match snapshot.current_count {
      Some(count) => {
        let pages = count.div_ceil(u64::from(state.limit)).max(1);
        parts.push(format!("page {}/{}", page, pages));
      }
      None => parts.push(format!("page {}", page)),
    }
    parts.push(format!("{} per page", state.limit));

    if E::ENDPOINT.supports_sort() {
      parts.push(format!("sort: {}", state.sort.label()));
    }
    if let Some(filter) = &state.filter_text {
      parts.push(format!("filter: {}", filter));
    }

    Line::from(Span::styled(
      format!(" {}", parts.join(" · ")),
      Style::default().fg(Color::DarkGray),
    ))
  }

  fn empty_message(&self, snapshot: &ListSnapshot<'_, E>) -> String {
    let label = E::ENDPOINT.label().to_lowercase();
    match snapshot.error {
      Some(e) if e.is_retryable() => "Failed to load. Press 'r' to retry.".to_string(),
      Some(e) => format!("Failed to load: {}", e.kind),
      None if self.state().filter_text.is_some() => format!("No {} match the filter.", label),
      None => format!("No {} found.", label),
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    let snapshot = self.controller.snapshot();
    let title = self.title(&snapshot);
    let pagination = self.pagination_line(&snapshot);
    ensure_valid_selection(&mut self.table_state, snapshot.row_count);

    let border = if snapshot.is_placeholder {
      Color::DarkGray
    } else {
      Color::Blue
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    if snapshot.items.is_empty() && !snapshot.is_loading {
      let paragraph = Paragraph::new(self.empty_message(&snapshot))
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[0]);
    } else {
      let header = Row::new(E::headers().iter().copied())
        .style(Style::default().add_modifier(Modifier::BOLD));
      let rows: Vec<Row> = snapshot.items.iter().map(|e| Row::new(e.cells())).collect();

      let table = Table::new(rows, E::widths())
        .header(header)
        .block(block)
        .row_highlight_style(
          Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

      frame.render_stateful_widget(table, chunks[0], &mut self.table_state);
    }

    frame.render_widget(Paragraph::new(pagination), chunks[1]);
  }

  fn move_selection(&mut self, delta: isize) {
    let len = self.controller.snapshot().row_count;
    if len == 0 {
      return;
    }
    let current = self.table_state.selected().unwrap_or(0) as isize;
    let next = (current + delta).rem_euclid(len as isize) as usize;
    self.table_state.select(Some(next));
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let current = self.state().filter_text.clone();
    match self.search.handle_key(key, current.as_deref()) {
      KeyResult::Handled | KeyResult::Event(SearchEvent::Cancelled) => Some(ViewAction::None),
      KeyResult::Event(SearchEvent::Submitted(text)) => {
        self.controller.on_filter_change(Some(text));
        self.table_state.select(Some(0));
        Some(ViewAction::None)
      }
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
      KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
        self.controller.next_page();
        self.table_state.select(Some(0));
      }
      KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
        self.controller.previous_page();
        self.table_state.select(Some(0));
      }
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('+') => {
        let size = self.lists.step_page_size(self.state().limit, true);
        self.controller.set_page_size(size);
      }
      KeyCode::Char('-') => {
        let size = self.lists.step_page_size(self.state().limit, false);
        self.controller.set_page_size(size);
      }
      KeyCode::Char('s') if E::ENDPOINT.supports_sort() => {
        let sort = self.state().sort.next();
        self.controller.on_sort_change(sort);
      }
      KeyCode::Char('r') => self.controller.refetch(),
      KeyCode::Esc if self.state().filter_text.is_some() => {
        self.controller.on_filter_change(None);
      }
      KeyCode::Char('q') => return Some(ViewAction::Quit),
      _ => return None,
    }
    Some(ViewAction::None)
  }
}

impl<E: TableRow> View for ListView<E> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    E::ENDPOINT.label().to_string()
  }

  fn location(&self) -> String {
    self.controller.location().href()
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active()
  }

  fn tick(&mut self) {
    self.controller.poll();
  }

  fn status_message(&self) -> Option<String> {
    self.controller.snapshot().error.map(|e| e.to_string())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "filter").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("+/-", "size").with_priority(40),
      ShortcutInfo::new("r", "refetch").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ];
    if E::ENDPOINT.supports_sort() {
      shortcuts.push(ShortcutInfo::new("s", "sort").with_priority(50));
    }
    shortcuts
  }
}
