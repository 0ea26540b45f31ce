use crate::api::{Entity, Variable, WorkPool};
use crate::ui::renderfns::{format_timestamp, status_color, truncate};
use ratatui::prelude::*;
use ratatui::widgets::Cell;

/// How an entity renders as a table row
pub trait TableRow: Entity {
  fn headers() -> &'static [&'static str];

  fn widths() -> Vec<Constraint>;

  fn cells(&self) -> Vec<Cell<'static>>;
}

impl TableRow for Variable {
  fn headers() -> &'static [&'static str] {
    &["NAME", "VALUE", "TAGS", "UPDATED"]
  }

  fn widths() -> Vec<Constraint> {
    vec![
      Constraint::Percentage(30),
      Constraint::Percentage(35),
      Constraint::Percentage(20),
      Constraint::Length(16),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    // Strings render bare, everything else as compact JSON
    let value = match &self.value {
      serde_json::Value::String(s) => s.clone(),
      other => other.to_string(),
    };
    vec![
      Cell::from(self.name.clone()).style(Style::default().fg(Color::Cyan)),
      Cell::from(truncate(&value, 60)),
      Cell::from(self.tags.join(", ")).style(Style::default().fg(Color::DarkGray)),
      Cell::from(format_timestamp(self.updated.as_ref())),
    ]
  }
}

impl TableRow for WorkPool {
  fn headers() -> &'static [&'static str] {
    &["NAME", "TYPE", "STATUS", "CONCURRENCY", "UPDATED"]
  }

  fn widths() -> Vec<Constraint> {
    vec![
      Constraint::Percentage(35),
      Constraint::Percentage(20),
      Constraint::Length(10),
      Constraint::Length(12),
      Constraint::Length(16),
    ]
  }

  fn cells(&self) -> Vec<Cell<'static>> {
    let status = self.status();
    let concurrency = self
      .concurrency_limit
      .map(|l| l.to_string())
      .unwrap_or_else(|| "∞".to_string());
    vec![
      Cell::from(self.name.clone()).style(Style::default().fg(Color::Cyan)),
      Cell::from(self.pool_type.clone()).style(Style::default().fg(Color::Yellow)),
      Cell::from(status.label()).style(Style::default().fg(status_color(status))),
      Cell::from(concurrency),
      Cell::from(format_timestamp(self.updated.as_ref())),
    ]
  }
}
