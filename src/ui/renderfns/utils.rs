use crate::api::WorkPoolStatus;
use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

pub fn status_color(status: WorkPoolStatus) -> Color {
  match status {
    WorkPoolStatus::Ready => Color::Green,
    WorkPoolStatus::NotReady => Color::Red,
    WorkPoolStatus::Paused => Color::Yellow,
    WorkPoolStatus::Unknown => Color::DarkGray,
  }
}

/// Short timestamp for table cells
pub fn format_timestamp(ts: Option<&DateTime<Utc>>) -> String {
  ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("ééééé", 4), "é...");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color(WorkPoolStatus::Ready), Color::Green);
    assert_eq!(status_color(WorkPoolStatus::NotReady), Color::Red);
    assert_eq!(status_color(WorkPoolStatus::Paused), Color::Yellow);
  }

  #[test]
  fn test_format_timestamp() {
    let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
    assert_eq!(format_timestamp(Some(&ts)), "2024-03-09 14:05");
    assert_eq!(format_timestamp(None), "-");
  }
}
