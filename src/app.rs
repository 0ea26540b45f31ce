use crate::api::Endpoint;
use crate::cache::QueryCache;
use crate::commands::CommandAction;
use crate::config::Config;
use crate::controller::ListController;
use crate::event::{Event, EventHandler};
use crate::query::QueryClient;
use crate::sync::{MemoryLocation, ViewStateSync};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{ListView, TableRow};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{info, warn};

/// Main application state
pub struct App {
  /// The list view on screen
  view: Box<dyn View>,

  /// Command input (after pressing :)
  command: CommandInput,

  /// Transient message for the footer, cleared on the next key
  notice: Option<String>,

  config: Config,

  client: QueryClient,

  should_quit: bool,
}

impl App {
  /// Open `endpoint` with the view state encoded in `query`
  pub fn new(config: Config, client: QueryClient, endpoint: Endpoint, query: &str) -> Self {
    let view = open_view(&client, &config, endpoint, query);
    Self {
      view,
      command: CommandInput::new(),
      notice: None,
      config,
      client,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
  ) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(100));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.view.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    self.notice = None;

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // The view's own overlays get the keyboard first
    if !self.view.is_capturing_input() {
      match self.command.handle_key(key) {
        KeyResult::Handled | KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::Event(CommandEvent::Run(cmd)) => {
          self.run_command(cmd.action);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          warn!(%input, "unknown command");
          self.notice = Some(format!("unknown command: {}", input));
          return;
        }
        KeyResult::NotHandled => {}
      }
    }

    match self.view.handle_key(key) {
      ViewAction::Quit => self.should_quit = true,
      ViewAction::None => {}
    }
  }

  fn run_command(&mut self, action: CommandAction) {
    match action {
      CommandAction::Open(endpoint) => {
        info!(endpoint = endpoint.name(), "open view");
        self.view = open_view(&self.client, &self.config, endpoint, "");
      }
      CommandAction::Quit => self.should_quit = true,
    }
  }

  // Accessors for UI rendering
  pub fn title(&self) -> String {
    self.config.display_title()
  }

  pub fn view_mut(&mut self) -> &mut dyn View {
    self.view.as_mut()
  }

  pub fn notice(&self) -> Option<&str> {
    self.notice.as_deref()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command
  }
}

fn open_view(
  client: &QueryClient,
  config: &Config,
  endpoint: Endpoint,
  query: &str,
) -> Box<dyn View> {
  match endpoint {
    Endpoint::Variables => list_view(client, config, query, client.variables()),
    Endpoint::WorkPools => list_view(client, config, query, client.work_pools()),
  }
}

fn list_view<E: TableRow>(
  client: &QueryClient,
  config: &Config,
  query: &str,
  cache: &QueryCache<Vec<E>>,
) -> Box<dyn View> {
  let location = MemoryLocation::new(E::ENDPOINT.route(), query);
  let controller = ListController::new(
    ViewStateSync::new(location),
    client.binder().clone(),
    cache.clone(),
    client.counts().clone(),
  );
  Box::new(ListView::new(controller, config.lists.clone()))
}
