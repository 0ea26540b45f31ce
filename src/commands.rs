//! Available commands and autocomplete logic

use crate::api::Endpoint;

/// What a command does when run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  Open(Endpoint),
  Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "variables",
    aliases: &["v", "var", "vars"],
    description: "Browse variables",
    action: CommandAction::Open(Endpoint::Variables),
  },
  Command {
    name: "work-pools",
    aliases: &["wp", "pools", "work_pools"],
    description: "Browse work pools",
    action: CommandAction::Open(Endpoint::WorkPools),
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit listsync",
    action: CommandAction::Quit,
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // Stable sort keeps declaration order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` means no match
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}
