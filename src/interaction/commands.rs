//! Slash command responses.

use crate::prelude::*;

/// A slash command the bot registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Resources,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::Help, Command::Resources];

    pub fn name(self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Resources => "resources",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Help => "Print help for bot commands.",
            Command::Resources => "Print the list of available resources.",
        }
    }

    /// Whether only the caller sees the response.
    pub fn ephemeral(self) -> bool {
        matches!(self, Command::Help)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// The text the command answers with.
    #[instrument(skip(config))]
    pub fn respond(self, config: &Config) -> String {
        match self {
            Command::Help => help_text(),
            Command::Resources => resources_text(config),
        }
    }
}

fn help_text() -> String {
    let mut text = String::from("```\n");

    for command in Command::ALL {
        text.push_str(&format!("/{:<11}-  {}\n", command.name(), command.description()));
    }

    text.push_str("```");
    text
}

fn resources_text(config: &Config) -> String {
    if config.resources.is_empty() {
        return "There are currently no resources".to_string();
    }

    config.resources.iter().map(|r| format!("- {r}\n")).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::base::config::{ConfigInner, Resource};

    fn config(resources: Vec<Resource>) -> Config {
        Config {
            inner: Arc::new(ConfigInner { resources, ..Default::default() }),
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Command::from_name("help"), Some(Command::Help));
        assert_eq!(Command::from_name("resources"), Some(Command::Resources));
        assert_eq!(Command::from_name("nope"), None);
    }

    #[test]
    fn test_help_lists_commands() {
        let text = Command::Help.respond(&config(vec![]));

        assert!(text.starts_with("```\n"));
        assert!(text.ends_with("```"));
        assert!(text.contains("/help       -  Print help for bot commands."));
        assert!(text.contains("/resources  -  Print the list of available resources."));
    }

    #[test]
    fn test_no_resources() {
        assert_eq!(Command::Resources.respond(&config(vec![])), "There are currently no resources");
    }

    #[test]
    fn test_resources_list() {
        let text = Command::Resources.respond(&config(vec![Resource::new("Docs", "docs.rs", "Crate docs"), Resource::new("Book", "https://doc.rust-lang.org/book", "")]));

        assert_eq!(text, "- [Docs](https://docs.rs): Crate docs\n- [Book](https://doc.rust-lang.org/book)\n");
    }
}
