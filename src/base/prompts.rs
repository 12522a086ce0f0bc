//! System prompt assembly.

use crate::base::config::Config;

/// Appended to every system prompt so the model knows about the commands and the message format.
pub const COMMANDS_ADDENDUM: &str = concat!(
    " You can help people if they run the command `/help`.",
    " You can give information about resources if they run the command `/resources`.",
    " The users' messages will all be prefixed with (user_name user_id),",
    " where the user's name is user_name, and the user's id is user_id (the angle brackets are required).",
    " To mention someone, use their user_id with angle brackets and @."
);

/// Build the system prompt from the current config.
///
/// Called for every request so a changed config is never stale.
pub fn build_system_prompt(config: &Config) -> String {
    let mut prompt = config.system_prompt.clone();

    if !config.bot_name.is_empty() {
        prompt.push_str(&format!(" Your name is {}.", config.bot_name));
    }

    prompt.push_str(COMMANDS_ADDENDUM);

    prompt
}
