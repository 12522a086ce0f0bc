use tracing::{debug, info, instrument, warn};

use crate::{
    base::{
        config::{Config, HistoryScope},
        prompts::build_system_prompt,
        types::{ChatOutcome, IncomingMessage, Res},
    },
    service::{chat::ChatClient, dispatch::ResponseDispatcher, history::HistoryStore, llm::LlmClient},
};

/// Handles one inbound chat message.
///
/// Records the message, and when the bot is mentioned asks the LLM for a
/// reply and delivers it. An LLM failure is not an error: it yields
/// [`ChatOutcome::NoResponse`]. Only a failed send is returned as `Err`.
#[instrument(skip_all, fields(channel_id = message.channel_id, message_id = message.message_id))]
pub async fn handle_chat_event(message: IncomingMessage, config: &Config, history: &HistoryStore, llm: &LlmClient, chat: &ChatClient) -> Res<ChatOutcome> {
    // Don't respond to messages from other guilds if that is enforced.

    if config.enforce_guild
        && let Some(guild) = config.discord_guild
        && message.guild_id != Some(guild)
    {
        debug!("Skipping message from outside the configured guild.");
        return Ok(ChatOutcome::Ignored);
    }

    let bot_user_id = chat.bot_user_id();

    // Don't respond to our own messages.

    if message.author_id == bot_user_id {
        return Ok(ChatOutcome::Ignored);
    }

    let mentioned = message.mentions(bot_user_id);

    if mentioned || config.history_scope == HistoryScope::All {
        history.append_user_turn(message.channel_id, &message.author_display_name, &message.author_mention, &message.text);
    }

    if !mentioned {
        debug!("Message didn't mention the bot.");
        return Ok(ChatOutcome::Ignored);
    }

    info!("Received message mentioning the bot ...");

    if !config.llm_enabled {
        return reply_to_greeting(&message, config, chat).await;
    }

    let system_prompt = build_system_prompt(config);
    let context = history.snapshot(message.channel_id);

    // Keep the typing indicator up for the whole generation, whatever its outcome.

    if let Err(err) = chat.start_typing(message.channel_id).await {
        warn!("Failed to start typing: {}", err);
    }

    let result = llm.generate_response(&system_prompt, &context).await;

    if let Err(err) = chat.stop_typing(message.channel_id).await {
        warn!("Failed to stop typing: {}", err);
    }

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            warn!("No response from LLM: {}", err);
            return Ok(ChatOutcome::NoResponse);
        }
    };

    if response.trim().is_empty() {
        warn!("LLM returned an empty response.");
        return Ok(ChatOutcome::NoResponse);
    }

    debug!("Response: `{}`", response);

    let dispatcher = ResponseDispatcher::new(chat.clone(), history.clone());
    let sent = dispatcher.deliver(&message.reply_target(), message.channel_id, &response).await?;

    Ok(ChatOutcome::Replied(sent))
}

/// Answers a greeting when the LLM is switched off.
async fn reply_to_greeting(message: &IncomingMessage, config: &Config, chat: &ChatClient) -> Res<ChatOutcome> {
    let Some(greeting) = find_greeting(&message.text, &config.greetings) else {
        debug!("LLM is disabled and the message is not a greeting.");
        return Ok(ChatOutcome::Ignored);
    };

    let text = format!("{}, {}!", capitalize(greeting), message.author_mention);
    let sent = chat.reply_to_message(&message.reply_target(), &text).await?;

    Ok(ChatOutcome::Replied(vec![sent]))
}

/// The configured greeting the message opens with, ignoring mentions, case, and punctuation.
fn find_greeting<'a>(text: &str, greetings: &'a [String]) -> Option<&'a str> {
    let first_word = text
        .split_whitespace()
        .find(|word| !(word.starts_with("<@") && word.ends_with('>')))?
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();

    greetings.iter().find(|g| g.to_lowercase() == first_word).map(String::as_str)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
