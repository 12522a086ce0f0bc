//! Discord integration for the bot.
//!
//! This module provides functionality for interacting with Discord through serenity:
//! - Receiving messages and slash commands
//! - Replying to messages and showing the typing indicator
//! - Updating the bot's presence after each handled mention

use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use serenity::all::{
    ChannelId, Command as DiscordCommand, Context, CreateCommand, CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EventHandler, GatewayIntents, GuildId, Http,
    Interaction, Mentionable, Message, MessageId, OnlineStatus, Ready,
};
use serenity::http::Typing;

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};
use crate::{
    base::types::{ChatOutcome, IncomingMessage, ReplyTarget, SentMessage},
    interaction::{chat_event::handle_chat_event, commands::Command},
    prelude::*,
    service::{history::HistoryStore, llm::LlmClient},
};

// Extra methods on `ChatClient` applied by the discord implementation.

impl ChatClient {
    /// Creates a new Discord chat client.
    pub async fn discord(config: &Config, history: HistoryStore, llm: LlmClient) -> Res<Self> {
        let client = DiscordChatClient::new(config, history, llm).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<DiscordChatClient> for ChatClient {
    fn from(client: DiscordChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Event handler state for the serenity gateway client.
struct DiscordHandler {
    config: Config,
    history: HistoryStore,
    llm: LlmClient,
    chat: ChatClient,
}

/// Discord client implementation.
#[derive(Clone)]
pub struct DiscordChatClient {
    token: String,
    bot_user_id: u64,
    http: Arc<Http>,
    typing: Arc<DashMap<u64, (usize, Typing)>>,
    config: Config,
    history: HistoryStore,
    llm: LlmClient,
}

impl DiscordChatClient {
    /// Create a new Discord chat client.
    #[instrument(name = "DiscordChatClient::new", skip_all)]
    pub async fn new(config: &Config, history: HistoryStore, llm: LlmClient) -> Res<Self> {
        let token = config.discord_token.clone();
        let http = Arc::new(Http::new(&token));

        // Get the bot's user ID.

        let bot_user = http.get_current_user().await?;
        let bot_user_id = bot_user.id.get();

        info!("Discord bot user: {} ({})", bot_user.name, bot_user_id);

        Ok(Self {
            token,
            bot_user_id,
            http,
            typing: Arc::new(DashMap::new()),
            config: config.clone(),
            history,
            llm,
        })
    }
}

#[async_trait]
impl GenericChatClient for DiscordChatClient {
    fn bot_user_id(&self) -> u64 {
        self.bot_user_id
    }

    async fn start(&self) -> Void {
        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::DIRECT_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

        let handler = DiscordHandler {
            config: self.config.clone(),
            history: self.history.clone(),
            llm: self.llm.clone(),
            chat: ChatClient::from(self.clone()),
        };

        let mut client = serenity::Client::builder(&self.token, intents).event_handler(handler).await?;
        let shard_manager = client.shard_manager.clone();

        // Run the gateway until it fails, or until Ctrl-C.

        tokio::select! {
            result = client.start() => result?,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C: shutting down ...");
                shard_manager.shutdown_all().await;
            }
        }

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn reply_to_message(&self, target: &ReplyTarget, text: &str) -> Res<SentMessage> {
        let channel = ChannelId::new(target.channel_id);
        let builder = CreateMessage::new().content(text).reference_message((channel, MessageId::new(target.message_id)));

        let message = channel.send_message(&self.http, builder).await.map_err(|e| anyhow!("Failed to send message: {}", e))?;

        Ok(SentMessage {
            id: message.id.get(),
            content: message.content,
        })
    }

    #[instrument(skip(self))]
    async fn start_typing(&self, channel_id: u64) -> Void {
        // serenity re-posts the indicator until the guard is stopped or dropped.
        self.typing.entry(channel_id).or_insert_with(|| (0, ChannelId::new(channel_id).start_typing(&self.http))).0 += 1;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop_typing(&self, channel_id: u64) -> Void {
        if let Entry::Occupied(mut entry) = self.typing.entry(channel_id) {
            entry.get_mut().0 -= 1;

            if entry.get().0 == 0 {
                let (_, typing) = entry.remove();
                typing.stop();
            }
        }

        Ok(())
    }
}

// Gateway callbacks.

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}.", ready.user.name);

        let commands: Vec<CreateCommand> = Command::ALL.into_iter().map(|c| CreateCommand::new(c.name()).description(c.description())).collect();

        info!("Syncing commands (guild: {:?}) ...", self.config.discord_guild);

        let result = match self.config.discord_guild {
            Some(guild) => GuildId::new(guild).set_commands(&ctx.http, commands).await,
            None => DiscordCommand::set_global_commands(&ctx.http, commands).await,
        };

        match result {
            Ok(registered) => info!("Synced {} command(s).", registered.len()),
            Err(err) => error!("Failed to sync commands: {}", err),
        }
    }

    #[instrument(skip_all)]
    async fn message(&self, ctx: Context, msg: Message) {
        let incoming = IncomingMessage {
            channel_id: msg.channel_id.get(),
            message_id: msg.id.get(),
            guild_id: msg.guild_id.map(|g| g.get()),
            author_id: msg.author.id.get(),
            author_display_name: msg.author.name.clone(),
            author_mention: msg.author.mention().to_string(),
            text: msg.content.clone(),
            mentioned_user_ids: msg.mentions.iter().map(|u| u.id.get()).collect(),
        };

        let result = handle_chat_event(incoming, &self.config, &self.history, &self.llm, &self.chat).await;

        let status = match result {
            Ok(ChatOutcome::Ignored) => return,
            Ok(ChatOutcome::Replied(sent)) => {
                info!("Replied with {} message(s).", sent.len());
                OnlineStatus::Online
            }
            Ok(ChatOutcome::NoResponse) => OnlineStatus::Idle,
            Err(err) => {
                error!("Error while handling: {:#}", err);
                OnlineStatus::Idle
            }
        };

        ctx.set_presence(None, status);
    }

    #[instrument(skip_all)]
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        let Some(known) = Command::from_name(&command.data.name) else {
            warn!("Received unknown command `{}`.", command.data.name);
            return;
        };

        let message = CreateInteractionResponseMessage::new().content(known.respond(&self.config)).ephemeral(known.ephemeral());

        if let Err(err) = command.create_response(&ctx.http, CreateInteractionResponse::Message(message)).await {
            error!("Failed to answer `/{}`: {}", known.name(), err);
        }
    }
}
