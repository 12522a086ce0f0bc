//! Load configuration via `config` crate with env-override support.

use std::{fmt, ops::Deref, path::Path, sync::Arc};

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::types::Res;

/// Defaults shipped with the binary; user files and the environment override them.
const DEFAULT_CONFIG: &str = include_str!("default_config.yaml");

/// User config file picked up from the working directory when no path is given.
const USER_CONFIG_FILE: &str = "config.yaml";

/// Which inbound messages are recorded in a channel's history.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryScope {
    /// Only messages that mention the bot.
    #[default]
    Mentions,
    /// Every message the bot can see in the channel.
    All,
}

/// A link listed by the `/resources` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub link: String,
    pub desc: String,
}

impl Resource {
    /// Create a resource, prefixing scheme-less links with `https://`.
    pub fn new(name: impl Into<String>, link: impl Into<String>, desc: impl Into<String>) -> Self {
        let link = link.into();
        let link = if link.starts_with("https://") || link.starts_with("http://") { link } else { format!("https://{link}") };

        Self {
            name: name.into(),
            link,
            desc: desc.into(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})", self.name, self.link)?;

        if !self.desc.is_empty() {
            write!(f, ": {}", self.desc)?;
        }

        Ok(())
    }
}

/// Resource entry as written in the config file; `name` and `link` may be missing.
#[derive(Debug, Deserialize)]
struct RawResource {
    name: Option<String>,
    link: Option<String>,
    #[serde(default)]
    desc: String,
}

/// Keep well-formed resources, warn about the rest.
fn deserialize_resources<'de, D>(deserializer: D) -> Result<Vec<Resource>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawResource>::deserialize(deserializer)?;

    Ok(raw
        .into_iter()
        .filter_map(|r| match (r.name, r.link) {
            (Some(name), Some(link)) => Some(Resource::new(name, link, r.desc)),
            (name, link) => {
                warn!("Malformed resource (name: {:?}, link: {:?}), skipping.", name, link);
                None
            }
        })
        .collect())
}

/// Guild id as it may appear in a file or the environment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGuild {
    Id(u64),
    Signed(i64),
    Text(String),
}

/// Read the guild id, falling back to no guild (with a warning) when it isn't a valid id.
fn deserialize_guild<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let guild = match Option::<RawGuild>::deserialize(deserializer)? {
        None => None,
        Some(RawGuild::Id(id)) => Some(id),
        Some(RawGuild::Text(text)) if text.trim().is_empty() => None,
        Some(RawGuild::Text(text)) => text.trim().parse().ok().or_else(|| {
            warn!("DISCORD_GUILD `{}` is an invalid id, defaulting to no guild.", text);
            None
        }),
        Some(RawGuild::Signed(id)) => {
            warn!("DISCORD_GUILD `{}` is an invalid id, defaulting to no guild.", id);
            None
        }
    };

    Ok(guild)
}

fn default_greetings() -> Vec<String> {
    vec!["hello".to_string(), "hi".to_string(), "hey".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_llm_model() -> String {
    "llama2".to_string()
}

fn default_llm_host() -> String {
    "localhost".to_string()
}

fn default_llm_port() -> u16 {
    11434
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_history_length() -> usize {
    30
}

/// Configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Discord bot token (`DISCORD_TOKEN`).
    #[serde(default)]
    pub discord_token: String,
    /// Guild the bot is bound to (`DISCORD_GUILD`); commands are registered globally when unset.
    ///
    /// An invalid id is treated as unset.
    #[serde(default, deserialize_with = "deserialize_guild")]
    pub discord_guild: Option<u64>,
    /// Words the bot answers to when the LLM is disabled.
    #[serde(default = "default_greetings")]
    pub greetings: Vec<String>,
    /// Ignore messages from guilds other than `discord_guild`.
    #[serde(default = "default_true")]
    pub enforce_guild: bool,
    /// Links listed by `/resources`.
    #[serde(default, deserialize_with = "deserialize_resources")]
    pub resources: Vec<Resource>,
    /// Name the bot introduces itself with in the system prompt.
    #[serde(default)]
    pub bot_name: String,
    /// Whether mentions are forwarded to the LLM server.
    #[serde(default = "default_true")]
    pub llm_enabled: bool,
    /// Model requested from the LLM server (`LLM_MODEL`).
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    /// Pull `llm_model` on startup.
    #[serde(default)]
    pub auto_pull_model: bool,
    /// LLM server host (`LLM_HOST`).
    #[serde(default = "default_llm_host")]
    pub llm_host: String,
    /// LLM server port (`LLM_PORT`).
    #[serde(default = "default_llm_port")]
    pub llm_port: u16,
    /// Request timeout for LLM calls, in seconds (`LLM_TIMEOUT_SECS`).
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    /// Maximum number of turns kept per channel (`HISTORY_LENGTH`).
    #[serde(default = "default_history_length")]
    pub history_length: usize,
    /// Which messages are recorded in history (`HISTORY_SCOPE`).
    #[serde(default)]
    pub history_scope: HistoryScope,
    /// Base system prompt; see [`crate::base::prompts::build_system_prompt`].
    #[serde(default)]
    pub system_prompt: String,
}

impl Config {
    /// Load the config from the embedded defaults, the user file, and the environment (in rising priority).
    pub fn load(explicit_path: Option<&Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if Path::new(USER_CONFIG_FILE).exists() {
            cfg = cfg.add_source(config::File::with_name(USER_CONFIG_FILE));
        }

        cfg = cfg.add_source(config::Environment::default().try_parsing(true).ignore_empty(true));

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        if self.discord_token.trim().is_empty() {
            return Err(anyhow::anyhow!("DISCORD_TOKEN must be set."));
        }

        if self.llm_port == 0 {
            return Err(anyhow::anyhow!("LLM port must be between 1 and 65535."));
        }

        if self.llm_timeout_secs == 0 {
            return Err(anyhow::anyhow!("LLM timeout must be at least one second."));
        }

        Ok(())
    }

    /// Base URL of the LLM server.
    pub fn llm_base_url(&self) -> String {
        format!("http://{}:{}", self.llm_host, self.llm_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_yaml(yaml: &str) -> Res<ConfigInner> {
        Ok(config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml))
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?)
    }

    #[test]
    fn test_defaults_are_embedded() {
        let inner = from_yaml("{}").unwrap();

        assert_eq!(inner.greetings, vec!["hello", "hi", "hey"]);
        assert!(inner.enforce_guild);
        assert!(inner.resources.is_empty());
        assert_eq!(inner.llm_model, "llama2");
        assert_eq!(inner.llm_host, "localhost");
        assert_eq!(inner.llm_port, 11434);
        assert_eq!(inner.history_length, 30);
        assert_eq!(inner.history_scope, HistoryScope::Mentions);
        assert!(!inner.system_prompt.is_empty());
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let inner = from_yaml(
            r#"
bot_name: Llama
history_length: 0
history_scope: all
greetings: ["yo"]
"#,
        )
        .unwrap();

        assert_eq!(inner.bot_name, "Llama");
        assert_eq!(inner.history_length, 0);
        assert_eq!(inner.history_scope, HistoryScope::All);
        assert_eq!(inner.greetings, vec!["yo"]);
    }

    #[test]
    fn test_malformed_resources_are_skipped() {
        let inner = from_yaml(
            r#"
resources:
  - name: Rust Book
    link: doc.rust-lang.org/book
    desc: The book
  - name: Missing link
  - link: https://example.com
  - name: Plain
    link: http://example.org
"#,
        )
        .unwrap();

        assert_eq!(
            inner.resources,
            vec![
                Resource::new("Rust Book", "https://doc.rust-lang.org/book", "The book"),
                Resource::new("Plain", "http://example.org", ""),
            ]
        );
    }

    #[test]
    fn test_invalid_guild_is_unset() {
        assert_eq!(from_yaml("discord_guild: 1234").unwrap().discord_guild, Some(1234));
        assert_eq!(from_yaml("discord_guild: '1234'").unwrap().discord_guild, Some(1234));
        assert_eq!(from_yaml("discord_guild: not-a-number").unwrap().discord_guild, None);
        assert_eq!(from_yaml("discord_guild: -5").unwrap().discord_guild, None);
        assert_eq!(from_yaml("discord_guild: ''").unwrap().discord_guild, None);
        assert_eq!(from_yaml("{}").unwrap().discord_guild, None);
    }

    #[test]
    fn test_resource_display() {
        assert_eq!(Resource::new("Docs", "docs.rs", "Crate docs").to_string(), "[Docs](https://docs.rs): Crate docs");
        assert_eq!(Resource::new("Docs", "docs.rs", "").to_string(), "[Docs](https://docs.rs)");
    }

    #[test]
    fn test_validation() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                discord_token: "token".to_string(),
                llm_port: 11434,
                llm_timeout_secs: 10,
                ..Default::default()
            }),
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.llm_base_url(), "http://:11434");

        let missing_token = Config {
            inner: Arc::new(ConfigInner {
                llm_port: 11434,
                llm_timeout_secs: 10,
                ..Default::default()
            }),
        };
        assert!(missing_token.validate().is_err());

        let zero_port = Config {
            inner: Arc::new(ConfigInner {
                discord_token: "token".to_string(),
                llm_timeout_secs: 10,
                ..Default::default()
            }),
        };
        assert!(zero_port.validate().is_err());
    }
}
