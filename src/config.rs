//! Application configuration.
//!
//! Settings are layered, lowest priority first: built-in defaults, an
//! optional config file, `ORITO_` prefixed environment variables, then CLI
//! flags (which also read their own environment variables through `clap`).

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Chat service used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// System prompt shown before the user edits it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a useful AI assistant.";

const DEFAULT_HTMX_SRC: &str = "https://unpkg.com/htmx.org@2.0.8";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address the web UI binds to
    #[arg(long, env = "BIND_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the chat service
    #[arg(long, env = "CHATBOT_API_URL")]
    pub api_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout. Unset means requests may wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Endpoint path templates of the chat service.
///
/// `{id}` is replaced by the conversation identifier.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub conversations: String,
    pub conversation: String,
    pub conversation_messages: String,
    pub chat: String,
    pub clear_conversation: String,
    pub feedback: String,
    pub system_message: String,
    pub export: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            conversations: "/conversations/".into(),
            conversation: "/conversations/{id}".into(),
            conversation_messages: "/conversations/{id}/messages".into(),
            chat: "/chat/".into(),
            clear_conversation: "/clear-conversation/".into(),
            feedback: "/feedback/".into(),
            system_message: "/update-system-message/".into(),
            export: "/export-conversation/{id}".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UiConfig {
    /// Heading shown at the top of the page.
    pub title: String,
    /// Name used in the typing indicator.
    pub assistant_name: String,
    /// Initial system prompt of a fresh session.
    pub default_system_prompt: String,
    /// HTMX script location. Empty disables progressive enhancement.
    pub htmx_src: String,
    /// How long a form post waits for the chat service before rendering
    /// the page with the request still in flight.
    pub settle_timeout_secs: u64,
}

impl UiConfig {
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: "orito".into(),
            assistant_name: "Orito".into(),
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            htmx_src: DEFAULT_HTMX_SRC.into(),
            settle_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("api.base_url", DEFAULT_API_URL)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. ORITO_API__BASE_URL=http://chat:8000
        builder = builder.add_source(
            Environment::with_prefix("ORITO")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(api_url) = cli.api_url {
            builder = builder.set_override("api.base_url", api_url)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err(config::ConfigError::Message(
                "api.base_url cannot be empty".into(),
            ));
        }
        let url = Url::parse(base).map_err(|e| {
            config::ConfigError::Message(format!("api.base_url is not a valid URL: {e}"))
        })?;
        if url.cannot_be_a_base() {
            return Err(config::ConfigError::Message(format!(
                "api.base_url cannot be used as a base: {base}"
            )));
        }
        Ok(())
    }

    /// Address the web UI listens on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
