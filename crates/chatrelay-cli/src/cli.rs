use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(version, about = "ChatRelay - Telegram bot relaying conversations to Claude")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to ~/.config/chatrelay/config.toml)
    #[arg(long, global = true, env = "CHATRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,
}

#[derive(Subcommand, Clone, Copy)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Validate configuration and check the Telegram token, then exit
    Check,

    /// Print the effective configuration with secrets redacted
    Config,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

// Settings given on the command line or through environment variables.
// Numbers are kept as text so bad values are reported like any other
// configuration error. Keep this a plain comment: a doc comment on a
// flattened struct replaces the command's about text.
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Telegram bot token from @BotFather
    #[arg(long, global = true, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Anthropic API key
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Bot username (without @), used to filter /command@bot suffixes
    #[arg(long, global = true, env = "BOT_USERNAME")]
    pub bot_username: Option<String>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long, global = true, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Environment: development, production or test
    #[arg(long, global = true, env = "APP_ENV")]
    pub environment: Option<String>,

    /// Also write logs to daily-rolling files in this directory
    #[arg(long, global = true, env = "CHATRELAY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Anthropic model name
    #[arg(long, global = true, env = "ANTHROPIC_MODEL")]
    pub model: Option<String>,

    /// Messages kept per conversation
    #[arg(long, global = true, env = "MAX_HISTORY_LENGTH")]
    pub max_history_length: Option<String>,

    /// Hours a message stays in history
    #[arg(long, global = true, env = "MAX_AGE_HOURS")]
    pub max_age_hours: Option<String>,

    /// Telegram long-polling timeout in seconds
    #[arg(long, global = true, env = "TELEGRAM_POLLING_TIMEOUT")]
    pub polling_timeout: Option<String>,

    /// Retries for transient provider errors
    #[arg(long, global = true, env = "LLM_MAX_RETRIES")]
    pub llm_max_retries: Option<String>,
}
