use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use sprout_agent::{AgentRuntime, OpenAiProvider, PromptTemplate};
use sprout_core::config::{SproutConfig, DEFAULT_CONFIG_FILE, DEFAULT_ENV_FILE};
use sprout_telegram::TelegramAdapter;

mod app;

const DEFAULT_LOG_FILTER: &str = "sprout=info,sprout_bot=info,sprout_agent=info,\
sprout_telegram=info,sprout_sessions=info,reqwest=warn,teloxide=warn";

/// Garden-centre sales consultant bot for Telegram.
#[derive(Debug, Parser)]
#[command(name = "sprout-bot", version)]
struct Cli {
    /// Env file holding TELEGRAM_BOT_TOKEN, YA_API_KEY and YA_FOLDER_ID.
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Optional TOML file with tunables.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// System prompt file; overrides `agent.prompt_path`.
    #[arg(long)]
    prompt: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("SPROUT_GIT_SHA"),
        "sprout-bot starting"
    );

    // configuration and prompt problems are fatal: nothing useful can run
    let config = SproutConfig::load(&cli.env_file, &cli.config)
        .context("failed to load configuration")?;

    let prompt_path = cli
        .prompt
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.agent.prompt_path));
    let prompt = PromptTemplate::load(
        &prompt_path,
        config.agent.greeting_instruction.clone(),
        config.agent.followup_instruction.clone(),
    )
    .context("failed to load system prompt")?;

    let agent = build_agent(&config, prompt)?;
    info!(
        provider = agent.provider().name(),
        model = %agent.model(),
        "completion provider ready"
    );

    let state = Arc::new(app::AppState::new(config, agent));

    let adapter = TelegramAdapter::new(&state.config.telegram, Arc::clone(&state));
    adapter.run().await.context("telegram adapter failed")?;

    info!("sprout-bot stopped");
    Ok(())
}

/// Completion runtime for the configured endpoint, sampling settings and
/// error reply. The folder id doubles as the `OpenAI-Project` header.
fn build_agent(config: &SproutConfig, prompt: PromptTemplate) -> anyhow::Result<AgentRuntime> {
    let provider = OpenAiProvider::new(
        config.provider.api_key.clone(),
        config.provider.base_url.clone(),
        Some(config.provider.folder_id.clone()),
        Duration::from_secs(config.provider.timeout_secs),
    )
    .context("failed to build HTTP client")?;

    Ok(
        AgentRuntime::new(Box::new(provider), prompt, config.provider.model_uri())
            .with_settings((&config.agent).into())
            .with_error_reply(config.agent.error_reply.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["sprout-bot"]);
        assert_eq!(cli.env_file, PathBuf::from(".env"));
        assert_eq!(cli.config, PathBuf::from("sprout.toml"));
        assert!(cli.prompt.is_none());
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from([
            "sprout-bot",
            "--env-file",
            "/etc/sprout/env",
            "--prompt",
            "p.txt",
        ]);
        assert_eq!(cli.env_file, PathBuf::from("/etc/sprout/env"));
        assert_eq!(cli.prompt, Some(PathBuf::from("p.txt")));
    }

    #[test]
    fn agent_uses_folder_scoped_model() {
        let mut config = SproutConfig::default();
        config.provider.api_key = "k".into();
        config.provider.folder_id = "b1g".into();
        config.agent.max_tokens = 128;

        let agent = build_agent(&config, PromptTemplate::new("p", "g", "f")).unwrap();
        assert_eq!(agent.model(), "gpt://b1g/yandexgpt-lite");
        assert_eq!(agent.settings().max_tokens, 128);
        assert_eq!(agent.provider().name(), "openai-compat");
    }
}
