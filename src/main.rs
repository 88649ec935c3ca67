mod chat;
mod cli;
mod config;
mod error;
mod export;
mod llm;
mod markdown;
mod notify;
mod speech;
mod tui;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, HistoryMode};
use llm::{GeminiClient, LlmClient};
use markdown::{extract_code_blocks, MarkdownFormatter};
use speech::{CommandSynthesizer, SpeechSynthesizer, VoicePlayback};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    // The TUI owns the terminal, so it only logs to a file.
    init_logging(cli.log_file.as_deref(), cli.command.is_some())?;

    match cli.command {
        Some(Commands::Render { file }) => {
            let text = read_markdown(file)?;
            println!("{}", MarkdownFormatter::default().format(&text));
        }
        Some(Commands::Ask {
            message,
            html,
            code_only,
        }) => {
            let config = load_config(cli.full_history)?;
            let client = GeminiClient::new(config.gemini);

            let mut conversation = chat::Conversation::new();
            conversation.set_input(message.join(" "));
            if !conversation.submit(&client).await? {
                bail!("Message is empty");
            }

            let reply = conversation
                .last_model_message()
                .map(|msg| msg.content.as_str())
                .unwrap_or_default();

            if html {
                println!("{}", MarkdownFormatter::default().format(reply));
            } else if code_only {
                for block in extract_code_blocks(reply) {
                    println!("// {}", block.language);
                    print!("{}", block.code);
                }
            } else {
                println!("{}", reply);
            }
        }
        None => {
            let config = load_config(cli.full_history)?;
            let synthesizer = config
                .tts_command
                .as_deref()
                .and_then(CommandSynthesizer::from_parts)
                .map(|synth| Box::new(synth) as Box<dyn SpeechSynthesizer>);

            let client: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(config.gemini));
            tui::run(client, VoicePlayback::new(synthesizer), cli.export_path).await?;
        }
    }

    Ok(())
}

fn load_config(full_history: bool) -> Result<Config> {
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if full_history {
        config.gemini = config.gemini.with_history(HistoryMode::Full);
    }
    Ok(config)
}

fn read_markdown(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Used when `RUST_LOG` is unset. Subcommand logs share stderr with piped output.
const DEFAULT_LOG_FILTER: &str = "warn";

fn init_logging(log_file: Option<&Path>, to_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if to_stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        None => {}
    }

    Ok(())
}
