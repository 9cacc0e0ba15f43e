use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, eyre};

use crate::api::AskClient;
use crate::api::types::{CompletionRequest, ModelsResponse};
use crate::config::{AppConfig, load_config};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "nlpask", about = "Ask questions to a chat-completion backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Launch the interactive TUI (default)
    Tui,
    /// Ask a question and print the normalized response (JSONL)
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true)]
        prompt: Vec<String>,
        /// Model id (defaults to `default_model` from config)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Ask a question and print only the answer text
    Answer {
        #[arg(required = true)]
        prompt: Vec<String>,
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Fetch a stored completion by id (JSONL)
    Get {
        id: u64,
    },
    /// List available models (JSONL)
    Models,
    /// Probe the backend health endpoint (JSONL)
    Health,
}

// ---------------------------------------------------------------------------
// Client construction (shared with main.rs TUI path)
// ---------------------------------------------------------------------------

pub fn build_client(config: &AppConfig) -> eyre::Result<AskClient> {
    AskClient::new(config.client_config()).map_err(|e| eyre!("failed to build HTTP client: {e}"))
}

fn build_request(config: &AppConfig, prompt: &[String], model: Option<String>) -> CompletionRequest {
    CompletionRequest::new(
        prompt.join(" ").trim(),
        model.unwrap_or_else(|| config.default_model.clone()),
    )
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

pub async fn run_command(cmd: CliCommand) -> eyre::Result<()> {
    let config = load_config();
    let client = build_client(&config)?;

    match cmd {
        CliCommand::Tui => {
            unreachable!("tui is handled in main")
        }

        CliCommand::Ask { prompt, model } => {
            let request = build_request(&config, &prompt, model);
            let resp = client.submit(&request).await.map_err(|e| eyre!("{e}"))?;
            println!("{}", serde_json::to_string(&resp)?);
        }

        CliCommand::Answer { prompt, model } => {
            let request = build_request(&config, &prompt, model);
            let resp = client.submit(&request).await.map_err(|e| eyre!("{e}"))?;
            println!("{}", resp.answer());
        }

        CliCommand::Get { id } => {
            let resp = client.get_completion(id).await.map_err(|e| eyre!("{e}"))?;
            println!("{}", serde_json::to_string(&resp)?);
        }

        CliCommand::Models => {
            let catalog = match client.list_models().await {
                Ok(catalog) => catalog,
                Err(e) => {
                    eprintln!("Warning: {e} Using the built-in model list.");
                    ModelsResponse::fallback()
                }
            };
            for model in &catalog.models {
                println!("{}", serde_json::to_string(model)?);
            }
        }

        CliCommand::Health => {
            let payload = client.health_check().await.map_err(|e| eyre!("{e}"))?;
            println!("{}", serde_json::to_string(&payload)?);
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ask_with_model() {
        let cli = Cli::try_parse_from(["nlpask", "ask", "what", "is", "rust?", "-m", "gpt2"]).unwrap();
        match cli.command {
            Some(CliCommand::Ask { prompt, model }) => {
                assert_eq!(prompt, ["what", "is", "rust?"]);
                assert_eq!(model.as_deref(), Some("gpt2"));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn ask_requires_prompt() {
        assert!(Cli::try_parse_from(["nlpask", "ask"]).is_err());
    }

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["nlpask"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn get_requires_numeric_id() {
        assert!(Cli::try_parse_from(["nlpask", "get", "abc"]).is_err());
        assert!(matches!(
            Cli::try_parse_from(["nlpask", "get", "12"]).unwrap().command,
            Some(CliCommand::Get { id: 12 })
        ));
    }

    #[test]
    fn request_joins_words_and_defaults_model() {
        let config = AppConfig::default();
        let words = vec!["  hello".to_string(), "world ".to_string()];
        let request = build_request(&config, &words, None);
        assert_eq!(request.prompt, "hello world");
        assert_eq!(request.model, "google/gemma-2-9b-it");

        let request = build_request(&config, &words, Some("gpt2".into()));
        assert_eq!(request.model, "gpt2");
    }
}
