//! FairGrade command line interface.
//!
//! Thin wrapper over the runtime: pick questions, grade answers, validate
//! banks. All subcommands emit JSON so the output is scriptable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fairgrade_core::QuestionBank;
use fairgrade_runtime::{BackendRegistry, Evaluator, EvaluatorConfig};

#[derive(Parser)]
#[command(
    name = "fairgrade",
    version,
    about = "Rubric-grounded interview answer grading"
)]
struct Cli {
    /// Question bank file (JSON or YAML)
    #[arg(long, global = true, default_value = "questions.json")]
    bank: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a random question for a topic
    Question {
        #[arg(long)]
        topic: String,
    },

    /// Grade an answer to a bank question
    Grade {
        #[arg(long)]
        question_id: String,

        /// Answer text; reads stdin when neither this nor --answer-file is given
        #[arg(long, conflicts_with = "answer_file")]
        answer: Option<String>,

        /// File containing the answer text
        #[arg(long)]
        answer_file: Option<PathBuf>,

        /// Reasoning backend endpoint
        #[arg(long, default_value = "http://127.0.0.1:11434")]
        endpoint: String,

        /// Evaluator configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Validate a question bank and summarize its contents
    Check,
}

fn load_bank(path: &Path) -> Result<QuestionBank> {
    let bank = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => QuestionBank::from_yaml_file(path),
        _ => QuestionBank::from_json_file(path),
    };
    bank.with_context(|| format!("failed to load question bank {}", path.display()))
}

fn load_config(path: Option<&Path>, model: Option<String>) -> Result<EvaluatorConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EvaluatorConfig::default(),
    };
    if let Some(model) = model {
        config.model = model;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Question { topic } => {
            let bank = load_bank(&cli.bank)?;
            let question = bank.pick(&topic)?;
            println!("{}", serde_json::to_string_pretty(question)?);
        }

        Command::Grade {
            question_id,
            answer,
            answer_file,
            endpoint,
            config,
            model,
        } => {
            let bank = load_bank(&cli.bank)?;
            let answer = match (answer, answer_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read answer file {}", path.display()))?,
                (None, None) => std::io::read_to_string(std::io::stdin())
                    .context("failed to read answer from stdin")?,
            };

            let config = load_config(config.as_deref(), model)?;
            let backend = BackendRegistry::with_defaults()
                .create("ollama", &serde_json::json!({ "endpoint": endpoint }))?;
            let evaluator = Evaluator::new(backend, config);

            tracing::info!(question_id = %question_id, "grading answer");
            let result = evaluator
                .evaluate_question_id(&bank, &question_id, &answer)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Check => {
            let bank = load_bank(&cli.bank)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "questions": bank.len(),
                    "topics": bank.topics(),
                }))?
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_grade_args_parse() {
        let cli = Cli::try_parse_from([
            "fairgrade",
            "--bank",
            "demos/questions.json",
            "grade",
            "--question-id",
            "ece-opamp-1",
            "--answer",
            "the gain is -Rf/Rin",
        ])
        .unwrap();

        match cli.command {
            Command::Grade {
                question_id,
                answer,
                ..
            } => {
                assert_eq!(question_id, "ece-opamp-1");
                assert_eq!(answer.as_deref(), Some("the gain is -Rf/Rin"));
            }
            _ => panic!("expected grade subcommand"),
        }
    }
}
