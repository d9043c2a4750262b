//! Survey Replay drives a survey definition through a scripted sequence of
//! respondent actions and prints where the traversal ended up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use survey_core::config::AppConfig;
use survey_core::types::{ResponseData, Survey};
use survey_sequencer::signal::{capture_responses, CompletionSignal, LogResponses};
use survey_sequencer::Sequencer;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "survey-replay")]
#[command(about = "Replay scripted answers against a survey definition")]
#[command(version)]
struct Cli {
    /// Survey definition (JSON)
    #[arg(long)]
    survey: PathBuf,

    /// Scripted actions (JSON array)
    #[arg(long)]
    script: PathBuf,

    /// Optional TOML config file
    #[arg(long, env = "SURVEY__CONFIG")]
    config: Option<String>,

    /// Thank-you card delay in milliseconds (overrides config)
    #[arg(long, env = "SURVEY__SEQUENCER__THANK_YOU_DELAY_MS")]
    thank_you_delay_ms: Option<u64>,

    /// Wait for a delayed close signal before printing the result
    #[arg(long, default_value_t = false)]
    wait_close: bool,
}

/// One respondent action from the script file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
enum ScriptStep {
    Submit {
        #[serde(default)]
        data: ResponseData,
    },
    Next {
        #[serde(default)]
        data: ResponseData,
    },
    Back {
        #[serde(default)]
        data: Option<ResponseData>,
    },
}

struct LogSignal;

impl CompletionSignal for LogSignal {
    fn on_auto_close(&self) {
        info!("Survey closed");
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the result document.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "survey_replay=info,survey_sequencer=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_from(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(delay) = cli.thank_you_delay_ms {
        config.sequencer.thank_you_delay_ms = delay;
    }

    let survey: Survey = read_json(&cli.survey)?;
    let script: Vec<ScriptStep> = read_json(&cli.script)?;

    info!(
        survey_id = %survey.id,
        questions = survey.questions.len(),
        steps = script.len(),
        "Replaying script"
    );

    let responses = capture_responses();
    let mut sequencer = Sequencer::new(survey, &config.sequencer)?
        .with_responses(Arc::new(LogResponses::wrapping(responses.clone())))
        .with_signal(Arc::new(LogSignal));

    for (index, step) in script.into_iter().enumerate() {
        if sequencer.is_finished() {
            warn!(step = index, "Survey already finished, ignoring remaining steps");
            break;
        }

        match step {
            ScriptStep::Submit { data } => {
                sequencer
                    .submit(data)
                    .await
                    .with_context(|| format!("step {index}: submit failed"))?;
            }
            ScriptStep::Next { data } => {
                sequencer
                    .go_to_next_question(data)
                    .await
                    .with_context(|| format!("step {index}: next failed"))?;
            }
            ScriptStep::Back { data } => {
                sequencer
                    .go_back(data)
                    .with_context(|| format!("step {index}: back failed"))?;
            }
        }
    }

    if cli.wait_close {
        sequencer.wait_closed().await;
    }

    let responses: Vec<serde_json::Value> = responses
        .responses()
        .into_iter()
        .map(|(question_id, value)| {
            serde_json::json!({ "questionId": question_id, "value": value })
        })
        .collect();
    let report = serde_json::json!({
        "state": sequencer.state(),
        "responses": responses,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_parses_all_actions() {
        let script: Vec<ScriptStep> = serde_json::from_str(
            r#"[
                {"action": "submit", "data": {"q1": "accepted"}},
                {"action": "back"},
                {"action": "next", "data": {"q1": ["a", "b"]}},
                {"action": "back", "data": {"q2": 4}}
            ]"#,
        )
        .unwrap();

        assert_eq!(script.len(), 4);
        assert!(matches!(script[0], ScriptStep::Submit { .. }));
        assert!(matches!(script[1], ScriptStep::Back { data: None }));
        assert!(matches!(script[2], ScriptStep::Next { .. }));
        assert!(matches!(script[3], ScriptStep::Back { data: Some(_) }));
    }
}
