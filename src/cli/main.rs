use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::json;
use std::path::PathBuf;
use ticket_classifier::{
    config::Config,
    ml::{ClassificationService, DevicePreference},
};

#[derive(Parser)]
#[command(name = "ticket-classifier-cli")]
#[command(about = "Ticket Classifier CLI", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a ticket on a running server (full distribution)
    Predict {
        #[arg(short, long)]
        text: String,
    },

    /// Classify a ticket on a running server (label only)
    Label {
        #[arg(short, long)]
        text: String,
    },

    /// Check server health
    Health,

    /// Load the model locally and classify each text without a server
    Classify {
        /// Ticket texts to classify
        #[arg(value_name = "TEXT", required = true)]
        texts: Vec<String>,

        /// Artifact directory, tried before the configured candidates
        #[arg(short, long, env = "TICKET_CLF__MODEL__PATH")]
        model: Option<PathBuf>,

        /// Compute device: auto, cpu, cuda or metal
        #[arg(short, long)]
        device: Option<DevicePreference>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Predict { text } => {
            let response = client
                .post(format!("{}/predict", cli.endpoint))
                .json(&json!({ "text": text }))
                .send()
                .await
                .with_context(|| format!("Failed to reach {}", cli.endpoint))?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Label { text } => {
            let response = client
                .post(format!("{}/predict/label", cli.endpoint))
                .json(&json!({ "text": text }))
                .send()
                .await
                .with_context(|| format!("Failed to reach {}", cli.endpoint))?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", cli.endpoint))
                .send()
                .await
                .with_context(|| format!("Failed to reach {}", cli.endpoint))?;

            let body: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }

        Commands::Classify {
            texts,
            model,
            device,
        } => {
            let mut config = Config::load().unwrap_or_default();
            if model.is_some() {
                config.model.path = model;
            }
            if let Some(device) = device {
                config.model.device = device;
            }

            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "ticket_classifier=warn".into()),
                )
                .with_writer(std::io::stderr)
                .init();

            let model_config = config.model.clone();
            let service = tokio::task::spawn_blocking(move || {
                ClassificationService::from_config(&model_config)
            })
            .await?
            .context("Failed to load a model artifact")?;

            let mut results = Vec::with_capacity(texts.len());
            for text in texts {
                let prediction = service
                    .classify(text.clone())
                    .await
                    .with_context(|| format!("Failed to classify {:?}", text))?;
                results.push(json!({
                    "text": text,
                    "label": prediction.label,
                    "confidence": prediction.confidence_percent(),
                    "confidences": prediction.probabilities,
                }));
            }

            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}
