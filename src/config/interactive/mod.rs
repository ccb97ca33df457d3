#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::Path;
use std::time::Duration;

use super::{ApiConfig, Config, ConfigError};
use crate::http::endpoint;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 AI Knower Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("API Configuration").bold().yellow());
    eprintln!("Configure the OpenAI-compatible service used for embeddings and answers.");
    eprintln!();

    configure_api(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_retrieval(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_api_connection(&config.api) {
        eprintln!("{}", style("✓ API endpoint reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the API endpoint").yellow()
        );
        eprintln!("You can continue, but the service must be reachable before building the index.");
    }

    if config.api_key().is_err() {
        eprintln!(
            "{}",
            style(format!(
                "⚠ {} is not set; export it before running build or ask",
                config.api.api_key_env
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("API Settings:").bold().yellow());
    eprintln!("  Base URL: {}", style(&config.api.base_url).cyan());
    eprintln!("  Key Variable: {}", style(&config.api.api_key_env).cyan());
    let key_status = if config.api_key().is_ok() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!("  Key Status: {}", key_status);
    eprintln!("  Timeout: {}s", style(config.api.timeout_seconds).cyan());

    eprintln!();
    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Chat Settings:").bold().yellow());
    eprintln!("  Model: {}", style(&config.chat.model).cyan());
    eprintln!("  Temperature: {}", style(config.chat.temperature).cyan());
    eprintln!("  Max Tokens: {}", style(config.chat.max_tokens).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!(
        "  Corpus Chunk Size: {} words",
        style(config.chunking.corpus_chunk_size).cyan()
    );
    eprintln!(
        "  Upload Sections: {} words, {} overlap",
        style(config.chunking.upload_chunk_size).cyan(),
        style(config.chunking.upload_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Max Chunk Characters: {}",
        style(config.retrieval.max_chunk_chars).cyan()
    );
    eprintln!("  Memory Size: {}", style(config.retrieval.memory_size).cyan());

    eprintln!();
    eprintln!("  Dataset: {}", style(config.dataset_path().display()).cyan());
    eprintln!("  Index: {}", style(config.index_path().display()).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::with_base_dir(config_dir))
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_api(config: &mut Config) -> Result<()> {
    let timeout_seconds = config.api.timeout_seconds;
    let api_key_env = config.api.api_key_env.clone();

    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(config.api.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = ApiConfig {
                base_url: input.clone(),
                api_key_env: api_key_env.clone(),
                timeout_seconds,
            };
            temp_config.validate()
        })
        .interact_text()?;

    let key_var: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(config.api.api_key_env.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Variable name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(config.embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(config.embedding.dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(config.embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(config.chat.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.api.set_base_url(base_url)?;
    config.api.set_api_key_env(key_var)?;
    config.embedding.set_model(embedding_model)?;
    config.embedding.set_dimension(dimension)?;
    config.embedding.set_batch_size(batch_size)?;
    config.chat.set_model(chat_model)?;

    Ok(())
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Top k must be between 1 and 100")
            }
        })
        .interact_text()?;

    let temperature: f32 = Input::new()
        .with_prompt("Answer temperature")
        .default(config.chat.temperature)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (0.0..=2.0).contains(input) {
                Ok(())
            } else {
                Err("Temperature must be between 0.0 and 2.0")
            }
        })
        .interact_text()?;

    config.retrieval.set_top_k(top_k)?;
    config.chat.set_temperature(temperature)?;

    Ok(())
}

/// Any HTTP response from `{base_url}/models` counts as reachable, including 401
fn test_api_connection(api: &ApiConfig) -> bool {
    let Ok(url) = endpoint(&api.base_url, "models") else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
