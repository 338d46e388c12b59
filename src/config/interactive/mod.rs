#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, LlmBackend, LlmConfig, OllamaConfig};
use crate::embeddings::ollama::OllamaClient;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Bank RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Answering Model").bold().yellow());
    configure_llm(&mut config.llm)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
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

/// Print the active configuration as TOML
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_existing_config()?;

    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).cyan()
    );
    eprintln!();

    let rendered =
        toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
    println!("{rendered}");

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().context("Failed to load existing configuration")
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    ollama.host = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .interact_text()?;

    ollama.port = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .interact_text()?;

    ollama.model = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .interact_text()?;

    ollama.batch_size = Input::new()
        .with_prompt("Embedding batch size")
        .default(ollama.batch_size)
        .interact_text()?;

    Ok(())
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let backends = ["openai (hosted chat API)", "ollama (local model)"];
    let default_index = match llm.backend {
        LlmBackend::Openai => 0,
        LlmBackend::Ollama => 1,
    };

    let selection = Select::new()
        .with_prompt("Answering backend")
        .items(&backends)
        .default(default_index)
        .interact()?;

    llm.backend = if selection == 1 {
        LlmBackend::Ollama
    } else {
        LlmBackend::Openai
    };

    let model_default = match llm.backend {
        LlmBackend::Openai => "gpt-3.5-turbo".to_string(),
        LlmBackend::Ollama => "llama3.2:3b".to_string(),
    };

    llm.model = Input::new()
        .with_prompt("Model name")
        .default(if llm.model.is_empty() {
            model_default
        } else {
            llm.model.clone()
        })
        .interact_text()?;

    if llm.backend == LlmBackend::Openai {
        eprintln!(
            "Note: the hosted backend reads its API key from the {} environment variable.",
            style("OPENAI_API_KEY").bold()
        );
    }

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    match OllamaClient::new(ollama) {
        // A single attempt keeps the prompt responsive
        Ok(client) => client.with_retry_attempts(1).ping().is_ok(),
        Err(_) => false,
    }
}
