use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bank_rag::Result;
use bank_rag::commands::{ask, generate, ingest, run_demo, show_status};
use bank_rag::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "bank-rag")]
#[command(about = "A retrieval-augmented banking assistant demo over synthetic statement data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama, model backend, and pipeline settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Generate a synthetic bank statement CSV
    Generate {
        /// Number of customers to generate transactions for
        #[arg(long, default_value_t = 50)]
        customers: usize,
        /// Output path (defaults to the configured statement file)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Chunk and embed the statement file into the vector store
    Ingest {
        /// Clear existing embeddings before ingesting
        #[arg(long)]
        fresh: bool,
    },
    /// Ask a single question against the ingested statements
    Ask {
        /// The question to answer
        question: String,
    },
    /// Run the scripted demo queries
    Demo,
    /// Show the state of each pipeline stage
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Generate { customers, output } => {
            generate(customers, output)?;
        }
        Commands::Ingest { fresh } => {
            ingest(fresh).await?;
        }
        Commands::Ask { question } => {
            ask(question).await?;
        }
        Commands::Demo => {
            run_demo().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["bank-rag", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn generate_defaults() {
        let cli = Cli::try_parse_from(["bank-rag", "generate"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Generate { customers, output } = parsed.command {
                assert_eq!(customers, 50);
                assert_eq!(output, None);
            }
        }
    }

    #[test]
    fn generate_with_options() {
        let cli = Cli::try_parse_from([
            "bank-rag",
            "generate",
            "--customers",
            "25",
            "--output",
            "statements.csv",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Generate { customers, output } = parsed.command {
                assert_eq!(customers, 25);
                assert_eq!(output, Some(PathBuf::from("statements.csv")));
            }
        }
    }

    #[test]
    fn ingest_fresh_flag() {
        let cli = Cli::try_parse_from(["bank-rag", "ingest", "--fresh"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { fresh } = parsed.command {
                assert!(fresh);
            }
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["bank-rag", "ask"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["bank-rag", "ask", "What is my balance?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "What is my balance?");
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["bank-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["bank-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["bank-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
