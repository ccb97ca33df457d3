use ai_knower::commands::{
    AskOptions, ask, build_index, chat_session, list_sections, search, show_status,
};
use ai_knower::config::{Config, get_config_dir, run_interactive_config, show_config};
use ai_knower::generation::PromptStyle;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ai-knower")]
#[command(about = "Retrieval-augmented question answering over a corpus of paper abstracts")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the API endpoint, models and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk and embed the corpus, then write the index
    Build,
    /// Show the chunks closest to a query
    Search {
        query: String,
        /// Number of chunks to return
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Answer a question from the indexed corpus
    Ask {
        question: String,
        #[arg(long, value_enum, default_value_t = PromptStyle::Default)]
        style: PromptStyle,
        /// Ask the model to reason step by step
        #[arg(long)]
        cot: bool,
        /// Plain-text document to anchor the question to
        #[arg(long)]
        upload: Option<PathBuf>,
        /// Section of the uploaded document to include (1-based)
        #[arg(long, requires = "upload")]
        section: Option<usize>,
        /// Print the full prompt sent to the model
        #[arg(long)]
        show_prompt: bool,
        /// Number of sources to retrieve
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Interactive session that remembers recent questions
    Chat {
        #[arg(long, value_enum, default_value_t = PromptStyle::Default)]
        style: PromptStyle,
        #[arg(long)]
        cot: bool,
    },
    /// List the titled sections of a plain-text document
    Sections { file: PathBuf },
    /// Show corpus, index and manifest status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    if let Commands::Config { show } = cli.command {
        if show {
            show_config(&Config::load(&config_dir)?)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Build => {
            build_index(&config)?;
        }
        Commands::Search { query, k } => {
            search(&config, &query, k)?;
        }
        Commands::Ask {
            question,
            style,
            cot,
            upload,
            section,
            show_prompt,
            k,
        } => {
            let options = AskOptions {
                question,
                style,
                cot,
                upload,
                section,
                show_prompt,
                top_k: k,
            };
            ask(&config, &options)?;
        }
        Commands::Chat { style, cot } => {
            chat_session(&config, style, cot)?;
        }
        Commands::Sections { file } => {
            list_sections(&config, &file)?;
        }
        Commands::Status => {
            show_status(&config)?;
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
        let cli = Cli::try_parse_from(["ai-knower", "build"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Build));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn search_command_with_k() {
        let cli = Cli::try_parse_from(["ai-knower", "search", "graph neural networks", "-k", "5"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Search { query, k } = parsed.command {
                assert_eq!(query, "graph neural networks");
                assert_eq!(k, Some(5));
            }
        }
    }

    #[test]
    fn ask_command_defaults() {
        let cli = Cli::try_parse_from(["ai-knower", "ask", "What is dropout?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                question,
                style,
                cot,
                upload,
                section,
                ..
            } = parsed.command
            {
                assert_eq!(question, "What is dropout?");
                assert_eq!(style, PromptStyle::Default);
                assert!(!cot);
                assert_eq!(upload, None);
                assert_eq!(section, None);
            }
        }
    }

    #[test]
    fn ask_command_with_upload() {
        let cli = Cli::try_parse_from([
            "ai-knower",
            "ask",
            "Summarize this",
            "--style",
            "beginner-friendly",
            "--cot",
            "--upload",
            "notes.txt",
            "--section",
            "2",
            "--config-dir",
            "/tmp/knower",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/knower")));
            if let Commands::Ask {
                style,
                cot,
                upload,
                section,
                ..
            } = parsed.command
            {
                assert_eq!(style, PromptStyle::BeginnerFriendly);
                assert!(cot);
                assert_eq!(upload, Some(PathBuf::from("notes.txt")));
                assert_eq!(section, Some(2));
            }
        }
    }

    #[test]
    fn section_requires_upload() {
        let cli = Cli::try_parse_from(["ai-knower", "ask", "q", "--section", "2"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn unknown_style_is_rejected() {
        let cli = Cli::try_parse_from(["ai-knower", "ask", "q", "--style", "poetic"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidValue);
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["ai-knower", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["ai-knower", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["ai-knower", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
