use clap::{Parser, Subcommand};
use docs_rag::Result;
use docs_rag::commands::{ask, chat, check, index, show_config};
use docs_rag::config::Config;

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Ask questions about framework documentation using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active configuration
    Config,
    /// Index crawled documentation into the vector store
    Index {
        /// Framework to index (all crawled frameworks when omitted)
        #[arg(long)]
        framework: Option<String>,
    },
    /// Show how many chunks are stored per framework
    Check {
        /// Framework to check (all crawled frameworks when omitted)
        #[arg(long)]
        framework: Option<String>,
    },
    /// Ask a single question
    Ask {
        /// The question to answer
        question: String,
        /// Framework whose documentation should be searched
        #[arg(short, long)]
        framework: String,
    },
    /// Interactive chat against one framework's documentation
    Chat {
        /// Framework whose documentation should be searched
        #[arg(short, long)]
        framework: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load_default()?;

    match cli.command {
        Commands::Config => {
            show_config(&config);
        }
        Commands::Index { framework } => {
            index(&config, framework).await?;
        }
        Commands::Check { framework } => {
            check(&config, framework).await?;
        }
        Commands::Ask {
            question,
            framework,
        } => {
            ask(&config, &question, &framework).await?;
        }
        Commands::Chat { framework } => {
            chat(&config, &framework).await?;
        }
    }

    Ok(())
}
