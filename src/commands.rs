use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::Config;
use crate::documents::DocumentRepository;
use crate::engine::RagEngine;
use crate::indexer::Indexer;
use crate::store::{LanceVectorStore, VectorIndex};

/// Print the active configuration.
#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    eprintln!("  API Base: {}", style(&config.openai.api_base).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());
    eprintln!(
        "  API Key: {}",
        if config.api_key.is_some() {
            style("set").green()
        } else {
            style("missing").red()
        }
    );
    eprintln!();

    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Chunk Size: {} chars",
        style(config.chunking.chunk_size).cyan()
    );
    eprintln!(
        "  Overlap: {} words",
        style(config.chunking.overlap_words).cyan()
    );
    eprintln!();

    eprintln!("  Docs Directory: {}", style(config.docs_dir().display()).cyan());
    eprintln!(
        "  Vector Store: {}",
        style(config.vector_db_path().display()).cyan()
    );
    eprintln!(
        "  Config File: {}",
        style(config.config_file_path().display()).dim()
    );
}

/// Reindex one framework, or every framework with crawled documents when
/// none is given. Failures for one framework do not stop the others.
#[inline]
pub async fn index(config: &Config, framework: Option<String>) -> Result<()> {
    let repository = DocumentRepository::new(config.docs_dir());
    let indexer = Indexer::new(config)
        .await
        .context("Failed to initialize indexer")?;

    let frameworks = match framework {
        Some(framework) => vec![framework],
        None => repository
            .frameworks()
            .context("Failed to list frameworks")?,
    };

    if frameworks.is_empty() {
        println!(
            "No crawled documents found under {}.",
            config.docs_dir().display()
        );
        return Ok(());
    }

    let mut failed = 0;
    for framework in &frameworks {
        if let Err(e) = index_framework(&repository, &indexer, framework).await {
            error!(framework = framework.as_str(), "indexing failed: {e:#}");
            println!(
                "{} {}: {e:#}",
                style("✗").red(),
                style(framework).bold()
            );
            failed += 1;
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} frameworks failed to index", frameworks.len());
    }
    Ok(())
}

async fn index_framework(
    repository: &DocumentRepository,
    indexer: &Indexer,
    framework: &str,
) -> Result<()> {
    let documents = repository.latest_batch(framework)?;
    if documents.is_empty() {
        println!(
            "{} {}: no crawled documents, skipping",
            style("-").yellow(),
            style(framework).bold()
        );
        return Ok(());
    }

    println!(
        "Indexing {} ({} documents)",
        style(framework).bold(),
        documents.len()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").context("invalid progress template")?,
    );
    spinner.set_message(format!("embedding and storing chunks for {framework}"));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let written = indexer.reindex(framework, &documents).await?;

    spinner.finish_and_clear();
    println!(
        "{} {}: {} chunks stored",
        style("✓").green(),
        style(framework).bold(),
        written
    );
    Ok(())
}

/// Report how many chunks are stored per framework.
#[inline]
pub async fn check(config: &Config, framework: Option<String>) -> Result<()> {
    let store = LanceVectorStore::open(&config.vector_db_path())
        .await
        .context("Failed to open vector store")?;

    let frameworks = match framework {
        Some(framework) => vec![framework],
        None => DocumentRepository::new(config.docs_dir())
            .frameworks()
            .context("Failed to list frameworks")?,
    };

    if frameworks.is_empty() {
        println!("No frameworks to check.");
        return Ok(());
    }

    for framework in frameworks {
        let count = store.count_framework(&framework).await?;
        if count == 0 {
            println!("{}: no stored chunks", style(&framework).bold());
        } else {
            println!("{}: {} chunks", style(&framework).bold(), count);
        }
    }

    Ok(())
}

/// Answer a single question and print the result.
#[inline]
pub async fn ask(config: &Config, question: &str, framework: &str) -> Result<()> {
    let engine = RagEngine::new(config)
        .await
        .context("Failed to initialize query engine")?;

    let result = engine.query(question, framework).await;
    print_result(&result);
    Ok(())
}

/// Interactive question loop against one framework's documentation.
#[inline]
pub async fn chat(config: &Config, framework: &str) -> Result<()> {
    let engine = RagEngine::new(config)
        .await
        .context("Failed to initialize query engine")?;

    eprintln!(
        "{} {} {}",
        style("Chatting with").dim(),
        style(framework).bold().cyan(),
        style("documentation. Type 'exit' to quit.").dim()
    );

    loop {
        let question: String = Input::new()
            .with_prompt(style("You").bold().green().to_string())
            .interact_text()
            .context("Failed to read input")?;

        let trimmed = question.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        info!(framework = framework, "chat question received");
        let result = engine.query(trimmed, framework).await;
        print_result(&result);
        println!();
    }

    Ok(())
}

/// Display policy at the boundary: the error verbatim when present,
/// otherwise the answer with sources as a secondary section.
fn print_result(result: &crate::engine::QueryResult) {
    if let Some(error) = &result.error {
        println!("{} {}", style("Error:").bold().red(), error);
        return;
    }

    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").bold().dim());
        println!("{}", style(&result.sources).dim());
    }
}
