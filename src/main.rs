//! Search Eval CLI
//!
//! Scores retrieval quality of a hosted search index with an LLM judge.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use search_eval::{
    config::{Config, RetrievalMode},
    credential::{COGNITIVE_SERVICES_SCOPE, Credential, SEARCH_SCOPE, clean_key},
    embeddings::AzureOpenAiEmbedder,
    eval::{DEFAULT_QUERIES, Pipeline, PipelineSettings, RetrievalJudge},
    inspect::{decode_source_url, find_document},
    llm::LlmClient,
    retrieval::{Retriever, SearchClient},
};
use std::path::PathBuf;
use std::time::Instant;

/// Search Eval - LLM-judged retrieval quality for a search index
#[derive(Parser)]
#[command(name = "search-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve, judge and record each query
    Evaluate {
        /// Retrieval mode (keyword or hybrid)
        #[arg(short, long)]
        mode: Option<RetrievalMode>,

        /// Number of documents to retrieve per query
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output path for the JSON results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include the annotated context in each record
        #[arg(long, conflicts_with = "no_debug_context")]
        debug_context: bool,

        /// Leave the annotated context out (hybrid mode includes it by default)
        #[arg(long)]
        no_debug_context: bool,

        /// Query to evaluate (repeatable); replaces the built-in list
        #[arg(short, long = "query")]
        queries: Vec<String>,
    },

    /// Look up indexed chunks by id
    Inspect {
        /// Chunk ids to look up
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Test the Azure OpenAI chat deployment
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            mode,
            top_k,
            output,
            debug_context,
            no_debug_context,
            queries,
        } => {
            let debug_context = debug_context_override(debug_context, no_debug_context);
            cmd_evaluate(mode, top_k, output, debug_context, queries).await
        }
        Commands::Inspect { ids } => cmd_inspect(ids).await,
        Commands::Ping => cmd_ping().await,
    }
}

/// Debug-context setting requested on the command line, if any.
fn debug_context_override(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

async fn cmd_evaluate(
    mode: Option<RetrievalMode>,
    top_k: Option<usize>,
    output: Option<PathBuf>,
    debug_context: Option<bool>,
    queries: Vec<String>,
) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(mode) = mode {
        config.eval.mode = mode;
    }
    if top_k.is_some() {
        config.eval.top_k = top_k;
    }
    if output.is_some() {
        config.eval.output = output;
    }
    if debug_context.is_some() {
        config.eval.debug_context = debug_context;
    }

    config.validate().context("Invalid configuration")?;

    let search = SearchClient::new(
        &config.search,
        Credential::from_configured_key(config.search.api_key.as_deref(), SEARCH_SCOPE),
    );
    let retriever = Retriever::new(search, config.eval.mode, &config.search);

    // The OpenAI resource only accepts delegated identity
    if config.openai.api_key.is_some() {
        log::debug!("Ignoring AZURE_OPENAI_API_KEY; judge and embeddings use delegated identity");
    }
    let openai_credential = Credential::delegated(COGNITIVE_SERVICES_SCOPE);

    let embedder = match config.eval.mode {
        RetrievalMode::Keyword => None,
        RetrievalMode::Hybrid => {
            let deployment = config
                .openai
                .embedding_deployment
                .clone()
                .context("Hybrid mode requires an embedding deployment")?;
            Some(AzureOpenAiEmbedder::new(
                &config.openai,
                deployment,
                config.search.dimensions,
                openai_credential.clone(),
            ))
        }
    };

    let judge = RetrievalJudge::new(LlmClient::new(config.openai.clone(), openai_credential));

    let queries: Vec<String> = if queries.is_empty() {
        DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        queries
    };

    println!(
        "Starting evaluation of {} queries ({} mode, top {})...",
        queries.len(),
        config.eval.mode,
        config.eval.top_k()
    );
    println!("{}", "-".repeat(50));

    let start = Instant::now();
    let pipeline = Pipeline::new(retriever, embedder, judge, PipelineSettings::from(&config.eval));
    let results = pipeline.run(queries.as_slice()).await;

    results.print_summary();

    if !results.is_empty() {
        let path = config.eval.output_path();
        results.save(&path).context("Failed to save results")?;
        println!("Detailed results saved to {}", path.display());
    }
    println!("Total time: {:.1?}", start.elapsed());

    Ok(())
}

async fn cmd_inspect(ids: Vec<String>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate_search().context("Invalid configuration")?;

    let client = SearchClient::new(
        &config.search,
        Credential::from_configured_key(config.search.api_key.as_deref(), SEARCH_SCOPE),
    );

    println!("Inspecting {} specific chunk IDs...", ids.len());

    for id in &ids {
        println!("\n{}\nTarget ID: {}", "=".repeat(20), id);
        match decode_source_url(id) {
            Some(url) => println!("Origin URL: {}", url),
            None => println!("Origin URL: could not decode source URL from ID"),
        }

        match find_document(&client, id).await {
            Some(lookup) => {
                let doc = &lookup.document;
                println!("Found via {}", lookup.strategy);
                println!("Title: {}", doc.title.as_deref().unwrap_or("(none)"));
                println!("Content Length: {}", doc.content.chars().count());
                println!("{}", "-".repeat(20));
                println!("{}", doc.content);
                println!("{}", "-".repeat(20));
                println!("Available fields: {:?}", doc.field_names());
            }
            None => println!("Could not retrieve document from index."),
        }
    }

    Ok(())
}

async fn cmd_ping() -> Result<()> {
    println!("Testing Azure OpenAI connection...\n");

    let config = Config::load().context("Failed to load configuration")?;
    let key = clean_key(config.openai.api_key.as_deref());

    println!("Configuration:");
    println!("  Endpoint:    {}", config.openai.endpoint);
    match &key {
        Some(k) => println!("  Key:         {}...", k.chars().take(5).collect::<String>()),
        None => println!("  Key:         None (using delegated identity)"),
    }
    println!("  Deployment:  {}", config.openai.deployment);
    println!();

    if let Err(e) = config.validate_openai() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let credential =
        Credential::from_configured_key(config.openai.api_key.as_deref(), COGNITIVE_SERVICES_SCOPE);
    if credential.is_key() {
        println!("Using key authentication.");
    } else {
        println!("Using delegated identity.");
    }
    let client = LlmClient::new(config.openai, credential);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(reply) => {
            println!("Success!");
            println!("{}", reply);
        }
        Err(e) => {
            println!("Error: {}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate_flags(args: &[&str]) -> Option<bool> {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Evaluate {
                debug_context,
                no_debug_context,
                ..
            } => debug_context_override(debug_context, no_debug_context),
            _ => panic!("expected evaluate"),
        }
    }

    #[test]
    fn test_debug_context_flags() {
        assert_eq!(evaluate_flags(&["search-eval", "evaluate"]), None);
        assert_eq!(
            evaluate_flags(&["search-eval", "evaluate", "--debug-context"]),
            Some(true)
        );
        assert_eq!(
            evaluate_flags(&["search-eval", "evaluate", "-m", "hybrid", "--no-debug-context"]),
            Some(false)
        );
    }

    #[test]
    fn test_debug_context_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "search-eval",
            "evaluate",
            "--debug-context",
            "--no-debug-context",
        ]);
        assert!(parsed.is_err());
    }
}
