use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use tracing::debug;

use ragbench_core::{
    Chunk, ChunkingConfig, OutputFormat, RagConfig, RetrievalMode, RetrievalResult,
};
use ragbench_prompt::citations::check_citations;
use ragbench_prompt::llm::LlmClient;
use ragbench_prompt::prompt::build_messages;
use ragbench_prompt::recipe::{DocSummary, Recipe, RecipeSettings};
use ragbench_retrieval::chunker::chunk_documents;
use ragbench_retrieval::context::{build_context, format_score, preview_chunks, render_trace};
use ragbench_retrieval::embedding::provider_from_config;
use ragbench_retrieval::retriever::{RetrievalRequest, Retriever};

const DEFAULT_CONFIG_FILE: &str = ".ragbench.toml";
const PREVIEW_CHARS: usize = 450;

#[derive(Parser)]
#[command(
    name = "ragbench",
    version,
    about = "Retrieval workbench: chunk, index, retrieve, and ground answers",
    long_about = "Ragbench chunks documents into overlapping word windows, indexes them with\n\
                   TF-IDF and/or embeddings, retrieves with keyword, vector, or hybrid (RRF)\n\
                   search, and assembles a bounded, citable context for an LLM.\n\n\
                   Examples:\n  \
                     ragbench chunk notes.md --chunk-size 120           Preview chunks\n  \
                     ragbench search 'what is rrf' --docs notes.md      Keyword search\n  \
                     ragbench search 'q' --docs a.md --mode hybrid      Hybrid search\n  \
                     ragbench ask 'q' --recipe recipe.json              Answer with citations\n  \
                     ragbench export --docs a.md b.md --out recipe.json Save a recipe"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .ragbench.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable output (default)\n  \
                         json      Machine-readable JSON\n  \
                         markdown  Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose (debug) logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Where chunks come from.
#[derive(Args)]
struct SourceArgs {
    /// Text documents to chunk (joined with blank lines, in order)
    #[arg(long, num_args = 1.., conflicts_with = "recipe")]
    docs: Vec<PathBuf>,

    /// Load chunks and settings from an exported recipe instead
    #[arg(long)]
    recipe: Option<PathBuf>,

    /// Words per chunk (overrides config; recipes carry their own)
    #[arg(long, conflicts_with = "recipe")]
    chunk_size: Option<usize>,

    /// Words shared between consecutive chunks (overrides config)
    #[arg(long, conflicts_with = "recipe")]
    overlap: Option<usize>,
}

#[derive(Args)]
struct RetrieveArgs {
    /// Retrieval mode: keyword, vector, or hybrid (overrides config)
    #[arg(long)]
    mode: Option<RetrievalMode>,

    /// Number of results (overrides config)
    #[arg(long)]
    top_k: Option<usize>,

    /// RRF smoothing constant for hybrid mode (overrides config)
    #[arg(long)]
    rrf_k: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Split documents into overlapping word chunks
    #[command(long_about = "Split documents into overlapping word chunks.\n\n\
        Documents are concatenated with blank lines and cut into windows of\n\
        --chunk-size words that overlap by --overlap words.\n\n\
        Examples:\n  ragbench chunk notes.md\n  ragbench chunk a.md b.md --chunk-size 50 --overlap 10")]
    Chunk {
        /// Text documents to chunk
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Words per chunk (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Words shared between consecutive chunks (overrides config)
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Retrieve the chunks most relevant to a question
    #[command(long_about = "Retrieve the chunks most relevant to a question.\n\n\
        Builds the keyword index, and the vector index when the mode needs it,\n\
        then prints the ranked trace. Use --context to print the assembled\n\
        context block that would be sent to the model.\n\n\
        Examples:\n  ragbench search 'tokio runtime' --docs notes.md\n  \
        ragbench search 'tokio runtime' --recipe recipe.json --mode hybrid --top-k 3")]
    Search {
        /// The question
        question: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        retrieve: RetrieveArgs,

        /// Also print the assembled context
        #[arg(long)]
        context: bool,
    },
    /// Retrieve, prompt the configured model, and check citations
    #[command(long_about = "Retrieve, prompt the configured model, and check citations.\n\n\
        In the default explain mode no network request is made. Set [llm] mode = \"api\"\n\
        with endpoint, model, and api_key to call an OpenAI-compatible endpoint.\n\n\
        Examples:\n  ragbench ask 'how does rrf work?' --docs notes.md")]
    Ask {
        /// The question
        question: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        retrieve: RetrieveArgs,
    },
    /// Send a tiny test request to the configured LLM endpoint
    CheckLlm,
    /// Chunk documents and save them with the current settings as a recipe
    #[command(long_about = "Chunk documents and save them with the current settings as a recipe.\n\n\
        Recipes store settings and chunks, never embeddings.\n\n\
        Examples:\n  ragbench export --docs a.md b.md --out recipe.json")]
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output path
        #[arg(long, default_value = "recipe.json")]
        out: PathBuf,
    },
    /// Create a default .ragbench.toml configuration file
    #[command(long_about = "Create a default .ragbench.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .ragbench.toml already exists.")]
    Init,
}

const DEFAULT_CONFIG: &str = r#"# Ragbench Configuration

[chunking]
# chunk_size_words = 220
# overlap_words = 40

[retrieval]
# mode = "keyword"          # keyword | vector | hybrid
# top_k = 5
# rrf_k = 60
# candidate_pool = 10
# max_context_chars = 9000

[embedding]
# provider = "hashing"      # hashing (offline) | openai
# model = "text-embedding-3-small"
# base_url = "https://api.openai.com/v1"
# dimensions = 384
# max_input_chars = 2000

[llm]
# mode = "explain"          # explain | api
# endpoint = "https://api.openai.com/v1/chat/completions"
# model = "gpt-4o-mini"
# temperature = 0.7
# top_p = 0.9
# max_tokens = 512

[prompt]
# cite_mode = "soft"        # soft | strict
# safe_mode = "on"          # on | off
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    debug!(format = %cli.format, "configuration loaded");

    match cli.command {
        Command::Chunk {
            ref files,
            chunk_size,
            overlap,
        } => {
            apply_chunking(&mut config, chunk_size, overlap)?;
            let texts = read_documents(files)?;
            let chunks = chunk_documents(&texts, &config.chunking)?;
            print_chunks(&chunks, cli.format)?;
        }
        Command::Search {
            ref question,
            ref source,
            ref retrieve,
            context,
        } => {
            let chunks = load_chunks(&mut config, source)?;
            apply_retrieval(&mut config, retrieve);
            config.validate()?;

            let retriever = build_retriever(chunks, &config).await?;
            let results = retriever
                .retrieve(question, &RetrievalRequest::from(&config.retrieval))
                .await?;
            let assembled = context.then(|| build_context(&results, config.retrieval.max_context_chars));
            print_search(question, &config, &results, assembled.as_deref(), cli.format)?;
        }
        Command::Ask {
            ref question,
            ref source,
            ref retrieve,
        } => {
            let chunks = load_chunks(&mut config, source)?;
            apply_retrieval(&mut config, retrieve);
            config.validate()?;

            let retriever = build_retriever(chunks, &config).await?;
            let results = retriever
                .retrieve(question, &RetrievalRequest::from(&config.retrieval))
                .await?;
            let context = build_context(&results, config.retrieval.max_context_chars);
            let messages = build_messages(question, &context, &config.prompt);

            let client = LlmClient::new(&config.llm)?;
            let spinner = spinner("Generating answer...")?;
            let answer = client.complete(&messages).await.inspect_err(|_e| {
                if let Some(pb) = &spinner {
                    pb.finish_with_message("Failed");
                }
            })?;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }

            let report = check_citations(&answer, &results);
            match cli.format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "question": question,
                        "answer": answer,
                        "results": results,
                        "citations": report,
                    });
                    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("## Answer\n\n{answer}\n");
                    println!("## Retrieved\n");
                    print_markdown_results(&results);
                    println!("\n## Citations\n\n```\n{report}\n```");
                }
                OutputFormat::Text => {
                    println!("{answer}\n");
                    println!("{report}");
                }
            }
        }
        Command::CheckLlm => {
            let client = LlmClient::new(&config.llm)?;
            let reply = client.test_connection().await?;
            println!("{reply}");
        }
        Command::Export {
            ref source,
            ref out,
        } => {
            if source.docs.is_empty() {
                miette::bail!("export reads documents; pass --docs <files...>");
            }
            apply_chunking(&mut config, source.chunk_size, source.overlap)?;
            let texts = read_documents(&source.docs)?;
            let chunks = chunk_documents(&texts, &config.chunking)?;
            let docs = source
                .docs
                .iter()
                .zip(&texts)
                .map(|(path, text)| DocSummary {
                    name: path.display().to_string(),
                    text_length: text.chars().count(),
                })
                .collect();
            let count = chunks.len();
            let recipe = Recipe::new(RecipeSettings::from(&config), docs, chunks);
            recipe
                .write_to(out)
                .wrap_err_with(|| format!("failed to write {}", out.display()))?;
            println!("Exported {count} chunks to {}", out.display());
        }
        Command::Init => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                miette::bail!("{DEFAULT_CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {DEFAULT_CONFIG_FILE} with default configuration");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    let config = match path {
        Some(path) => RagConfig::from_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                RagConfig::from_file(default_path)?
            } else {
                RagConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

fn apply_chunking(
    config: &mut RagConfig,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    config.chunking = ChunkingConfig::new(
        chunk_size.unwrap_or(config.chunking.chunk_size_words),
        overlap.unwrap_or(config.chunking.overlap_words),
    )?;
    Ok(())
}

fn apply_retrieval(config: &mut RagConfig, args: &RetrieveArgs) {
    if let Some(mode) = args.mode {
        config.retrieval.mode = mode;
    }
    if let Some(top_k) = args.top_k {
        config.retrieval.top_k = top_k;
    }
    if let Some(rrf_k) = args.rrf_k {
        config.retrieval.rrf_k = rrf_k;
    }
}

fn read_documents(paths: &[PathBuf]) -> Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read {}", path.display()))
        })
        .collect()
}

/// Chunks from a recipe (whose settings then apply) or from documents.
fn load_chunks(config: &mut RagConfig, source: &SourceArgs) -> Result<Vec<Arc<Chunk>>> {
    if let Some(path) = &source.recipe {
        let recipe = Recipe::read_from(path)?;
        recipe.settings.apply_to(config);
        debug!(chunks = recipe.chunks.len(), "recipe loaded");
        return Ok(recipe.chunks);
    }
    if source.docs.is_empty() {
        miette::bail!("no input: pass --docs <files...> or --recipe <file>");
    }
    apply_chunking(config, source.chunk_size, source.overlap)?;
    let texts = read_documents(&source.docs)?;
    Ok(chunk_documents(&texts, &config.chunking)?)
}

async fn build_retriever(chunks: Vec<Arc<Chunk>>, config: &RagConfig) -> Result<Retriever> {
    let mut retriever = Retriever::new(chunks);
    retriever.build_keyword();
    if !config.retrieval.mode.needs_vectors() {
        return Ok(retriever);
    }

    let provider = provider_from_config(&config.embedding)?;
    let bar = progress_bar(retriever.chunks().len() as u64)?;
    let built = retriever
        .build_vector(provider, Some(config.embedding.max_input_chars), |p| {
            bar.set_position(p.done as u64)
        })
        .await;
    match &built {
        Ok(()) => bar.finish_and_clear(),
        Err(_) => bar.abandon_with_message("embedding failed"),
    }
    built?;
    Ok(retriever)
}

fn progress_bar(total: u64) -> Result<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return Ok(indicatif::ProgressBar::hidden());
    }
    let pb = indicatif::ProgressBar::new(total);
    pb.set_style(
        indicatif::ProgressStyle::with_template(
            "{spinner:.cyan} embedding chunks [{bar:30.cyan/blue}] {pos}/{len} ({elapsed}) {msg}",
        )
        .into_diagnostic()?,
    );
    Ok(pb)
}

fn spinner(message: &'static str) -> Result<Option<indicatif::ProgressBar>> {
    if !std::io::stderr().is_terminal() {
        return Ok(None);
    }
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_style(
        indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
            .into_diagnostic()?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(Some(pb))
}

fn print_chunks(chunks: &[Arc<Chunk>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(chunks).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            for chunk in chunks {
                println!(
                    "### chunk {} (words {}..{})\n\n{}\n",
                    chunk.id, chunk.meta.start_word, chunk.meta.end_word, chunk.text
                );
            }
        }
        OutputFormat::Text => {
            println!("{}", preview_chunks(chunks, PREVIEW_CHARS));
            eprintln!("\n{} chunks", chunks.len());
        }
    }
    Ok(())
}

fn print_search(
    question: &str,
    config: &RagConfig,
    results: &[RetrievalResult],
    context: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let mut json = serde_json::json!({
                "question": question,
                "mode": config.retrieval.mode,
                "topK": config.retrieval.top_k,
                "results": results,
            });
            if let Some(context) = context {
                json["context"] = serde_json::Value::from(context);
            }
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("## Results for: {question}\n");
            print_markdown_results(results);
            if let Some(context) = context {
                println!("\n## Context\n\n```\n{context}\n```");
            }
        }
        OutputFormat::Text => {
            println!("{}", render_trace(results));
            if let Some(context) = context {
                println!("--- context ---\n{context}");
            }
        }
    }
    Ok(())
}

fn print_markdown_results(results: &[RetrievalResult]) {
    if results.is_empty() {
        println!("_No results._");
        return;
    }
    println!("| Rank | Chunk | Score | Via |");
    println!("|------|-------|-------|-----|");
    for (i, r) in results.iter().enumerate() {
        println!(
            "| {} | {} | {} | {} |",
            i + 1,
            r.chunk.id,
            format_score(r.score),
            r.method
        );
    }
}
