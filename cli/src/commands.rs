//! Subcommand implementations
//!
//! Each command takes the resolved config and writes its human-facing
//! output to the given writer; progress and diagnostics go through logging.

use anyhow::{Context, Result};
use std::io::Write;

use healthrag_core::{
    format_context, ChunkReport, Chunker, EmbeddingEngine, IndexHeader, IndexInfo, IndexStore, Indexer,
    PipelineConfig, Retriever, SearchConfig, SearchHit,
};

use crate::args::{Cli, Command, QueryArgs};

/// Characters of chunk text shown per hit
const SNIPPET_CHARS: usize = 400;

/// Dispatch a parsed command line
pub fn execute<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let config = cli.resolve_config().context("Invalid configuration")?;

    match &cli.command {
        Command::Chunk(_) => {
            let report = chunk(&config)?;
            print_report(out, &report)?;
        }
        Command::Build(args) => {
            let engine = engine(&config)?;
            let header = build(&config, &engine, args.limit)?;
            print_header(out, &header)?;
        }
        Command::Search(args) => {
            let engine = engine(&config)?;
            let hits = search(&config, &engine, &args.query)?;
            print_hits(out, &hits, &args.output)?;
        }
        Command::Run(args) => {
            let report = chunk(&config)?;
            print_report(out, &report)?;
            let engine = engine(&config)?;
            let header = build(&config, &engine, args.limit)?;
            print_header(out, &header)?;
            if let Some(query) = &args.query {
                let hits = search(&config, &engine, query)?;
                print_hits(out, &hits, &args.output)?;
            }
        }
        Command::Info(args) => {
            let info = IndexStore::new(&config.paths.index_dir)
                .info()
                .context("Failed to read index")?;
            print_info(out, &info, args.json)?;
        }
    }
    Ok(())
}

fn engine(config: &PipelineConfig) -> Result<EmbeddingEngine> {
    EmbeddingEngine::from_config(&config.embedding)
        .with_context(|| format!("Failed to initialize {} embedding provider", config.embedding.provider))
}

pub fn chunk(config: &PipelineConfig) -> Result<ChunkReport> {
    let chunker = Chunker::new(config.chunking.clone())?;
    chunker
        .run(&config.paths.text_dir, &config.paths.chunk_path)
        .with_context(|| format!("Chunking {} failed", config.paths.text_dir.display()))
}

pub fn build(config: &PipelineConfig, engine: &EmbeddingEngine, limit: Option<usize>) -> Result<IndexHeader> {
    let store = IndexStore::new(&config.paths.index_dir);
    Indexer::new(engine)
        .build_and_publish(&config.paths.chunk_path, limit, &store)
        .with_context(|| format!("Building index from {} failed", config.paths.chunk_path.display()))
}

pub fn search(config: &PipelineConfig, engine: &EmbeddingEngine, query: &str) -> Result<Vec<SearchHit>> {
    let store = IndexStore::new(&config.paths.index_dir);
    let retriever = Retriever::open(&store, engine, &config.search)
        .with_context(|| format!("Failed to open index at {}", store.dir().display()))?;
    let hits = retriever.search_with(query, &SearchConfig::from(&config.search))?;
    tracing::debug!(hits = hits.len(), approximate = retriever.is_approximate(), "Search complete");
    Ok(hits)
}

fn print_report<W: Write>(out: &mut W, report: &ChunkReport) -> Result<()> {
    writeln!(
        out,
        "Chunked {} of {} documents into {} chunks ({} empty, {} unreadable)",
        report.documents_chunked,
        report.documents_seen,
        report.chunks_written,
        report.skipped_empty,
        report.skipped_unreadable
    )?;
    Ok(())
}

fn print_header<W: Write>(out: &mut W, header: &IndexHeader) -> Result<()> {
    writeln!(
        out,
        "Indexed {} chunks (dim {}, model {})",
        header.rows, header.dimension, header.model
    )?;
    Ok(())
}

fn print_info<W: Write>(out: &mut W, info: &IndexInfo, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, info)?;
        writeln!(out)?;
        return Ok(());
    }
    writeln!(out, "Index:      {}", info.dir.display())?;
    writeln!(out, "Rows:       {}", info.rows)?;
    writeln!(out, "Dimension:  {}", info.dimension)?;
    writeln!(out, "Model:      {}", info.model)?;
    writeln!(out, "Built:      {}", info.built_at.to_rfc3339())?;
    writeln!(out, "Metadata:   sha256 {}", info.metadata_sha256)?;
    writeln!(
        out,
        "Size:       {} bytes index, {} bytes metadata",
        info.index_bytes, info.metadata_bytes
    )?;
    Ok(())
}

pub fn print_hits<W: Write>(out: &mut W, hits: &[SearchHit], options: &QueryArgs) -> Result<()> {
    if options.json {
        serde_json::to_writer_pretty(&mut *out, hits)?;
        writeln!(out)?;
        return Ok(());
    }
    if options.context {
        writeln!(out, "{}", format_context(hits))?;
        return Ok(());
    }
    if hits.is_empty() {
        writeln!(out, "No results.")?;
        return Ok(());
    }

    for hit in hits {
        writeln!(
            out,
            "{}. score={:.4} {}#{} [{}]",
            hit.rank, hit.score, hit.record.source, hit.record.chunk_index, hit.record.language
        )?;
        writeln!(out, "   {}", snippet(&hit.record.text))?;
    }
    Ok(())
}

/// First [`SNIPPET_CHARS`] characters on a single line
fn snippet(text: &str) -> String {
    let mut s: String = text.chars().take(SNIPPET_CHARS).collect();
    if text.chars().count() > SNIPPET_CHARS {
        s.push_str("...");
    }
    s.replace(['\n', '\r'], " ")
}
