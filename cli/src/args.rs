//! Command-line arguments
//!
//! Flags override the loaded [`PipelineConfig`]; anything not given on the
//! command line keeps the value from the config file or the defaults.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use healthrag_core::{PipelineConfig, ProviderKind};

#[derive(Debug, Parser)]
#[command(name = "healthrag")]
#[command(about = "Chunk, index and search multilingual healthcare documents")]
#[command(version)]
pub struct Cli {
    /// TOML config file (defaults to $HEALTHRAG_CONFIG, then built-in defaults)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub embedding: EmbeddingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split extracted .txt files into overlapping word windows
    Chunk(ChunkArgs),
    /// Embed the chunk store and publish the index
    Build(BuildArgs),
    /// Retrieve the best matching chunks for a query
    Search(SearchArgs),
    /// Chunk, then build; optionally search the fresh index
    Run(RunArgs),
    /// Show what the published index was built with
    Info(InfoArgs),
}

/// Embedding provider overrides, accepted by every subcommand
#[derive(Debug, Default, Args)]
pub struct EmbeddingArgs {
    /// Embedding provider: fastembed, http or hash
    #[arg(long, global = true)]
    pub provider: Option<ProviderKind>,

    /// Model identifier for the provider
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Vector dimension (hash provider, or to skip the http dimension check)
    #[arg(long, global = true)]
    pub dimension: Option<usize>,

    /// Texts per embedding call
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Base URL of an OpenAI-compatible embeddings API
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Args)]
pub struct ChunkArgs {
    /// Root of the extracted text tree
    #[arg(long)]
    pub text_dir: Option<PathBuf>,

    /// Chunk store to write
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Words per chunk
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Words shared by consecutive chunks
    #[arg(long)]
    pub overlap: Option<usize>,
}

#[derive(Debug, Default, Args)]
pub struct BuildArgs {
    /// Chunk store to read
    #[arg(long)]
    pub chunks: Option<PathBuf>,

    /// Directory to publish the index into
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Only index the first N chunks (0 indexes all)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Args)]
pub struct QueryArgs {
    /// Number of hits
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Drop hits scoring below this
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Print hits as a citation block for prompt context
    #[arg(long, conflicts_with = "json")]
    pub context: bool,

    /// Print hits as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    /// Directory holding the published index
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    #[command(flatten)]
    pub output: QueryArgs,
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub chunk: ChunkArgs,

    /// Directory to publish the index into
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Only index the first N chunks (0 indexes all)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Search the fresh index for this query
    #[arg(long)]
    pub query: Option<String>,

    #[command(flatten)]
    pub output: QueryArgs,
}

#[derive(Debug, Default, Args)]
pub struct InfoArgs {
    /// Directory holding the published index
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl EmbeddingArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        let embedding = &mut config.embedding;
        if let Some(provider) = self.provider {
            embedding.provider = provider;
        }
        if let Some(model) = &self.model {
            embedding.model = model.clone();
        }
        if self.dimension.is_some() {
            embedding.dimension = self.dimension;
        }
        if let Some(batch_size) = self.batch_size {
            embedding.batch_size = batch_size;
        }
        if self.base_url.is_some() {
            embedding.base_url = self.base_url.clone();
        }
    }
}

impl ChunkArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.text_dir {
            config.paths.text_dir = dir.clone();
        }
        if let Some(out) = &self.out {
            config.paths.chunk_path = out.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.chunking.max_tokens = max_tokens;
        }
        if let Some(overlap) = self.overlap {
            config.chunking.overlap = overlap;
        }
    }
}

impl BuildArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(chunks) = &self.chunks {
            config.paths.chunk_path = chunks.clone();
        }
        if let Some(dir) = &self.index_dir {
            config.paths.index_dir = dir.clone();
        }
    }
}

impl QueryArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(top_k) = self.top_k {
            config.search.top_k = top_k;
        }
        if self.min_score.is_some() {
            config.search.min_score = self.min_score;
        }
    }
}

impl Cli {
    /// Load the config file and layer this invocation's flags on top
    pub fn resolve_config(&self) -> healthrag_core::Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref())?;
        self.embedding.apply(&mut config);

        match &self.command {
            Command::Chunk(args) => args.apply(&mut config),
            Command::Build(args) => args.apply(&mut config),
            Command::Search(args) => {
                if let Some(dir) = &args.index_dir {
                    config.paths.index_dir = dir.clone();
                }
                args.output.apply(&mut config);
            }
            Command::Run(args) => {
                args.chunk.apply(&mut config);
                if let Some(dir) = &args.index_dir {
                    config.paths.index_dir = dir.clone();
                }
                args.output.apply(&mut config);
            }
            Command::Info(args) => {
                if let Some(dir) = &args.index_dir {
                    config.paths.index_dir = dir.clone();
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}
