// src/config.rs
use crate::error::{AppError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Directory the generated knowledge base is written to
    #[arg(short = 'd', long, default_value = "data")]
    pub data_dir: String,

    /// Directory for caches and downloaded dumps
    #[arg(long, default_value = "temp")]
    pub temp_dir: String,

    /// Skip the wiki importer
    #[arg(long, default_value_t = false)]
    pub skip_wiki: bool,

    /// Skip importing cards from the wiki
    #[arg(long, default_value_t = false)]
    pub skip_wiki_cards: bool,

    /// Skip importing sets from the wiki
    #[arg(long, default_value_t = false)]
    pub skip_wiki_sets: bool,

    /// Skip the YAML Yugi bulk importer
    #[arg(long, default_value_t = false)]
    pub skip_yamlyugi: bool,

    /// Skip the YGOPRODeck bulk importer
    #[arg(long, default_value_t = false)]
    pub skip_prodeck: bool,

    /// Disable cache reads (always fetch fresh data; caches still fill)
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Drop caches and sync state, forcing a full re-crawl
    #[arg(long, default_value_t = false)]
    pub full: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved run configuration — validated and ready to drive the
/// importers.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub data_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub wiki: bool,
    pub wiki_cards: bool,
    pub wiki_sets: bool,
    pub yamlyugi: bool,
    pub prodeck: bool,
    pub no_cache: bool,
    pub full: bool,
    pub verbose: bool,
}

impl SyncConfig {
    /// Resolves a run configuration from CLI input.
    pub fn resolve(cli: CommandLineInput) -> Result<Self> {
        if cli.skip_wiki && cli.skip_yamlyugi && cli.skip_prodeck {
            return Err(AppError::MissingConfiguration(
                "every importer is skipped; nothing to do".to_string(),
            ));
        }
        Ok(SyncConfig {
            data_dir: PathBuf::from(cli.data_dir),
            temp_dir: PathBuf::from(cli.temp_dir),
            wiki: !cli.skip_wiki,
            wiki_cards: !cli.skip_wiki_cards,
            wiki_sets: !cli.skip_wiki_sets,
            yamlyugi: !cli.skip_yamlyugi,
            prodeck: !cli.skip_prodeck,
            no_cache: cli.no_cache,
            full: cli.full,
            verbose: cli.verbose,
        })
    }
}
