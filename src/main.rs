// src/main.rs

use cardvault::config::{CommandLineInput, SyncConfig};
use cardvault::error::AppError;
use cardvault::sources;
use cardvault::store::CardStore;
use cardvault::wiki::cache::CacheDir;
use cardvault::wiki::importer::import_from_wiki;
use cardvault::wiki::{HttpTransport, PageBatcher};
use chrono::Utc;
use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("cardvault.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = if verbose {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Runs every enabled importer against the store, saving only after all
/// of them succeeded. A transport failure exits before any sync
/// timestamp advances, so the next run retries the same window.
fn run(config: &SyncConfig) -> Result<(), AppError> {
    let now = Utc::now();

    log::info!("Loading knowledge base from {}", config.data_dir.display());
    let mut store = CardStore::load(&config.data_dir)?;
    log::info!(
        "Loaded {} cards and {} sets",
        store.card_count(),
        store.set_count()
    );

    if config.full {
        store.sync = Default::default();
    }

    if config.yamlyugi {
        log::info!("Importing YAML Yugi data...");
        let (updated, new) =
            sources::yamlyugi::import_from_yamlyugi(&mut store, &config.temp_dir, now)?;
        println!("YAML Yugi: {} cards updated, {} new", updated, new);
    }

    if config.prodeck {
        log::info!("Importing YGOPRODeck data...");
        let (updated, new) =
            sources::prodeck::import_from_prodeck(&mut store, &config.temp_dir, now)?;
        println!("YGOPRODeck: {} cards updated, {} new", updated, new);
    }

    if config.wiki {
        log::info!("Importing wiki data...");
        let transport = HttpTransport::new()?;
        let mut batcher = PageBatcher::new(Box::new(transport), CacheDir::new(&config.temp_dir));
        if config.no_cache {
            batcher.use_cache = false;
        }
        if config.full {
            batcher.clear_caches();
        }

        let shared = Rc::new(RefCell::new(store));
        let result = import_from_wiki(
            &mut batcher,
            &shared,
            now,
            config.wiki_cards,
            config.wiki_sets,
        );
        // Fetched data is valid regardless of how the attempt ended;
        // keep it so a retry does not pay for it again.
        if let Err(error) = batcher.save_caches() {
            log::warn!("Could not save wiki caches: {}", error);
        }
        let report = result?;
        store = Rc::try_unwrap(shared)
            .map(RefCell::into_inner)
            .map_err(|_| AppError::Store("store still shared after import".to_string()))?;
        println!(
            "Wiki: {} cards updated, {} new; {} sets updated, {} new",
            report.cards_found, report.cards_created, report.sets_found, report.sets_created
        );
    }

    log::info!("Saving knowledge base to {}", config.data_dir.display());
    store.save(&config.data_dir)?;
    println!(
        "Done. {} cards, {} sets.",
        store.card_count(),
        store.set_count()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();

    setup_logging(cli.verbose)?;

    let config = SyncConfig::resolve(cli)?;

    run(&config)?;

    Ok(())
}
