//! Command-line interface for memoscribe.
//!
//! - `memoscribe watch` - backfill, then watch for new recordings
//! - `memoscribe scan` - one-shot backfill of existing files
//! - `memoscribe list` / `search` / `show` / `delete` - browse the store
//! - `memoscribe language` - get/set the transcription language
//! - `memoscribe config` - show resolved configuration

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;

use crate::adapters::OsaScriptNotifier;
use crate::config::ResolvedConfig;
use crate::ingest::{
    AudioProcessor, BackfillScanner, DebouncedWatcher, Pipeline, ProcessorConfig, ScanConfig,
    ScanSummary, WatchConfig,
};
use crate::settings::SettingsSource;
use crate::store::TranscriptStore;

/// memoscribe - voice memo ingestion and transcription service
#[derive(Parser, Debug)]
#[command(name = "memoscribe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Backfill existing recordings, then watch for new ones
    Watch,

    /// Process existing recordings once and exit
    Scan,

    /// List recent transcripts
    List {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Search transcripts and filenames
    Search {
        /// Substring to look for
        query: String,
    },

    /// Show a single transcript in full
    Show {
        /// Record id
        id: i64,
    },

    /// Delete a transcript record
    Delete {
        /// Record id
        id: i64,
    },

    /// Get or set the transcription language
    Language {
        /// Language code to set (e.g. "auto", "en", "sv"); prints the
        /// current value when omitted
        code: Option<String>,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = ResolvedConfig::load()?;

        match self.command {
            Commands::Watch => execute_watch(&config).await,
            Commands::Scan => execute_scan(&config).await,
            Commands::List { limit } => execute_list(&config, limit),
            Commands::Search { query } => execute_search(&config, &query),
            Commands::Show { id } => execute_show(&config, id),
            Commands::Delete { id } => execute_delete(&config, id),
            Commands::Language { code } => execute_language(&config, code),
            Commands::Config => execute_config(&config),
        }
    }
}

fn build_pipeline(config: &ResolvedConfig) -> Result<Pipeline> {
    // Store initialization failure is the one fatal error in the system.
    let store = TranscriptStore::open(&config.db_path)
        .with_context(|| format!("failed to open store: {}", config.db_path.display()))?;

    let processor = AudioProcessor::new(ProcessorConfig {
        tools: config.tools.clone(),
        model_path: config.model_path.clone(),
        threads: config.whisper_threads,
        min_file_size: config.min_file_size,
        extensions: config.extensions.clone(),
        work_dir: None,
    });

    Ok(Pipeline::new(
        store,
        processor,
        SettingsSource::new(&config.settings_path),
        Arc::new(OsaScriptNotifier),
    ))
}

fn scan_config(config: &ResolvedConfig) -> ScanConfig {
    ScanConfig {
        watch_dir: config.watch_dir.clone(),
        input_dir: config.input_dir.clone(),
        backfill_days: config.backfill_days,
        extensions: config.extensions.clone(),
    }
}

/// Backfill, then watch until Ctrl-C.
async fn execute_watch(config: &ResolvedConfig) -> Result<()> {
    config.ensure_dirs()?;
    let pipeline = build_pipeline(config)?;

    println!("Watching:  {}", config.watch_dir.display());
    println!("Drop dir:  {}", config.input_dir.display());
    println!("Database:  {}", config.db_path.display());
    println!("Model:     {}", config.model_path.display());
    println!();
    println!("Watching for new recordings... (Ctrl+C to stop)");

    let (ready_tx, ready_rx) = mpsc::channel(100);

    // The scanner runs alongside the pipeline so a large backlog cannot
    // fill the channel with nobody draining it.
    let scanner = BackfillScanner::new(scan_config(config));
    let scan_tx = ready_tx.clone();
    let scan_task = tokio::spawn(async move { scanner.run(&scan_tx).await });

    let watcher = DebouncedWatcher::new(WatchConfig {
        paths: vec![config.watch_dir.clone(), config.input_dir.clone()],
        quiescence: config.quiescence,
        sweep_tick: config.sweep_tick,
        extensions: config.extensions.clone(),
    });
    let handle = watcher.watch(ready_tx)?;

    // Ctrl-C signals the pipeline (which abandons the backlog and bounds the
    // in-flight file with a grace period) and stops the watcher.
    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let stopper = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("stop signal received");
        let _ = stop_tx.send(true);
        let _ = handle.stop().await;
    });

    pipeline.run(ready_rx, stop_rx).await;

    let _ = scan_task.await?;
    stopper.abort();
    println!("Stopped.");
    Ok(())
}

/// One-shot backfill pass.
async fn execute_scan(config: &ResolvedConfig) -> Result<()> {
    config.ensure_dirs()?;
    let pipeline = build_pipeline(config)?;

    println!("Scanning: {}", config.watch_dir.display());
    println!("Drop dir: {}", config.input_dir.display());

    let (ready_tx, ready_rx) = mpsc::channel(100);
    let scanner = BackfillScanner::new(scan_config(config));
    let scan_task = tokio::spawn(async move { scanner.run(&ready_tx).await });

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let stopper = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("stop signal received");
        let _ = stop_tx.send(true);
    });

    pipeline.run(ready_rx, stop_rx).await;
    stopper.abort();

    let summary: ScanSummary = scan_task.await??;
    println!();
    println!("Scan results:");
    println!("  Candidates queued:  {}", summary.queued);
    println!("  Outside window:     {}", summary.too_old);
    println!("  Ignored (non-audio): {}", summary.ignored);
    Ok(())
}

fn execute_list(config: &ResolvedConfig, limit: usize) -> Result<()> {
    let store = TranscriptStore::open(&config.db_path)?;
    let records = store.list(limit)?;

    if records.is_empty() {
        println!("No transcripts yet");
        return Ok(());
    }

    println!();
    println!("{:<6} {:<32} {:<9} {:<6} TRANSCRIPT", "ID", "FILE", "DURATION", "LANG");
    println!("{}", "-".repeat(100));
    for record in &records {
        let filename = truncate(&record.filename, 30);
        println!(
            "{:<6} {:<32} {:<9} {:<6} {}",
            record.id,
            filename,
            format_duration(record.duration_seconds),
            record.language,
            record.preview(40)
        );
    }
    println!();
    println!("  {} record(s)", records.len());
    Ok(())
}

fn execute_search(config: &ResolvedConfig, query: &str) -> Result<()> {
    let store = TranscriptStore::open(&config.db_path)?;
    let records = store.search(query)?;

    if records.is_empty() {
        println!("No matches for {:?}", query);
        return Ok(());
    }

    for record in &records {
        println!("[{}] {}", record.id, record.filename);
        println!("    {}", record.preview(200));
    }
    println!();
    println!("  {} match(es)", records.len());
    Ok(())
}

fn execute_show(config: &ResolvedConfig, id: i64) -> Result<()> {
    let store = TranscriptStore::open(&config.db_path)?;
    let record = store
        .get(id)?
        .with_context(|| format!("no transcript with id {}", id))?;

    println!("File:        {}", record.filename);
    println!("Path:        {}", record.original_path.display());
    println!("Duration:    {}", format_duration(record.duration_seconds));
    println!("Language:    {}", record.language);
    println!("Hash:        {}", record.content_hash);
    if let Some(at) = record.transcribed_at {
        println!("Transcribed: {}", at.format("%Y-%m-%d %H:%M"));
    }
    println!();
    println!("{}", record.transcript.as_deref().unwrap_or("(no transcript)"));
    Ok(())
}

fn execute_delete(config: &ResolvedConfig, id: i64) -> Result<()> {
    let store = TranscriptStore::open(&config.db_path)?;
    if store.delete(id)? {
        println!("Deleted transcript {}", id);
    } else {
        println!("No transcript with id {}", id);
    }
    Ok(())
}

fn execute_language(config: &ResolvedConfig, code: Option<String>) -> Result<()> {
    let settings = SettingsSource::new(&config.settings_path);
    match code {
        Some(code) => {
            settings.set_language(&code)?;
            println!("Language set to {:?} (applies to the next file)", code);
        }
        None => println!("Language: {:?}", settings.language()),
    }
    Ok(())
}

fn execute_config(config: &ResolvedConfig) -> Result<()> {
    println!();
    println!("memoscribe configuration");
    println!("════════════════════════════════════════════════");
    println!();
    println!("Home:         {}", config.home.display());
    println!("Watch dir:    {}", config.watch_dir.display());
    println!("Drop dir:     {}", config.input_dir.display());
    println!("Database:     {}", config.db_path.display());
    println!("Settings:     {}", config.settings_path.display());
    println!("Model:        {}", config.model_path.display());
    println!();
    println!("ffmpeg:       {}", config.tools.ffmpeg);
    println!("ffprobe:      {}", config.tools.ffprobe);
    println!("whisper:      {}", config.tools.whisper);
    println!("Threads:      {}", config.whisper_threads);
    println!();
    println!("Quiescence:   {:?}", config.quiescence);
    println!("Min size:     {} bytes", config.min_file_size);
    println!("Backfill:     last {} days", config.backfill_days);
    println!("Extensions:   {:?}", config.extensions);
    println!();

    if config.watch_dir.exists() {
        println!("✓ Watch directory exists");
    } else {
        println!("⚠️  Watch directory does not exist");
    }
    Ok(())
}

/// Format seconds as m:ss or h:mm:ss.
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
