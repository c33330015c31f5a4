//! Service configuration.
//!
//! Sources (highest priority first):
//! 1. Environment variables (MEMOSCRIBE_HOME, MEMOSCRIBE_WATCH_DIR)
//! 2. Config file (<home>/config.yaml)
//! 3. Defaults (~/.memoscribe, macOS Voice Memos directory)
//!
//! The resolved config is built once at startup and passed explicitly into
//! the components that need it; there is no hidden global.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Audio extensions the pipeline accepts.
pub const AUDIO_EXTENSIONS: &[&str] = &["m4a", "mp3", "wav", "aac", "ogg"];

/// Raw config file schema (matches YAML structure).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Directory to watch for new recordings.
    pub watch_dir: Option<String>,
    /// Manual drop folder, processed regardless of file age.
    pub input_dir: Option<String>,
    /// Whisper model file.
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    pub whisper_cmd: Option<String>,
    pub ffmpeg_cmd: Option<String>,
    pub ffprobe_cmd: Option<String>,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    /// Seconds a path must stay quiet before it is promoted.
    pub quiescence_secs: Option<u64>,
    /// Files below this size are skipped as still-being-written.
    pub min_file_size_bytes: Option<u64>,
    /// Backfill recency window over the watched directory.
    pub backfill_days: Option<i64>,
}

/// External tool commands. Injectable so tests can substitute fakes.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub whisper: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            whisper: find_whisper_cmd(),
        }
    }
}

/// Fully resolved configuration with absolute paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub home: PathBuf,
    pub watch_dir: PathBuf,
    pub input_dir: PathBuf,
    pub db_path: PathBuf,
    pub settings_path: PathBuf,
    pub model_path: PathBuf,
    pub tools: ToolConfig,
    pub whisper_threads: usize,
    pub quiescence: Duration,
    pub sweep_tick: Duration,
    pub min_file_size: u64,
    pub backfill_days: i64,
    pub extensions: Vec<String>,
}

impl ResolvedConfig {
    /// Load configuration from env, config file and defaults.
    pub fn load() -> Result<Self> {
        let home = match std::env::var("MEMOSCRIBE_HOME") {
            Ok(h) => PathBuf::from(h),
            Err(_) => dirs::home_dir()
                .context("failed to determine home directory")?
                .join(".memoscribe"),
        };

        let file = load_config_file(&home.join("config.yaml"))?;

        let watch_dir = match std::env::var("MEMOSCRIBE_WATCH_DIR") {
            Ok(d) => PathBuf::from(d),
            Err(_) => file
                .paths
                .watch_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(default_recordings_dir),
        };

        let input_dir = file
            .paths
            .input_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("input"));

        let model_path = file
            .paths
            .model
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("models").join("ggml-large-v3-turbo-q5_0.bin"));

        let mut tools = ToolConfig::default();
        if let Some(cmd) = file.engine.whisper_cmd.clone() {
            tools.whisper = cmd;
        }
        if let Some(cmd) = file.engine.ffmpeg_cmd.clone() {
            tools.ffmpeg = cmd;
        }
        if let Some(cmd) = file.engine.ffprobe_cmd.clone() {
            tools.ffprobe = cmd;
        }

        let whisper_threads = file.engine.threads.unwrap_or_else(default_threads);

        Ok(Self {
            db_path: home.join("db").join("transcripts.db"),
            settings_path: home.join("settings.json"),
            watch_dir,
            input_dir,
            model_path,
            tools,
            whisper_threads,
            quiescence: Duration::from_secs(file.ingest.quiescence_secs.unwrap_or(3)),
            sweep_tick: Duration::from_secs(1),
            min_file_size: file.ingest.min_file_size_bytes.unwrap_or(1000),
            backfill_days: file.ingest.backfill_days.unwrap_or(14),
            extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            home,
        })
    }

    /// Create the directories the service writes to.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.home)?;
        std::fs::create_dir_all(&self.input_dir)?;
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Some(parent) = self.model_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Default Voice Memos recordings directory on macOS.
pub fn default_recordings_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join("Library/Group Containers/group.com.apple.VoiceMemos.shared/Recordings")
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Look for whisper-cli in the common install locations, falling back to
/// whatever PATH resolves.
fn find_whisper_cmd() -> String {
    let locations = [
        "/opt/homebrew/bin/whisper-cli",
        "/usr/local/bin/whisper-cli",
    ];
    for loc in locations {
        if Path::new(loc).exists() {
            return loc.to_string();
        }
    }
    "whisper-cli".to_string()
}

fn default_threads() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    cpus.min(8)
}
