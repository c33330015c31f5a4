//! Conversion and transcription of a single audio file.
//!
//! Owns the temporary-artifact lifecycle: every run gets a scoped temp
//! directory for the canonical waveform and the engine's output, removed on
//! every exit path (including panics) when the guard drops. The waveform
//! itself is additionally deleted as soon as transcription returns.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::adapters::{convert_to_wav, probe_duration, transcribe};
use crate::config::ToolConfig;
use crate::domain::{FailureKind, ProcessOutcome, SkipReason, Transcription};

/// Configuration for the audio processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub tools: ToolConfig,
    pub model_path: PathBuf,
    pub threads: usize,

    /// Files below this size are treated as still being written.
    pub min_file_size: u64,

    /// Accepted extensions, lowercase.
    pub extensions: Vec<String>,

    /// Where per-file temp directories are created. `None` uses the system
    /// temp dir; tests point this at a known location to assert cleanup.
    pub work_dir: Option<PathBuf>,
}

/// Wraps the external converter and transcription engine for one file at a
/// time. Stateless between calls.
pub struct AudioProcessor {
    config: ProcessorConfig,
}

impl AudioProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    /// Run one file through probe → convert → transcribe.
    ///
    /// The language preference is passed in per call; the caller reads it
    /// fresh so changes apply to the next file.
    pub async fn process(&self, source: &Path, language: &str) -> ProcessOutcome {
        let metadata = match tokio::fs::metadata(source).await {
            Ok(m) => m,
            Err(_) => return ProcessOutcome::Skipped(SkipReason::Vanished),
        };

        if !self.is_supported(source) {
            return ProcessOutcome::Skipped(SkipReason::UnsupportedExtension);
        }

        if metadata.len() < self.config.min_file_size {
            return ProcessOutcome::Skipped(SkipReason::TooSmall {
                size: metadata.len(),
            });
        }

        // Best effort only; an unprobeable file still gets transcribed.
        let duration = match probe_duration(&self.config.tools.ffprobe, source).await {
            Ok(d) => d,
            Err(e) => {
                debug!(path = %source.display(), error = %e, "duration probe failed");
                0.0
            }
        };

        // Scoped temp dir: dropped (and deleted) on every return below.
        let workspace = match self.make_workspace() {
            Ok(dir) => dir,
            Err(e) => {
                return ProcessOutcome::Failed(FailureKind::ConversionFailed(format!(
                    "could not create workspace: {}",
                    e
                )))
            }
        };

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "recording".to_string());
        let wav_path = workspace.path().join(format!("{}.wav", stem));
        let output_base = workspace.path().join(&stem);

        if let Err(e) = convert_to_wav(&self.config.tools.ffmpeg, source, &wav_path).await {
            return ProcessOutcome::Failed(FailureKind::ConversionFailed(e.to_string()));
        }

        let result = transcribe(
            &self.config.tools.whisper,
            &self.config.model_path,
            self.config.threads,
            language,
            &wav_path,
            &output_base,
        )
        .await;

        // The waveform is dead weight the moment the engine returns,
        // whatever it returned.
        let _ = tokio::fs::remove_file(&wav_path).await;

        let text = match result {
            Ok(text) => text,
            Err(e) => return ProcessOutcome::Failed(FailureKind::EngineFailed(e.to_string())),
        };

        if text.is_empty() {
            warn!(path = %source.display(), "engine produced no transcript");
            return ProcessOutcome::NoTranscript;
        }

        ProcessOutcome::Transcribed(Transcription {
            text,
            duration_seconds: duration,
            language: language.to_string(),
        })
    }

    fn make_workspace(&self) -> std::io::Result<tempfile::TempDir> {
        match &self.config.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                tempfile::tempdir_in(dir)
            }
            None => tempfile::tempdir(),
        }
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn processor(work_dir: &Path) -> AudioProcessor {
        AudioProcessor::new(ProcessorConfig {
            tools: ToolConfig {
                ffmpeg: "/nonexistent/ffmpeg".to_string(),
                ffprobe: "/nonexistent/ffprobe".to_string(),
                whisper: "/nonexistent/whisper-cli".to_string(),
            },
            model_path: PathBuf::from("/nonexistent/model.bin"),
            threads: 1,
            min_file_size: 1000,
            extensions: vec!["m4a".to_string(), "wav".to_string()],
            work_dir: Some(work_dir.to_path_buf()),
        })
    }

    #[tokio::test]
    async fn zero_byte_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.m4a");
        tokio::fs::write(&path, b"").await.unwrap();

        let outcome = processor(temp.path()).process(&path, "auto").await;
        assert_eq!(
            outcome,
            ProcessOutcome::Skipped(SkipReason::TooSmall { size: 0 })
        );
    }

    #[tokio::test]
    async fn unsupported_extension_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        tokio::fs::write(&path, vec![0u8; 2000]).await.unwrap();

        let outcome = processor(temp.path()).process(&path, "auto").await;
        assert_eq!(
            outcome,
            ProcessOutcome::Skipped(SkipReason::UnsupportedExtension)
        );
    }

    #[tokio::test]
    async fn vanished_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gone.m4a");

        let outcome = processor(temp.path()).process(&path, "auto").await;
        assert_eq!(outcome, ProcessOutcome::Skipped(SkipReason::Vanished));
    }

    #[tokio::test]
    async fn unrunnable_converter_is_conversion_failure() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("memo.m4a");
        tokio::fs::write(&path, vec![0u8; 2000]).await.unwrap();

        let work = temp.path().join("work");
        let outcome = processor(&work).process(&path, "auto").await;
        assert!(matches!(
            outcome,
            ProcessOutcome::Failed(FailureKind::ConversionFailed(_))
        ));

        // Scoped workspace was cleaned up on the failure path.
        let leftovers: Vec<_> = std::fs::read_dir(&work).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
