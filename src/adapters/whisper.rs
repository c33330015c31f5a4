//! whisper.cpp transcription engine invocation.
//!
//! Shells out to whisper-cli against a canonical 16 kHz mono WAV. The
//! engine writes its transcript to `<output_base>.txt`; if that file never
//! appears we fall back to parsing stdout, matching the engine's behavior
//! when -otxt is ignored by older builds.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use tokio::process::Command;

/// Transcribe `wav_path`, writing engine artifacts under `output_base`.
///
/// Returns the raw transcript text, which may be empty (silence); the
/// caller decides what an empty transcript means. `Err` is reserved for
/// the engine being un-runnable.
pub async fn transcribe(
    whisper_cmd: &str,
    model: &Path,
    threads: usize,
    language: &str,
    wav_path: &Path,
    output_base: &Path,
) -> Result<String> {
    let output = Command::new(whisper_cmd)
        .arg("-m")
        .arg(model)
        .args(["-t", &threads.to_string()])
        .args(["-l", language])
        .arg("-otxt")
        .arg("-of")
        .arg(output_base)
        .arg(wav_path)
        // Abandoned invocations must not outlive the pipeline.
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to run {}", whisper_cmd))?;

    if !output.status.success() {
        // The engine sometimes exits non-zero after writing a usable
        // transcript; prefer whatever output exists over failing hard.
        warn!(
            status = %output.status,
            "transcription engine exited non-zero"
        );
    }

    let txt_path = output_base.with_extension("txt");
    if txt_path.exists() {
        let transcript = tokio::fs::read_to_string(&txt_path)
            .await
            .with_context(|| format!("failed to read transcript: {}", txt_path.display()))?;
        return Ok(transcript.trim().to_string());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
