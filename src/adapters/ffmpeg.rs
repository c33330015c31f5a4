//! ffmpeg / ffprobe invocation.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::process::Command;

/// Probe audio duration in seconds via ffprobe.
///
/// Non-fatal by contract: the caller falls back to 0.0 on error.
pub async fn probe_duration(ffprobe: &str, path: &Path) -> Result<f64> {
    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-show_entries", "format=duration"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to run {}", ffprobe))?;

    if !output.status.success() {
        anyhow::bail!("{} exited with {}", ffprobe, output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse::<f64>()
        .with_context(|| format!("unparseable duration from {}: {:?}", ffprobe, stdout.trim()))
}

/// Convert audio to the canonical waveform the engine expects: mono,
/// 16 kHz, 16-bit PCM WAV. Success requires both a zero exit status and an
/// output file on disk.
pub async fn convert_to_wav(ffmpeg: &str, input: &Path, output: &Path) -> Result<()> {
    let result = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le"])
        .arg(output)
        // Abandoned invocations must not outlive the pipeline.
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("failed to run {}", ffmpeg))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        anyhow::bail!("{} exited with {}: {}", ffmpeg, result.status, stderr.trim());
    }

    if !output.exists() {
        anyhow::bail!("{} reported success but produced no output", ffmpeg);
    }

    Ok(())
}
