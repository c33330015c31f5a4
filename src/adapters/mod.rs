//! Adapters for the external tools the pipeline drives.
//!
//! Each external collaborator is wrapped behind a narrow surface: ffmpeg /
//! ffprobe for conversion and metadata, whisper-cli for transcription, and
//! a fire-and-forget notification sink.

pub mod ffmpeg;
pub mod notifier;
pub mod whisper;

use async_trait::async_trait;

pub use ffmpeg::{convert_to_wav, probe_duration};
pub use notifier::{NoopNotifier, OsaScriptNotifier};
pub use whisper::transcribe;

/// Fire-and-forget completion notifications. Failures here never affect
/// pipeline correctness, so the trait has no error channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str);
}
