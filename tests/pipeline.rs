//! Pipeline integration tests.
//!
//! External tools (ffprobe, ffmpeg, whisper-cli) are replaced with small
//! shell scripts so the full hash → dedup → convert → transcribe → store
//! path runs without any audio software installed.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use memoscribe::adapters::NoopNotifier;
use memoscribe::domain::SkipReason;
use memoscribe::ingest::{AudioProcessor, Pipeline, PipelineResult, ProcessorConfig};
use memoscribe::settings::SettingsSource;
use memoscribe::store::TranscriptStore;
use memoscribe::ToolConfig;
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// ffprobe fake: always reports 12.5 seconds.
fn fake_ffprobe(dir: &Path) -> PathBuf {
    write_script(dir, "ffprobe", "echo 12.5")
}

/// ffmpeg fake: copies the input (arg 3) to the output (last arg). Inputs
/// whose name contains "bad" fail with a non-zero exit.
fn fake_ffmpeg(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "ffmpeg",
        r#"case "$3" in *bad*) exit 1 ;; esac
for a in "$@"; do out="$a"; done
cp "$3" "$out""#,
    )
}

/// whisper fake: writes a fixed transcript to `<base>.txt` where `<base>`
/// is the value of the -of flag.
fn fake_whisper(dir: &Path, transcript: &str) -> PathBuf {
    write_script(
        dir,
        "whisper-cli",
        &format!(
            r#"prev=""; base=""
for a in "$@"; do
  if [ "$prev" = "-of" ]; then base="$a"; fi
  prev="$a"
done
printf '%s' '{}' > "$base.txt""#,
            transcript
        ),
    )
}

struct Harness {
    _root: TempDir,
    pub pipeline: Pipeline,
    pub db_path: PathBuf,
    pub audio_dir: PathBuf,
    pub work_dir: PathBuf,
    pub settings: SettingsSource,
}

fn harness(transcript: &str) -> Harness {
    build_harness(|dir| fake_whisper(dir, transcript))
}

fn build_harness(make_whisper: impl FnOnce(&Path) -> PathBuf) -> Harness {
    let root = TempDir::new().unwrap();
    let tools_dir = root.path().join("tools");
    std::fs::create_dir_all(&tools_dir).unwrap();
    let audio_dir = root.path().join("audio");
    std::fs::create_dir_all(&audio_dir).unwrap();
    let work_dir = root.path().join("work");
    std::fs::create_dir_all(&work_dir).unwrap();
    let db_path = root.path().join("transcripts.db");

    let tools = ToolConfig {
        ffprobe: fake_ffprobe(&tools_dir).display().to_string(),
        ffmpeg: fake_ffmpeg(&tools_dir).display().to_string(),
        whisper: make_whisper(&tools_dir).display().to_string(),
    };

    let processor = AudioProcessor::new(ProcessorConfig {
        tools,
        model_path: root.path().join("model.bin"),
        threads: 1,
        min_file_size: 1000,
        extensions: vec!["m4a".to_string(), "wav".to_string()],
        work_dir: Some(work_dir.clone()),
    });

    let settings = SettingsSource::new(root.path().join("settings.json"));
    let store = TranscriptStore::open(&db_path).unwrap();
    let pipeline = Pipeline::new(store, processor, settings.clone(), Arc::new(NoopNotifier))
        .with_shutdown_grace(Duration::from_millis(200));

    Harness {
        _root: root,
        pipeline,
        db_path,
        audio_dir,
        work_dir,
        settings,
    }
}

fn audio_file(h: &Harness, name: &str, bytes: &[u8]) -> PathBuf {
    let path = h.audio_dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn assert_no_temp_leak(h: &Harness) {
    let leftovers: Vec<_> = std::fs::read_dir(&h.work_dir).unwrap().collect();
    assert!(leftovers.is_empty(), "temp artifacts leaked: {:?}", leftovers);
}

#[tokio::test]
async fn transcript_is_recorded_with_all_fields() {
    let h = harness("hello from the engine");
    h.settings.set_language("sv").unwrap();
    let file = audio_file(&h, "20251212 013354-AB.m4a", &[1u8; 2000]);

    let result = h.pipeline.process_ready(&file).await;
    let id = match result {
        PipelineResult::Recorded(id) => id,
        other => panic!("expected Recorded, got {:?}", other),
    };

    let store = TranscriptStore::open(&h.db_path).unwrap();
    let record = store.get(id).unwrap().unwrap();
    assert_eq!(record.filename, "20251212 013354-AB.m4a");
    assert_eq!(record.original_path, file);
    assert_eq!(record.transcript.as_deref(), Some("hello from the engine"));
    assert_eq!(record.duration_seconds, 12.5);
    assert_eq!(record.language, "sv");
    assert!(record.transcribed_at.is_some());

    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn identical_content_under_two_names_records_once() {
    let h = harness("same audio");
    let a = audio_file(&h, "a.m4a", &[7u8; 4000]);
    let b = audio_file(&h, "b.m4a", &[7u8; 4000]);

    let first = h.pipeline.process_ready(&a).await;
    let second = h.pipeline.process_ready(&b).await;

    assert!(matches!(first, PipelineResult::Recorded(_)));
    assert_eq!(second, PipelineResult::Duplicate);

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn resubmitting_the_same_file_is_a_noop() {
    let h = harness("only once");
    let file = audio_file(&h, "memo.m4a", &[3u8; 2000]);

    assert!(matches!(
        h.pipeline.process_ready(&file).await,
        PipelineResult::Recorded(_)
    ));
    assert_eq!(h.pipeline.process_ready(&file).await, PipelineResult::Duplicate);

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn conversion_failure_does_not_block_the_next_file() {
    let h = harness("still works");
    let bad = audio_file(&h, "bad-recording.m4a", &[9u8; 2000]);
    let good = audio_file(&h, "good-recording.m4a", &[5u8; 2000]);

    let first = h.pipeline.process_ready(&bad).await;
    assert!(matches!(first, PipelineResult::Failed(_)));
    // Partial temp output from the failed conversion is gone.
    assert_no_temp_leak(&h);

    let second = h.pipeline.process_ready(&good).await;
    assert!(matches!(second, PipelineResult::Recorded(_)));

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn zero_byte_file_is_skipped_without_a_record() {
    let h = harness("unused");
    let empty = audio_file(&h, "empty.m4a", b"");

    let result = h.pipeline.process_ready(&empty).await;
    assert_eq!(
        result,
        PipelineResult::Skipped(SkipReason::TooSmall { size: 0 })
    );

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn empty_transcript_leaves_file_eligible_for_retry() {
    let h = harness("");
    let silent = audio_file(&h, "silence.m4a", &[0u8; 2000]);

    assert_eq!(
        h.pipeline.process_ready(&silent).await,
        PipelineResult::NoTranscript
    );

    // Never inserted, so a later attempt is not blocked by dedup.
    assert_eq!(
        h.pipeline.process_ready(&silent).await,
        PipelineResult::NoTranscript
    );

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn unrunnable_engine_fails_without_leaking_temp_files() {
    let h = build_harness(|_| PathBuf::from("/nonexistent/whisper-cli"));
    let file = audio_file(&h, "memo.m4a", &[1u8; 2000]);

    let result = h.pipeline.process_ready(&file).await;
    assert!(matches!(result, PipelineResult::Failed(_)));

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn crashing_engine_leaves_no_record_or_temp_files() {
    // Exits non-zero without writing anything: treated like silence, and
    // every intermediate artifact is still cleaned up.
    let h = build_harness(|dir| write_script(dir, "whisper-cli", "exit 1"));
    let file = audio_file(&h, "memo.m4a", &[1u8; 2000]);

    assert_eq!(
        h.pipeline.process_ready(&file).await,
        PipelineResult::NoTranscript
    );

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn stop_signal_ends_the_drain_without_processing_the_backlog() {
    let h = harness("never transcribed");
    let queued = audio_file(&h, "queued.m4a", &[1u8; 2000]);

    let (ready_tx, ready_rx) = mpsc::channel(16);
    ready_tx.send(queued).await.unwrap();

    let (stop_tx, stop_rx) = watch::channel(false);
    stop_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), h.pipeline.run(ready_rx, stop_rx))
        .await
        .expect("pipeline should stop without draining the backlog");

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_abandons_a_hung_engine_after_the_grace_period() {
    let h = build_harness(|dir| write_script(dir, "whisper-cli", "sleep 600"));
    let file = audio_file(&h, "memo.m4a", &[1u8; 2000]);

    let (ready_tx, ready_rx) = mpsc::channel(4);
    ready_tx.send(file).await.unwrap();
    let (stop_tx, stop_rx) = watch::channel(false);

    let run = h.pipeline.run(ready_rx, stop_rx);
    let stop = async {
        // Let the pipeline reach the engine invocation first.
        tokio::time::sleep(Duration::from_millis(500)).await;
        stop_tx.send(true).unwrap();
    };

    tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(run, stop);
    })
    .await
    .expect("pipeline should abandon the hung engine within the grace period");

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert_no_temp_leak(&h);
}

#[tokio::test]
async fn vanished_file_is_a_transient_read_failure() {
    let h = harness("unused");
    let gone = h.audio_dir.join("gone.m4a");

    let result = h.pipeline.process_ready(&gone).await;
    assert!(matches!(result, PipelineResult::ReadFailed(_)));

    let store = TranscriptStore::open(&h.db_path).unwrap();
    assert_eq!(store.count().unwrap(), 0);
}
