//! Completion notification sinks.

use async_trait::async_trait;
use tracing::debug;

use tokio::process::Command;

use super::Notifier;

/// macOS notification center via osascript.
#[derive(Debug, Default, Clone)]
pub struct OsaScriptNotifier;

#[async_trait]
impl Notifier for OsaScriptNotifier {
    async fn notify(&self, title: &str, message: &str) {
        let script = format!(
            "display notification \"{}\" with title \"{}\"",
            escape(message),
            escape(title)
        );

        match Command::new("osascript").arg("-e").arg(&script).output().await {
            Ok(output) if !output.status.success() => {
                debug!(status = %output.status, "osascript notification failed");
            }
            Err(e) => debug!(error = %e, "could not run osascript"),
            _ => {}
        }
    }
}

/// AppleScript string literals only need quotes and backslashes escaped.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Sink that drops every notification. Used in tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _title: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape(r#"say "hi" \now"#), r#"say \"hi\" \\now"#);
    }
}
