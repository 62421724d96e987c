//! Ownership tagging of the resources produced by a release
//!
//! Every object in a release manifest gets an annotation pointing back to the
//! desired release that produced it. The default tagger shells out to
//! `kubectl annotate`; [`ResourceTagger`] keeps that process boundary out of
//! the release manager so it can be replaced by a native API client.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::ReleaseConfig;

/// Annotation carrying the owner of a resource
pub const ANTECEDENT_ANNOTATION: &str = "flux.weave.works/antecedent";

/// Default upper bound for a single tagging call
pub const DEFAULT_TAG_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors raised while tagging resources
#[derive(Debug, Error)]
pub enum TagError {
    /// Tagging tool could not be started
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Talking to the tagging tool failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tagging tool did not finish in time and was killed
    #[error("tagging timed out after {after:?}")]
    Timeout { after: Duration },

    /// Tagging tool exited unsuccessfully
    #[error("tagging failed ({status}): {output}")]
    Failed { status: String, output: String },
}

/// Applies an owner key/value pair to every object of a manifest
#[async_trait]
pub trait ResourceTagger: Send + Sync {
    async fn tag(
        &self,
        manifest: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), TagError>;
}

/// Tagger backed by `kubectl annotate --overwrite -f -`
#[derive(Debug, Clone)]
pub struct KubectlTagger {
    program: String,
    timeout: Duration,
}

impl Default for KubectlTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl KubectlTagger {
    /// Create a tagger running `kubectl` with the default timeout
    pub fn new() -> Self {
        Self {
            program: "kubectl".to_string(),
            timeout: DEFAULT_TAG_TIMEOUT,
        }
    }

    /// Create a tagger from the release configuration
    pub fn from_config(config: &ReleaseConfig) -> Self {
        Self {
            program: config.kubectl.clone(),
            timeout: config.annotation_timeout,
        }
    }

    /// Use another binary
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments passed to the binary; the manifest is read from stdin
    pub fn annotate_args(namespace: &str, key: &str, value: &str) -> Vec<String> {
        vec![
            "annotate".to_string(),
            "--overwrite".to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "-f".to_string(),
            "-".to_string(),
            format!("{}={}", key, value),
        ]
    }
}

#[async_trait]
impl ResourceTagger for KubectlTagger {
    async fn tag(
        &self,
        manifest: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), TagError> {
        let args = Self::annotate_args(namespace, key, value);
        tracing::debug!(program = %self.program, ?args, "annotating release resources");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TagError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Dropping this future on timeout drops the child, which kills it.
        // stdin is fed while stdout/stderr are drained so neither pipe can fill up.
        let stdin = child.stdin.take();
        let run = async move {
            let feed = async move {
                if let Some(mut stdin) = stdin {
                    match stdin.write_all(manifest.as_bytes()).await {
                        Ok(()) => {}
                        // The tool exited without reading; its exit status says why.
                        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                        Err(e) => return Err(TagError::Io(e)),
                    }
                }
                Ok(())
            };
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            Ok::<_, TagError>(output?)
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(program = %self.program, timeout = ?self.timeout, "annotation timed out");
                return Err(TagError::Timeout {
                    after: self.timeout,
                });
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        tracing::warn!(status = %output.status, output = %combined, "annotation failed");
        Err(TagError::Failed {
            status: output.status.to_string(),
            output: combined,
        })
    }
}

/// A single recorded tagging call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCall {
    pub manifest: String,
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// In-memory tagger for testing: records calls, optionally fails them
#[derive(Clone, Default)]
pub struct MockTagger {
    calls: Arc<RwLock<Vec<TagCall>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl MockTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call fail with the given tool output
    pub fn fail_with(&self, output: impl Into<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(output.into());
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<TagCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ResourceTagger for MockTagger {
    async fn tag(
        &self,
        manifest: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), TagError> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TagCall {
                manifest: manifest.to_string(),
                namespace: namespace.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            });

        match self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(output) => Err(TagError::Failed {
                status: "exit status: 1".to_string(),
                output,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_args() {
        let args = KubectlTagger::annotate_args(
            "team-a",
            ANTECEDENT_ANNOTATION,
            "team-a:fluxhelmrelease/web",
        );
        assert_eq!(
            args,
            vec![
                "annotate",
                "--overwrite",
                "--namespace",
                "team-a",
                "-f",
                "-",
                "flux.weave.works/antecedent=team-a:fluxhelmrelease/web",
            ]
        );
    }

    #[test]
    fn test_from_config() {
        let config = ReleaseConfig {
            kubectl: "/usr/local/bin/kubectl".to_string(),
            annotation_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let tagger = KubectlTagger::from_config(&config);
        assert_eq!(tagger.program(), "/usr/local/bin/kubectl");
        assert_eq!(tagger.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_defaults() {
        let tagger = KubectlTagger::default();
        assert_eq!(tagger.program(), "kubectl");
        assert_eq!(tagger.timeout(), DEFAULT_TAG_TIMEOUT);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let tagger = KubectlTagger::new().with_program("/nonexistent/chartsync-kubectl");
        let result = tagger
            .tag("kind: ConfigMap", "default", ANTECEDENT_ANNOTATION, "x")
            .await;
        assert!(matches!(result, Err(TagError::Spawn { .. })));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("kubectl");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[tokio::test]
        async fn test_success_consumes_manifest() {
            let dir = TempDir::new().unwrap();
            let seen = dir.path().join("stdin");
            let program = script(&dir, &format!("cat > '{}'", seen.display()));

            let tagger = KubectlTagger::new().with_program(program);
            tagger
                .tag("kind: ConfigMap\n", "default", ANTECEDENT_ANNOTATION, "x")
                .await
                .unwrap();

            assert_eq!(std::fs::read_to_string(seen).unwrap(), "kind: ConfigMap\n");
        }

        #[tokio::test]
        async fn test_failure_carries_combined_output() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "echo \"args: $*\"; echo 'forbidden' >&2; exit 3");

            let tagger = KubectlTagger::new().with_program(program);
            let err = tagger
                .tag("kind: ConfigMap", "team-a", "owner", "team-a:fluxhelmrelease/web")
                .await
                .unwrap_err();

            match err {
                TagError::Failed { output, .. } => {
                    assert!(output.contains(
                        "args: annotate --overwrite --namespace team-a -f - owner=team-a:fluxhelmrelease/web"
                    ));
                    assert!(output.contains("forbidden"));
                }
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_large_manifest_echoed_back_does_not_stall() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "cat; exit 1");

            // Far larger than a pipe buffer, so the tool blocks on stdout
            // unless its output is drained while the manifest is written.
            let manifest = "kind: ConfigMap # padding\n".repeat(40_000);
            let tagger = KubectlTagger::new()
                .with_program(program)
                .with_timeout(Duration::from_secs(10));
            let err = tagger
                .tag(&manifest, "default", "owner", "x")
                .await
                .unwrap_err();

            match err {
                TagError::Failed { output, .. } => assert_eq!(output, manifest.trim()),
                other => panic!("expected Failed, got {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_hanging_tool_times_out() {
            let dir = TempDir::new().unwrap();
            let program = script(&dir, "sleep 10");

            let tagger = KubectlTagger::new()
                .with_program(program)
                .with_timeout(Duration::from_millis(200));
            let err = tagger
                .tag("kind: ConfigMap", "default", "owner", "x")
                .await
                .unwrap_err();

            assert!(matches!(err, TagError::Timeout { .. }));
        }
    }
}
