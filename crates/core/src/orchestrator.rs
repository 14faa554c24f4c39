//! Download orchestration: gate by scan status, confirm flagged models,
//! assign destination paths, then dispatch bounded-concurrency transfers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{stream, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{ModelCategory, ModelDescriptor};
use crate::paths::PathResolver;
use crate::prompt::DownloadPrompter;
use crate::scan;
use crate::transfer::Transfer;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Aggregate outcome of one orchestrator run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Models dropped before dispatch: no scan information, or flagged
    /// and not confirmed.
    pub skipped: usize,
}

impl std::fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Accepted descriptors with their run-scoped path assignments.
struct Prepared {
    accepted: Vec<Arc<ModelDescriptor>>,
    paths: HashMap<String, PathBuf>,
    skipped: usize,
}

/// Drives a batch of model downloads through gating, confirmation, path
/// assignment, and dispatch. Everything interactive happens before the
/// first transfer starts.
pub struct Orchestrator {
    resolver: PathResolver,
    transfer: Arc<dyn Transfer>,
    prompter: Arc<dyn DownloadPrompter>,
}

impl Orchestrator {
    pub fn new(
        resolver: PathResolver,
        transfer: Arc<dyn Transfer>,
        prompter: Arc<dyn DownloadPrompter>,
    ) -> Self {
        Self {
            resolver,
            transfer,
            prompter,
        }
    }

    /// Download with at most `limit` transfers in flight. Task and
    /// completion order are unspecified; one task's failure never
    /// affects its siblings.
    pub async fn run_concurrent(
        &self,
        models: Vec<Arc<ModelDescriptor>>,
        limit: usize,
    ) -> Result<DownloadSummary> {
        let prepared = self.prepare(models)?;
        if prepared.accepted.is_empty() {
            info!("no models to download after scan checks and confirmation");
            return Ok(DownloadSummary {
                skipped: prepared.skipped,
                ..DownloadSummary::default()
            });
        }

        let limit = limit.max(1);
        info!(
            "downloading {} model(s), at most {} at a time",
            prepared.accepted.len(),
            limit
        );

        debug!("dispatching");
        let progress = MultiProgress::new();
        let results: Vec<bool> = stream::iter(prepared.accepted.iter())
            .map(|model| self.download_one(model, &prepared.paths, &progress))
            .buffer_unordered(limit)
            .collect()
            .await;

        let succeeded = results.iter().filter(|ok| **ok).count();
        Ok(DownloadSummary {
            succeeded,
            failed: results.len() - succeeded,
            skipped: prepared.skipped,
        })
    }

    /// Download one model at a time, in input order. A failure does not
    /// halt the remaining sequence.
    pub async fn run_sequential(
        &self,
        models: Vec<Arc<ModelDescriptor>>,
    ) -> Result<DownloadSummary> {
        let prepared = self.prepare(models)?;
        if prepared.accepted.is_empty() {
            info!("no models to download after scan checks and confirmation");
            return Ok(DownloadSummary {
                skipped: prepared.skipped,
                ..DownloadSummary::default()
            });
        }

        info!(
            "downloading {} model(s) sequentially",
            prepared.accepted.len()
        );

        let progress = MultiProgress::new();
        let mut summary = DownloadSummary {
            skipped: prepared.skipped,
            ..DownloadSummary::default()
        };
        for model in &prepared.accepted {
            if self.download_one(model, &prepared.paths, &progress).await {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }
        Ok(summary)
    }

    /// Gate, confirm, and assign paths. Runs fully before any dispatch,
    /// so no transfer can observe a missing or changing assignment.
    fn prepare(&self, models: Vec<Arc<ModelDescriptor>>) -> Result<Prepared> {
        debug!("gating {} model(s)", models.len());
        let partition = scan::partition(&models);
        let mut skipped = partition.skipped.len();
        let mut accepted = partition.safe;

        if !partition.flagged.is_empty() {
            let confirmed = self.prompter.confirm_flagged(&partition.flagged)?;
            for (index, (model, status)) in partition.flagged.iter().enumerate() {
                if confirmed.contains(&index) {
                    accepted.push(Arc::clone(model));
                } else {
                    info!("dropping '{}' (virus scan: {})", model.name(), status);
                    skipped += 1;
                }
            }
        }

        debug!("assigning paths for {} model(s)", accepted.len());
        let mut paths = HashMap::new();
        for model in &accepted {
            // Folder choices for "other" models are collected here, once
            // per model, never during dispatch.
            let chosen = if model.category() == ModelCategory::Other {
                Some(
                    self.prompter
                        .choose_folder(model, &self.resolver.folder_names())?,
                )
            } else {
                None
            };
            let path = self.resolver.resolve(model, chosen.as_deref())?;
            paths.insert(model.id().to_string(), path);
        }

        Ok(Prepared {
            accepted,
            paths,
            skipped,
        })
    }

    /// Perform one transfer. Never raises: every failure mode collapses
    /// to `false` with its own diagnostic.
    pub async fn download_one(
        &self,
        model: &ModelDescriptor,
        paths: &HashMap<String, PathBuf>,
        progress: &MultiProgress,
    ) -> bool {
        let url = match model.latest_download_url() {
            Some(url) => url,
            None => {
                warn!("{}", Error::NoDownloadUrl(model.name().to_string()));
                return false;
            }
        };

        let dest = match paths.get(model.id()) {
            Some(dest) => dest,
            None => {
                warn!("{}", Error::PathNotAssigned(model.name().to_string()));
                return false;
            }
        };

        let bar = task_bar(progress, model.name());
        match self.transfer.transfer(url, dest, &bar).await {
            Ok(bytes) => {
                bar.finish();
                info!(
                    "downloaded '{}' ({} bytes) to {}",
                    model.name(),
                    bytes,
                    dest.display()
                );
                true
            }
            Err(e) => {
                bar.abandon();
                warn!("download of '{}' failed: {}", model.name(), e);
                false
            }
        }
    }
}

fn task_bar(progress: &MultiProgress, name: &str) -> ProgressBar {
    let bar = progress.add(ProgressBar::no_length());
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
    {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar.set_message(name.to_string());
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileRecord, ModelVersion, ScanResult};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockTransfer {
        delay: Duration,
        fail_urls: Vec<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: Mutex<Vec<(String, PathBuf)>>,
    }

    impl MockTransfer {
        fn new(delay_ms: u64, fail_urls: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                delay: Duration::from_millis(delay_ms),
                fail_urls: fail_urls.iter().map(|s| s.to_string()).collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, PathBuf)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transfer for MockTransfer {
        async fn transfer(&self, url: &str, dest: &Path, _bar: &ProgressBar) -> Result<u64> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), dest.to_path_buf()));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_urls.iter().any(|f| url.contains(f.as_str())) {
                return Err(Error::Transfer(format!("forced failure for {}", url)));
            }
            Ok(1024)
        }
    }

    struct ScriptedPrompter {
        accept: Vec<usize>,
        folder: String,
    }

    impl ScriptedPrompter {
        fn accepting(accept: &[usize]) -> Arc<Self> {
            Arc::new(Self {
                accept: accept.to_vec(),
                folder: "loras".to_string(),
            })
        }
    }

    impl DownloadPrompter for ScriptedPrompter {
        fn confirm_flagged(
            &self,
            _flagged: &[(Arc<ModelDescriptor>, ScanResult)],
        ) -> Result<Vec<usize>> {
            Ok(self.accept.clone())
        }

        fn choose_folder(&self, _model: &ModelDescriptor, _folders: &[String]) -> Result<String> {
            Ok(self.folder.clone())
        }
    }

    fn model(id: &str, category: &str, scan: Option<&str>) -> Arc<ModelDescriptor> {
        let files = match scan {
            Some(scan) => vec![FileRecord {
                name: format!("{id}.safetensors"),
                virus_scan_result: Some(scan.to_string()),
            }],
            None => vec![],
        };
        Arc::new(ModelDescriptor::new(
            id.to_string(),
            format!("Model {id}"),
            category,
            false,
            "tester".to_string(),
            vec![],
            vec![ModelVersion {
                id: format!("{id}-v1"),
                created_at: None,
                download_url: Some(format!("https://civitai.com/api/download/models/{id}")),
                trained_words: vec![],
                files,
            }],
        ))
    }

    fn orchestrator(
        base: &Path,
        transfer: Arc<MockTransfer>,
        prompter: Arc<ScriptedPrompter>,
    ) -> Orchestrator {
        let resolver = PathResolver::new(
            base.to_path_buf(),
            vec![("loras".to_string(), base.join("loras"))],
        );
        Orchestrator::new(resolver, transfer, prompter)
    }

    #[tokio::test]
    async fn concurrency_stays_within_limit() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(25, &[]);
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[]));

        let models: Vec<_> = (0..8)
            .map(|i| model(&format!("m{i}"), "LORA", Some("Success")))
            .collect();

        let summary = orch.run_concurrent(models, 3).await.unwrap();
        assert_eq!(summary.succeeded, 8);
        assert_eq!(summary.failed, 0);
        assert!(transfer.max_in_flight.load(Ordering::SeqCst) <= 3);
        // with 8 queued tasks and a shared delay the pool does fill up
        assert!(transfer.max_in_flight.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_affect_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(5, &["models/bad"]);
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[]));

        let summary = orch
            .run_concurrent(
                vec![
                    model("bad", "LORA", Some("Success")),
                    model("good", "LORA", Some("Success")),
                ],
                2,
            )
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn declined_flagged_models_are_never_dispatched() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(1, &[]);
        // confirm none of the flagged models
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[]));

        let summary = orch
            .run_concurrent(
                vec![
                    model("safe", "LORA", Some("Success")),
                    model("pending", "LORA", Some("Pending")),
                ],
                2,
            )
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
        let calls = transfer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("models/safe"));
    }

    #[tokio::test]
    async fn confirmed_subset_of_flagged_is_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(1, &[]);
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[1]));

        let summary = orch
            .run_concurrent(
                vec![
                    model("first", "LORA", Some("Pending")),
                    model("second", "LORA", Some("Failed")),
                ],
                2,
            )
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
        assert!(transfer.calls()[0].0.contains("models/second"));
    }

    #[tokio::test]
    async fn empty_accepted_set_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(1, &[]);
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[]));

        let summary = orch
            .run_concurrent(vec![model("nofiles", "LORA", None)], 4)
            .await
            .unwrap();

        assert_eq!(summary, DownloadSummary { succeeded: 0, failed: 0, skipped: 1 });
        assert!(transfer.calls().is_empty());
    }

    #[tokio::test]
    async fn other_category_uses_prompted_folder() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(1, &[]);
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[]));

        let summary = orch
            .run_concurrent(vec![model("odd", "WEIRD", Some("Success"))], 1)
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        let calls = transfer.calls();
        assert!(calls[0].1.starts_with(dir.path().join("loras")));
    }

    #[tokio::test]
    async fn sequential_preserves_input_order_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(1, &["models/mid"]);
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[]));

        let summary = orch
            .run_sequential(vec![
                model("one", "LORA", Some("Success")),
                model("mid", "LORA", Some("Success")),
                model("two", "LORA", Some("Success")),
            ])
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let urls: Vec<_> = transfer.calls().into_iter().map(|(url, _)| url).collect();
        assert!(urls[0].contains("models/one"));
        assert!(urls[1].contains("models/mid"));
        assert!(urls[2].contains("models/two"));
        assert_eq!(transfer.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_download_url_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transfer = MockTransfer::new(1, &[]);
        let orch = orchestrator(dir.path(), Arc::clone(&transfer), ScriptedPrompter::accepting(&[]));

        let urlless = Arc::new(ModelDescriptor::new(
            "nourl".to_string(),
            "No Url".to_string(),
            "LORA",
            false,
            "tester".to_string(),
            vec![],
            vec![ModelVersion {
                id: "v1".to_string(),
                created_at: None,
                download_url: None,
                trained_words: vec![],
                files: vec![FileRecord {
                    name: "x.safetensors".to_string(),
                    virus_scan_result: Some("Success".to_string()),
                }],
            }],
        ));

        let summary = orch.run_concurrent(vec![urlless], 1).await.unwrap();
        assert_eq!(summary.failed, 1);
        assert!(transfer.calls().is_empty());
    }
}
