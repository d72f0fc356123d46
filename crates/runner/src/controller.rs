use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use keycheck_core::config::PacingConfig;
use keycheck_core::ports::{ConfirmGate, KeyProber};
use keycheck_core::{mask_key, CheckError, ProgressEvent, RunOutcome, WorkItem};
use keycheck_queue::status_column;
use keycheck_storage::Dataset;

use crate::pacer;

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Items actually probed and written back.
    pub checked: usize,
    /// Delays issued between probes.
    pub paced: usize,
    pub total: usize,
}

/// Drives the verification loop: session up, manual login gate, probe /
/// write-back / pace per item, then unconditional teardown and persistence.
///
/// Cancellation is cooperative — observed before each probe and during the
/// paced delay, never mid-probe — so the in-flight key always lands in the
/// dataset before the loop stops.
pub struct RunController<G: ConfirmGate> {
    gate: G,
    pacing: PacingConfig,
    cancel: CancellationToken,
    progress: Option<mpsc::Sender<ProgressEvent>>,
}

impl<G: ConfirmGate> RunController<G> {
    pub fn new(gate: G, pacing: PacingConfig, cancel: CancellationToken) -> Self {
        Self {
            gate,
            pacing,
            cancel,
            progress: None,
        }
    }

    /// Attach a one-way progress channel for whatever front-end is listening.
    pub fn with_progress(mut self, sender: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    async fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            // A gone receiver must never stall the loop
            let _ = sender.send(event).await;
        }
    }

    /// Run the queue to completion, cancellation, or fatal session error.
    ///
    /// The session is only opened when there is work; an empty queue is
    /// terminal success with zero side effects. Once the loop is entered,
    /// teardown and persistence to `output` happen on every exit path.
    pub async fn run<P, F>(
        &self,
        dataset: &mut Dataset,
        queue: &[WorkItem],
        make_prober: F,
        output: &Path,
    ) -> Result<RunReport, CheckError>
    where
        P: KeyProber,
        F: FnOnce() -> Result<P, CheckError>,
    {
        let total = queue.len();
        if total == 0 {
            info!("queue is empty, nothing to verify");
            self.emit(ProgressEvent::Finished {
                outcome: RunOutcome::Completed,
            })
            .await;
            return Ok(RunReport {
                outcome: RunOutcome::Completed,
                checked: 0,
                paced: 0,
                total: 0,
            });
        }

        // Idle -> AwaitingManualLogin: session opens on the portal page
        let mut prober = match make_prober() {
            Ok(prober) => prober,
            Err(e) => {
                error!(error = %e, "session setup failed");
                let outcome = RunOutcome::Fatal(e.to_string());
                self.emit(ProgressEvent::Finished {
                    outcome: outcome.clone(),
                })
                .await;
                return Ok(RunReport {
                    outcome,
                    checked: 0,
                    paced: 0,
                    total,
                });
            }
        };

        if let Err(e) = self
            .gate
            .proceed("A browser window is open on the verification portal.\nLog in there, then come back here.")
            .await
        {
            error!(error = %e, "login acknowledgment failed");
            prober.close();
            let outcome = RunOutcome::Fatal(e.to_string());
            self.emit(ProgressEvent::Finished {
                outcome: outcome.clone(),
            })
            .await;
            return Ok(RunReport {
                outcome,
                checked: 0,
                paced: 0,
                total,
            });
        }

        // AwaitingManualLogin -> Running
        self.emit(ProgressEvent::Started { total }).await;
        let mut checked = 0;
        let mut paced = 0;
        let mut outcome = RunOutcome::Completed;

        for item in queue {
            if self.cancel.is_cancelled() {
                warn!(checked, total, "run cancelled, keeping partial results");
                outcome = RunOutcome::Cancelled;
                break;
            }

            let status = prober.probe(&item.key).await;

            let column = status_column(&item.column);
            dataset.ensure_column(&column);
            dataset.set(item.row, &column, &status.to_string());
            checked += 1;

            info!(
                progress = format!("{}/{}", checked, total),
                column = %item.column,
                key = %mask_key(&item.key),
                status = %status,
                "checked"
            );
            self.emit(ProgressEvent::Checked {
                index: checked,
                total,
                column: item.column.clone(),
                key: mask_key(&item.key),
                status: status.to_string(),
            })
            .await;

            if checked < total && !self.cancel.is_cancelled() {
                pacer::pace(&self.pacing, &self.cancel).await;
                paced += 1;
            }
        }

        // Leaving Running: teardown and persistence are unconditional
        prober.close();
        let saved = dataset.save(output);

        self.emit(ProgressEvent::Finished {
            outcome: outcome.clone(),
        })
        .await;

        saved.map_err(|e| CheckError::Dataset(e.to_string()))?;
        Ok(RunReport {
            outcome,
            checked,
            paced,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keycheck_core::KeyStatus;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct AutoGate;

    #[async_trait]
    impl ConfirmGate for AutoGate {
        async fn proceed(&self, _prompt: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct DenyGate;

    #[async_trait]
    impl ConfirmGate for DenyGate {
        async fn proceed(&self, _prompt: &str) -> anyhow::Result<()> {
            anyhow::bail!("stdin closed")
        }
    }

    /// Prober double: fixed status per probe, optionally cancels the run
    /// after a set number of probes (as the operator would mid-run).
    struct FakeProber {
        status: KeyStatus,
        probed: Vec<String>,
        cancel_after: Option<(usize, CancellationToken)>,
        closed: Arc<AtomicBool>,
    }

    impl FakeProber {
        fn new(status: KeyStatus, closed: Arc<AtomicBool>) -> Self {
            Self {
                status,
                probed: Vec::new(),
                cancel_after: None,
                closed,
            }
        }
    }

    #[async_trait]
    impl KeyProber for FakeProber {
        async fn probe(&mut self, key: &str) -> KeyStatus {
            self.probed.push(key.to_string());
            if let Some((after, token)) = &self.cancel_after {
                if self.probed.len() >= *after {
                    token.cancel();
                }
            }
            self.status.clone()
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn no_pacing() -> PacingConfig {
        PacingConfig {
            min_delay_secs: 0.0,
            max_delay_secs: 0.0,
        }
    }

    fn dataset(n: usize) -> Dataset {
        Dataset::from_parts(
            vec!["key_1".into(), "key_1_status".into()],
            (0..n).map(|i| vec![format!("KEY-{i}"), String::new()]).collect(),
        )
    }

    fn queue_for(ds: &Dataset) -> Vec<WorkItem> {
        (0..ds.len())
            .map(|row| WorkItem {
                row,
                column: "key_1".into(),
                key: ds.get(row, "key_1").unwrap().to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_queue_completes_without_a_session() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        let mut ds = dataset(0);
        let controller = RunController::new(AutoGate, no_pacing(), CancellationToken::new());

        let report = controller
            .run(
                &mut ds,
                &[],
                || -> Result<FakeProber, CheckError> { panic!("session must not open") },
                &output,
            )
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.checked, 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn full_run_writes_every_status_and_persists() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        let mut ds = dataset(3);
        let queue = queue_for(&ds);
        let closed = Arc::new(AtomicBool::new(false));
        let closed2 = closed.clone();
        let controller = RunController::new(AutoGate, no_pacing(), CancellationToken::new());

        let report = controller
            .run(
                &mut ds,
                &queue,
                move || Ok(FakeProber::new(KeyStatus::Activated, closed2)),
                &output,
            )
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.checked, 3);
        assert_eq!(report.paced, 2); // N-1 delays
        assert!(closed.load(Ordering::SeqCst));

        let saved = Dataset::load(&output).unwrap();
        for row in 0..3 {
            assert_eq!(saved.get(row, "key_1_status"), Some("Activated"));
        }
    }

    #[tokio::test]
    async fn cancellation_keeps_partial_results() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        let mut ds = dataset(5);
        let queue = queue_for(&ds);
        let cancel = CancellationToken::new();
        let closed = Arc::new(AtomicBool::new(false));
        let closed2 = closed.clone();
        let cancel2 = cancel.clone();
        let controller = RunController::new(AutoGate, no_pacing(), cancel);

        let report = controller
            .run(
                &mut ds,
                &queue,
                move || {
                    let mut prober = FakeProber::new(KeyStatus::NotActivated, closed2);
                    prober.cancel_after = Some((2, cancel2));
                    Ok(prober)
                },
                &output,
            )
            .await
            .unwrap();

        // in-flight probe finished, then the loop stopped
        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert_eq!(report.checked, 2);
        assert!(closed.load(Ordering::SeqCst));

        let saved = Dataset::load(&output).unwrap();
        assert_eq!(saved.get(0, "key_1_status"), Some("Not activated"));
        assert_eq!(saved.get(1, "key_1_status"), Some("Not activated"));
        for row in 2..5 {
            assert_eq!(saved.get(row, "key_1_status"), None);
        }
    }

    #[tokio::test]
    async fn session_setup_failure_is_fatal_with_no_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        let mut ds = dataset(2);
        let queue = queue_for(&ds);
        let controller = RunController::new(AutoGate, no_pacing(), CancellationToken::new());

        let report = controller
            .run(
                &mut ds,
                &queue,
                || -> Result<FakeProber, CheckError> {
                    Err(CheckError::Session("no chrome binary".into()))
                },
                &output,
            )
            .await
            .unwrap();

        assert!(matches!(report.outcome, RunOutcome::Fatal(_)));
        assert_eq!(report.checked, 0);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn refused_gate_tears_down_the_session() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        let mut ds = dataset(2);
        let queue = queue_for(&ds);
        let closed = Arc::new(AtomicBool::new(false));
        let closed2 = closed.clone();
        let controller = RunController::new(DenyGate, no_pacing(), CancellationToken::new());

        let report = controller
            .run(
                &mut ds,
                &queue,
                move || Ok(FakeProber::new(KeyStatus::Activated, closed2)),
                &output,
            )
            .await
            .unwrap();

        assert!(matches!(report.outcome, RunOutcome::Fatal(_)));
        assert!(closed.load(Ordering::SeqCst));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn progress_events_bracket_the_run() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        let mut ds = dataset(2);
        let queue = queue_for(&ds);
        let (tx, mut rx) = mpsc::channel(16);
        let closed = Arc::new(AtomicBool::new(false));
        let controller = RunController::new(AutoGate, no_pacing(), CancellationToken::new())
            .with_progress(tx);

        controller
            .run(
                &mut ds,
                &queue,
                move || Ok(FakeProber::new(KeyStatus::Invalid, closed)),
                &output,
            )
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events[0], ProgressEvent::Started { total: 2 }));
        assert!(
            matches!(&events[1], ProgressEvent::Checked { index: 1, status, .. } if status == "Invalid")
        );
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Finished {
                outcome: RunOutcome::Completed
            })
        ));
    }
}
