use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use keycheck_core::{AppConfig, CheckError, ProgressEvent, RunOutcome};
use keycheck_prober::PortalProber;
use keycheck_queue::{build_queue, status_column, QueueStats};
use keycheck_runner::{RunController, StdinGate};
use keycheck_storage::{Dataset, StoreError};

/// Output lands next to the input, never at the input path itself.
pub fn derive_output_path(input: &Path, timestamp: bool) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("keys");
    let name = if timestamp {
        format!(
            "{}_with_status_{}.csv",
            stem,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        )
    } else {
        format!("{}_with_status.csv", stem)
    };
    input.with_file_name(name)
}

/// Pre-session validation. Any failure here is fatal before a browser ever
/// opens, with nothing written.
fn load_validated(config: &AppConfig, input: &Path) -> Result<Dataset, CheckError> {
    let mut dataset = Dataset::load(input).map_err(|e| match e {
        StoreError::NotFound(p) => CheckError::InputNotFound(p.display().to_string()),
        other => CheckError::Dataset(other.to_string()),
    })?;

    if !dataset.column_exists(&config.columns.key_column_1) {
        return Err(CheckError::MissingColumn(config.columns.key_column_1.clone()));
    }

    dataset.ensure_column(&status_column(&config.columns.key_column_1));
    if config.columns.check_second_column && dataset.column_exists(&config.columns.key_column_2) {
        dataset.ensure_column(&status_column(&config.columns.key_column_2));
    }
    Ok(dataset)
}

fn log_queue_stats(config: &AppConfig, stats: &QueueStats) {
    for col in &stats.columns {
        info!(
            column = %col.column,
            eligible = col.eligible,
            selected = col.selected,
            filter = %config.columns.filter_column,
            "keys selected for checking"
        );
    }
}

fn log_summary(dataset: &Dataset, config: &AppConfig) {
    let mut columns = vec![config.columns.key_column_1.clone()];
    if config.columns.check_second_column {
        columns.push(config.columns.key_column_2.clone());
    }
    for column in columns {
        let status_col = status_column(&column);
        if !dataset.column_exists(&status_col) {
            continue;
        }
        for (status, count) in dataset.value_counts(&status_col) {
            info!(column = %column, status = %status, count, "status summary");
        }
    }
}

pub async fn run_check(
    config: AppConfig,
    input: &Path,
    output: Option<PathBuf>,
    timestamp: bool,
) -> Result<()> {
    let mut dataset = load_validated(&config, input)?;
    let (queue, stats) = build_queue(&dataset, &config.columns, &config.filter);
    log_queue_stats(&config, &stats);

    if queue.is_empty() {
        info!("all keys already verified or none selected, nothing to do");
        return Ok(());
    }

    let output = output.unwrap_or_else(|| derive_output_path(input, timestamp));
    if output.as_path() == input {
        return Err(CheckError::Config("output path must differ from the input".into()).into());
    }
    info!(total = queue.len(), output = %output.display(), "starting verification");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the in-flight key");
            signal_cancel.cancel();
        }
    });

    // User-facing progress, fed from the loop's one-way channel
    let (tx, mut rx) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::Started { total } => {
                    println!("Checking {} keys...", total);
                }
                ProgressEvent::Checked {
                    index,
                    total,
                    column,
                    key,
                    status,
                } => {
                    println!("[{}/{}] {} {} -> {}", index, total, column, key, status);
                }
                ProgressEvent::Finished { .. } => {}
            }
        }
    });

    let controller =
        RunController::new(StdinGate, config.pacing.clone(), cancel).with_progress(tx);
    let portal = config.portal.clone();
    let browser = config.browser.clone();
    let report = controller
        .run(
            &mut dataset,
            &queue,
            move || {
                PortalProber::launch(&portal, &browser)
                    .map_err(|e| CheckError::Session(e.to_string()))
            },
            &output,
        )
        .await?;
    // releases the progress sender so the printer can drain and exit
    drop(controller);
    let _ = printer.await;

    match report.outcome {
        RunOutcome::Completed => {
            log_summary(&dataset, &config);
            info!(checked = report.checked, output = %output.display(), "verification complete");
            Ok(())
        }
        RunOutcome::Cancelled => {
            log_summary(&dataset, &config);
            warn!(
                checked = report.checked,
                total = report.total,
                output = %output.display(),
                "verification cancelled, partial results saved"
            );
            Ok(())
        }
        RunOutcome::Fatal(detail) => Err(anyhow::anyhow!("run failed: {}", detail)),
    }
}

/// Dry run: everything up to (and excluding) the browser.
pub fn run_plan(config: AppConfig, input: &Path) -> Result<()> {
    let dataset = load_validated(&config, input)?;
    let (queue, stats) = build_queue(&dataset, &config.columns, &config.filter);

    println!("{} rows, columns: {:?}", dataset.len(), dataset.columns());
    for col in &stats.columns {
        println!(
            "  {}: {}/{} unverified keys selected (filter: '{}')",
            col.column, col.selected, col.eligible, config.columns.filter_column
        );
    }
    println!("{} keys would be checked", queue.len());
    Ok(())
}
