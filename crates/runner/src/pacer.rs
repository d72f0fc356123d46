use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use keycheck_core::config::PacingConfig;

/// Sleep a uniformly drawn delay from the configured interval, or less if
/// cancellation fires first. Returns the drawn delay.
///
/// Called between consecutive probes only — a burst of evenly spaced
/// requests is what trips the portal's rate defenses.
pub async fn pace(config: &PacingConfig, cancel: &CancellationToken) -> Duration {
    let delay = draw_delay(config);
    debug!(secs = delay.as_secs_f64(), "pacing before next key");

    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = cancel.cancelled() => {
            debug!("pacing interrupted by cancellation");
        }
    }
    delay
}

fn draw_delay(config: &PacingConfig) -> Duration {
    let min = config.min_delay_secs.max(0.0);
    let max = config.max_delay_secs.max(min);
    let min_ms = (min * 1000.0) as u64;
    let max_ms = (max * 1000.0) as u64;
    let millis = rand::thread_rng().gen_range(min_ms..=max_ms);
    Duration::from_millis(millis)
}
