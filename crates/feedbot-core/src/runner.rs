use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::relay::{Relay, RelayOutcome};

/// Run relay ticks back to back, `interval` apart, until `cancel` fires.
///
/// Tick errors are logged and never end the loop. Returns the number of
/// ticks that completed.
pub async fn run_forever(relay: &Relay, interval: Duration, cancel: CancellationToken) -> u64 {
    tracing::info!(interval_secs = interval.as_secs(), "bot started");

    let mut ticks = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = relay.run_once() => {
                ticks += 1;
                match res {
                    Ok(RelayOutcome::Relayed(report)) if !(report.archived && report.recorded) => {
                        tracing::warn!(
                            post_id = %report.post_id,
                            archived = report.archived,
                            recorded = report.recorded,
                            "tick finished with partial failures"
                        );
                    }
                    Ok(outcome) => tracing::debug!(?outcome, "tick finished"),
                    Err(e) => tracing::error!("tick failed: {e}"),
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
    }

    tracing::info!(ticks, "bot stopped");
    ticks
}
