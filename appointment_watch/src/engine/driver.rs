//! Interval loop driving a [`PollingEngine`] until cancelled or failed.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    engine::{CycleReport, EngineError, PollingEngine},
    store::SeenStore,
};

/// Runs `engine` until cancelled or until a cycle fails fatally.
///
/// Successive cycle starts are spaced by `interval`: the next cycle begins
/// `interval` after the previous one began, or immediately if the cycle itself
/// took longer. A zero `interval` runs exactly one cycle.
///
/// Cancellation is observed during the courtesy delay, the fetch and the wait
/// for the next cycle. Once a response is in, its store transaction and the
/// notification for what it claimed both complete before the loop stops.
pub async fn monitor_location<S>(
    engine: &PollingEngine<S>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<(), EngineError>
where
    S: SeenStore + Send + Sync + 'static,
{
    let location_id = engine.location_id();

    if interval.is_zero() {
        engine.run_cycle_until(&cancel).await?;
        return Ok(());
    }

    loop {
        let started = Instant::now();

        if engine.run_cycle_until(&cancel).await? == CycleReport::Cancelled {
            break;
        }

        let wait = interval.saturating_sub(started.elapsed());
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    tracing::debug!(%location_id, "monitor stopped");
    Ok(())
}
